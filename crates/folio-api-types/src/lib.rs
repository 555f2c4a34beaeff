//! Wire types exchanged with the remote content API and carried in handoff payloads.
//!
//! Field names follow the remote API's camelCase JSON. Timestamps travel as
//! RFC 3339 strings; sequence ids travel as JSON integers and stay `u64` end to
//! end so that large ids survive a serialize/parse cycle unchanged.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Read/like counters attached to a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDto {
    pub read: u64,
    pub like: u64,
}

/// A track reference attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A fully resolved note as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    pub id: String,
    pub nid: u64,
    pub title: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub secret: Option<OffsetDateTime>,
    #[serde(default)]
    pub allows_password: bool,
    #[serde(default)]
    pub count: CountDto,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub music: Vec<MusicDto>,
    #[serde(default)]
    pub has_memory: bool,
    #[serde(default)]
    pub allow_comment: Option<bool>,
}

/// Minimal description of a neighbouring note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSiblingDto {
    pub id: String,
    pub nid: u64,
    #[serde(default)]
    pub title: String,
}

/// Response body of the note detail and latest-note endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEnvelope {
    pub data: NoteDto,
    #[serde(default)]
    pub prev: Option<NoteSiblingDto>,
    #[serde(default)]
    pub next: Option<NoteSiblingDto>,
}

/// Placeholder produced when a note exists but requires a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedNoteDto {
    pub id: String,
    pub needs_password: bool,
}

/// Props handed from the initial data load of a note route to its view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteProps {
    Locked(LockedNoteDto),
    Resolved(Box<NoteDto>),
}

/// A standalone page addressed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
}

/// Response body of the page-by-slug endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope {
    pub data: PageDto,
}

/// Name of the key carrying the navigation marker inside a handoff payload.
pub const MARKER_KEY: &str = "__marker";

/// Server-produced props plus the route they were generated for.
///
/// Serialized as a single flat object: the props' own keys plus [`MARKER_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload<P> {
    #[serde(flatten)]
    pub props: P,
    #[serde(rename = "__marker")]
    pub marker: String,
}

impl<P> HandoffPayload<P> {
    pub fn new(props: P, marker: impl Into<String>) -> Self {
        Self {
            props,
            marker: marker.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use time::macros::datetime;

    use super::*;

    fn sample_note(nid: u64) -> NoteDto {
        NoteDto {
            id: "65a1f0c2e4b0a1b2c3d4e5f6".to_string(),
            nid,
            title: "Rain".to_string(),
            text: "It rained all day.".to_string(),
            created: datetime!(2024-03-01 08:30:00 UTC),
            modified: Some(datetime!(2024-03-02 10:00:00 UTC)),
            hide: false,
            secret: None,
            allows_password: false,
            count: CountDto { read: 12, like: 3 },
            mood: Some("calm".to_string()),
            weather: Some("rain".to_string()),
            music: vec![MusicDto {
                id: "1901371647".to_string(),
                kind: "netease".to_string(),
            }],
            has_memory: true,
            allow_comment: Some(true),
        }
    }

    #[test]
    fn handoff_payload_is_flat_and_byte_stable() {
        let payload = HandoffPayload::new(
            NoteProps::Resolved(Box::new(sample_note(9_007_199_254_740_993))),
            "/notes/9007199254740993",
        );

        let first = serde_json::to_string(&payload).expect("serialize");
        let value: Value = serde_json::from_str(&first).expect("parse as value");
        assert_eq!(value[MARKER_KEY], json!("/notes/9007199254740993"));
        assert_eq!(value["nid"].as_u64(), Some(9_007_199_254_740_993));

        let parsed: HandoffPayload<NoteProps> = serde_json::from_str(&first).expect("parse");
        assert_eq!(parsed, payload);
        let second = serde_json::to_string(&parsed).expect("serialize again");
        assert_eq!(first, second);
    }

    #[test]
    fn locked_props_do_not_parse_as_resolved() {
        let raw = json!({ "id": "7", "needsPassword": true, "__marker": "/notes/7" });
        let parsed: HandoffPayload<NoteProps> = serde_json::from_value(raw).expect("parse");
        assert_eq!(
            parsed.props,
            NoteProps::Locked(LockedNoteDto {
                id: "7".to_string(),
                needs_password: true
            })
        );
    }

    #[test]
    fn envelope_defaults_missing_optional_fields() {
        let raw = json!({
            "data": {
                "id": "abc",
                "nid": 42,
                "title": "t",
                "text": "b",
                "created": "2024-01-01T00:00:00Z"
            }
        });
        let envelope: NoteEnvelope = serde_json::from_value(raw).expect("parse");
        assert_eq!(envelope.data.nid, 42);
        assert!(envelope.prev.is_none());
        assert!(envelope.data.secret.is_none());
        assert_eq!(envelope.data.count, CountDto::default());
    }
}
