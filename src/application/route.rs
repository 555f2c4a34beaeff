//! Routes the reader understands and the navigation marker derived from them.

use url::Url;

use crate::domain::DocumentId;
use crate::domain::error::DomainError;

pub const NOTES_PATH: &str = "/notes";
pub const TIMELINE_PATH: &str = "/timeline?type=note";
const LATEST_SEGMENT: &str = "latest";
const PAGES_SEGMENT: &str = "pages";
const PASSWORD_PARAM: &str = "password";
const ROUTE_BASE: &str = "folio://local/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Note(DocumentId),
    LatestNote,
    Page(String),
}

/// Parsed route plus the query parameters loaders care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    path: String,
    route: Route,
    password: Option<String>,
}

impl RouteContext {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let base = Url::parse(ROUTE_BASE).map_err(|err| DomainError::validation(err.to_string()))?;
        let url = base
            .join(raw.trim())
            .map_err(|_| DomainError::unknown_route(raw))?;

        let password = url
            .query_pairs()
            .find(|(key, _)| key == PASSWORD_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        let route = match segments.as_slice() {
            ["notes", LATEST_SEGMENT] => Route::LatestNote,
            ["notes", id] => Route::Note(DocumentId::parse(id)),
            [PAGES_SEGMENT, slug] => Route::Page(slug.to_string()),
            [slug] if *slug != "notes" => Route::Page(slug.to_string()),
            _ => return Err(DomainError::unknown_route(raw)),
        };

        Ok(Self {
            path: url.path().trim_end_matches('/').to_string(),
            route,
            password,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Navigation marker: identifies the route a server payload was produced for.
    pub fn marker(&self) -> &str {
        &self.path
    }

    /// Same route with a password attached, as a password submission would navigate.
    pub fn with_password(&self, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..self.clone()
        }
    }

    pub fn is_latest(&self) -> bool {
        self.route == Route::LatestNote
    }
}

pub fn note_path(nid: u64) -> String {
    format!("{NOTES_PATH}/{nid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_routes() {
        let ctx = RouteContext::parse("/notes/9").expect("route");
        assert_eq!(ctx.route(), &Route::Note(DocumentId::Seq(9)));
        assert_eq!(ctx.marker(), "/notes/9");
        assert_eq!(ctx.password(), None);

        let ctx = RouteContext::parse("/notes/65a1f0c2").expect("route");
        assert_eq!(
            ctx.route(),
            &Route::Note(DocumentId::Key("65a1f0c2".to_string()))
        );
    }

    #[test]
    fn latest_alias_is_recognised() {
        let ctx = RouteContext::parse("/notes/latest").expect("route");
        assert!(ctx.is_latest());
    }

    #[test]
    fn password_query_is_not_part_of_marker() {
        let ctx = RouteContext::parse("/notes/7?password=right").expect("route");
        assert_eq!(ctx.password(), Some("right"));
        assert_eq!(ctx.marker(), "/notes/7");
    }

    #[test]
    fn pages_resolve_by_slug() {
        let ctx = RouteContext::parse("/pages/about").expect("route");
        assert_eq!(ctx.route(), &Route::Page("about".to_string()));
        let ctx = RouteContext::parse("/about/").expect("route");
        assert_eq!(ctx.route(), &Route::Page("about".to_string()));
        assert_eq!(ctx.marker(), "/about");
    }

    #[test]
    fn unknown_routes_are_rejected() {
        assert!(matches!(
            RouteContext::parse("/"),
            Err(DomainError::UnknownRoute { .. })
        ));
        assert!(RouteContext::parse("/notes").is_err());
        assert!(RouteContext::parse("/a/b/c").is_err());
    }

    #[test]
    fn note_paths_use_sequence_numbers() {
        assert_eq!(note_path(42), "/notes/42");
    }
}
