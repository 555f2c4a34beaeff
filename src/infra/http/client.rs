//! Minimal JSON client for the content API.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::{Client, Method, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::application::ports::GatewayError;
use crate::infra::error::InfraError;

const METRIC_REQUEST_TOTAL: &str = "folio_gateway_request_total";
const METRIC_REQUEST_MS: &str = "folio_gateway_request_ms";
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone, Debug)]
pub struct Ctx {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl Ctx {
    pub fn new(base: &Url, timeout: Duration, token: Option<String>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: base.clone(),
            token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    /// Accessor for one kind of entity, optionally addressed through a named id field.
    ///
    /// `get("notes", Some("nid")).fetch("5")` requests `<base>/notes/nid/5`.
    pub fn get(&self, kind: &'static str, id_field: Option<&'static str>) -> Resource<'_> {
        Resource {
            ctx: self,
            kind,
            id_field,
        }
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::transport(format!("base URL `{}` cannot carry a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    #[instrument(skip(self, query))]
    async fn send(
        &self,
        kind: &'static str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Response, GatewayError> {
        let url = self.url(segments, query)?;
        let mut request = self.client.request(Method::GET, url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let result = request.send().await;
        counter!(METRIC_REQUEST_TOTAL, "kind" => kind).increment(1);
        histogram!(METRIC_REQUEST_MS, "kind" => kind)
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        let response = result.map_err(|err| GatewayError::transport(err.to_string()))?;
        let status = response.status();
        debug!(path = url.path(), status = status.as_u16(), "gateway response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::status(status.as_u16(), error_message(&body)))
    }
}

/// One kind of entity exposed by the API.
pub struct Resource<'a> {
    ctx: &'a Ctx,
    kind: &'static str,
    id_field: Option<&'static str>,
}

impl Resource<'_> {
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        value: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let response = self.ctx.send(self.kind, &self.segments(value), query).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| GatewayError::transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| GatewayError::decode(err.to_string()))
    }

    /// Request without decoding a body.
    pub async fn touch(&self, value: &str) -> Result<(), GatewayError> {
        self.ctx.send(self.kind, &self.segments(value), &[]).await?;
        Ok(())
    }

    fn segments<'v>(&self, value: &'v str) -> Vec<&'v str> {
        match self.id_field {
            Some(field) => vec![self.kind, field, value],
            None => vec![self.kind, value],
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: MessageField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageField {
    One(String),
    Many(Vec<String>),
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: MessageField::One(message),
        }) => message,
        Ok(ErrorBody {
            message: MessageField::Many(messages),
        }) => messages.join("; "),
        Err(_) => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(base: &str) -> Ctx {
        let base = Url::parse(base).expect("url");
        Ctx::new(&base, Duration::from_secs(5), None).expect("ctx")
    }

    #[test]
    fn resource_paths_respect_base_prefix() {
        let ctx = ctx("https://api.example.com/v2/");
        let resource = ctx.get("notes", Some("nid"));
        let url = ctx
            .url(&resource.segments("5"), &[("password", "a b")])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v2/notes/nid/5?password=a+b"
        );
    }

    #[test]
    fn resource_without_id_field_addresses_value_directly() {
        let ctx = ctx("https://api.example.com");
        let resource = ctx.get("notes", None);
        let url = ctx.url(&resource.segments("latest"), &[]).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/notes/latest");
    }

    #[test]
    fn path_values_are_escaped() {
        let ctx = ctx("https://api.example.com/");
        let resource = ctx.get("pages", Some("slug"));
        let url = ctx.url(&resource.segments("a/b"), &[]).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/pages/slug/a%2Fb");
    }

    #[test]
    fn error_messages_prefer_json_message_field() {
        assert_eq!(
            error_message(r#"{"message":"password required"}"#),
            "password required"
        );
        assert_eq!(error_message(r#"{"message":["a","b"]}"#), "a; b");
        assert_eq!(error_message("plain"), "plain");
    }
}
