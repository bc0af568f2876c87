use std::time::Duration;

use serde_json::Value;

use super::{BackendFuture, RawRecord, ReportBackend, TransportError};
use crate::ReportId;

/// Talks to the report service over HTTP.
///
/// Endpoints, relative to `base_url`:
/// - `GET video/list/{user_no}`
/// - `GET video/{id}`
/// - `DELETE video/{id}`
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, user_no: u64) -> String {
        format!("{}/video/list/{}", self.base_url, user_no)
    }

    fn record_url(&self, id: &ReportId) -> String {
        format!("{}/video/{}", self.base_url, urlencoding::encode(id.as_str()))
    }
}

impl ReportBackend for HttpBackend {
    fn fetch_list(&self, user_no: u64) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            let url = self.list_url(user_no);
            tracing::debug!(%url, "fetching report list");

            let resp = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }

            let body = decode_body(&resp.bytes().await?)?;
            unwrap_list(body)
        })
    }

    fn fetch_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, RawRecord> {
        Box::pin(async move {
            let url = self.record_url(id);
            tracing::debug!(%url, "fetching report");

            let resp = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await?;

            let status = resp.status();
            if status.as_u16() == 404 {
                return Err(TransportError::NotFound(id.clone()));
            }
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }

            let body = decode_body(&resp.bytes().await?)?;
            unwrap_record(body, id)
        })
    }

    fn delete_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let url = self.record_url(id);
            tracing::debug!(%url, "deleting report");

            let resp = self
                .client
                .delete(&url)
                .timeout(self.timeout)
                .send()
                .await?;

            let status = resp.status();
            if status.as_u16() == 404 {
                return Err(TransportError::NotFound(id.clone()));
            }
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}

/// Parse a response body as JSON. Anything unparseable is a `Decode` error.
fn decode_body(bytes: &[u8]) -> Result<Value, TransportError> {
    serde_json::from_slice(bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Accept a bare array, an array wrapped in `data` or `items`, or `null`.
fn unwrap_list(body: Value) -> Result<Vec<RawRecord>, TransportError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => {
            for key in ["data", "items"] {
                match map.remove(key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    _ => {}
                }
            }
            Err(TransportError::Decode(
                "expected a list of reports".to_string(),
            ))
        }
        other => Err(TransportError::Decode(format!(
            "expected a list of reports, got {}",
            json_kind(&other)
        ))),
    }
}

/// Accept a bare object or one wrapped in `data`.
fn unwrap_record(body: Value, id: &ReportId) -> Result<RawRecord, TransportError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => Ok(inner),
            Some(Value::Null) => Err(TransportError::NotFound(id.clone())),
            Some(other) => {
                map.insert("data".to_string(), other);
                Ok(Value::Object(map))
            }
            None => Ok(Value::Object(map)),
        },
        Value::Null => Err(TransportError::NotFound(id.clone())),
        other => Err(TransportError::Decode(format!(
            "expected a report object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> HttpBackend {
        HttpBackend::new("http://localhost:8080/api/", Duration::from_secs(5))
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(backend().base_url(), "http://localhost:8080/api");
        assert_eq!(backend().list_url(1), "http://localhost:8080/api/video/list/1");
    }

    #[test]
    fn record_url_encodes_id() {
        let b = backend();
        assert_eq!(
            b.record_url(&ReportId::from("a b/c")),
            "http://localhost:8080/api/video/a%20b%2Fc"
        );
        assert_eq!(
            b.record_url(&ReportId::from(12u64)),
            "http://localhost:8080/api/video/12"
        );
    }

    #[test]
    fn list_accepts_bare_and_wrapped_arrays() {
        assert_eq!(unwrap_list(json!([{"id": 1}])).unwrap().len(), 1);
        assert_eq!(
            unwrap_list(json!({"data": [{"id": 1}, {"id": 2}]}))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(unwrap_list(json!({"items": []})).unwrap().len(), 0);
        assert!(unwrap_list(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn list_rejects_scalars() {
        assert!(matches!(
            unwrap_list(json!("nope")),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(
            unwrap_list(json!({"message": "ok"})),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(
            decode_body(b"<html>502 Bad Gateway</html>"),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(decode_body(b""), Err(TransportError::Decode(_))));
        assert_eq!(decode_body(br#"{"data": []}"#).unwrap(), json!({"data": []}));
    }

    #[test]
    fn record_unwraps_data_envelope() {
        let id = ReportId::from(3u64);
        let rec = unwrap_record(json!({"data": {"record_no": 3}}), &id).unwrap();
        assert_eq!(rec["record_no"], 3);

        let bare = unwrap_record(json!({"record_no": 3, "data": "raw"}), &id).unwrap();
        assert_eq!(bare["data"], "raw");
    }

    #[test]
    fn null_record_is_not_found() {
        let id = ReportId::from(9u64);
        assert!(matches!(
            unwrap_record(Value::Null, &id),
            Err(TransportError::NotFound(_))
        ));
        assert!(matches!(
            unwrap_record(json!({"data": null}), &id),
            Err(TransportError::NotFound(_))
        ));
    }
}
