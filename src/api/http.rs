//! HTTP utilities for admin REST calls
//!
//! Every response goes through [`normalize_response`]: the HTTP status and the
//! body's `success` flag are both checked, so downstream code sees a single
//! `Result<ApiResponse, ApiError>` contract.

use super::error::{ApiError, GENERIC_FAILURE};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Pagination block of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pages: Option<u32>,
}

/// Successful, normalized backend response
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    /// The `data` field (or the whole body when it is a bare array)
    pub data: Value,
    pub message: Option<String>,
    pub pagination: Option<PageMeta>,
}

/// Raw download (export endpoints)
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// File attached to a multipart payload
#[derive(Debug, Clone)]
pub struct FileField {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Request body for create/update calls
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    /// Form fields plus file uploads (product images, bulk import sheets)
    Multipart {
        fields: Map<String, Value>,
        files: Vec<FileField>,
    },
}

impl Payload {
    pub fn json(value: Value) -> Self {
        Self::Json(value)
    }

    /// Form-encode a JSON object payload; other payloads are returned unchanged
    pub fn into_multipart(self) -> Self {
        match self {
            Self::Json(Value::Object(fields)) => Self::Multipart {
                fields,
                files: Vec::new(),
            },
            other => other,
        }
    }

    /// Field view used for client-side validation
    pub fn fields(&self) -> Option<Map<String, Value>> {
        match self {
            Self::Json(Value::Object(map)) => Some(map.clone()),
            Self::Json(_) => None,
            Self::Multipart { fields, files } => {
                let mut map = fields.clone();
                for file in files {
                    map.insert(file.name.clone(), Value::String(file.file_name.clone()));
                }
                Some(map)
            }
        }
    }

    fn to_form(&self) -> Result<Option<Form>, ApiError> {
        let Self::Multipart { fields, files } = self else {
            return Ok(None);
        };

        let mut form = Form::new();
        for (key, value) in fields {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|_| ApiError::Validation {
                    message: format!("Invalid content type for {}", file.name),
                    fields: vec![file.name.clone()],
                })?;
            form = form.part(file.name.clone(), part);
        }
        Ok(Some(form))
    }
}

/// Pull a human-readable message out of a response body
pub fn extract_message(body: &Value) -> Option<String> {
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| body.get("error").and_then(|v| v.as_str()))
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
        })?;

    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A 2xx body can still report failure with `success: false`
fn check_success_flag(status: StatusCode, value: &Value, body: &str) -> Result<(), ApiError> {
    if value.get("success").and_then(|v| v.as_bool()) != Some(false) {
        return Ok(());
    }
    tracing::warn!("API reported failure: {} - {}", status, sanitize_for_log(body));
    Err(ApiError::Server {
        status: status.as_u16(),
        message: extract_message(value).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
    })
}

/// Fold status code and body into one result
pub fn normalize_response(status: StatusCode, body: &str) -> Result<ApiResponse, ApiError> {
    let parsed = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(body)
    };

    if !status.is_success() {
        tracing::error!("API error: {} - {}", status, sanitize_for_log(body));
        let message = parsed.as_ref().ok().and_then(extract_message);
        return Err(ApiError::from_status(status, message));
    }

    let value = parsed.map_err(|e| {
        tracing::error!("Malformed response body: {} - {}", e, sanitize_for_log(body));
        ApiError::Network("malformed response body".to_string())
    })?;

    // Some list endpoints answer with a bare array
    if let Value::Array(_) = value {
        return Ok(ApiResponse {
            data: value,
            message: None,
            pagination: None,
        });
    }

    check_success_flag(status, &value, body)?;
    let message = extract_message(&value);

    let pagination = value
        .get("pagination")
        .and_then(|p| serde_json::from_value::<PageMeta>(p.clone()).ok());

    Ok(ApiResponse {
        data: value.get("data").cloned().unwrap_or(Value::Null),
        message,
        pagination,
    })
}

/// HTTP client wrapper for admin API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cellar-admin/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request and normalize the response
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        query: &[(String, String)],
        payload: Option<&Payload>,
    ) -> Result<ApiResponse, ApiError> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }

        match payload {
            Some(Payload::Json(body)) => request = request.json(body),
            Some(multipart) => {
                if let Some(form) = multipart.to_form()? {
                    request = request.multipart(form);
                }
            }
            None => {}
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        normalize_response(status, &body)
    }

    /// GET raw bytes from an export endpoint
    pub async fn download(
        &self,
        url: &str,
        token: &str,
        query: &[(String, String)],
    ) -> Result<Download, ApiError> {
        tracing::debug!("GET (download) {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Export error: {} - {}", status, sanitize_for_log(&body));
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(extract_message);
            return Err(ApiError::from_status(status, message));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?.to_vec();

        // Export endpoints answer failures with the usual JSON envelope
        let looks_like_json = content_type.as_deref().is_some_and(|c| c.contains("json"))
            || bytes.first() == Some(&b'{');
        if looks_like_json {
            if let Ok(value @ Value::Object(_)) = serde_json::from_slice::<Value>(&bytes) {
                check_success_flag(status, &value, &String::from_utf8_lossy(&bytes))?;
            }
        }

        Ok(Download {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let body = json!({
            "success": true,
            "data": [{"id": 1}],
            "pagination": {"page": 1, "limit": 20, "total": 41, "pages": 3}
        })
        .to_string();

        let response = normalize_response(StatusCode::OK, &body).unwrap();
        assert_eq!(response.data.as_array().unwrap().len(), 1);
        assert_eq!(response.pagination.unwrap().total, Some(41));
    }

    #[test]
    fn test_success_false_is_failure_even_with_200() {
        let body = json!({"success": false, "message": "Coupon code taken"}).to_string();
        let err = normalize_response(StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.user_message(), "Coupon code taken");
    }

    #[test]
    fn test_success_flag_without_message_uses_generic_text() {
        let err = check_success_flag(StatusCode::OK, &json!({"success": false}), "").unwrap_err();
        assert_eq!(err, ApiError::Server { status: 200, message: GENERIC_FAILURE.to_string() });
        assert!(check_success_flag(StatusCode::OK, &json!({"success": true}), "").is_ok());
    }

    #[test]
    fn test_bare_array_body() {
        let response = normalize_response(StatusCode::OK, r#"[{"_id": "a"}]"#).unwrap();
        assert!(response.data.is_array());
    }

    #[test]
    fn test_empty_body_is_null_data() {
        let response = normalize_response(StatusCode::NO_CONTENT, "").unwrap();
        assert!(response.data.is_null());
    }

    #[test]
    fn test_malformed_body_is_network_error() {
        let err = normalize_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[test]
    fn test_nested_error_message() {
        let body = json!({"error": {"message": "Store suspended"}});
        assert_eq!(extract_message(&body), Some("Store suspended".to_string()));
    }

    #[test]
    fn test_sanitize_truncates_long_body() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated, 500 bytes total"));
    }

    #[test]
    fn test_into_multipart_keeps_fields() {
        let payload = Payload::json(json!({"name": "Rioja", "price": 24})).into_multipart();
        match payload {
            Payload::Multipart { fields, files } => {
                assert_eq!(fields["name"], "Rioja");
                assert!(files.is_empty());
            }
            other => panic!("expected multipart, got {:?}", other),
        }
        assert!(matches!(Payload::json(json!([1])).into_multipart(), Payload::Json(_)));
    }

    #[test]
    fn test_multipart_fields_include_files() {
        let payload = Payload::Multipart {
            fields: json!({"name": "Rioja"}).as_object().cloned().unwrap(),
            files: vec![FileField {
                name: "image".into(),
                file_name: "rioja.png".into(),
                content_type: "image/png".into(),
                bytes: vec![1, 2, 3],
            }],
        };
        let fields = payload.fields().unwrap();
        assert_eq!(fields["image"], "rioja.png");
        assert_eq!(fields["name"], "Rioja");
    }
}
