use super::TransportError;
use crate::Result;
use reqwest::{Method, Proxy};
use serde_json::Value;
use std::env;
use std::time::Duration;
use url::Url;

/// Response from a provider API: status code plus the parsed JSON body.
///
/// Bodies that are not JSON are kept as a JSON string so error paths can still
/// report them.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort error message from common provider error shapes.
    pub fn error_message(&self) -> Option<String> {
        let candidates = ["/detail", "/error/message", "/error", "/message", "/title"];
        for path in candidates {
            if let Some(s) = self.body.pointer(path).and_then(|v| v.as_str()) {
                if !s.trim().is_empty() {
                    return Some(s.to_string());
                }
            }
        }
        match &self.body {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Thin JSON-over-HTTP client bound to one provider base URL and credential.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            crate::Error::configuration_with_context(
                format!("Invalid base URL '{}': {}", base_url, e),
                crate::ErrorContext::new().with_field_path("base_url").with_source("transport"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::Error::configuration(format!(
                "Unsupported URL scheme '{}' for base URL",
                parsed.scheme()
            )));
        }

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("PANELKIT_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("PANELKIT_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Request timeout from `PANELKIT_HTTP_TIMEOUT_SECS`, default 30s.
    pub fn timeout_from_env() -> Duration {
        let secs = env::var("PANELKIT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        Duration::from_secs(secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get_json(&self, path: &str) -> Result<JsonResponse> {
        self.send_json(Method::GET, path, None, &[]).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<JsonResponse> {
        self.send_json(Method::POST, path, body, headers).await
    }

    /// Send one request. Transport failures are returned as-is; no retry.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<JsonResponse> {
        let url = self.url(path);
        let mut request = self.client.request(method, &url);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(JsonResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_shapes() {
        let detail = JsonResponse {
            status: 422,
            body: json!({"detail": "Invalid version or not permitted"}),
        };
        assert_eq!(
            detail.error_message().as_deref(),
            Some("Invalid version or not permitted")
        );

        let nested = JsonResponse {
            status: 500,
            body: json!({"error": {"message": "boom"}}),
        };
        assert_eq!(nested.error_message().as_deref(), Some("boom"));

        let plain = JsonResponse {
            status: 502,
            body: Value::String("Bad Gateway".into()),
        };
        assert_eq!(plain.error_message().as_deref(), Some("Bad Gateway"));

        let empty = JsonResponse {
            status: 500,
            body: Value::Null,
        };
        assert!(empty.error_message().is_none());
        assert!(!empty.is_success());
    }

    #[test]
    fn test_url_joining() {
        let t = HttpTransport::new("https://api.example.com/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(t.url("/v1/predictions"), "https://api.example.com/v1/predictions");
        assert_eq!(t.url("v1/predictions"), "https://api.example.com/v1/predictions");
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let err = HttpTransport::new("not a url", None, Duration::from_secs(5)).unwrap_err();
        assert!(err.is_configuration());
        let err = HttpTransport::new("ftp://files.example", None, Duration::from_secs(5)).unwrap_err();
        assert!(err.is_configuration());
    }
}
