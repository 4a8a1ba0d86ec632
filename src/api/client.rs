//! Authenticated HTTP client for the backend-for-frontend
//!
//! Wraps reqwest::Client with base URL resolution, bearer token injection
//! and JSON encode/decode. No retries; timeouts are reqwest defaults.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::error::{ApiError, ApiResult, NETWORK_HINT};

/// Authenticated client for the BFF JSON API.
#[derive(Clone)]
pub struct BffClient {
    http: reqwest::Client,
    base: Url,
    base_url: String,
    bearer: Option<String>,
}

impl BffClient {
    /// Build a client for `base_url` (scheme + host, optional path prefix).
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let trimmed = base_url.trim_end_matches('/');
        let invalid = |message: String| ApiError::InvalidUrl {
            url: base_url.to_string(),
            message,
        };
        let base = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            base_url: trimmed.to_string(),
            bearer: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.clone(),
                message: "cannot append a path".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `segments` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let (resp, path) = self.send::<()>(Method::GET, segments, None).await?;
        decode(resp, &path).await
    }

    /// POST a JSON body to `segments` and decode the JSON response.
    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (resp, path) = self.send(Method::POST, segments, Some(body)).await?;
        decode(resp, &path).await
    }

    /// POST a JSON body to `segments`, ignoring whatever the backend returns.
    pub async fn post_ignore<B>(&self, segments: &[&str], body: &B) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, segments, Some(body)).await?;
        Ok(())
    }

    /// PATCH a JSON body to `segments` and decode the JSON response.
    pub async fn patch<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (resp, path) = self.send(Method::PATCH, segments, Some(body)).await?;
        decode(resp, &path).await
    }

    /// Returns the response and the request path, for error messages.
    async fn send<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> ApiResult<(reqwest::Response, String)>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        tracing::debug!("{} {}", method, url);

        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!("{} {} failed before a response: {}", method, url, e);
            ApiError::Network {
                url: self.base_url.clone(),
                reason: e.to_string(),
                hint: NETWORK_HINT,
            }
        })?;

        let resp = check_response(resp, &method, &path).await?;
        Ok((resp, path))
    }
}

/// Check HTTP response status code and return a descriptive error on failure.
async fn check_response(
    resp: reqwest::Response,
    method: &Method,
    path: &str,
) -> ApiResult<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!("{} {} -> HTTP {}", method, path, status.as_u16());
        return Err(ApiError::Http {
            status: status.as_u16(),
            method: method.to_string(),
            path: path.to_string(),
            body,
        });
    }
    Ok(resp)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, path: &str) -> ApiResult<T> {
    let bytes = resp.bytes().await.map_err(|e| ApiError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one canned HTTP response; yields the raw request head.
    async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        (format!("http://{}", addr), rx)
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            BffClient::new("not a url"),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            BffClient::new("ftp://example.com"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = BffClient::new("http://localhost:8787/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8787/api");
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let client = BffClient::new("http://localhost:8787/api/").unwrap();
        let url = client
            .endpoint(&["conversations", "a/b c", "messages"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8787/api/conversations/a%2Fb%20c/messages"
        );

        let bare = BffClient::new("http://localhost:8787").unwrap();
        assert_eq!(
            bare.endpoint(&["bootstrap"]).unwrap().as_str(),
            "http://localhost:8787/bootstrap"
        );
    }

    #[tokio::test]
    async fn test_get_decodes_json_and_sends_bearer() {
        let (base, head_rx) = serve_once(http_response("200 OK", r#"{"value":42}"#)).await;
        let mut client = BffClient::new(&base).unwrap();
        client.set_bearer_token(Some("tok-123".into()));

        let v: serde_json::Value = client.get(&["bootstrap"]).await.unwrap();
        assert_eq!(v["value"], 42);

        let head = head_rx.await.unwrap();
        assert!(head.starts_with("GET /bootstrap "));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer tok-123"));
    }

    #[tokio::test]
    async fn test_non_success_embeds_status_and_body() {
        let (base, _head) =
            serve_once(http_response("403 Forbidden", "role not allowed")).await;
        let client = BffClient::new(&base).unwrap();

        let err = client
            .post_ignore(&["conversations", "c1", "assign"], &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("role not allowed"));
        assert!(msg.contains("/conversations/c1/assign"));
    }

    #[tokio::test]
    async fn test_bad_json_is_decode_error() {
        let (base, _head) = serve_once(http_response("200 OK", "<html>")).await;
        let client = BffClient::new(&base).unwrap();

        let err = client.get::<serde_json::Value>(&["bootstrap"]).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error_with_hint() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BffClient::new(&format!("http://{}", addr)).unwrap();
        let err = client.get::<serde_json::Value>(&["bootstrap"]).await.unwrap_err();
        match &err {
            ApiError::Network { hint, .. } => assert_eq!(*hint, NETWORK_HINT),
            other => panic!("expected network error, got {:?}", other),
        }
        assert!(err.to_string().contains("PROPDESK_API_URL"));
    }
}
