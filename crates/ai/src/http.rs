//! Shared request plumbing for the provider clients.

use std::time::Duration;

use serde_json::Value;

use crate::error::VisionError;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, VisionError> {
    reqwest::Client::builder()
        .user_agent(concat!("designdiff/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| VisionError::Http(e.to_string()))
}

/// Send a prepared JSON request and return the decoded JSON body.
///
/// Non-2xx answers become `VisionError::Api` with the response text attached.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    timeout: Duration,
) -> Result<Value, VisionError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VisionError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| VisionError::parse(format!("response body is not JSON: {e}")))
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> VisionError {
    if err.is_timeout() {
        VisionError::Timeout(timeout)
    } else {
        VisionError::Http(err.to_string())
    }
}

/// One-shot local HTTP server for exercising the clients end to end.
#[cfg(test)]
pub(crate) mod stub {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// What the server received.
    #[derive(Debug)]
    pub struct Captured {
        pub method: String,
        pub path: String,
        pub headers: Vec<(String, String)>,
        pub body: serde_json::Value,
    }

    impl Captured {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Answer the next request with `status` and `body`. Returns the base URL
    /// to point a client at and a handle resolving to the captured request.
    pub async fn serve_once(status: u16, body: String) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];

            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before request head");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
            let mut lines = head.split("\r\n");
            let mut request_line = lines.next().unwrap_or_default().split_whitespace();
            let method = request_line.next().unwrap_or_default().to_string();
            let path = request_line.next().unwrap_or_default().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|l| l.split_once(':'))
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                .collect();

            let content_length = headers
                .iter()
                .find(|(k, _)| k == "content-length")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_body =
                serde_json::from_slice(&buf[head_end..]).unwrap_or(serde_json::Value::Null);

            let response = format!(
                "HTTP/1.1 {status} STUB\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            Captured {
                method,
                path,
                headers,
                body: request_body,
            }
        });

        (base_url, handle)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn server_errors_become_transient_api_errors() {
        let (base_url, server) = stub::serve_once(503, r#"{"error":"overloaded"}"#.into()).await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let err = send_json(
            client.post(format!("{base_url}/v1/anything")),
            &json!({}),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        match &err {
            VisionError::Api { status, body } => {
                assert_eq!(*status, 503);
                assert!(body.contains("overloaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_transient());
        assert_eq!(server.await.unwrap().path, "/v1/anything");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base_url, _server) = stub::serve_once(401, r#"{"error":"bad key"}"#.into()).await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let err = send_json(client.post(base_url), &json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Api { status: 401, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_parse_error() {
        let (base_url, _server) = stub::serve_once(200, "not json".into()).await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let err = send_json(client.post(base_url), &json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::AnalysisParse(_)));
    }
}
