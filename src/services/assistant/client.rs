use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use serde_json::Value;

use crate::services::config::WebhookConfig;

use super::error::AssistantError;
use super::retry_policy::should_retry;

/// Client for the single assistant webhook endpoint.
///
/// One instance shares a connection pool across all sends; cloning is cheap
/// and clones share the pool.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    config: WebhookConfig,
}

impl AssistantClient {
    pub fn new(config: WebhookConfig) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http, config }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// True when a real endpoint is configured. Unconfigured clients refuse
    /// to send; the store answers in demo mode instead.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn payload(&self, message: &str, conversation_id: Option<&str>, stream: bool) -> Value {
        let mut payload = serde_json::json!({
            "message": message,
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if let Some(id) = conversation_id {
            payload["conversationId"] = Value::from(id);
        }
        if stream {
            payload["stream"] = Value::from(true);
        }
        payload
    }

    /// Send a message and return the raw JSON body verbatim.
    ///
    /// Retryable failures (timeouts, transport errors, throttling and server
    /// statuses) are retried with capped exponential backoff; the final
    /// error surfaces once attempts are exhausted.
    pub async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<Value, AssistantError> {
        if !self.is_configured() {
            return Err(AssistantError::unconfigured(
                "Webhook endpoint is not configured",
            ));
        }

        let payload = self.payload(message, conversation_id, false);
        let retry = self.config.retry;
        let mut last_error: Option<AssistantError> = None;

        for attempt in 1..=retry.max_attempts {
            match self.post_json(&payload).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt < retry.max_attempts && should_retry(&err) {
                        log::warn!(
                            "Retry attempt {}/{} after webhook error: {}",
                            attempt + 1,
                            retry.max_attempts,
                            err
                        );
                        last_error = Some(err);
                        tokio::time::sleep(retry.backoff(attempt)).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AssistantError::network("Retry limit exceeded")))
    }

    async fn post_json(&self, payload: &Value) -> Result<Value, AssistantError> {
        let resp = self
            .http
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AssistantError::status(
                status.as_u16(),
                format!("HTTP {status}"),
            ));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| AssistantError::invalid_response(e.to_string()))
    }

    /// Send a message and consume a newline-delimited streaming response.
    ///
    /// `on_chunk` runs once per complete line carrying a `chunk` string
    /// field; partial lines are buffered across reads, malformed lines are
    /// logged and skipped. Not retried and not timeout-bounded: chunks may
    /// already have reached the caller.
    pub async fn send_message_stream<F>(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        mut on_chunk: F,
    ) -> Result<(), AssistantError>
    where
        F: FnMut(&str),
    {
        if !self.is_configured() {
            return Err(AssistantError::unconfigured(
                "Webhook endpoint is not configured",
            ));
        }

        let payload = self.payload(message, conversation_id, true);
        let resp = self
            .http
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AssistantError::status(
                status.as_u16(),
                format!("HTTP {status}"),
            ));
        }

        let mut stream = resp.bytes_stream();
        let mut buffer = String::new();

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(AssistantError::from)?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                handle_stream_line(&line, &mut on_chunk);
            }
        }

        // A final line without a trailing newline still counts.
        if !buffer.trim().is_empty() {
            let line = std::mem::take(&mut buffer);
            handle_stream_line(&line, &mut on_chunk);
        }

        Ok(())
    }
}

fn handle_stream_line<F: FnMut(&str)>(line: &str, on_chunk: &mut F) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<Value>(line) {
        Ok(data) => {
            if let Some(chunk) = data.get("chunk").and_then(Value::as_str) {
                on_chunk(chunk);
            }
        }
        Err(err) => log::warn!("Skipping malformed stream line: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::retry::RetryConfig;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_config(url: String) -> WebhookConfig {
        WebhookConfig {
            url,
            timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(20),
            },
        }
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve each canned response to one connection, in order, then stop.
    async fn serve(responses: Vec<String>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = vec![0u8; 8192];
                let _ = socket.read(&mut request).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_send_message_returns_body_verbatim() {
        let addr = serve(vec![http_response("200 OK", r#"{"output":"hello"}"#)]).await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let body = client.send_message("hi", Some("conv_1")).await.unwrap();
        assert_eq!(body["output"], "hello");
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses_to_send() {
        let client = AssistantClient::new(WebhookConfig::default());
        let err = client.send_message("hi", None).await.unwrap_err();
        assert!(matches!(err, AssistantError::Unconfigured { .. }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let addr = serve(vec![http_response("404 Not Found", "{}")]).await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let err = client.send_message("hi", None).await.unwrap_err();
        match err {
            AssistantError::Status { status, .. } => assert_eq!(status, 404),
            other => panic!("expected status error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let addr = serve(vec![
            http_response("500 Internal Server Error", "{}"),
            http_response("200 OK", r#"{"output":"second try"}"#),
        ])
        .await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let body = client.send_message("hi", None).await.unwrap();
        assert_eq!(body["output"], "second try");
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let addr = serve(vec![
            http_response("500 Internal Server Error", "{}"),
            http_response("502 Bad Gateway", "{}"),
            http_response("503 Service Unavailable", "{}"),
        ])
        .await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let err = client.send_message("hi", None).await.unwrap_err();
        match err {
            AssistantError::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("expected status error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        // Accept the connection, then never respond.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let config = WebhookConfig {
            timeout: Duration::from_millis(200),
            retry: RetryConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
            ..fast_config(format!("http://{addr}/webhook"))
        };
        let client = AssistantClient::new(config);

        let err = client.send_message("hi", None).await.unwrap_err();
        assert!(matches!(err, AssistantError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_stream_collects_chunks_and_skips_bad_lines() {
        let body = concat!(
            r#"{"chunk":"Hel"}"#, "\n",
            "not json at all\n",
            r#"{"done":true}"#, "\n",
            r#"{"chunk":"lo"}"#,
        );
        let addr = serve(vec![http_response("200 OK", body)]).await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let collected = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = collected.clone();
        client
            .send_message_stream("hi", Some("conv_1"), |chunk| {
                sink.lock().unwrap().push_str(chunk);
            })
            .await
            .unwrap();

        assert_eq!(collected.lock().unwrap().as_str(), "Hello");
    }

    #[tokio::test]
    async fn test_stream_non_success_status_is_an_error() {
        let addr = serve(vec![http_response("503 Service Unavailable", "{}")]).await;
        let client = AssistantClient::new(fast_config(format!("http://{addr}/webhook")));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let err = client
            .send_message_stream("hi", None, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Status { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
