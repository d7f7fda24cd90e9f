// # HTTP Transport
//
// This crate provides the HTTP implementation of the ledgersync
// `Transport` trait.
//
// ## Wire Format
//
// Every action is a single GET against the configured endpoint:
//
// ```text
// GET <endpoint>?action=<name>&<param>=<value>&...
// ```
//
// The response body is returned as text whatever the HTTP status; the
// endpoint reports outcomes in the body, not the status line.
//
// ## Deadlines
//
// The whole exchange (connect, send, read body) is bounded by one
// timeout. When it elapses the call fails with `Error::Timeout`.

use ledgersync_core::traits::{Params, Transport};
use ledgersync_core::{Error, Result, SyncConfig};

use std::time::Duration;

use reqwest::Url;

/// Transport that sends actions as GET requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Endpoint every action is sent to
    endpoint: Url,

    /// Deadline for one request
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Base URL of the remote endpoint
    /// - `timeout`: Deadline for one request
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Endpoint must use HTTP or HTTPS scheme. Got: {}",
                endpoint.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            timeout,
            client,
        })
    }

    /// Create a transport from the validated configuration
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.endpoint, config.transport.timeout())
    }

    /// Endpoint actions are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            // Without the URL: it carries credentials as query parameters.
            Error::transport(format!("Request failed: {}", e.without_url()))
        }
    }

    async fn exchange(&self, action: &str, params: &Params) -> Result<String> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        query.push(("action", action));
        query.extend(params.iter().map(|(key, value)| (*key, value.as_str())));

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered with HTTP {}", action, status);
        }

        response.text().await.map_err(|e| self.map_error(e))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn request(&self, action: &str, params: &Params) -> Result<String> {
        tracing::trace!("GET {} action={}", self.endpoint, action);

        match tokio::time::timeout(self.timeout, self.exchange(action, params)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", action, self.timeout);
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one connection with `status` and `body`; yields the request line
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_head(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            request.lines().next().unwrap_or_default().to_string()
        });

        (addr, handle)
    }

    async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn sends_action_and_params_as_query() {
        let (addr, server) = serve_once("200 OK", "Deposit successful").await;
        let transport =
            HttpTransport::new(&format!("http://{}/api.php", addr), Duration::from_secs(5)).unwrap();

        let body = transport
            .request(
                "deposit",
                &[("hid", "H1".to_string()), ("note", "cash in".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(body, "Deposit successful");

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /api.php?action=deposit&hid=H1&note=cash+in "));
    }

    #[tokio::test]
    async fn error_status_still_returns_body() {
        let (addr, server) = serve_once("500 Internal Server Error", "Insufficient balance").await;
        let transport =
            HttpTransport::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap();

        let body = transport.request("withdraw", &[]).await.unwrap();
        assert_eq!(body, "Insufficient balance");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let transport =
            HttpTransport::new(&format!("http://{}/", addr), Duration::from_secs(1)).unwrap();
        let err = transport.request("tget", &[]).await.unwrap_err();

        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn closed_port_is_a_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let transport =
            HttpTransport::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
        let err = transport
            .request("login", &[("password", "hunter2".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn rejects_invalid_endpoints() {
        assert!(matches!(
            HttpTransport::new("not a url", Duration::from_secs(5)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            HttpTransport::new("ftp://ledger.example.com", Duration::from_secs(5)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn from_config_uses_configured_timeout() {
        let config = SyncConfig::new("https://ledger.example.com/api.php")
            .with_timeout(Duration::from_secs(3));
        let transport = HttpTransport::from_config(&config).unwrap();

        assert_eq!(transport.timeout, Duration::from_secs(3));
        assert_eq!(transport.endpoint().host_str(), Some("ledger.example.com"));
        assert_eq!(transport.name(), "http");
    }
}
