//! WebSocket dial for the realtime service.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, http::StatusCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::base::{RealtimeError, RealtimeResult};
use super::config::REALTIME_BETA_HEADER;

/// Connected realtime WebSocket.
pub type RealtimeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Append the `model` query parameter to the endpoint.
pub fn build_ws_url(base_url: &str, model: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid URL {base_url}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Unsupported URL scheme: {other}"
            )));
        }
    }

    if !model.is_empty() {
        url.query_pairs_mut().append_pair("model", model);
    }
    Ok(url)
}

fn host_header(url: &Url) -> RealtimeResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| RealtimeError::InvalidConfiguration(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Build the upgrade request with authentication headers.
///
/// permessage-deflate is never offered.
pub fn build_request(url: &Url, api_key: &str) -> RealtimeResult<http::Request<()>> {
    http::Request::builder()
        .uri(url.as_str())
        .header("Authorization", format!("Bearer {api_key}"))
        .header("OpenAI-Beta", REALTIME_BETA_HEADER)
        .header(
            "Sec-WebSocket-Key",
            tungstenite::handshake::client::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Host", host_header(url)?)
        .body(())
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))
}

/// Dial the realtime endpoint.
pub async fn connect(base_url: &str, model: &str, api_key: &str) -> RealtimeResult<RealtimeStream> {
    let url = build_ws_url(base_url, model)?;
    let request = build_request(&url, api_key)?;

    tracing::debug!(host = url.host_str().unwrap_or_default(), model, "Connecting to realtime service");

    let (ws_stream, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(map_connect_error)?;

    tracing::info!(status = %response.status(), "Connected to realtime service");
    Ok(ws_stream)
}

fn map_connect_error(err: tungstenite::Error) -> RealtimeError {
    match err {
        tungstenite::Error::Http(response)
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            RealtimeError::AuthenticationFailed(format!(
                "Handshake rejected with {}",
                response.status()
            ))
        }
        other => RealtimeError::ConnectionFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ws_url_adds_model() {
        let url = build_ws_url(
            "wss://api.openai.com/v1/realtime",
            "gpt-4o-realtime-preview-2024-12-17",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-12-17"
        );
    }

    #[test]
    fn test_build_ws_url_rejects_http() {
        assert!(matches!(
            build_ws_url("https://api.openai.com/v1/realtime", "m"),
            Err(RealtimeError::InvalidConfiguration(_))
        ));
        assert!(build_ws_url("not a url", "m").is_err());
    }

    #[test]
    fn test_request_headers() {
        let url = build_ws_url("ws://127.0.0.1:9001/v1/realtime", "m").unwrap();
        let request = build_request(&url, "sk-test").unwrap();
        let headers = request.headers();

        assert_eq!(headers["Authorization"], "Bearer sk-test");
        assert_eq!(headers["OpenAI-Beta"], "realtime=v1");
        assert_eq!(headers["Host"], "127.0.0.1:9001");
        assert!(headers.get("Sec-WebSocket-Extensions").is_none());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 on localhost is not listening in test environments
        let result = connect("ws://127.0.0.1:1/v1/realtime", "m", "sk").await;
        assert!(matches!(result, Err(RealtimeError::ConnectionFailed(_))));
    }
}
