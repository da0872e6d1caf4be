//! Realtime subscriptions over the Remote Store's WebSocket.
//!
//! Every subscription is a [`Subscription`] handle owned by the caller.
//! Once [`Subscription::cancel`] returns, or the handle is dropped, the
//! callback is never invoked again.

use std::future::Future;

use fairway_engine::{Canonical, CollectionName, DrawNotice};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::RemoteError;
use crate::remote::HttpRemote;

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Handle to a running subscription.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Run `listener` until cancelled.
    pub fn spawn<F>(listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(listener)),
        }
    }

    /// Whether the listener is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the listener and wait until it has fully stopped.
    pub async fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancellation is the expected outcome here.
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { collection: CollectionName },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Changed {
        collection: CollectionName,
        value: Value,
    },
    DrawNotification {
        notice: DrawNotice,
    },
    Pong,
    Error {
        message: String,
    },
}

/// Socket URL, with `reg` percent-encoded into the query.
fn socket_url(remote: &HttpRemote, reg: Option<&str>) -> Result<String, RemoteError> {
    let mut url =
        reqwest::Url::parse(&remote.ws_url()).map_err(|e| RemoteError::WebSocket(e.to_string()))?;
    if let Some(reg) = reg {
        url.query_pairs_mut().append_pair("reg", &reg.to_uppercase());
    }
    Ok(url.into())
}

async fn connect(remote: &HttpRemote, reg: Option<&str>) -> Result<Socket, RemoteError> {
    let mut request = socket_url(remote, reg)?
        .into_client_request()
        .map_err(|e| RemoteError::WebSocket(e.to_string()))?;
    if let Some(token) = remote.token() {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| RemoteError::WebSocket(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (socket, _) = connect_async(request)
        .await
        .map_err(|e| RemoteError::WebSocket(e.to_string()))?;
    Ok(socket)
}

/// Read server messages until the socket closes, handing each to `handle`.
async fn listen<F>(mut socket: Socket, mut handle: F)
where
    F: FnMut(ServerMessage),
{
    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                Ok(ServerMessage::Error { message }) => {
                    tracing::warn!("remote store error: {}", message);
                }
                Ok(message) => handle(message),
                Err(e) => tracing::warn!("unreadable server message: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("subscription socket error: {}", e);
                break;
            }
        }
    }
    tracing::debug!("subscription socket closed");
}

/// Receive the normalized value of `collection` now and after every remote write.
pub async fn subscribe_collection<F>(
    remote: &HttpRemote,
    collection: CollectionName,
    mut callback: F,
) -> Result<Subscription, RemoteError>
where
    F: FnMut(Value) + Send + 'static,
{
    let mut socket = connect(remote, None).await?;
    let request = serde_json::to_string(&ClientMessage::Subscribe { collection })
        .map_err(|e| RemoteError::WebSocket(e.to_string()))?;
    socket
        .send(Message::Text(request.into()))
        .await
        .map_err(|e| RemoteError::WebSocket(e.to_string()))?;

    tracing::info!(collection = %collection, "subscribed");

    Ok(Subscription::spawn(listen(socket, move |message| {
        if let ServerMessage::Changed {
            collection: changed,
            value,
        } = message
        {
            if changed == collection {
                callback(Canonical::normalize(collection, Some(value)).into_value());
            }
        }
    })))
}

/// Receive draw notices addressed to player `reg`.
pub async fn subscribe_draw_notices<F>(
    remote: &HttpRemote,
    reg: &str,
    mut callback: F,
) -> Result<Subscription, RemoteError>
where
    F: FnMut(DrawNotice) + Send + 'static,
{
    let socket = connect(remote, Some(reg)).await?;
    tracing::info!(reg = %reg, "listening for draw notices");

    Ok(Subscription::spawn(listen(socket, move |message| {
        if let ServerMessage::DrawNotification { notice } = message {
            callback(notice);
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_stops_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = Subscription::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(subscription.is_active());

        subscription.cancel().await;
        let after_cancel = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn drop_aborts_listener() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let subscription = Subscription::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        drop(subscription);
        // The sender is dropped with the aborted task.
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn socket_url_encodes_registration() {
        let remote = HttpRemote::new("https://scores.example.com", None);
        assert_eq!(
            socket_url(&remote, Some("p 1&x=2")).unwrap(),
            "wss://scores.example.com/ws?reg=P+1%26X%3D2"
        );
        assert_eq!(
            socket_url(&remote, None).unwrap(),
            "wss://scores.example.com/ws"
        );
        assert!(socket_url(&HttpRemote::new("not a url", None), None).is_err());
    }

    #[test]
    fn server_messages_parse() {
        let message: ServerMessage = serde_json::from_str(
            r#"{"type": "changed", "collection": "players", "value": {"P1": {"reg": "P1"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            message,
            ServerMessage::Changed { collection: CollectionName::Players, .. }
        ));

        let request = serde_json::to_string(&ClientMessage::Subscribe {
            collection: CollectionName::AdmittedPlayers,
        })
        .unwrap();
        assert_eq!(request, r#"{"type":"subscribe","collection":"admittedPlayers"}"#);
    }
}
