//! Subscriber tracking and WebSocket fan-out.

use crate::error::{Result, ServiceError};
use crate::logs::{log_message, LogClass, LogSink};
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug)]
struct Subscriber {
    connected_at: SystemTime,
}

/// A freshly registered subscriber.
///
/// `replay` holds the current log contents and must be delivered before
/// anything read from `receiver`.
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    pub replay: Vec<String>,
    pub receiver: broadcast::Receiver<String>,
}

/// Fans serialized messages out to every connected subscriber.
///
/// Publishing never waits on subscribers. One that falls more than the
/// channel capacity behind skips ahead to the newest messages.
#[derive(Debug)]
pub struct BroadcastHub {
    tx: broadcast::Sender<String>,
    subscribers: RwLock<HashMap<Uuid, Subscriber>>,
    sink: Arc<LogSink>,
    max_subscribers: usize,
}

impl BroadcastHub {
    pub fn new(sink: Arc<LogSink>, capacity: usize, max_subscribers: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            subscribers: RwLock::new(HashMap::new()),
            sink,
            max_subscribers,
        }
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    /// Add a subscriber and collect its log replay.
    ///
    /// The live receiver is created before the logs are read, so a record
    /// written in between is delivered at least once.
    pub async fn register(&self) -> Result<Subscription> {
        let id = Uuid::new_v4();
        let receiver = {
            let mut subscribers = self.subscribers.write().await;
            if subscribers.len() >= self.max_subscribers {
                return Err(ServiceError::network_error(format!(
                    "Subscriber limit of {} reached",
                    self.max_subscribers
                )));
            }
            subscribers.insert(
                id,
                Subscriber {
                    connected_at: SystemTime::now(),
                },
            );
            self.tx.subscribe()
        };

        let mut replay = Vec::new();
        for class in LogClass::ALL {
            match self.sink.read(class).await {
                Ok(Some(content)) => replay.push(log_message(class, &content)),
                Ok(None) => {}
                Err(e) => warn!("Failed to read {} log for replay: {}", class, e),
            }
        }

        Ok(Subscription {
            id,
            replay,
            receiver,
        })
    }

    pub async fn unregister(&self, id: Uuid) {
        if let Some(subscriber) = self.subscribers.write().await.remove(&id) {
            let connected_for = subscriber.connected_at.elapsed().unwrap_or_default();
            debug!(
                "Subscriber {} removed after {}s",
                id,
                connected_for.as_secs()
            );
        }
    }

    /// Send a message to every open subscriber. Returns how many received it.
    pub fn publish(&self, message: String) -> usize {
        // Err only means nobody is listening
        self.tx.send(message).unwrap_or(0)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.hub;
    if hub.subscriber_count().await >= hub.max_subscribers() {
        warn!("Refusing WebSocket client: subscriber limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Subscriber limit reached").into_response();
    }
    ws.on_upgrade(move |socket| handle_websocket(socket, hub))
}

/// Serve one subscriber until it disconnects.
async fn handle_websocket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let Subscription {
        id,
        replay,
        mut receiver,
    } = match hub.register().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Dropping WebSocket client: {}", e);
            return;
        }
    };
    info!("WebSocket client connected: {}", id);

    let (mut sender, mut inbound) = socket.split();

    let mut send_task = tokio::spawn(async move {
        for message in replay {
            if let Err(e) = sender.send(Message::Text(message)).await {
                warn!("Failed to replay logs to client {}: {}", id, e);
                return;
            }
        }

        loop {
            match receiver.recv().await {
                Ok(message) => {
                    if let Err(e) = sender.send(Message::Text(message)).await {
                        warn!("Failed to send message to client {}: {}", id, e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, skipped {} messages", id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = inbound.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client {} sent close", id);
                    break;
                }
                Ok(_) => {
                    debug!("Ignoring inbound message from {}", id);
                }
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", id, e);
                    break;
                }
            }
        }
    });

    // Whichever side finishes first ends the session
    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed for client {}", id);
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed for client {}", id);
            send_task.abort();
        }
    }

    hub.unregister(id).await;
    info!("WebSocket client disconnected: {}", id);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hub_in(dir: &std::path::Path, max: usize) -> BroadcastHub {
        let sink = Arc::new(LogSink::open(dir).await.unwrap());
        BroadcastHub::new(sink, 16, max)
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub_in(dir.path(), 4).await;
        assert_eq!(hub.publish("{}".to_string()), 0);
    }

    #[tokio::test]
    async fn test_register_replays_errors_then_incidents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(LogSink::open(dir.path()).await.unwrap());
        sink.write(LogClass::Incidents, "hot").await.unwrap();
        sink.write(LogClass::Errors, "bad").await.unwrap();
        let hub = BroadcastHub::new(sink, 16, 4);

        let subscription = hub.register().await.unwrap();
        assert_eq!(subscription.replay.len(), 2);
        assert!(subscription.replay[0].starts_with("{\"errors.log\""));
        assert!(subscription.replay[1].starts_with("{\"incidents.log\""));
    }

    #[tokio::test]
    async fn test_register_skips_absent_logs() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub_in(dir.path(), 4).await;
        let subscription = hub.register().await.unwrap();
        assert!(subscription.replay.is_empty());
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub_in(dir.path(), 4).await;
        let mut a = hub.register().await.unwrap();
        let mut b = hub.register().await.unwrap();

        assert_eq!(hub.publish("update".to_string()), 2);
        assert_eq!(a.receiver.recv().await.unwrap(), "update");
        assert_eq!(b.receiver.recv().await.unwrap(), "update");
    }

    #[tokio::test]
    async fn test_unregister_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub_in(dir.path(), 1).await;

        let first = hub.register().await.unwrap();
        assert!(hub.register().await.is_err());

        hub.unregister(first.id).await;
        assert_eq!(hub.subscriber_count().await, 0);
        assert!(hub.register().await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_subscriber_skips_ahead() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(LogSink::open(dir.path()).await.unwrap());
        let hub = BroadcastHub::new(sink, 2, 4);
        let mut slow = hub.register().await.unwrap();

        for i in 0..5 {
            hub.publish(format!("m{}", i));
        }

        assert!(matches!(
            slow.receiver.recv().await,
            Err(RecvError::Lagged(3))
        ));
        assert_eq!(slow.receiver.recv().await.unwrap(), "m3");
    }
}
