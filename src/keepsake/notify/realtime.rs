//! Backend change feed over the realtime websocket (Phoenix channel protocol).
//!
//! Each subscription owns one background thread running a single-threaded tokio
//! runtime. The thread joins `realtime:room:<code>` and asks for row changes on the
//! room's records and on all photo rows, then invokes the callback for every
//! `postgres_changes` frame. Photo rows carry no room code, so photo changes from
//! other rooms also arrive here; the cost is an extra re-fetch.
//!
//! A lost connection is retried after [`RECONNECT_DELAY`] until the subscription ends.

use super::{ChangeNotifier, Invalidation, Subscription};
use crate::error::{KeepsakeError, Result};
use crate::model::RoomCode;
use crate::remote::{PHOTOS_TABLE, RECORDS_TABLE};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const PROTOCOL_VERSION: &str = "1.0.0";
const SYSTEM_TOPIC: &str = "phoenix";

#[derive(Debug, Clone)]
pub struct RealtimeNotifier {
    socket_url: Url,
    key: String,
}

impl RealtimeNotifier {
    /// `backend_url` is the project's base URL (`https://...`); the socket URL is derived
    /// from it.
    pub fn new(backend_url: &Url, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        Ok(Self {
            socket_url: socket_url(backend_url, &key)?,
            key,
        })
    }

    pub fn socket_url(&self) -> &Url {
        &self.socket_url
    }
}

impl ChangeNotifier for RealtimeNotifier {
    fn subscribe(&self, room: &RoomCode, on_change: Invalidation) -> Subscription {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let channel = Channel {
            url: self.socket_url.clone(),
            topic: topic(room),
            join: join_frame(room, &self.key),
        };

        let spawned = thread::Builder::new()
            .name(format!("keepsake-realtime-{}", room))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "could not start realtime runtime");
                        return;
                    }
                };
                runtime.block_on(channel.run(on_change, shutdown_rx));
            });

        match spawned {
            Ok(_) => {
                tracing::debug!(room = %room, "realtime subscription started");
                Subscription::new(move || {
                    // The receiver is gone if the thread already stopped
                    let _ = shutdown_tx.send(());
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not spawn realtime thread");
                Subscription::inert()
            }
        }
    }
}

/// One wire frame: `{topic, event, payload, ref}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Changed,
    Closed,
    Ignored,
}

struct Channel {
    url: Url,
    topic: String,
    join: Frame,
}

impl Channel {
    async fn run(self, on_change: Invalidation, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                outcome = self.session(&on_change) => match outcome {
                    Ok(()) => tracing::debug!(topic = %self.topic, "realtime channel closed"),
                    Err(e) => tracing::warn!(topic = %self.topic, error = %e, "realtime connection lost"),
                },
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(RECONNECT_DELAY) => {}
            }
        }
        tracing::debug!(topic = %self.topic, "realtime subscription stopped");
    }

    async fn session(&self, on_change: &Invalidation) -> Result<()> {
        let (stream, _) = connect_async(self.url.as_str()).await.map_err(socket_error)?;
        let (mut write, mut read) = stream.split();

        write
            .send(Message::Text(serde_json::to_string(&self.join)?.into()))
            .await
            .map_err(socket_error)?;
        tracing::debug!(topic = %self.topic, "joined realtime channel");

        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
        let mut seq: u64 = 1;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    seq += 1;
                    let frame = heartbeat_frame(seq);
                    write
                        .send(Message::Text(serde_json::to_string(&frame)?.into()))
                        .await
                        .map_err(socket_error)?;
                }
                message = read.next() => {
                    let Some(message) = message else {
                        return Ok(());
                    };
                    match message.map_err(socket_error)? {
                        Message::Text(text) => match classify(&self.topic, text.as_str()) {
                            Inbound::Changed => on_change(),
                            Inbound::Closed => {
                                return Err(KeepsakeError::Repository(
                                    "realtime channel closed by server".to_string(),
                                ))
                            }
                            Inbound::Ignored => {}
                        },
                        Message::Close(_) => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn socket_error(err: tokio_tungstenite::tungstenite::Error) -> KeepsakeError {
    KeepsakeError::Repository(format!("realtime: {}", err))
}

fn socket_url(backend_url: &Url, key: &str) -> Result<Url> {
    let mut url = backend_url.join("realtime/v1/websocket")?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(KeepsakeError::Configuration(format!(
                "unsupported backend URL scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme).map_err(|_| {
        KeepsakeError::Configuration("backend URL cannot be used for realtime".to_string())
    })?;
    url.query_pairs_mut()
        .append_pair("apikey", key)
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url)
}

fn topic(room: &RoomCode) -> String {
    format!("realtime:room:{}", room)
}

fn join_frame(room: &RoomCode, key: &str) -> Frame {
    Frame {
        topic: topic(room),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    {
                        "event": "*",
                        "schema": "public",
                        "table": RECORDS_TABLE,
                        "filter": format!("room_code=eq.{}", room),
                    },
                    { "event": "*", "schema": "public", "table": PHOTOS_TABLE },
                ]
            },
            "access_token": key,
        }),
        reference: Some("1".to_string()),
    }
}

fn heartbeat_frame(seq: u64) -> Frame {
    Frame {
        topic: SYSTEM_TOPIC.to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(seq.to_string()),
    }
}

fn classify(topic: &str, text: &str) -> Inbound {
    let Ok(frame) = serde_json::from_str::<Frame>(text) else {
        tracing::trace!("ignoring unparseable realtime frame");
        return Inbound::Ignored;
    };
    if frame.topic != topic {
        return Inbound::Ignored;
    }
    match frame.event.as_str() {
        "postgres_changes" => Inbound::Changed,
        "phx_error" | "phx_close" => Inbound::Closed,
        "phx_reply" => {
            if frame.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(payload = %frame.payload, "realtime join rejected");
            }
            Inbound::Ignored
        }
        _ => Inbound::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomCode {
        RoomCode::parse("abc-2026").unwrap()
    }

    #[test]
    fn socket_url_switches_scheme_and_carries_key() {
        let base = Url::parse("https://demo.example.co").unwrap();
        let url = socket_url(&base, "anon").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://demo.example.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let local = Url::parse("http://localhost:54321").unwrap();
        assert_eq!(socket_url(&local, "k").unwrap().scheme(), "ws");
    }

    #[test]
    fn socket_url_keeps_base_path() {
        let base = Url::parse("https://host.example.co/supabase/").unwrap();
        let url = socket_url(&base, "anon").unwrap();
        assert_eq!(url.path(), "/supabase/realtime/v1/websocket");
    }

    #[test]
    fn unsupported_scheme_is_a_configuration_error() {
        let base = Url::parse("ftp://example.com").unwrap();
        assert!(matches!(
            socket_url(&base, "k"),
            Err(KeepsakeError::Configuration(_))
        ));
    }

    #[test]
    fn join_filters_records_by_room() {
        let frame = join_frame(&room(), "anon");
        assert_eq!(frame.topic, "realtime:room:abc-2026");
        assert_eq!(frame.event, "phx_join");
        let changes = &frame.payload["config"]["postgres_changes"];
        assert_eq!(changes[0]["table"], "records");
        assert_eq!(changes[0]["filter"], "room_code=eq.abc-2026");
        assert_eq!(changes[1]["table"], "sub_records");
        assert!(changes[1].get("filter").is_none());
    }

    #[test]
    fn heartbeat_uses_system_topic() {
        let text = serde_json::to_string(&heartbeat_frame(7)).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "phoenix");
        assert_eq!(value["ref"], "7");
    }

    #[test]
    fn classifies_inbound_frames() {
        let t = "realtime:room:abc-2026";
        let change = r#"{"topic":"realtime:room:abc-2026","event":"postgres_changes","payload":{"data":{}},"ref":null}"#;
        let other_room = r#"{"topic":"realtime:room:zzz","event":"postgres_changes","payload":{},"ref":null}"#;
        let reply = r#"{"topic":"realtime:room:abc-2026","event":"phx_reply","payload":{"status":"ok"},"ref":"1"}"#;
        let error = r#"{"topic":"realtime:room:abc-2026","event":"phx_error","payload":{},"ref":null}"#;

        assert_eq!(classify(t, change), Inbound::Changed);
        assert_eq!(classify(t, other_room), Inbound::Ignored);
        assert_eq!(classify(t, reply), Inbound::Ignored);
        assert_eq!(classify(t, error), Inbound::Closed);
        assert_eq!(classify(t, "garbage"), Inbound::Ignored);
    }
}
