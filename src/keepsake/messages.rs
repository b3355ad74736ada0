//! The couple's two free-text messages, kept on the device only.

use crate::error::Result;
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};

pub const MESSAGES_KEY: &str = "keepsake.messages.v1";

const DEFAULT_FIRST: &str = "Let's be the happiest couple in the world. On hard and tiring \
days, let's lean on each other and stay happy together. I love you.";
const DEFAULT_SECOND: &str = "Write something you want to tell your partner.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePair {
    pub first: String,
    pub second: String,
}

impl Default for MessagePair {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST.to_string(),
            second: DEFAULT_SECOND.to_string(),
        }
    }
}

impl MessagePair {
    fn is_complete(&self) -> bool {
        !self.first.trim().is_empty() && !self.second.trim().is_empty()
    }
}

pub struct MessageBoard<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> MessageBoard<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// The stored pair, or the defaults when nothing usable is stored.
    pub fn load(&self) -> MessagePair {
        let raw = match self.kv.get(MESSAGES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return MessagePair::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read messages");
                return MessagePair::default();
            }
        };
        match serde_json::from_str::<MessagePair>(&raw) {
            Ok(pair) if pair.is_complete() => pair,
            _ => MessagePair::default(),
        }
    }

    pub fn save(&self, pair: &MessagePair) -> Result<()> {
        self.kv.set(MESSAGES_KEY, &serde_json::to_string(pair)?)
    }
}
