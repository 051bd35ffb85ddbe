//! In-memory ChatClient for driving the export pipeline without Telegram

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use telegram_exporter::client::{ChatClient, EntityRef, PeerKind, RawMessage, RawSender};
use telegram_exporter::error::{Error, Result};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Username(String),
    Peer(PeerKind, i64),
    Generic(i64),
    History { offset_id: i32, limit: usize },
    Disconnect,
}

#[derive(Default)]
pub struct FakeClient {
    usernames: HashMap<String, EntityRef<i64>>,
    peers: HashMap<(PeerKind, i64), EntityRef<i64>>,
    generic: HashMap<i64, EntityRef<i64>>,
    failing_peers: HashSet<(PeerKind, i64)>,
    username_error: bool,
    /// Stored oldest first
    history: Vec<RawMessage>,
    fail_history_at: Option<i32>,
    calls: Mutex<Vec<Call>>,
    disconnected: AtomicBool,
}

pub fn entity(id: i64, kind: PeerKind, title: Option<&str>, username: Option<&str>) -> EntityRef<i64> {
    EntityRef {
        id,
        kind,
        title: title.map(str::to_string),
        username: username.map(str::to_string),
        handle: id,
    }
}

/// A message with id `id` sent by Ada Lovelace; `None` text means media-only.
pub fn message(id: i32, text: Option<&str>) -> RawMessage {
    RawMessage {
        id,
        date: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + chrono::Duration::minutes(id as i64),
        text: text.map(str::to_string),
        sender: Some(RawSender {
            id: 1001,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
        }),
    }
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, name: &str, entity: EntityRef<i64>) -> Self {
        self.usernames.insert(name.to_string(), entity);
        self
    }

    pub fn with_peer(mut self, kind: PeerKind, id: i64, entity: EntityRef<i64>) -> Self {
        self.peers.insert((kind, id), entity);
        self
    }

    pub fn with_generic(mut self, id: i64, entity: EntityRef<i64>) -> Self {
        self.generic.insert(id, entity);
        self
    }

    pub fn failing_peer(mut self, kind: PeerKind, id: i64) -> Self {
        self.failing_peers.insert((kind, id));
        self
    }

    /// Username lookups fail with a transport error.
    pub fn failing_usernames(mut self) -> Self {
        self.username_error = true;
        self
    }

    /// History messages, oldest first.
    pub fn with_history(mut self, messages: Vec<RawMessage>) -> Self {
        self.history = messages;
        self
    }

    /// Fail the history request issued at this offset.
    pub fn fail_history_at(mut self, offset_id: i32) -> Self {
        self.fail_history_at = Some(offset_id);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn history_offsets(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::History { offset_id, .. } => Some(offset_id),
                _ => None,
            })
            .collect()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    type Handle = i64;

    async fn resolve_username(&self, username: &str) -> Result<Option<EntityRef<i64>>> {
        self.record(Call::Username(username.to_string()));
        if self.username_error {
            return Err(Error::ConnectionError("connection reset".to_string()));
        }
        Ok(self.usernames.get(username).cloned())
    }

    async fn resolve_peer(&self, kind: PeerKind, id: i64) -> Result<Option<EntityRef<i64>>> {
        self.record(Call::Peer(kind, id));
        if self.failing_peers.contains(&(kind, id)) {
            return Err(Error::TelegramError("PEER_ID_INVALID".to_string()));
        }
        Ok(self.peers.get(&(kind, id)).cloned())
    }

    async fn resolve_id(&self, marked_id: i64) -> Result<Option<EntityRef<i64>>> {
        self.record(Call::Generic(marked_id));
        match self.generic.get(&marked_id) {
            Some(entity) => Ok(Some(entity.clone())),
            None => Err(Error::TelegramError(format!("no entity for {}", marked_id))),
        }
    }

    async fn history_page(
        &self,
        _entity: &EntityRef<i64>,
        offset_id: i32,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        self.record(Call::History { offset_id, limit });
        if self.fail_history_at == Some(offset_id) {
            return Err(Error::ConnectionError("connection reset".to_string()));
        }

        Ok(self
            .history
            .iter()
            .rev()
            .filter(|msg| offset_id == 0 || msg.id < offset_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record(Call::Disconnect);
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}
