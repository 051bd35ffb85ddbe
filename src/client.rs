//! Client capability used by the resolver and the export loop
//!
//! The export pipeline only needs five operations from Telegram. They live
//! behind [`ChatClient`] so the pipeline runs the same against the grammers
//! connection and against in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Offset added to channel ids in the marked-id encoding (`-100` prefix).
const CHANNEL_MARK: i64 = 1_000_000_000_000;

/// Peer category for typed lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    /// Private user
    User,
    /// Basic group
    Chat,
    /// Broadcast channel or supergroup
    Channel,
}

impl PeerKind {
    /// Encode a bare id of this kind as a marked id.
    pub fn marked_id(self, id: i64) -> i64 {
        match self {
            PeerKind::User => id,
            PeerKind::Chat => -id,
            PeerKind::Channel => -(CHANNEL_MARK + id),
        }
    }

    /// Decode a marked id into its kind and bare id. Zero has no kind.
    pub fn from_marked(marked: i64) -> Option<(PeerKind, i64)> {
        if marked > 0 {
            Some((PeerKind::User, marked))
        } else if marked <= -CHANNEL_MARK {
            Some((PeerKind::Channel, -marked - CHANNEL_MARK))
        } else if marked < 0 {
            Some((PeerKind::Chat, -marked))
        } else {
            None
        }
    }
}

impl std::fmt::Display for PeerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PeerKind::User => "user",
            PeerKind::Chat => "chat",
            PeerKind::Channel => "channel",
        };
        f.write_str(name)
    }
}

/// A resolved chat, user or channel.
///
/// `handle` is whatever the client needs to address the peer again.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef<H> {
    pub id: i64,
    pub kind: PeerKind,
    pub title: Option<String>,
    pub username: Option<String>,
    pub handle: H,
}

impl<H> EntityRef<H> {
    /// Name used in logs and output filenames: title, then username, then id.
    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| self.username.clone().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Sender of a history record as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSender {
    /// Marked id of the sending peer
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One history record, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: i32,
    pub date: DateTime<Utc>,
    /// Text body; `None` for service and empty records
    pub text: Option<String>,
    pub sender: Option<RawSender>,
}

/// Operations the exporter needs from a Telegram connection.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opaque peer handle carried inside [`EntityRef`].
    type Handle: Clone + Send + Sync;

    /// Look up a public username. `Ok(None)` means no such username.
    async fn resolve_username(&self, username: &str)
        -> Result<Option<EntityRef<Self::Handle>>>;

    /// Look up a peer by bare id within one category.
    async fn resolve_peer(&self, kind: PeerKind, id: i64)
        -> Result<Option<EntityRef<Self::Handle>>>;

    /// Look up a peer by marked id.
    async fn resolve_id(&self, marked_id: i64) -> Result<Option<EntityRef<Self::Handle>>>;

    /// Fetch up to `limit` messages older than `offset_id`, newest first.
    /// An `offset_id` of 0 anchors at the most recent message.
    async fn history_page(
        &self,
        entity: &EntityRef<Self::Handle>,
        offset_id: i32,
        limit: usize,
    ) -> Result<Vec<RawMessage>>;

    /// Tear down the connection.
    async fn disconnect(&self) -> Result<()>;
}
