//! Chat identifier resolution
//!
//! A user-supplied identifier is either a username or a numeric id. Numeric
//! ids are ambiguous on Telegram (user, basic group, channel, with or without
//! the `-100` channel prefix), so they are tried against an ordered list of
//! interpretations and the first hit wins.

use std::str::FromStr;

use tracing::{debug, error, info};

use crate::client::{ChatClient, EntityRef, PeerKind};
use crate::error::{Error, Result};

/// Marker Telegram puts in front of channel ids in their decimal form.
const CHANNEL_PREFIX: &str = "100";

/// Chat identifier as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIdentifier {
    Username(String),
    Numeric(i64),
}

impl From<&str> for ChatIdentifier {
    /// Digits with an optional leading `-` are numeric ids, anything else
    /// (including `+42` or padded input) a username.
    fn from(s: &str) -> Self {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse::<i64>() {
                return ChatIdentifier::Numeric(id);
            }
        }
        ChatIdentifier::Username(s.to_string())
    }
}

impl FromStr for ChatIdentifier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ChatIdentifier::from(s))
    }
}

impl From<i64> for ChatIdentifier {
    fn from(id: i64) -> Self {
        ChatIdentifier::Numeric(id)
    }
}

impl std::fmt::Display for ChatIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatIdentifier::Username(name) => f.write_str(name),
            ChatIdentifier::Numeric(id) => write!(f, "{}", id),
        }
    }
}

/// One interpretation of a numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Typed lookup of a bare id
    Peer(PeerKind, i64),
    /// Client-side interpretation of a marked id
    Generic(i64),
}

/// Ordered interpretations for a numeric id.
pub fn numeric_strategies(id: i64) -> Vec<Strategy> {
    let mut strategies = vec![
        Strategy::Peer(PeerKind::User, id),
        Strategy::Peer(PeerKind::Chat, id),
        Strategy::Peer(PeerKind::Channel, id),
    ];

    if id > 0 {
        if let Ok(prefixed) = format!("-{}{}", CHANNEL_PREFIX, id).parse::<i64>() {
            strategies.push(Strategy::Peer(PeerKind::Channel, prefixed));
        }
    }

    if id < 0 {
        if let Some(stripped) = strip_channel_prefix(id) {
            strategies.push(Strategy::Peer(PeerKind::Channel, stripped));
        }
    }

    strategies.push(Strategy::Generic(id));
    strategies
}

/// `-100123456` -> `123456`. `None` when the digits lack the marker or
/// nothing parsable follows it.
fn strip_channel_prefix(id: i64) -> Option<i64> {
    let digits = id.unsigned_abs().to_string();
    digits.strip_prefix(CHANNEL_PREFIX)?.parse::<i64>().ok()
}

/// Normalize a username argument: drop `@` and `t.me/` link prefixes.
fn normalize_username(raw: &str) -> &str {
    let name = raw
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let name = name.strip_prefix("t.me/").unwrap_or(name);
    name.trim_start_matches('@')
}

/// Resolve an identifier to an entity the export loop can page through.
pub async fn resolve<C: ChatClient>(
    client: &C,
    identifier: &ChatIdentifier,
) -> Result<EntityRef<C::Handle>> {
    match identifier {
        ChatIdentifier::Username(raw) => {
            let username = normalize_username(raw);
            info!("🔍 Resolving entity by username: {}", username);
            client
                .resolve_username(username)
                .await?
                .ok_or_else(|| Error::ChatNotFound(raw.clone()))
        }
        ChatIdentifier::Numeric(id) => resolve_numeric(client, *id).await,
    }
}

async fn resolve_numeric<C: ChatClient>(client: &C, id: i64) -> Result<EntityRef<C::Handle>> {
    info!("🔍 Resolving entity by ID: {}", id);

    for strategy in numeric_strategies(id) {
        match attempt(client, strategy).await {
            Ok(Some(entity)) => {
                debug!(?strategy, entity_id = entity.id, "resolved");
                return Ok(entity);
            }
            Ok(None) => debug!(?strategy, "no match"),
            Err(e) => debug!(?strategy, "lookup failed: {}", e),
        }
    }

    error!("❌ Failed to find chat with ID {}", id);
    Err(Error::ChatNotFound(id.to_string()))
}

async fn attempt<C: ChatClient>(
    client: &C,
    strategy: Strategy,
) -> Result<Option<EntityRef<C::Handle>>> {
    match strategy {
        Strategy::Peer(kind, id) => client.resolve_peer(kind, id).await,
        Strategy::Generic(id) => client.resolve_id(id).await,
    }
}
