//! [`ChatClient`] backed by the grammers MTProto client
//!
//! Typed lookups walk the account's dialog list (fetched once per
//! connection), since bare ids cannot be addressed without an access hash.
//! History pages come straight from `messages.getHistory`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use grammers_client::types::peer::Peer;
use grammers_tl_types as tl;
use tracing::debug;

use crate::client::{ChatClient, EntityRef, PeerKind, RawMessage, RawSender};
use crate::error::{Error, Result};
use crate::session::TelegramClient;

/// Convert a Peer to InputPeer for API calls.
fn peer_to_input(peer: &Peer) -> tl::enums::InputPeer {
    match peer {
        Peer::User(user) => {
            let (user_id, access_hash) = match &user.raw {
                tl::enums::User::User(u) => (u.id, u.access_hash.unwrap_or(0)),
                tl::enums::User::Empty(u) => (u.id, 0),
            };
            tl::enums::InputPeer::User(tl::types::InputPeerUser {
                user_id,
                access_hash,
            })
        }
        Peer::Channel(channel) => tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
            channel_id: channel.raw.id,
            access_hash: channel.raw.access_hash.unwrap_or(0),
        }),
        Peer::Group(group) => match &group.raw {
            tl::enums::Chat::Chat(c) => {
                tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id: c.id })
            }
            tl::enums::Chat::Channel(c) => {
                tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
                    channel_id: c.id,
                    access_hash: c.access_hash.unwrap_or(0),
                })
            }
            _ => tl::enums::InputPeer::Empty,
        },
    }
}

/// Kind and bare id of a dialog peer. Megagroups count as channels.
fn peer_key(peer: &Peer) -> (PeerKind, i64) {
    match peer {
        Peer::User(user) => (PeerKind::User, user.raw.id()),
        Peer::Channel(channel) => (PeerKind::Channel, channel.raw.id),
        Peer::Group(group) => match &group.raw {
            tl::enums::Chat::Empty(c) => (PeerKind::Chat, c.id),
            tl::enums::Chat::Chat(c) => (PeerKind::Chat, c.id),
            tl::enums::Chat::Forbidden(c) => (PeerKind::Chat, c.id),
            tl::enums::Chat::Channel(c) => (PeerKind::Channel, c.id),
            tl::enums::Chat::ChannelForbidden(c) => (PeerKind::Channel, c.id),
        },
    }
}

fn entity_ref(peer: Peer) -> EntityRef<Peer> {
    let (kind, id) = peer_key(&peer);
    let (title, username) = match &peer {
        Peer::User(user) => (None, user.username().map(str::to_string)),
        Peer::Channel(channel) => (
            Some(channel.title().to_string()),
            channel.raw.username.clone(),
        ),
        Peer::Group(group) => {
            let username = match &group.raw {
                tl::enums::Chat::Channel(c) => c.username.clone(),
                _ => None,
            };
            (group.title().map(str::to_string), username)
        }
    };

    EntityRef {
        id,
        kind,
        title,
        username,
        handle: peer,
    }
}

fn tl_peer_marked_id(peer: &tl::enums::Peer) -> i64 {
    match peer {
        tl::enums::Peer::User(p) => PeerKind::User.marked_id(p.user_id),
        tl::enums::Peer::Chat(p) => PeerKind::Chat.marked_id(p.chat_id),
        tl::enums::Peer::Channel(p) => PeerKind::Channel.marked_id(p.channel_id),
    }
}

/// Who sent a message: explicit `from_id`, else the chat itself for
/// channel posts and incoming private messages.
fn sender_peer(
    from_id: Option<&tl::enums::Peer>,
    peer_id: &tl::enums::Peer,
    post: bool,
    out: bool,
) -> Option<i64> {
    match from_id {
        Some(from) => Some(tl_peer_marked_id(from)),
        None if post => Some(tl_peer_marked_id(peer_id)),
        None if !out && matches!(peer_id, tl::enums::Peer::User(_)) => {
            Some(tl_peer_marked_id(peer_id))
        }
        None => None,
    }
}

type UserNames = HashMap<i64, (Option<String>, Option<String>)>;

fn raw_sender(marked_id: Option<i64>, names: &UserNames) -> Option<RawSender> {
    let id = marked_id?;
    let (first_name, last_name) = names.get(&id).cloned().unwrap_or_default();
    Some(RawSender {
        id,
        first_name,
        last_name,
    })
}

fn to_raw_message(message: tl::enums::Message, names: &UserNames) -> RawMessage {
    match message {
        tl::enums::Message::Message(m) => {
            let sender = sender_peer(m.from_id.as_ref(), &m.peer_id, m.post, m.out);
            RawMessage {
                id: m.id,
                date: DateTime::from_timestamp(m.date as i64, 0).unwrap_or_default(),
                text: Some(m.message).filter(|t| !t.is_empty()),
                sender: raw_sender(sender, names),
            }
        }
        tl::enums::Message::Service(m) => {
            let sender = sender_peer(m.from_id.as_ref(), &m.peer_id, m.post, m.out);
            RawMessage {
                id: m.id,
                date: DateTime::from_timestamp(m.date as i64, 0).unwrap_or_default(),
                text: None,
                sender: raw_sender(sender, names),
            }
        }
        tl::enums::Message::Empty(m) => RawMessage {
            id: m.id,
            date: DateTime::default(),
            text: None,
            sender: None,
        },
    }
}

/// Flatten a history response into raw records, in server order.
fn history_records(response: tl::enums::messages::Messages) -> Vec<RawMessage> {
    let (messages, users) = match response {
        tl::enums::messages::Messages::Messages(m) => (m.messages, m.users),
        tl::enums::messages::Messages::Slice(m) => (m.messages, m.users),
        tl::enums::messages::Messages::ChannelMessages(m) => (m.messages, m.users),
        tl::enums::messages::Messages::NotModified(_) => return Vec::new(),
    };

    let names: UserNames = users
        .into_iter()
        .filter_map(|user| match user {
            tl::enums::User::User(u) => Some((u.id, (u.first_name, u.last_name))),
            tl::enums::User::Empty(_) => None,
        })
        .collect();

    messages
        .into_iter()
        .map(|m| to_raw_message(m, &names))
        .collect()
}

impl TelegramClient {
    async fn cached_dialogs(&self) -> Result<&[Peer]> {
        let dialogs = self
            .dialogs
            .get_or_try_init(|| async {
                let mut peers = Vec::new();
                let mut iter = self.client.iter_dialogs();
                while let Some(dialog) = iter
                    .next()
                    .await
                    .map_err(|e| Error::TelegramError(e.to_string()))?
                {
                    peers.push(dialog.peer);
                }
                debug!(count = peers.len(), "loaded dialogs");
                Ok::<_, Error>(peers)
            })
            .await?;
        Ok(dialogs.as_slice())
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    type Handle = Peer;

    async fn resolve_username(&self, username: &str) -> Result<Option<EntityRef<Peer>>> {
        let peer = self
            .client
            .resolve_username(username)
            .await
            .map_err(|e| Error::TelegramError(e.to_string()))?;
        Ok(peer.map(entity_ref))
    }

    async fn resolve_peer(&self, kind: PeerKind, id: i64) -> Result<Option<EntityRef<Peer>>> {
        let found = self
            .cached_dialogs()
            .await?
            .iter()
            .find(|peer| peer_key(peer) == (kind, id))
            .cloned();
        Ok(found.map(entity_ref))
    }

    async fn resolve_id(&self, marked_id: i64) -> Result<Option<EntityRef<Peer>>> {
        match PeerKind::from_marked(marked_id) {
            Some((kind, id)) => self.resolve_peer(kind, id).await,
            None => Ok(None),
        }
    }

    async fn history_page(
        &self,
        entity: &EntityRef<Peer>,
        offset_id: i32,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        let request = tl::functions::messages::GetHistory {
            peer: peer_to_input(&entity.handle),
            offset_id,
            offset_date: 0,
            add_offset: 0,
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
            max_id: 0,
            min_id: 0,
            hash: 0,
        };

        let response = self.client.invoke(&request).await?;
        Ok(history_records(response))
    }

    async fn disconnect(&self) -> Result<()> {
        self.shutdown().await
    }
}
