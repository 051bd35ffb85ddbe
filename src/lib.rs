//! Telegram Chat History Exporter Library
//!
//! This library provides tools to:
//! - Resolve a chat identifier (username or numeric id) to a Telegram peer
//! - Page through the chat history with an offset cursor
//! - Format messages into flat records and save them as JSON
//!
//! The export pipeline is generic over [`client::ChatClient`]; the grammers
//! implementation lives in [`telegram`].

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod message;
pub mod output;
pub mod resolver;
pub mod session;
pub mod telegram;

// Re-export common types
pub use client::{ChatClient, EntityRef, PeerKind, RawMessage, RawSender};
pub use config::Config;
pub use error::{Error, Result};
pub use export::{export_chat, export_with_client, fetch_messages, ExportOptions, ProgressObserver};
pub use message::{format_message, FormattedMessage};
pub use resolver::{resolve, ChatIdentifier};
pub use session::{SessionLock, TelegramClient};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
