//! Session management for the Telegram client
//!
//! Provides:
//! - File-based session locking to prevent parallel use of one session
//! - Client connection and teardown
//! - Interactive sign-in when the stored session is not authorized

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::peer::Peer;
use grammers_client::{Client, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::{mpsc, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock at `path`.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                warn!(
                    "Session lock {} is held by another process; wait for it to finish",
                    path.display()
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Open (or create) the SQLite session file.
pub fn open_session(path: &Path) -> Result<Arc<SqliteSession>> {
    let session = SqliteSession::open(path).map_err(|e| {
        Error::ConnectionError(format!("Failed to open session {}: {}", path.display(), e))
    })?;
    Ok(Arc::new(session))
}

/// Connected grammers client plus the sender pool task driving it.
pub struct TelegramClient {
    pub client: Client,
    handle: SenderPoolHandle,
    runner: Mutex<Option<JoinHandle<()>>>,
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    /// Dialog list, fetched on first typed lookup
    pub(crate) dialogs: OnceCell<Vec<Peer>>,
}

impl TelegramClient {
    /// Connect using the session file named by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("🔌 Connecting to Telegram...");
        let session = open_session(&config.session_file())?;
        let pool = SenderPool::new(session, config.api_id);

        // Client needs the whole pool before it is split up
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner = tokio::spawn(async move {
            runner.run().await;
        });

        info!("✅ Connected successfully");
        Ok(Self {
            client,
            handle,
            runner: Mutex::new(Some(runner)),
            _updates: updates,
            dialogs: OnceCell::new(),
        })
    }

    /// Stop the sender pool and wait for its task to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.handle.quit();
        if let Some(runner) = self.runner.lock().await.take() {
            runner
                .await
                .map_err(|e| Error::ConnectionError(format!("Sender pool task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for TelegramClient {
    /// Stop the sender pool even when `shutdown` never ran, e.g. when the
    /// owning future was cancelled by a timeout.
    fn drop(&mut self) {
        let _ = self.handle.quit();
    }
}

impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Sign in interactively unless the session is already authorized.
pub async fn ensure_authorized(client: &Client, config: &Config) -> Result<()> {
    if client.is_authorized().await? {
        return Ok(());
    }

    info!("🔑 Session is not authorized, signing in");
    let phone = if config.phone.is_empty() {
        prompt("Enter your phone number (international format): ")?
    } else {
        config.phone.clone()
    };
    if phone.is_empty() {
        return Err(Error::AuthorizationRequired);
    }

    let token = client
        .request_login_code(&phone, &config.api_hash)
        .await
        .map_err(|e| Error::TelegramError(format!("Failed to request code: {}", e)))?;

    let code = prompt("Enter the code you received: ")?;

    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&format!("Enter the 2FA password (hint: {}): ", hint))?;
            client
                .check_password(password_token, password.as_bytes())
                .await
                .map_err(|e| Error::TelegramError(format!("Failed to check password: {}", e)))?
        }
        Err(e) => return Err(Error::TelegramError(format!("Failed to sign in: {}", e))),
    };

    info!("✅ Signed in as {}", user.full_name());
    Ok(())
}
