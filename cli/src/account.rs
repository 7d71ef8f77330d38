//! Account file - remembers who logged in last

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
struct AccountFile {
    /// Username of the last successful login
    username: String,
    /// When that login happened
    last_login: DateTime<Utc>,
}

pub struct AccountManager {
    path: PathBuf,
    username: Option<String>,
    last_login: Option<DateTime<Utc>>,
}

impl AccountManager {
    /// Open the account file at `path`; a missing file is not an error
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut manager = Self {
            path,
            username: None,
            last_login: None,
        };

        if manager.path.exists() {
            let data = fs::read(&manager.path)
                .with_context(|| format!("Failed to read account file: {}", manager.path.display()))?;
            let account: AccountFile =
                serde_json::from_slice(&data).context("Failed to parse account file")?;
            manager.username = Some(account.username);
            manager.last_login = Some(account.last_login);
        }

        Ok(manager)
    }

    /// Last username, if any
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Record a successful login and save the file
    pub fn remember(&mut self, username: &str) -> Result<()> {
        let account = AccountFile {
            username: username.to_string(),
            last_login: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&account)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write account file: {}", self.path.display()))?;

        self.username = Some(account.username);
        self.last_login = Some(account.last_login);
        Ok(())
    }
}
