//! Local persistence for the API credential.
//!
//! Only one value is ever stored: the key under [`API_KEY_SETTING`].

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub const DB_FILE_NAME: &str = "doc-chat.db";
pub const API_KEY_SETTING: &str = "openai_api_key";

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("key store lock poisoned")]
    Poisoned,
}

pub struct KeyStore {
    conn: Mutex<Connection>,
}

impl KeyStore {
    pub fn open(app_dir: &Path) -> Result<Self, KeyStoreError> {
        std::fs::create_dir_all(app_dir)?;
        let conn = Connection::open(app_dir.join(DB_FILE_NAME))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, KeyStoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, KeyStoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, KeyStoreError> {
        self.conn.lock().map_err(|_| KeyStoreError::Poisoned)
    }

    pub fn api_key(&self) -> Result<Option<String>, KeyStoreError> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![API_KEY_SETTING],
            |row| row.get(0),
        );
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store the key, trimmed. A blank value clears it.
    pub fn set_api_key(&self, value: &str) -> Result<(), KeyStoreError> {
        let value = value.trim();
        if value.is_empty() {
            return self.clear_api_key();
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![API_KEY_SETTING, value],
        )?;
        Ok(())
    }

    pub fn clear_api_key(&self) -> Result<(), KeyStoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM settings WHERE key = ?1",
            params![API_KEY_SETTING],
        )?;
        Ok(())
    }

    /// The stored key, safe for display.
    pub fn masked_api_key(&self) -> Result<Option<String>, KeyStoreError> {
        Ok(self.api_key()?.map(|key| mask_key(&key)))
    }
}

pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "********".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let store = KeyStore::in_memory().unwrap();
        assert_eq!(store.api_key().unwrap(), None);

        store.set_api_key("  sk-first  ").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("sk-first"));

        store.set_api_key("sk-second").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("sk-second"));

        store.clear_api_key().unwrap();
        assert_eq!(store.api_key().unwrap(), None);
    }

    #[test]
    fn blank_value_clears() {
        let store = KeyStore::in_memory().unwrap();
        store.set_api_key("sk-keep").unwrap();
        store.set_api_key("   ").unwrap();
        assert_eq!(store.api_key().unwrap(), None);
    }

    #[test]
    fn masks_long_and_short_keys() {
        assert_eq!(mask_key("sk-abcdefghijkl"), "sk-a...ijkl");
        assert_eq!(mask_key("short"), "********");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("nested").join("app");
        {
            let store = KeyStore::open(&app_dir).unwrap();
            store.set_api_key("sk-persisted-value").unwrap();
        }
        let store = KeyStore::open(&app_dir).unwrap();
        assert!(app_dir.join(DB_FILE_NAME).exists());
        assert_eq!(
            store.masked_api_key().unwrap().as_deref(),
            Some("sk-p...alue")
        );
    }
}
