//! Initialize the configuration directory: create ~/.sous, a default config, and the conversation database.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::store::SqliteConversationStore;

/// Create the config directory and default config file if they do not exist.
/// Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config::config_dir(config_path);
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

/// Create the conversation database (and its table) at the resolved location. Returns the database URL.
pub async fn init_database(config: &Config, config_path: &Path) -> Result<String> {
    let url = config::resolve_database_url(config, config_path);
    create_database(&url).await?;
    Ok(url)
}

/// Create the database at `url` if missing and ensure its table exists.
pub async fn create_database(url: &str) -> Result<()> {
    let store = SqliteConversationStore::connect(url)
        .await
        .with_context(|| format!("initializing conversation store {}", url))?;
    store.close().await;
    log::info!("conversation store initialized at {}", url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "sous-init-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn init_writes_default_config_once() {
        let dir = temp_dir();
        let path = dir.join("config.json");

        let out = init_config_dir(&path).unwrap();
        assert_eq!(out, dir);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        std::fs::write(&path, r#"{"gateway":{"port":9001}}"#).unwrap();
        init_config_dir(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"gateway":{"port":9001}}"#
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn create_database_writes_file_beside_config() {
        let dir = temp_dir();
        let path = dir.join("config.json");
        init_config_dir(&path).unwrap();

        let url = config::resolve_database_url_with(&Config::default(), &path, |_| None);
        assert!(url.ends_with("conversations.db"));
        create_database(&url).await.unwrap();
        assert!(dir.join("conversations.db").exists());

        // Existing database is reopened, not replaced.
        create_database(&url).await.unwrap();
        let store = SqliteConversationStore::open_existing(&url).await.unwrap();
        store.close().await;
        let _ = std::fs::remove_dir_all(dir);
    }
}
