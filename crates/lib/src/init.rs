//! Initialize the configuration directory: create ~/.hookgram and a default config with a fresh hook secret.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::path::{Path, PathBuf};

use crate::config::{Config, HooksConfig};

/// Random URL-safe secret for signing hook URLs.
pub fn generate_hook_secret() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("generating hook secret: {}", e))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Create the config directory and a default config file if they do not exist.
/// The default config carries a generated `hooks.secret`; an existing file is left untouched.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let config = Config {
            hooks: HooksConfig {
                secret: Some(generate_hook_secret()?),
            },
            ..Config::default()
        };
        let json = serde_json::to_string_pretty(&config).context("serializing default config")?;
        std::fs::write(config_path, json)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;

    #[test]
    fn secrets_are_random_and_url_safe() {
        let a = generate_hook_secret().unwrap();
        let b = generate_hook_secret().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn init_writes_loadable_config_once() {
        let dir = std::env::temp_dir().join(format!("hookgram-init-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        init_config_dir(&path).unwrap();
        let (first, _) = load_config(Some(path.clone())).unwrap();
        let secret = first.hooks.secret.clone().unwrap();
        assert_eq!(first.gateway.port, 15152);

        init_config_dir(&path).unwrap();
        let (second, _) = load_config(Some(path)).unwrap();
        assert_eq!(second.hooks.secret.as_deref(), Some(secret.as_str()));
        let _ = std::fs::remove_dir_all(dir);
    }
}
