use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Everything the chat core needs to run one authenticated session: where the
/// REST collaborator and the socket endpoint live, who we are, and the bearer
/// token obtained at login. The token is base64-encoded at rest.
#[derive(Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    pub api_base: String,
    pub socket_url: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl SessionConfig {
    pub fn new(
        api_base: &str,
        socket_url: &str,
        user_id: &str,
        display_name: &str,
        token: &str,
    ) -> Self {
        SessionConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            socket_url: socket_url.to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            token: if token.is_empty() {
                None
            } else {
                Some(BASE64.encode(token))
            },
        }
    }

    /// The decoded bearer token, or None when the session is unauthenticated.
    /// Callers must fail closed on None: no socket connect, no REST calls.
    pub fn token(&self) -> Option<String> {
        self.token.as_ref().and_then(|encoded| {
            let decoded = String::from_utf8(BASE64.decode(encoded).unwrap_or_default())
                .unwrap_or_default();
            if decoded.is_empty() {
                None
            } else {
                Some(decoded)
            }
        })
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("parlor");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn save_session(config: &SessionConfig) -> Result<()> {
    save_session_to(config, get_config_path()?)
}

pub fn load_session() -> Result<Option<SessionConfig>> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        return Ok(None);
    }

    load_session_from(config_path).map(Some)
}

pub fn save_session_to<P: AsRef<Path>>(config: &SessionConfig, path: P) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, config)?;

    info!("Session saved for {}", config.user_id);
    Ok(())
}

pub fn load_session_from<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
    // Keep the path as a string for logging before the handle consumes it
    let path_str = path.as_ref().display().to_string();

    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: SessionConfig = serde_json::from_str(&contents)?;
    info!("Loaded session for {} from {}", config.user_id, path_str);

    Ok(config)
}

static CONFIG_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

fn get_config_path() -> Result<PathBuf> {
    if let Some(path) = CONFIG_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("session.json"))
}
