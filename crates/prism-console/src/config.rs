use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Version stamped on every saved config. Raising it needs a matching step
/// in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const APP_DIR: &str = "com.prism.console";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PRISM_CONFIG";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_CHAT_MODEL: &str = "us.anthropic.claude-sonnet-4-20250514-v1:0";
pub const DEFAULT_IMAGE_MODEL: &str = "amazon.nova-canvas-v1:0";
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrismConfig {
    /// 0 when absent (configs written before versioning).
    #[serde(default)]
    pub config_version: u32,
    pub region: String,
    pub credentials: CredentialSource,
    #[serde(default = "default_chat_model")]
    pub chat_model_id: String,
    #[serde(default = "default_image_model")]
    pub image_model_id: String,
    /// Replaces the built-in system prompt when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Added in v1.
    pub storage: StorageConfig,
    #[serde(default = "default_user_key")]
    pub user_key: String,
    /// Added in v1.
    pub save_debounce_ms: u64,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "jiff::Timestamp::now")]
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    DefaultChain,
}

/// Where session snapshots are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// A directory on this machine; the platform data directory if unset.
    Local {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directory: Option<PathBuf>,
    },
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: String,
    },
}

/// Redacted config info, safe to print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub path: String,
    pub region: String,
    pub credential_type: String,
    pub profile_name: Option<String>,
    pub access_key_hint: Option<String>,
    pub chat_model_id: String,
    pub image_model_id: String,
    pub custom_system_prompt: bool,
    pub storage: String,
    pub user_key: String,
    pub save_debounce_ms: u64,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            region: DEFAULT_REGION.to_string(),
            credentials: CredentialSource::DefaultChain,
            chat_model_id: default_chat_model(),
            image_model_id: default_image_model(),
            system_prompt: None,
            storage: StorageConfig::Local { directory: None },
            user_key: default_user_key(),
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            title_max_chars: default_title_max_chars(),
            created_at: jiff::Timestamp::now(),
        }
    }
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_title_max_chars() -> usize {
    prism_core::models::session::TITLE_MAX_CHARS
}

fn default_user_key() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

fn app_dir(base: Option<PathBuf>, kind: &str) -> eyre::Result<PathBuf> {
    let base = base.ok_or_else(|| eyre::eyre!("no {kind} directory found"))?;
    Ok(base.join(APP_DIR))
}

/// The config file location: `$PRISM_CONFIG`, else the platform config dir.
pub fn config_path() -> eyre::Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(app_dir(dirs::config_dir(), "config")?.join("config.json"))
}

/// Default directory for locally stored sessions.
pub fn default_data_dir() -> eyre::Result<PathBuf> {
    app_dir(dirs::data_dir(), "data")
}

/// Parse a config document, migrating older versions first.
pub fn parse_config(contents: &str) -> eyre::Result<PrismConfig> {
    // Migrations run on the raw document, before the typed parse.
    let json: serde_json::Value = serde_json::from_str(contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: PrismConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> eyre::Result<PrismConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    parse_config(&contents)
}

/// Load the config at `path`, writing the defaults there first if the file
/// does not exist yet.
pub fn load_or_init(path: &Path) -> eyre::Result<PrismConfig> {
    if path.exists() {
        return load_config(path);
    }
    let config = PrismConfig::default();
    save_config(path, &config)?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update Prism."
        ));
    }

    // v0 → v1: sessions moved behind a storage backend and saves became debounced.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.entry("storage")
            .or_insert_with(|| serde_json::json!({ "type": "local" }));
        obj.entry("save_debounce_ms")
            .or_insert_with(|| serde_json::Value::Number(DEFAULT_SAVE_DEBOUNCE_MS.into()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added storage, save_debounce_ms)");
    }

    Ok(json)
}

pub fn save_config(path: &Path, config: &PrismConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Readers never see a half-written file.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // The file can hold inline credentials.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

pub fn config_info(path: &Path, config: &PrismConfig) -> ConfigInfo {
    let (credential_type, profile_name, access_key_hint) = match &config.credentials {
        CredentialSource::Inline {
            access_key_id,
            session_token,
            ..
        } => {
            let cred_type = if session_token.is_some() {
                "temporary".to_string()
            } else {
                "inline".to_string()
            };
            (cred_type, None, Some(redact_access_key(access_key_id)))
        }
        CredentialSource::Profile { profile_name } => {
            ("profile".to_string(), Some(profile_name.clone()), None)
        }
        CredentialSource::DefaultChain => ("default_chain".to_string(), None, None),
    };

    let storage = match &config.storage {
        StorageConfig::Local {
            directory: Some(dir),
        } => format!("local ({})", dir.display()),
        StorageConfig::Local { directory: None } => "local (default data directory)".to_string(),
        StorageConfig::S3 { bucket, prefix } if prefix.is_empty() => format!("s3://{bucket}"),
        StorageConfig::S3 { bucket, prefix } => format!("s3://{bucket}/{prefix}"),
    };

    ConfigInfo {
        path: path.display().to_string(),
        region: config.region.clone(),
        credential_type,
        profile_name,
        access_key_hint,
        chat_model_id: config.chat_model_id.clone(),
        image_model_id: config.image_model_id.clone(),
        custom_system_prompt: config.system_prompt.is_some(),
        storage,
        user_key: config.user_key.clone(),
        save_debounce_ms: config.save_debounce_ms,
    }
}

impl fmt::Display for ConfigInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "config:        {}", self.path)?;
        writeln!(f, "region:        {}", self.region)?;
        write!(f, "credentials:   {}", self.credential_type)?;
        if let Some(profile) = &self.profile_name {
            write!(f, " ({profile})")?;
        }
        if let Some(hint) = &self.access_key_hint {
            write!(f, " ({hint})")?;
        }
        writeln!(f)?;
        writeln!(f, "chat model:    {}", self.chat_model_id)?;
        writeln!(f, "image model:   {}", self.image_model_id)?;
        writeln!(
            f,
            "system prompt: {}",
            if self.custom_system_prompt { "custom" } else { "built-in" }
        )?;
        writeln!(f, "storage:       {}", self.storage)?;
        writeln!(f, "user:          {}", self.user_key)?;
        write!(f, "autosave:      {} ms after the last change", self.save_debounce_ms)
    }
}

pub fn redact_access_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    let prefix = &key[..4];
    let suffix = &key[key.len() - 4..];
    format!("{prefix}...{suffix}")
}
