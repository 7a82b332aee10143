use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_ENV_VAR: &str = "COURSEFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/coursefetch.toml";
const ENV_PREFIX: &str = "COURSEFETCH";
const ENV_SEPARATOR: &str = "__";

/// Token variables, first set one wins
const TOKEN_VARS: &[&str] = &["COURSEFETCH_TOKEN", "MOODLE_TOKEN"];

/// Defaults, then the TOML file, then `.env` and process environment
pub fn load() -> Result<Config, ConfigError> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let mut config = load_from_sources(&config_path())?;
    load_secrets(&mut config);
    Ok(config)
}

fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Fill the site token from the environment; it never comes from a file
pub fn load_secrets(config: &mut Config) {
    let token = TOKEN_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()));

    if token.is_some() {
        config.site.token = token;
    }
}

pub fn load_from_sources(config_path: &Path) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        info!(path = %config_path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(config_path));
    } else {
        warn!(path = %config_path.display(), "Configuration file not found, using defaults");
    }

    // COURSEFETCH__DOWNLOAD__MAX_FILE_BYTES -> download.max_file_bytes
    let environment = Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    builder.add_source(environment).build()?.try_deserialize()
}
