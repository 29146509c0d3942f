use crate::error::Result;
use crate::types::{
    Config, ConfigError, NescError, Options, Protocol, ResolverSettings, MAX_WORKERS, MIN_WORKERS,
    WORDLIST_EXTENSION,
};
use log::debug;
use std::env;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

pub const RESOLVER_ENV: &str = "NESC_RESOLVER";

/// Loads resolver settings from a TOML file. A missing file yields defaults.
pub fn load_settings(config_path: &Path) -> Result<ResolverSettings> {
    let mut settings = if config_path.exists() {
        let contents = fs::read_to_string(config_path).map_err(|e| {
            NescError::Settings(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;
        parse_settings(&contents)?
    } else {
        debug!("Config file {} not found, using defaults", config_path.display());
        ResolverSettings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

pub fn parse_settings(contents: &str) -> Result<ResolverSettings> {
    #[derive(serde::Deserialize, Default)]
    #[serde(default)]
    struct SettingsFile {
        resolver: ResolverSettings,
    }

    let file: SettingsFile = toml::from_str(contents)
        .map_err(|e| NescError::Settings(format!("Failed to parse config file: {}", e)))?;
    Ok(file.resolver)
}

pub fn apply_env_overrides(settings: &mut ResolverSettings) {
    if let Ok(nameserver) = env::var(RESOLVER_ENV) {
        let nameserver = nameserver.trim();
        if !nameserver.is_empty() {
            settings.nameserver = nameserver.to_string();
        }
    }
}

/// Checks caller options and turns them into a `Config`.
///
/// Every rule that needs no I/O runs before the wordlist is touched, so an
/// out-of-range worker count never reaches the filesystem.
pub fn validate(options: Options) -> std::result::Result<Config, ConfigError> {
    let domain = options
        .args
        .first()
        .map(|d| d.trim().trim_end_matches('.').to_string())
        .filter(|d| !d.is_empty())
        .ok_or(ConfigError::MissingDomain)?;

    if options.wordlist.as_os_str().is_empty() {
        return Err(ConfigError::MissingWordlist);
    }

    let wordlist_display = options.wordlist.display().to_string();
    if options.wordlist.extension().and_then(|e| e.to_str()) != Some(WORDLIST_EXTENSION) {
        return Err(ConfigError::InvalidExtension(wordlist_display));
    }

    let protocol: Protocol = options.protocol.parse()?;

    if !(MIN_WORKERS..=MAX_WORKERS).contains(&options.workers) {
        return Err(ConfigError::InvalidConcurrency(options.workers));
    }

    validate_resolver(&options.resolver)?;

    check_wordlist(&options.wordlist)?;

    Ok(Config {
        domain,
        wordlist: options.wordlist,
        workers: options.workers,
        protocol,
        resolver: options.resolver,
    })
}

fn validate_resolver(settings: &ResolverSettings) -> std::result::Result<(), ConfigError> {
    if settings.nameserver.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::InvalidResolver(settings.nameserver.clone()));
    }
    if settings.connect_timeout_secs == 0 {
        return Err(ConfigError::InvalidTimeout);
    }
    Ok(())
}

// Opening is enough to prove readability; no content is read here.
fn check_wordlist(path: &Path) -> std::result::Result<(), ConfigError> {
    let display = path.display().to_string();
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::WordlistNotFound(display.clone()),
        _ => ConfigError::WordlistUnreadable {
            path: display.clone(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(ConfigError::WordlistUnreadable {
            path: display,
            reason: "not a regular file".to_string(),
        });
    }

    File::open(path).map_err(|e| ConfigError::WordlistUnreadable {
        path: display,
        reason: e.to_string(),
    })?;

    Ok(())
}
