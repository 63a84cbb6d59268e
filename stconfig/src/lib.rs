//! # stremote configuration
//!
//! YAML configuration for the SoundTouch remote browser:
//! - embedded defaults merged with `<config_dir>/config.yaml`
//! - environment variable overrides (`STREMOTE_CONFIG__SECTION__KEY=value`)
//! - typed getters and setters, each setter saving the file
//! - the last browse path, so a new session resumes where the previous one stopped
//!
//! ## Usage
//!
//! ```no_run
//! use stconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_device_port();
//! config.set_last_device("192.168.1.42", "Kitchen")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = include_str!("stremote.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load stremote configuration"));
}

const ENV_CONFIG_DIR: &str = "STREMOTE_CONFIG";
const ENV_PREFIX: &str = "STREMOTE_CONFIG__";
const CONFIG_DIR_NAME: &str = ".stremote";

const DEFAULT_DEVICE_PORT: u16 = 8090;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SOURCE: &str = "STORED_MUSIC";
const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_BOOTSTRAP_FOLDER: &str = "Folder";
const DEFAULT_BOOTSTRAP_MOUNT: &str = "/mnt/usb1_1";
const DEFAULT_LOG_MIN_LEVEL: &str = "info";

macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> u64 {
            match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().unwrap_or($default),
                _ => $default,
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> usize {
            match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().map(|n| n as usize).unwrap_or($default),
                _ => $default,
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(size)))
        }
    };
}

macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => s,
                _ => $default.to_string(),
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager backed by a YAML document.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().expect("Config mutex poisoned").clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;
        Ok(())
    }

    /// Determines and validates the configuration directory.
    ///
    /// Searched in order: `directory` if not empty, the `STREMOTE_CONFIG`
    /// environment variable, `./.stremote`, then `~/.stremote`. The directory
    /// is created when missing and must be readable and writable.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))
            .with_context(|| format!("Invalid configuration directory {}", dir_path))?;
        Ok(dir_path)
    }

    /// Loads defaults, merges `config.yaml` over them, applies environment
    /// overrides and writes the result back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)
                    .with_context(|| format!("Invalid YAML in {}", path))?;
                merge_yaml(&mut default_value, &Self::lower_keys_value(external_value));
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(default_value);
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    pub fn config_dir_path(&self) -> &str {
        &self.config_dir
    }

    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().expect("Config mutex poisoned");
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml).with_context(|| format!("Cannot write {}", self.path))?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["device", "port"]`) and saves.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().expect("Config mutex poisoned");
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().expect("Config mutex poisoned");
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a map", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(err) = Self::set_value_internal(config, &key_path, yaml_value) {
                    warn!(variable = %key, error = %err, "Ignoring config override");
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Address of the device used last time, if any.
    pub fn get_last_device_ip(&self) -> Option<String> {
        match self.get_value(&["device", "last_ip"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    pub fn get_last_device_name(&self) -> Option<String> {
        match self.get_value(&["device", "last_name"]) {
            Ok(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn set_last_device(&self, ip: &str, name: &str) -> Result<()> {
        self.set_value(&["device", "last_ip"], Value::String(ip.to_string()))?;
        self.set_value(&["device", "last_name"], Value::String(name.to_string()))
    }

    /// Device HTTP API port. Accepts a number or a numeric string.
    pub fn get_device_port(&self) -> u16 {
        match self.get_value(&["device", "port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!(port = %n, default = DEFAULT_DEVICE_PORT, "Invalid device port, using default");
                    DEFAULT_DEVICE_PORT
                }
            },
            Ok(Value::String(s)) => s.parse::<u16>().unwrap_or_else(|_| {
                warn!(port = %s, default = DEFAULT_DEVICE_PORT, "Invalid device port, using default");
                DEFAULT_DEVICE_PORT
            }),
            _ => DEFAULT_DEVICE_PORT,
        }
    }

    pub fn set_device_port(&self, port: u16) -> Result<()> {
        self.set_value(&["device", "port"], Value::Number(Number::from(port)))
    }

    impl_u64_config!(
        get_http_timeout_secs,
        set_http_timeout_secs,
        &["device", "http_timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_u64_config!(
        get_discovery_timeout_secs,
        set_discovery_timeout_secs,
        &["device", "discovery_timeout_secs"],
        DEFAULT_DISCOVERY_TIMEOUT_SECS
    );

    impl_string_config!(
        get_browser_source,
        set_browser_source,
        &["browser", "source"],
        DEFAULT_SOURCE
    );

    impl_usize_config!(
        get_page_size,
        set_page_size,
        &["browser", "page_size"],
        DEFAULT_PAGE_SIZE
    );

    impl_string_config!(
        get_bootstrap_folder,
        set_bootstrap_folder,
        &["browser", "bootstrap", "folder"],
        DEFAULT_BOOTSTRAP_FOLDER
    );

    impl_string_config!(
        get_bootstrap_mount,
        set_bootstrap_mount,
        &["browser", "bootstrap", "mount"],
        DEFAULT_BOOTSTRAP_MOUNT
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    /// Browse path saved for `device`.
    ///
    /// Returns `Ok(None)` when nothing was saved; a stored value that no
    /// longer deserializes is reported as an error so the caller can start
    /// over from the bootstrap path.
    pub fn get_browse_path<T: DeserializeOwned>(&self, device: &str) -> Result<Option<T>> {
        match self.get_value(&["browser", "paths", device]) {
            Ok(Value::Null) | Err(_) => Ok(None),
            Ok(value) => serde_yaml::from_value(value)
                .map(Some)
                .with_context(|| format!("Invalid browse path stored for {}", device)),
        }
    }

    pub fn set_browse_path<T: Serialize>(&self, device: &str, path: &T) -> Result<()> {
        let value = serde_yaml::to_value(path)?;
        self.set_value(&["browser", "paths", device], value)
    }

    pub fn clear_browse_path(&self, device: &str) -> Result<()> {
        self.set_value(&["browser", "paths", device], Value::Null)
    }
}

/// Returns the global configuration, loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Recursively merges `external` into `default`: mappings are merged key by
/// key, scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
