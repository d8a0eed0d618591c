//! A YAML configuration file reconciled against compiled-in defaults.
//!
//! A [`ConfigStore`] starts out holding a copy of its defaults. [`ConfigStore::load`]
//! then locates the file on disk, writes the defaults there when it is missing,
//! or reads it and fills in whatever the defaults have that the file lacks.
//! Nothing in this module returns an error for I/O or parse problems: every
//! failure is logged and the store keeps the best configuration it has.

use crate::codec::{self, CodecError, YamlStyle};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::{self, DEFAULT_REL_CONFIG_PATH};
use crate::reconcile::{self, ExemptKeys, Fill, FillKind};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Raised by callers that need a value to be present. The store itself only
/// produces it from [`ConfigStore::require`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing { key: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { key } => {
                write!(f, "missing configuration value for '{}'", key)
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug)]
enum PersistError {
    Io(io::Error),
    Codec(CodecError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(source) => write!(f, "{}", source),
            PersistError::Codec(source) => write!(f, "{}", source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Constructed,
    Loaded,
}

/// Which branch of [`ConfigStore::load`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The file was missing and the defaults were written to it.
    Created,
    /// The file was read and parsed.
    Existing,
    /// The file exists but could not be read or parsed.
    Unreadable,
    /// The file was missing and the defaults could not be written.
    Unwritable,
    /// The target directory could not be created.
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub filled: Vec<Fill>,
    pub saved: bool,
}

impl LoadReport {
    fn new(source: LoadSource) -> Self {
        Self {
            source,
            filled: Vec::new(),
            saved: false,
        }
    }

    pub fn changed(&self) -> bool {
        !self.filled.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub reconcile: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { reconcile: true }
    }
}

pub struct ConfigStore {
    name: String,
    default_text: String,
    active: Mapping,
    exempt: ExemptKeys,
    rel_config_path: String,
    style: YamlStyle,
    resolved_path: Option<PathBuf>,
    target_dir: Option<PathBuf>,
    state: StoreState,
    fs: Box<dyn FileSystem>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("exempt", &self.exempt)
            .field("resolved_path", &self.resolved_path)
            .field("target_dir", &self.target_dir)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    pub fn new(default_text: impl Into<String>) -> Self {
        let name = "config".to_string();
        let default_text = default_text.into();
        let active = parse_defaults(&name, &default_text);
        Self {
            name,
            default_text,
            active,
            exempt: ExemptKeys::default(),
            rel_config_path: DEFAULT_REL_CONFIG_PATH.to_string(),
            style: YamlStyle::default(),
            resolved_path: None,
            target_dir: None,
            state: StoreState::Constructed,
            fs: Box::new(RealFileSystem),
        }
    }

    /// Name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_exempt_keys(mut self, keys: &ExemptKeys) -> Self {
        self.exempt = self.exempt.union(keys);
        self
    }

    /// Subdirectory of the user config root used when `load` gets no
    /// directory.
    pub fn with_rel_config_path(mut self, rel_config_path: impl Into<String>) -> Self {
        self.rel_config_path = rel_config_path.into();
        self
    }

    pub fn with_style(mut self, style: YamlStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_fs(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn load(&mut self, filename: &str, directory: Option<&Path>) -> LoadReport {
        self.load_with(filename, directory, LoadOptions::default())
    }

    pub fn load_with(
        &mut self,
        filename: &str,
        directory: Option<&Path>,
        options: LoadOptions,
    ) -> LoadReport {
        let directory = directory
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths::default_store_dir(&self.rel_config_path));
        self.state = StoreState::Loaded;
        self.target_dir = Some(directory.clone());

        if !self.fs.exists(&directory) {
            tracing::debug!(
                event = "config.load.create_dir",
                store = %self.name,
                path = %directory.display(),
                "Creating configuration directory"
            );
            if let Err(err) = self.fs.create_dir_all(&directory) {
                tracing::error!(
                    event = "config.load.create_dir_failed",
                    store = %self.name,
                    path = %directory.display(),
                    error = %err,
                    "Could not create configuration directory; using a temporary configuration"
                );
                return LoadReport::new(LoadSource::Ephemeral);
            }
        }

        let file_path = directory.join(filename);
        if self.fs.exists(&file_path) {
            self.read_existing(&file_path, options)
        } else {
            self.create_from_defaults(&file_path)
        }
    }

    fn create_from_defaults(&mut self, path: &Path) -> LoadReport {
        tracing::warn!(
            event = "config.load.missing_file",
            store = %self.name,
            path = %path.display(),
            "No configuration file found; writing defaults"
        );
        let defaults = self.defaults();
        match self.write_mapping(&defaults, path) {
            Ok(()) => {
                self.active = defaults;
                self.resolved_path = Some(path.to_path_buf());
                tracing::debug!(
                    event = "config.load.created",
                    store = %self.name,
                    path = %path.display(),
                );
                LoadReport::new(LoadSource::Created)
            }
            Err(err) => {
                tracing::error!(
                    event = "config.load.write_failed",
                    store = %self.name,
                    path = %path.display(),
                    error = %err,
                    "Could not write configuration; using a temporary configuration"
                );
                LoadReport::new(LoadSource::Unwritable)
            }
        }
    }

    fn read_existing(&mut self, path: &Path, options: LoadOptions) -> LoadReport {
        let document = self
            .fs
            .read_to_string(path)
            .map_err(PersistError::Io)
            .and_then(|text| codec::parse_document(&text).map_err(PersistError::Codec));
        let document = match document {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(
                    event = "config.load.read_failed",
                    store = %self.name,
                    path = %path.display(),
                    error = %err,
                    "Could not read configuration; keeping the previous configuration"
                );
                return LoadReport::new(LoadSource::Unreadable);
            }
        };

        let (active, is_mapping) = match document {
            Value::Mapping(map) => (map, true),
            Value::Null => (Mapping::new(), true),
            other => {
                tracing::warn!(
                    event = "config.load.not_a_mapping",
                    store = %self.name,
                    path = %path.display(),
                    found = codec::kind_name(&other),
                    "Configuration file does not hold a mapping; using an empty configuration and leaving the file alone"
                );
                (Mapping::new(), false)
            }
        };
        self.active = active;
        self.resolved_path = Some(path.to_path_buf());
        tracing::debug!(
            event = "config.load.loaded",
            store = %self.name,
            path = %path.display(),
        );

        let mut report = LoadReport::new(LoadSource::Existing);
        // A file that does not hold a mapping is never filled or written back.
        if !options.reconcile || !is_mapping {
            return report;
        }

        let defaults = self.defaults();
        report.filled = reconcile::fill_missing(&mut self.active, &defaults, &self.exempt);
        for fill in &report.filled {
            self.log_fill(fill);
        }
        if report.changed() {
            report.saved = self.save();
        }
        report
    }

    fn log_fill(&self, fill: &Fill) {
        match &fill.kind {
            FillKind::Inserted => tracing::info!(
                event = "config.load.default_key",
                store = %self.name,
                key = %fill.key,
                "Using default value for missing key"
            ),
            FillKind::SubKeys(sub_keys) => tracing::info!(
                event = "config.load.default_sub_keys",
                store = %self.name,
                key = %fill.key,
                sub_keys = ?sub_keys,
                "Added missing default entries"
            ),
            FillKind::Elements(count) => tracing::info!(
                event = "config.load.default_elements",
                store = %self.name,
                key = %fill.key,
                count = *count,
                "Appended missing default items"
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.active.get(key)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// Deserializes the value at `key`. A value of the wrong shape is logged
    /// and treated as absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_yaml::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(
                    event = "config.get.type_mismatch",
                    store = %self.name,
                    key,
                    error = %err,
                );
                None
            }
        }
    }

    pub fn require(&self, key: &str) -> Result<&Value, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.active.insert(Value::String(key.into()), value.into());
    }

    /// Removes a top-level key, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.active.shift_remove(key)
    }

    /// Top-level string keys in file order.
    pub fn list_keys(&self) -> Vec<String> {
        self.active
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect()
    }

    /// Writes the whole configuration to the resolved path. Returns whether
    /// anything was written.
    pub fn save(&self) -> bool {
        let Some(path) = self.resolved_path.as_deref() else {
            tracing::warn!(
                event = "config.save.no_path",
                store = %self.name,
                "No configuration file has been loaded; nothing saved"
            );
            return false;
        };
        match self.write_mapping(&self.active, path) {
            Ok(()) => {
                tracing::debug!(
                    event = "config.save.saved",
                    store = %self.name,
                    path = %path.display(),
                );
                true
            }
            Err(err) => {
                tracing::error!(
                    event = "config.save.failed",
                    store = %self.name,
                    path = %path.display(),
                    error = %err,
                    "Could not save configuration"
                );
                false
            }
        }
    }

    /// A fresh parse of the default text.
    pub fn defaults(&self) -> Mapping {
        parse_defaults(&self.name, &self.default_text)
    }

    pub fn active(&self) -> &Mapping {
        &self.active
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exempt_keys(&self) -> &ExemptKeys {
        &self.exempt
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }

    pub fn target_dir(&self) -> Option<&Path> {
        self.target_dir.as_deref()
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    fn write_mapping(&self, map: &Mapping, path: &Path) -> Result<(), PersistError> {
        let text = codec::to_yaml_string(map, &self.style).map_err(PersistError::Codec)?;
        self.fs.write_string(path, &text).map_err(PersistError::Io)
    }
}

/// Builds a store for `default_text` and loads `filename` from `directory`
/// (or the default per-user location).
pub fn open(default_text: &str, filename: &str, directory: Option<&Path>) -> ConfigStore {
    let mut store = ConfigStore::new(default_text);
    store.load(filename, directory);
    store
}

fn parse_defaults(name: &str, text: &str) -> Mapping {
    match codec::parse_mapping(text) {
        Ok(map) => map,
        Err(err) => {
            tracing::error!(
                event = "config.defaults.invalid",
                store = %name,
                error = %err,
                "Default configuration is not a valid mapping; using an empty one"
            );
            Mapping::new()
        }
    }
}
