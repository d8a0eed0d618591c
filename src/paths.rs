use crate::fs::{FileSystem, RealFileSystem};
use std::env;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

pub const CONFIG_HOME_ENV: &str = "YAML_CONFIG_HOME";
pub const DEFAULT_REL_CONFIG_PATH: &str = "yaml_configuration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathArgError {
    NotFound(PathBuf),
    Unreadable(PathBuf),
}

impl fmt::Display for PathArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathArgError::NotFound(path) => write!(f, "{} is not a valid path", path.display()),
            PathArgError::Unreadable(path) => {
                write!(f, "{} is not a readable path", path.display())
            }
        }
    }
}

impl Error for PathArgError {}

/// Root under which per-store directories are created.
pub fn config_root() -> PathBuf {
    if let Some(path) = env::var_os(CONFIG_HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    if let Some(path) = dirs::config_dir() {
        return path;
    }
    match dirs::home_dir() {
        Some(home) => home.join(".config"),
        None => PathBuf::from("."),
    }
}

pub fn default_store_dir(rel_config_path: &str) -> PathBuf {
    config_root().join(rel_config_path)
}

/// Expands a leading `~` and `$VAR` / `${VAR}` references. Unset variables
/// are kept as written.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(expand_vars(&expand_home(raw)))
}

/// Validates a user-supplied path argument. Empty input and the literal
/// `None` mean "no path given".
pub fn config_path(raw: &str) -> Result<Option<PathBuf>, PathArgError> {
    config_path_with(raw, &RealFileSystem)
}

pub fn config_path_with(raw: &str, fs: &dyn FileSystem) -> Result<Option<PathBuf>, PathArgError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return Ok(None);
    }
    let path = expand_path(trimmed);
    if !fs.exists(&path) {
        return Err(PathArgError::NotFound(path));
    }
    if !fs.is_readable(&path) {
        return Err(PathArgError::Unreadable(path));
    }
    Ok(Some(path))
}

fn expand_home(raw: &str) -> String {
    let Some(rest) = raw.strip_prefix('~') else {
        return raw.to_string();
    };
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR)) {
        return raw.to_string();
    }
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => raw.to_string(),
    }
}

fn expand_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match env::var(name).ok().filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}
