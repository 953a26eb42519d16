use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use renderer::Config;
use thiserror::Error;
use tracing::debug;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "ivm.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load the configuration.
///
/// An explicit `path` must exist. Without one, `ivm.toml` is used when
/// present and the defaults otherwise. A relative `template_path` is taken
/// relative to the config file.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG);
            if !fallback.is_file() {
                debug!("no {DEFAULT_CONFIG}, using defaults");
                return Ok(Config::default());
            }
            fallback
        }
    };

    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    if let (Some(templates), Some(base)) = (&config.template_path, path.parent()) {
        if templates.is_relative() {
            config.template_path = Some(base.join(templates));
        }
    }
    debug!(path = %path.display(), overrides = config.template_overrides.len(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("ivm.toml");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn reads_overrides_and_template_path() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "template_path = \"templates\"\n\n[template_overrides]\nxp = \"\"\nlink = \"<a>{{ label }}</a>\"\n",
        );
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.template_path, Some(dir.path().join("templates")));
        assert_eq!(config.template_overrides.len(), 2);
        assert_eq!(config.template_overrides["xp"], "");
    }

    #[test]
    fn absolute_template_path_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "template_path = \"/srv/templates\"\n");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.template_path, Some(PathBuf::from("/srv/templates")));
    }

    #[test]
    fn empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "");
        assert_eq!(load(Some(&path)).unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "templates = \"x\"\n");
        assert!(matches!(load(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(load(Some(&missing)), Err(ConfigError::Read { .. })));
    }
}
