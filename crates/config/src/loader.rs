use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::TunedropConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "tunedrop.toml",
    "tunedrop.yaml",
    "tunedrop.yml",
    "tunedrop.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<TunedropConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the explicit config file, or discover one in standard locations.
///
/// Search order when `explicit` is `None`:
/// 1. `./tunedrop.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tunedrop/tunedrop.{toml,yaml,yml,json}` (user-global)
///
/// The bot cannot run without a token, so a missing file is an error rather
/// than a silent fallback to defaults.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<(PathBuf, TunedropConfig)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file().map_err(|searched| Error::NotFound { searched })?,
    };
    debug!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    Ok((path, config))
}

/// Find the first config file in standard locations, or return every path
/// that was checked.
fn find_config_file() -> std::result::Result<PathBuf, Vec<PathBuf>> {
    let mut candidates: Vec<PathBuf> = CONFIG_FILENAMES.iter().map(PathBuf::from).collect();
    if let Some(dir) = config_dir() {
        candidates.extend(CONFIG_FILENAMES.iter().map(|name| dir.join(name)));
    }

    match candidates.iter().find(|p| p.exists()) {
        Some(found) => Ok(found.clone()),
        None => Err(candidates),
    }
}

/// Returns the user-global config directory (`~/.config/tunedrop/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tunedrop").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<TunedropConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_json_with_kebab_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"bot-token": "42:XYZ", "debug-mode": false}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.bot_token.expose_secret(), "42:XYZ");
        assert!(!cfg.debug_mode);
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunedrop.yaml");
        std::fs::write(
            &path,
            "bot_token: abc\ndelivery:\n  size_budget_bytes: 2048\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.bot_token.expose_secret(), "abc");
        assert_eq!(cfg.delivery.size_budget_bytes, 2048);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }), "got {err:?}");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunedrop.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "got {err:?}");
        assert!(err.to_string().contains("tunedrop.json"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunedrop.ini");
        std::fs::write(&path, "bot_token=x").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn explicit_path_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "bot_token = \"explicit\"").unwrap();

        let (found, cfg) = discover_and_load(Some(&path)).unwrap();
        assert_eq!(found, path);
        assert_eq!(cfg.bot_token.expose_secret(), "explicit");
    }
}
