use anyhow::{Context, Result};
use jailkit::PoudrierePaths;
use pgkit::{ConfigLayer, ConnectionParams, ExplicitParams};
use std::fs;
use std::path::{Path, PathBuf};

/// Poudriere main configuration file key.
pub const KEY_POUDRIERE_CONFIG_FILE: &str = "poudriere.config_file";
/// Poudriere per-jail configuration directory key.
pub const KEY_POUDRIERE_CONFIG_DIR: &str = "poudriere.config_dir";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("converge"))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

// ============================================================================
// Settings
// ============================================================================

/// The two configuration layers, local first.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub local: ConfigLayer,
    pub shared: ConfigLayer,
}

impl Settings {
    /// Load both layers. `None` picks the default file in [`config_dir`].
    pub fn load(local: Option<&str>, shared: Option<&str>) -> Result<Self> {
        let local_path = layer_path(local, "config.toml")?;
        let shared_path = layer_path(shared, "pillar.toml")?;
        Ok(Self {
            local: load_layer(&local_path)?,
            shared: load_layer(&shared_path)?,
        })
    }

    /// First non-empty value for `key`, local layer first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.local.get(key).or_else(|| self.shared.get(key))
    }

    /// Resolve connection parameters for the given call-site values.
    pub fn connection(&self, explicit: &ExplicitParams) -> ConnectionParams {
        pgkit::resolve(explicit, &self.local, &self.shared)
    }

    /// Poudriere configuration paths.
    pub fn poudriere_paths(&self) -> PoudrierePaths {
        let defaults = PoudrierePaths::default();
        PoudrierePaths {
            config_file: self
                .get(KEY_POUDRIERE_CONFIG_FILE)
                .map(expand_path)
                .unwrap_or(defaults.config_file),
            config_dir: self
                .get(KEY_POUDRIERE_CONFIG_DIR)
                .map(expand_path)
                .unwrap_or(defaults.config_dir),
        }
    }
}

fn layer_path(explicit: Option<&str>, default_name: &str) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand_path(path)),
        None => Ok(config_dir()?.join(default_name)),
    }
}

/// Load one TOML file as a flat layer. A missing file is an empty layer.
pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
    if !path.exists() {
        log::debug!("no config at {}", path.display());
        return Ok(ConfigLayer::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    parse_layer(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

/// Parse TOML into a flat layer of dotted keys.
pub fn parse_layer(content: &str) -> Result<ConfigLayer> {
    let table: toml::Table = content.parse()?;
    let mut layer = ConfigLayer::new();
    flatten("", &table, &mut layer);
    Ok(layer)
}

fn flatten(prefix: &str, table: &toml::Table, layer: &mut ConfigLayer) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(&full, inner, layer),
            toml::Value::String(s) => layer.insert(full, s.clone()),
            toml::Value::Integer(i) => layer.insert(full, i.to_string()),
            toml::Value::Float(f) => layer.insert(full, f.to_string()),
            toml::Value::Boolean(b) => layer.insert(full, b.to_string()),
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                log::warn!("ignoring non-scalar config key {full}");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_nested_tables() {
        let layer = parse_layer(
            r#"
            [postgres]
            host = "db.internal"
            port = 6543

            [poudriere]
            config_dir = "/tmp/p.d"
            "#,
        )
        .unwrap();
        assert_eq!(layer.get("postgres.host"), Some("db.internal"));
        assert_eq!(layer.get("postgres.port"), Some("6543"));
        assert_eq!(layer.get("poudriere.config_dir"), Some("/tmp/p.d"));
    }

    #[test]
    fn test_dotted_keys_equal_tables() {
        let dotted = parse_layer(r#""postgres.pguser" = "ops""#).unwrap();
        let nested = parse_layer("[postgres]\npguser = \"ops\"\n").unwrap();
        assert_eq!(dotted, nested);
    }

    #[test]
    fn test_arrays_are_skipped() {
        let layer = parse_layer("hosts = [\"a\", \"b\"]\nflag = true\n").unwrap();
        assert_eq!(layer.get("hosts"), None);
        assert_eq!(layer.get("flag"), Some("true"));
    }

    #[test]
    fn test_missing_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();
        let layer = load_layer(&dir.path().join("absent.toml")).unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[postgres\nhost = ").unwrap();
        assert!(load_layer(&path).is_err());
    }

    #[test]
    fn test_settings_layers_resolve_connection() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("config.toml");
        let shared = dir.path().join("pillar.toml");
        fs::write(&local, "[postgres]\nhost = \"h1\"\n").unwrap();
        fs::write(&shared, "[postgres]\nhost = \"h2\"\npguser = \"ops\"\n").unwrap();

        let settings = Settings::load(local.to_str(), shared.to_str()).unwrap();
        let params = settings.connection(&ExplicitParams::default());
        assert_eq!(params.host, "h1");
        assert_eq!(params.user, "ops");
        assert_eq!(params.port, "5432");
    }

    #[test]
    fn test_poudriere_paths() {
        let settings = Settings {
            local: ConfigLayer::new(),
            shared: ConfigLayer::new().with(KEY_POUDRIERE_CONFIG_DIR, "/srv/poudriere.d"),
        };
        let paths = settings.poudriere_paths();
        assert_eq!(paths.config_dir, PathBuf::from("/srv/poudriere.d"));
        assert_eq!(
            paths.config_file,
            PathBuf::from("/usr/local/etc/poudriere.conf")
        );
    }
}
