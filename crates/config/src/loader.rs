use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MegaphoneConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "megaphone.toml",
    "megaphone.yaml",
    "megaphone.yml",
    "megaphone.json",
];

/// Load config from the given path (any supported format), applying
/// `${ENV_VAR}` substitution first.
pub fn load_config(path: &Path) -> anyhow::Result<MegaphoneConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./megaphone.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/megaphone/megaphone.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MegaphoneConfig::default()` if no config file is found or the
/// found file fails to parse.
pub fn discover_and_load() -> MegaphoneConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return MegaphoneConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            MegaphoneConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/megaphone/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("megaphone")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MegaphoneConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
