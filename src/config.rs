use crate::error::{GraderError, Result};
use crate::types::config::GraderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "grader.toml";
pub const DEFAULT_LOCAL_FILE: &str = ".grader/local.toml";
pub const DEFAULT_GLOBAL_CONFIG_FILE: &str = ".config/canvas-grader/config.toml";

/// Loads the layered configuration rooted at `root`.
///
/// An explicit `--config` path replaces the repository file and must exist.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<GraderConfig> {
    let global = std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(DEFAULT_GLOBAL_CONFIG_FILE));
    load_config_with_global(root, explicit, global.as_deref())
}

pub(crate) fn load_config_with_global(
    root: &Path,
    explicit: Option<&Path>,
    global_path: Option<&Path>,
) -> Result<GraderConfig> {
    let course_file = match explicit {
        Some(path) if !path.exists() => {
            return Err(GraderError::PathNotFound(path.display().to_string()));
        }
        Some(path) => path.to_path_buf(),
        None => root.join(DEFAULT_CONFIG_FILE),
    };

    // Lowest precedence first.
    let layers = global_path
        .map(Path::to_path_buf)
        .into_iter()
        .chain([course_file, root.join(DEFAULT_LOCAL_FILE)]);

    let mut merged = Table::new();
    for layer in layers.filter(|path| path.is_file()) {
        debug!(path = %layer.display(), "merging config layer");
        overlay_table(&mut merged, parse_layer(&layer)?);
    }

    let cfg = GraderConfig::deserialize(Value::Table(merged))
        .map_err(|e| GraderError::ConfigParse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse_layer(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<Table>()
        .map_err(|e| GraderError::ConfigParse(format!("{}: {e}", path.display())))
}

/// Nested tables merge key by key; any other value in `top` replaces the
/// one in `base`.
fn overlay_table(base: &mut Table, top: Table) {
    for (key, value) in top {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(nested)) => overlay_table(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
