use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MirrorConfig {
    pub database: Option<String>,
    pub table: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl MirrorConfig {
    /// Command-line values win over the ones read from the config file
    pub fn merged(self, database: Option<PathBuf>, table: Option<String>) -> Self {
        Self {
            database: database
                .map(|p| p.to_string_lossy().to_string())
                .or(self.database),
            table: table.or(self.table),
            read_only: self.read_only,
        }
    }

    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("no database given (use --database or `tablemirror init`)"))
    }

    pub fn table_name(&self) -> anyhow::Result<&str> {
        self.table
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no table given (use --table or `tablemirror init`)"))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("tablemirror.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MirrorConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MirrorConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MirrorConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
