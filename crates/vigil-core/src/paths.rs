//! Standard paths used by Vigil

use std::path::PathBuf;

/// Standard Vigil paths
pub struct Paths {
    /// Config directory (~/.config/vigil)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vigil");

        Self { config }
    }

    /// Root the paths somewhere else (tests, portable installs)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            config: root.into(),
        }
    }

    /// Get the YAML config file for a tool
    pub fn config_file(&self, tool: &str) -> PathBuf {
        self.config.join(format!("{}.yaml", tool))
    }
}
