//! Application path resolution
//!
//! Three layouts are supported:
//!
//! - **Dev mode** (debug builds only): `config.yaml` in the working directory
//!   keeps everything next to it, under `.state/` and `logs/`.
//! - **Portable mode**: a `.portable` marker next to the executable keeps all
//!   data beside the binary.
//! - **Installed mode** (default): data lives in the platform data directory,
//!   e.g. `~/.local/share/Panel Sync`.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used in installed mode
const APP_NAME: &str = "Panel Sync";

/// Application paths for config, state and logs
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration file
    pub config: PathBuf,
    /// State directory (sled database)
    pub state_dir: PathBuf,
    /// Rolling log files
    pub logs_dir: PathBuf,
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the layout from the environment
    ///
    /// Runs before logging is initialized, so diagnostics go to stderr.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join("config.yaml").exists() {
                eprintln!("[paths] dev mode ({})", cwd.display());
                return Self::rooted_at(&cwd);
            }
        }

        if exe_dir.join(".portable").exists() {
            return Self::rooted_at(&exe_dir);
        }

        let app_data = dirs::data_dir()
            .unwrap_or_else(|| {
                eprintln!("[paths] no platform data directory, using executable directory");
                exe_dir.clone()
            })
            .join(APP_NAME);

        Self {
            config: app_data.join("config.yaml"),
            state_dir: app_data.join("state"),
            logs_dir: app_data.join("logs"),
            is_portable: false,
        }
    }

    /// Portable layout under `root`
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config: root.join("config.yaml"),
            state_dir: root.join(".state"),
            logs_dir: root.join("logs"),
            is_portable: true,
        }
    }

    /// Use an explicit config file, keeping the detected data directories
    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = config.into();
        self
    }

    /// Create the state and log directories
    ///
    /// In installed mode the config directory is created too and, when no
    /// config exists yet, `config.example.yaml` is copied into place.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [&self.state_dir, &self.logs_dir] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }

        if !self.is_portable {
            if let Some(parent) = self.config.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            if !self.config.exists() {
                self.copy_example_config()?;
            }
        }

        Ok(())
    }

    fn copy_example_config(&self) -> anyhow::Result<()> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        let candidates = [
            exe_dir.join("config.example.yaml"),
            PathBuf::from("config.example.yaml"),
        ];

        match candidates.iter().find(|c| c.exists()) {
            Some(example) => {
                info!("Copying {} to {}", example.display(), self.config.display());
                std::fs::copy(example, &self.config).with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        example.display(),
                        self.config.display()
                    )
                })?;
            }
            None => info!(
                "No config found at {}, running with defaults",
                self.config.display()
            ),
        }
        Ok(())
    }

    /// sled database directory
    pub fn sled_db_path(&self) -> PathBuf {
        self.state_dir.join("sled")
    }
}
