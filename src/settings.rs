use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable overriding the working-copy directory.
pub const TEMP_DIR_ENV: &str = "DOC_TEMPLATE_TEMP_DIR";

const DEFAULT_DIR_NAME: &str = "doc-template";

/// Where working copies are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    temp_dir: PathBuf,
}

impl Settings {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Reads [`TEMP_DIR_ENV`], falling back to `<system temp>/doc-template`.
    pub fn from_env() -> Self {
        match env::var_os(TEMP_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    /// Process-wide settings, read from the environment on first use.
    pub fn global() -> &'static Settings {
        static GLOBAL: OnceLock<Settings> = OnceLock::new();
        GLOBAL.get_or_init(Settings::from_env)
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(env::temp_dir().join(DEFAULT_DIR_NAME))
    }
}
