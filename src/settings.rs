//! Runtime settings.
//!
//! Layered from built-in defaults, an optional `splitter.toml` in the
//! working directory and `SPLITTER_*` environment variables, later layers
//! winning. `--database` on the command line overrides `store`.
use crate::core::currency::CurrencyCode;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_STORE: &str = "splitter.json";
const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// JSON file holding the book.
    pub store: PathBuf,
    /// Currency for new groups.
    pub currency: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Path::new("splitter"))
    }

    /// Load with `base` as the settings file, without extension.
    pub fn load(base: &Path) -> Result<Self, ConfigError> {
        let base = base.to_string_lossy();
        Config::builder()
            .set_default("store", DEFAULT_STORE)?
            .set_default("currency", DEFAULT_CURRENCY)?
            .add_source(File::with_name(&base).required(false))
            .add_source(Environment::with_prefix("SPLITTER"))
            .build()?
            .try_deserialize()
    }

    pub fn currency(&self) -> CurrencyCode {
        CurrencyCode::new(&self.currency)
    }
}
