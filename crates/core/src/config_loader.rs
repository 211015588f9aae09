use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration from `config/Config.toml` merged
    /// with `SENTIBAR_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be read, parsed, or fails
    /// validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads application configuration from an explicit TOML path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be read, parsed, or fails
    /// validation.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SENTIBAR_"))
            .extract()?;

        config.validate()?;

        Ok(config)
    }
}
