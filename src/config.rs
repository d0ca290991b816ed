use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use confique::Config as _;

use crate::prelude::*;


/// The locations where Libris will look for a configuration file. The first
/// existing file in this list is used.
const DEFAULT_PATHS: &[&str] = &[
    // For better DX, we include this special path here, but just in debug mode.
    #[cfg(debug_assertions)]
    "util/dev-config/config.toml",

    "config.toml",
    "/etc/libris/config.toml",
];

const LIBRIS_CONFIG_PATH_ENV: &str = "LIBRIS_CONFIG_PATH";

/// Configuration for Libris.
///
/// All relative paths are relative to the location of this configuration file.
#[derive(Debug, confique::Config)]
pub(crate) struct Config {
    #[config(nested)]
    pub(crate) store: crate::store::StoreConfig,

    #[config(nested)]
    pub(crate) db: crate::db::DbConfig,

    #[config(nested)]
    pub(crate) http: crate::http::HttpConfig,

    #[config(nested)]
    pub(crate) log: crate::logger::LogConfig,
}

impl Config {
    /// Tries to find a config file by checking `LIBRIS_CONFIG_PATH` and from a
    /// list of possible default config file locations. The first config file
    /// is loaded via [`Self::load_from`]. Returns the loaded config and the
    /// path that it was loaded from.
    pub(crate) fn from_env_or_default_locations() -> Result<(Self, PathBuf)> {
        let path = if let Some(path) = std::env::var_os(LIBRIS_CONFIG_PATH_ENV) {
            PathBuf::from(path)
        } else {
            DEFAULT_PATHS.iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!(
                    "no configuration file found. Note: we checked the following paths: {}",
                    DEFAULT_PATHS.join(", "),
                ))?
        };

        let config = Self::load_from(&path)
            .with_context(|| format!("failed to load configuration from '{}'", path.display()))?;

        Ok((config, path))
    }

    /// Loads the configuration from a specific TOML file.
    pub(crate) fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Config::from_file(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;

        config.fix_paths(path)?;
        config.validate()?;

        Ok(config)
    }

    /// Checks combinations of values that cannot be expressed by the types
    /// alone.
    pub(crate) fn validate(&self) -> Result<()> {
        self.db.validate()?;
        self.http.validate()?;
        Ok(())
    }

    /// Goes through all paths in the configuration and changes relative paths
    /// to be absolute based on the path of the configuration file itself.
    fn fix_paths(&mut self, config_path: &Path) -> Result<()> {
        fn fix_path(base_path: &Path, path: &mut PathBuf) {
            if path.is_relative() {
                *path = base_path.join(&path);
            }
        }

        let absolute_config_path = config_path.canonicalize()
            .context("failed to canonicalize config path")?;
        let base = absolute_config_path.parent()
            .ok_or_else(|| anyhow!("config file path has no parent"))?;

        let paths = [
            &mut self.store.fixtures,
            &mut self.db.server_cert,
            &mut self.http.unix_socket,
            &mut self.log.file,
        ];
        for path in paths.into_iter().flatten() {
            fix_path(base, path);
        }

        Ok(())
    }
}

/// Writes the generated TOML config template file to the given destination or
/// stdout.
pub(crate) fn write_template(path: Option<&PathBuf>) -> Result<()> {
    use confique::toml::FormatOptions;

    info!(
        "Writing configuration template to '{}'",
        path.map(|p| p.display().to_string()).unwrap_or("<stdout>".into()),
    );

    let mut options = FormatOptions::default();
    options.general.nested_field_gap = 2;
    let template = confique::toml::template::<Config>(options);
    match path {
        Some(path) => fs::write(path, template)?,
        None => io::stdout().write_all(template.as_bytes())?,
    }

    Ok(())
}
