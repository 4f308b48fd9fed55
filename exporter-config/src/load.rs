use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration file.
const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Stem of the file every environment starts from.
const BASE_STEM: &str = "base";

/// Prefix of environment variable overrides, e.g. `APP_EXPORT__PAGE_SIZE`.
const ENV_PREFIX: &str = "APP";

/// Separator between nested keys in environment variable overrides.
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to read the working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("no `{stem}` configuration in `{directory}`, expected one of {expected}")]
    MissingFile {
        stem: String,
        directory: PathBuf,
        expected: String,
    },

    #[error("configuration file `{path}` is invalid: {source}")]
    InvalidFile {
        path: PathBuf,
        source: config::ConfigError,
    },

    #[error("failed to merge configuration sources: {0}")]
    Merge(#[source] config::ConfigError),

    #[error("configuration does not match the expected shape: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads `./configuration` for the environment named by `APP_ENVIRONMENT`.
pub fn load_config<T: DeserializeOwned>() -> Result<T, LoadConfigError> {
    let directory = std::env::current_dir()
        .map_err(LoadConfigError::WorkingDirectory)?
        .join(CONFIGURATION_DIR);

    load_config_from(&directory, Environment::load()?)
}

/// Loads `base` and then the `environment` file from `directory`, each as yaml,
/// yml or json, and finally applies `APP_`-prefixed environment variables.
pub fn load_config_from<T: DeserializeOwned>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingDirectory(directory.to_path_buf()));
    }

    let mut builder = config::Config::builder();
    for stem in [BASE_STEM, environment.as_str()] {
        let path = find_file(directory, stem)?;

        // Each file is checked on its own so a parse error names the file.
        config::Config::builder()
            .add_source(config::File::from(path.as_path()))
            .build()
            .map_err(|source| LoadConfigError::InvalidFile {
                path: path.clone(),
                source,
            })?;

        builder = builder.add_source(config::File::from(path));
    }

    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR),
        )
        .build()
        .map_err(LoadConfigError::Merge)?
        .try_deserialize()
        .map_err(LoadConfigError::Deserialization)
}

fn find_file(directory: &Path, stem: &str) -> Result<PathBuf, LoadConfigError> {
    EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
        .ok_or_else(|| LoadConfigError::MissingFile {
            stem: stem.to_string(),
            directory: directory.to_path_buf(),
            expected: EXTENSIONS
                .iter()
                .map(|extension| format!("`{stem}.{extension}`"))
                .collect::<Vec<_>>()
                .join(", "),
        })
}
