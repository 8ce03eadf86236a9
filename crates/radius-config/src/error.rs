use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    ConfigDirNotFound,

    #[error(
        "workspace config not found. Looked in:\n\
        - current directory: rad.local.yaml, rad.yaml\n\
        - ./.rad/ directory\n\
        - ~/.config/radius/rad.yaml\n\
        Set RAD_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
