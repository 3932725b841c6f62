use std::path::PathBuf;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed error: {0}")]
    Feed(#[from] castsync_data::FeedError),

    #[error("tag error: {0}")]
    Tag(#[from] id3::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
