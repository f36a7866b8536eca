use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkshopError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot reach controller at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource manager `{0}` is no longer running")]
    ResourceClosed(&'static str),

    #[error("Unparseable journal line: {0}")]
    JournalLine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
