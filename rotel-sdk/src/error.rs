use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Client error: {0}")]
    Client(#[from] rotel_client::ClientError),

    #[error("Profile error: {0}")]
    Profile(#[from] rotel_profiles::ProfileError),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid device configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, SdkError>;
