use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("callback rejected with HTTP {status}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Media(#[from] pixelpost_media::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
