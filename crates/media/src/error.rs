use std::{error::Error as StdError, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid pixel buffer: {message}")]
    InvalidShape { message: String },

    #[error("save path escapes the output directory: {}", path.display())]
    PathEscape { path: PathBuf },

    #[error("no file counter left for {base_name:?}")]
    CounterExhausted { base_name: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl pixelpost_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pixelpost_common::impl_context!();
