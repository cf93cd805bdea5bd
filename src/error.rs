use std::io;
use thiserror::Error;

/// All errors produced by the imgdrop client and service plumbing.
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing in the submitted batch was an image.
    #[error("No image files found in selection")]
    NoEligibleFiles,

    /// The request did not produce a usable HTTP response (connect, timeout, body).
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Parse(String),

    /// Filesystem I/O failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Settings could not be loaded.
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Error::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Human-readable reason for a failed item, as shown to the user.
    ///
    /// Server rejections carry the store's own message; everything else falls
    /// back to the error's display text.
    pub fn reason(&self) -> String {
        match self {
            Error::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reason_is_server_message() {
        let err = Error::rejected(413, "too large");
        assert_eq!(err.reason(), "too large");
        assert_eq!(err.to_string(), "too large");
    }

    #[test]
    fn parse_reason_mentions_shape() {
        let err = Error::parse("missing data");
        assert_eq!(err.reason(), "malformed response: missing data");
    }
}
