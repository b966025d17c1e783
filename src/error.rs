use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed bencode, a top level that is not a dictionary, or a
    /// missing `info` key.
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Deserialize(String),
    /// Well-formed bencode whose `info` breaks a layout rule.
    #[error("invalid torrent: {0}")]
    InvalidTorrent(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("bytes to hash id")]
    BytesToHashId,
    #[error("filter: {0}")]
    Predicate(String),
    #[error("config: {0}")]
    Config(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn with_path(self, path: impl AsRef<Path>) -> Self {
        Error::Path {
            path: path.as_ref().to_owned(),
            source: Box::new(self),
        }
    }

    /// The error with any path context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::Path { source, .. } => source.root(),
            err => err,
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Error::Deserialize(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_context() {
        let err = Error::Decode("missing info".into()).with_path("a/b.torrent");
        assert_eq!(err.to_string(), "a/b.torrent: decode error: missing info");
        assert!(matches!(err.root(), Error::Decode(_)));
    }
}
