use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File could not be read or written.
    Io { path: PathBuf, message: String },
    /// JSON / TOML parse or deserialization error.
    Parse { path: Option<PathBuf>, message: String },
    /// Parsed, but a value is out of range or a required key is missing.
    Validation(String),
}

impl ConfigError {
    pub(crate) fn parse(path: Option<&std::path::Path>, message: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.map(|p| p.to_path_buf()),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Parse { path: Some(path), message } => {
                write!(f, "{}: parse error: {message}", path.display())
            }
            Self::Parse { path: None, message } => write!(f, "parse error: {message}"),
            Self::Validation(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
