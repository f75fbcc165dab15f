//! Application error types.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Application error that can be serialized for the command surface.
#[derive(Debug)]
pub struct AppError {
    payload: HashMap<String, String>,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing directory, marker file, instance or archive
    NotFound,
    /// Install target already exists
    AlreadyExists,
    /// Instance is currently running
    InstanceRunning,
    /// Instance is not running
    InstanceNotRunning,
    /// Start/stop polling exceeded its bound
    Timeout,
    /// File system error
    Io,
    /// Network error
    Network,
    /// Malformed version listing or other unparsable input
    Parse,
    /// Configuration error
    Config,
    /// General error
    Other,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::NotFound => 1001,
            Self::AlreadyExists => 1002,
            Self::InstanceRunning => 1003,
            Self::InstanceNotRunning => 1004,
            Self::Timeout => 1005,
            Self::Config => 2001,
            Self::Io => 2002,
            Self::Network => 2003,
            Self::Parse => 2004,
            Self::Other => 9999,
        }
    }
}

impl AppError {
    pub fn new(kind: ErrorKind, payload: HashMap<String, String>) -> Self {
        Self { payload, kind }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            HashMap::new()
        } else {
            HashMap::from([("detail".to_string(), detail)])
        };
        Self::new(kind, payload)
    }

    pub fn not_found(what: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            HashMap::from([
                ("what".to_string(), what.to_string()),
                ("name".to_string(), name.to_string()),
            ]),
        )
    }

    pub fn already_exists(name: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            HashMap::from([("name".to_string(), name.to_string())]),
        )
    }

    pub fn instance_running(name: &str) -> Self {
        Self::new(
            ErrorKind::InstanceRunning,
            HashMap::from([("name".to_string(), name.to_string())]),
        )
    }

    pub fn instance_not_running(name: &str) -> Self {
        Self::new(
            ErrorKind::InstanceNotRunning,
            HashMap::from([("name".to_string(), name.to_string())]),
        )
    }

    pub fn timeout(operation: &str, secs: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            HashMap::from([
                ("operation".to_string(), operation.to_string()),
                ("secs".to_string(), secs.to_string()),
            ]),
        )
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Network, message)
    }

    pub fn network_with_url(url: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network,
            HashMap::from([
                ("url".to_string(), url.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Parse, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Config, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Other, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn payload(&self) -> &HashMap<String, String> {
        &self.payload
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            let mut pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            pairs.sort();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))
        }
    }
}

impl std::error::Error for AppError {}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;
        let mut s = serializer.serialize_struct("AppError", 3)?;
        s.serialize_field("code", &self.kind.code())?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("payload", &self.payload)?;
        s.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::io(err.to_string())
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sorts_payload_keys() {
        let err = AppError::not_found("instance", "apache-tomcat-9.0.50");
        assert_eq!(
            err.to_string(),
            "NotFound: name=apache-tomcat-9.0.50, what=instance"
        );
    }

    #[test]
    fn serializes_code_and_payload() {
        let err = AppError::timeout("start", 60);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], 1005);
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["payload"]["secs"], "60");
    }

    #[test]
    fn empty_detail_has_empty_payload() {
        let err = AppError::io("");
        assert!(err.payload().is_empty());
        assert_eq!(err.to_string(), "Io");
    }
}
