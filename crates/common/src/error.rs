//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Property service error: {0}")]
    Property(String),

    #[error("Process spawn error: {0}")]
    Spawn(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Property("setprop exited with status 1".to_string());
        assert_eq!(
            err.to_string(),
            "Property service error: setprop exited with status 1"
        );
    }

    #[test]
    fn test_spawn_error_display() {
        let err = Error::Spawn("/sbin/recovery: No such file or directory".to_string());
        assert_eq!(
            err.to_string(),
            "Process spawn error: /sbin/recovery: No such file or directory"
        );
    }
}
