use staging_monitor::MonitorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cannot find {software} installed on your system. {advice}")]
    NotInstalled { software: String, advice: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Interrupted before all photos were processed")]
    Interrupted,

    #[error("{count} photo(s) could not be moved to the destination")]
    UnitsFailed { count: usize },

    #[error("Converter exited but {} photo(s) never completed: {}", remaining.len(), remaining.join(", "))]
    Stalled { remaining: Vec<String> },
}

impl AppError {
    pub fn not_installed(software: impl Into<String>, advice: Option<&str>) -> Self {
        Self::NotInstalled {
            software: software.into(),
            advice: advice
                .unwrap_or("Please install this dependency before continuing.")
                .to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_message() {
        let err = AppError::not_installed(
            "RawTherapee CLI",
            Some("Please go to rawtherapee.com and install the CLI tool before continuing."),
        );
        assert_eq!(
            err.to_string(),
            "Cannot find RawTherapee CLI installed on your system. \
             Please go to rawtherapee.com and install the CLI tool before continuing."
        );

        let err = AppError::not_installed("thing", None);
        assert!(err.to_string().ends_with("Please install this dependency before continuing."));
    }

    #[test]
    fn test_stalled_message_lists_names() {
        let err = AppError::Stalled {
            remaining: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Converter exited but 2 photo(s) never completed: a, b"
        );
    }
}
