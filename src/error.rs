//! Error handling for the DTMF test fixture generator

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid DTMF digit: {0:?}")]
    InvalidDigit(char),

    #[error("Invalid duration: {0}s")]
    InvalidDuration(f64),

    #[error("Configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    #[error("Invalid test plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn configuration_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::ConfigurationMismatch(msg.into())
    }

    pub fn invalid_plan<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPlan(msg.into())
    }

    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::InvalidDigit('x').to_string(), "Invalid DTMF digit: 'x'");
        assert_eq!(Error::InvalidDuration(-1.5).to_string(), "Invalid duration: -1.5s");
        assert_eq!(
            Error::configuration_mismatch("24-bit samples").to_string(),
            "Configuration mismatch: 24-bit samples"
        );
    }
}
