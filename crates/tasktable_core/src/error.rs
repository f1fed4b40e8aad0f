#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("validation_error - {0}")]
    Validation(String),
    #[error("format_error - {0}")]
    Format(String),
    #[error("parse_error - {0}")]
    Parse(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn format<M: Into<String>>(message: M) -> Self {
        Self::Format(message.into())
    }

    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Format(_) => "format_error",
            Self::Parse(_) => "parse_error",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Format(message)
            | Self::Parse(message)
            | Self::InvalidData(message)
            | Self::Io(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
