use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmError {
    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid selection: {0}")]
    Selection(String),

    #[error("Port {0} is closed")]
    PortClosed(String),

    #[error("Log file error: {0}")]
    LogFile(String),

    #[error("Input error: {0}")]
    Input(String),
}

pub type KmResult<T> = std::result::Result<T, KmError>;
