use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("unsupported file type: {0} (expected jpeg, jpg or png)")]
    UnsupportedFormat(String),
    #[error("could not open {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("could not encode annotated {name}: {reason}")]
    Encode { name: String, reason: String },
    #[error("no valid image to predict")]
    NoImages,
    #[error("detector failed: {0:#}")]
    Detector(anyhow::Error),
    #[error("prediction log I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("prediction log format: {0}")]
    Csv(#[from] csv::Error),
    #[error("credentials file: {0}")]
    Credentials(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("login required")]
    Unauthenticated,
}

pub type ReviewResult<T> = Result<T, ReviewError>;
