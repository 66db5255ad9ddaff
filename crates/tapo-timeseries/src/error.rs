use thiserror::Error;

/// 时序写入错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid InfluxDB URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid data point: {0}")]
    InvalidPoint(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
