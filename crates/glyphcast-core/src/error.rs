pub type Result<T> = std::result::Result<T, LayoutError>;

/// Caption bytes that are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("caption text is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
pub struct EncodingError {
    pub valid_up_to: usize,
}

impl From<std::str::Utf8Error> for EncodingError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self {
            valid_up_to: err.valid_up_to(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("invalid fit options: {message}")]
    InvalidOptions { message: String },
}
