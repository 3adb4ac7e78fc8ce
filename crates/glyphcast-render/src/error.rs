#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("asset not found: {url}")]
    NotFound { url: String },
    #[error("HTTP {status} while fetching {url}")]
    Status { url: String, status: u16 },
    #[error("transport error while fetching {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("asset is empty")]
    Empty,
    #[error("invalid SVG: {0}")]
    Svg(String),
    #[error("invalid raster image: {0}")]
    Raster(String),
    #[error("decoded image has unusable dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
}

/// Terminal failure for one emoji asset. Stored in the cache and handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to decode emoji asset {url}: {source}")]
    Decode { url: String, source: DecodeError },
    #[error("fetch for {url} was abandoned before completing")]
    Aborted { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("failed to parse font data: {0}")]
    Parse(String),
    #[error("no installed font matches {family:?}")]
    NotFound { family: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("JPG rendering requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPG")]
    JpegEncode,
    #[error("invalid color {value:?}")]
    InvalidColor { value: String },
    #[error("failed to decode background image: {0}")]
    BackgroundDecode(#[from] DecodeError),
    #[error(transparent)]
    Font(#[from] FontError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("asset store rejected {asset_id}: {message}")]
    Rejected { asset_id: String, message: String },
    #[error("asset store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
