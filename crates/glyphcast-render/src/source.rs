//! Where emoji asset bytes come from.

use crate::error::FetchError;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Blocking byte fetcher used by [`crate::EmojiAssetCache`].
///
/// Implementations must be shareable across the threads that call into the cache.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

impl<S: AssetSource + ?Sized> AssetSource for std::sync::Arc<S> {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }
}

const JSDELIVR_72: &str = "https://cdn.jsdelivr.net/gh/twitter/twemoji@latest/assets/72x72/";

/// Rewrites references to the retired `twemoji.maxcdn.com` mirror onto jsDelivr. Every other URL
/// is returned unchanged.
pub fn normalize_asset_url(url: &Url) -> Url {
    if url.host_str() != Some("twemoji.maxcdn.com") {
        return url.clone();
    }
    let Some(file) = url.path_segments().and_then(|mut s| s.next_back()) else {
        return url.clone();
    };
    let is_asset = file
        .strip_suffix(".png")
        .is_some_and(|stem| {
            !stem.is_empty() && stem.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
        });
    if !is_asset {
        return url.clone();
    }
    Url::parse(JSDELIVR_72)
        .and_then(|base| base.join(file))
        .unwrap_or_else(|_| url.clone())
}

/// In-memory source keyed by URL. Useful for bundled assets and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAssetSource {
    assets: HashMap<String, Vec<u8>>,
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &Url, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(url.as_str().to_string(), bytes.into());
    }

    pub fn with(mut self, url: &Url, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl AssetSource for StaticAssetSource {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.assets
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

/// Retries transient failures with a linear backoff (`backoff * attempt`).
#[derive(Debug, Clone)]
pub struct RetryingSource<S> {
    inner: S,
    attempts: u32,
    backoff: Duration,
}

impl<S: AssetSource> RetryingSource<S> {
    /// Three attempts, 500ms apart then 1s apart.
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, 3, Duration::from_millis(500))
    }

    pub fn with_policy(inner: S, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: AssetSource> AssetSource for RetryingSource<S> {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    tracing::warn!(url = %url, attempt, error = %err, "emoji fetch failed; retrying");
                    std::thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpAssetSource;

#[cfg(feature = "http")]
mod http {
    use super::{AssetSource, normalize_asset_url};
    use crate::error::FetchError;
    use std::time::Duration;
    use url::Url;

    /// Blocking HTTP(S) source with a per-request timeout.
    #[derive(Debug, Clone)]
    pub struct HttpAssetSource {
        client: reqwest::blocking::Client,
    }

    impl HttpAssetSource {
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

        pub fn new() -> Result<Self, FetchError> {
            Self::with_timeout(Self::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("glyphcast/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| FetchError::Transport {
                    url: String::new(),
                    message: format!("failed to create HTTP client: {e}"),
                })?;
            Ok(Self { client })
        }
    }

    impl AssetSource for HttpAssetSource {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            let target = normalize_asset_url(url);
            let transport = |e: reqwest::Error| FetchError::Transport {
                url: target.to_string(),
                message: e.to_string(),
            };
            let response = self.client.get(target.as_str()).send().map_err(transport)?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound {
                    url: target.to_string(),
                });
            }
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: target.to_string(),
                    status: status.as_u16(),
                });
            }
            let bytes = response.bytes().map_err(transport)?;
            Ok(bytes.to_vec())
        }
    }
}
