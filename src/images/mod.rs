//! Image providers and the random-page search used to sample them.
//!
//! Three providers back the bot's commands:
//! - [`FlickrCatalog`]: keyword search over Flickr photos, paged by page number
//! - [`TumblrCatalog`]: tag search over one Tumblr blog, paged by post offset
//! - [`MoeStash`]: a fixed list of keys under one base URL, no network
//!
//! The two remote catalogs only expose ranked pages, so [`RandomPageSearch`]
//! turns them into a sampler: one reconnaissance query learns the catalog
//! size, then up to three random pages are fetched until one yields a picture.

pub mod flickr;
pub mod moe;
pub mod random;
pub mod retry;
pub mod testing;
pub mod tumblr;

pub use flickr::FlickrCatalog;
pub use moe::MoeStash;
pub use random::{RandomSource, ThreadRandom};
pub use retry::RandomPageSearch;
pub use tumblr::TumblrCatalog;

use async_trait::async_trait;

/// Keywords or tags for one search, in caller order followed by any fixed
/// tags appended by the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    terms: Vec<String>,
}

impl SearchCriteria {
    pub fn new(terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Suffix `tags` after the caller's terms.
    pub fn with_appended<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.terms
            .extend(tags.iter().map(|tag| tag.as_ref().to_string()));
        self
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Terminal state of one successful search invocation. Failures are carried
/// separately as [`ProviderError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(String),
    NotFound,
}

impl SearchOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            Self::NotFound => None,
        }
    }
}

/// Network, status or decoding fault while talking to an image provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} response could not be decoded: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can answer a search with a single picture URL.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchOutcome, ProviderError>;
}

/// One fetched page of a remote catalog. Discarded after use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Catalog size as the provider reports it: total pages for Flickr,
    /// total posts for Tumblr.
    pub extent: usize,
    /// Displayable picture URLs found on this page.
    pub urls: Vec<String>,
}

/// A remote catalog that can be fetched one page at a time.
#[async_trait]
pub trait PagedCatalog: Send + Sync {
    fn name(&self) -> &str;

    /// Settle the criteria once per search, before the first fetch. Every
    /// page of one search is fetched with the returned criteria.
    fn prepare(&self, criteria: &SearchCriteria) -> SearchCriteria {
        criteria.clone()
    }

    /// Highest position worth sampling for a catalog of the given extent, or
    /// `None` when the catalog is too small to page through.
    fn addressable_range(&self, extent: usize) -> Option<usize>;

    /// Fetch the page at `position`. `0` requests the provider's default page.
    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        position: usize,
    ) -> Result<CatalogPage, ProviderError>;
}

/// Read a provider response, mapping transport, status and JSON failures
/// onto [`ProviderError`].
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ProviderError::Http { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body: crate::util::truncate_with_ellipsis(&body, 200),
        });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::Decode { provider, source })
}
