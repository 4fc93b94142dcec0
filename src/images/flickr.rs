use super::random::{choose, RandomSource};
use super::{decode_json, CatalogPage, PagedCatalog, ProviderError, SearchCriteria};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const FLICKR_API_URL: &str = "https://api.flickr.com/services/rest/";

/// Flickr only serves the first few thousand results of a search, so random
/// pages are drawn from the first 40.
pub const FLICKR_PAGE_LIMIT: usize = 40;

/// Appended to every query to keep results work-safe.
pub const EXCLUDED_TERMS: &[&str] = &["-hentai", "-porn", "-sexy", "-fuck"];

/// Used when the caller gives no keyword at all.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "猫",
    "ねこ",
    "犬",
    "いぬ",
    "兎",
    "うさぎ",
    "鳥",
    "とり",
    "ハムスター",
    "パンダ",
    "日本酒",
];

const PROVIDER: &str = "flickr";

/// Keyword search over Flickr photos (`flickr.photos.search`).
pub struct FlickrCatalog {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    default_keywords: Vec<String>,
    rng: Arc<dyn RandomSource>,
}

impl FlickrCatalog {
    /// Blank default keywords are dropped; if none remain the built-in
    /// [`DEFAULT_KEYWORDS`] are used.
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        api_url: String,
        default_keywords: Vec<String>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        let mut default_keywords: Vec<String> = default_keywords
            .into_iter()
            .filter(|w| !w.trim().is_empty())
            .collect();
        if default_keywords.is_empty() {
            default_keywords = DEFAULT_KEYWORDS.iter().map(|w| (*w).to_string()).collect();
        }
        Self {
            client,
            api_key,
            api_url,
            default_keywords,
            rng,
        }
    }

    /// Free-text query: the keywords followed by the exclusion terms.
    fn query_text(criteria: &SearchCriteria) -> String {
        let mut words: Vec<&str> = criteria.terms().iter().map(String::as_str).collect();
        words.extend_from_slice(EXCLUDED_TERMS);
        words.join(" ")
    }
}

#[async_trait]
impl PagedCatalog for FlickrCatalog {
    fn name(&self) -> &str {
        PROVIDER
    }

    /// A keywordless search becomes a search for one random default keyword,
    /// drawn once so every page of the search asks for the same thing.
    fn prepare(&self, criteria: &SearchCriteria) -> SearchCriteria {
        if !criteria.is_empty() {
            return criteria.clone();
        }
        choose(self.rng.as_ref(), &self.default_keywords)
            .map_or_else(SearchCriteria::default, |word| {
                SearchCriteria::new([word.as_str()])
            })
    }

    fn addressable_range(&self, extent: usize) -> Option<usize> {
        Some(extent.min(FLICKR_PAGE_LIMIT))
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        position: usize,
    ) -> Result<CatalogPage, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
            ("method", "flickr.photos.search".to_string()),
            ("text", Self::query_text(criteria)),
            ("safe_mode", "1".to_string()),
            ("media", "photo".to_string()),
        ];
        if position > 0 {
            params.push(("page", position.to_string()));
        }

        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;

        let body: FlickrSearchResponse = decode_json(PROVIDER, response).await?;
        body.into_page()
    }
}

#[derive(Debug, Deserialize)]
struct FlickrSearchResponse {
    #[serde(default)]
    stat: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<FlickrPhotos>,
}

#[derive(Debug, Default, Deserialize)]
struct FlickrPhotos {
    #[serde(default)]
    pages: usize,
    #[serde(default)]
    photo: Vec<FlickrPhoto>,
}

#[derive(Debug, Deserialize)]
struct FlickrPhoto {
    id: String,
    secret: String,
    server: String,
    farm: u32,
}

impl FlickrPhoto {
    fn image_url(&self) -> String {
        format!(
            "https://farm{}.staticflickr.com/{}/{}_{}.jpg",
            self.farm, self.server, self.id, self.secret
        )
    }
}

impl FlickrSearchResponse {
    fn into_page(self) -> Result<CatalogPage, ProviderError> {
        if self.stat.as_deref() == Some("fail") {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: self.message.unwrap_or_else(|| "unknown".into()),
            });
        }

        let photos = self.photos.unwrap_or_default();
        Ok(CatalogPage {
            extent: photos.pages,
            urls: photos.photo.iter().map(FlickrPhoto::image_url).collect(),
        })
    }
}
