use super::random::{choose, RandomSource};
use super::{ImageProvider, ProviderError, SearchCriteria, SearchOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// A hand-picked stash of pictures: fixed keys under one base URL.
///
/// Search criteria are ignored and no request is made; every search returns
/// `base_url/<key>` for a random key, or `NotFound` when the stash is empty.
pub struct MoeStash {
    base_url: String,
    keys: Vec<String>,
    rng: Arc<dyn RandomSource>,
}

impl MoeStash {
    pub fn new(base_url: String, keys: Vec<String>, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            base_url,
            keys,
            rng,
        }
    }

    fn image_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl ImageProvider for MoeStash {
    fn name(&self) -> &str {
        "moe"
    }

    async fn search(&self, _criteria: &SearchCriteria) -> Result<SearchOutcome, ProviderError> {
        Ok(choose(self.rng.as_ref(), &self.keys)
            .map_or(SearchOutcome::NotFound, |key| {
                SearchOutcome::Found(self.image_url(key))
            }))
    }
}
