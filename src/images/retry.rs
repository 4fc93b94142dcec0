use super::random::{choose, RandomSource};
use super::{ImageProvider, PagedCatalog, ProviderError, SearchCriteria, SearchOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Random pages fetched after the reconnaissance query before giving up.
pub const RANDOM_PAGE_ATTEMPTS: usize = 3;

/// Samples a [`PagedCatalog`] by jumping to random pages.
///
/// One reconnaissance query at the default page learns the catalog size; the
/// catalog turns that into an addressable range, and up to
/// [`RANDOM_PAGE_ATTEMPTS`] uniformly drawn positions in `0..=range` are
/// fetched until one page holds a picture. At most four remote calls are made
/// per search. Any provider fault aborts immediately.
pub struct RandomPageSearch<C> {
    catalog: C,
    rng: Arc<dyn RandomSource>,
}

impl<C: PagedCatalog> RandomPageSearch<C> {
    pub fn new(catalog: C, rng: Arc<dyn RandomSource>) -> Self {
        Self { catalog, rng }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }
}

#[async_trait]
impl<C: PagedCatalog> ImageProvider for RandomPageSearch<C> {
    fn name(&self) -> &str {
        self.catalog.name()
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchOutcome, ProviderError> {
        let criteria = &self.catalog.prepare(criteria);
        let recon = self.catalog.fetch_page(criteria, 0).await?;

        let Some(range) = self.catalog.addressable_range(recon.extent) else {
            tracing::debug!(
                provider = self.catalog.name(),
                extent = recon.extent,
                "catalog too small to page through"
            );
            return Ok(SearchOutcome::NotFound);
        };

        for attempt in 1..=RANDOM_PAGE_ATTEMPTS {
            let position = self.rng.up_to(range);
            let page = self.catalog.fetch_page(criteria, position).await?;

            if let Some(url) = choose(self.rng.as_ref(), &page.urls) {
                tracing::debug!(
                    provider = self.catalog.name(),
                    attempt,
                    position,
                    "picked picture"
                );
                return Ok(SearchOutcome::Found(url.clone()));
            }

            tracing::debug!(
                provider = self.catalog.name(),
                attempt,
                position,
                range,
                "random page was empty"
            );
        }

        Ok(SearchOutcome::NotFound)
    }
}
