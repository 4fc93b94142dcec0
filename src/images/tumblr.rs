use super::{decode_json, CatalogPage, PagedCatalog, ProviderError, SearchCriteria};
use async_trait::async_trait;
use serde::Deserialize;

pub const TUMBLR_API_URL: &str = "https://api.tumblr.com";

/// Posts requested per page.
pub const TUMBLR_PAGE_SIZE: usize = 20;

const PROVIDER: &str = "tumblr";

/// Tag search over the photo posts of a single Tumblr blog.
pub struct TumblrCatalog {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    blog: String,
}

impl TumblrCatalog {
    pub fn new(client: reqwest::Client, api_key: String, api_url: String, blog: String) -> Self {
        Self {
            client,
            api_key,
            api_url,
            blog,
        }
    }

    pub fn blog(&self) -> &str {
        &self.blog
    }

    fn posts_url(&self) -> String {
        format!(
            "{}/v2/blog/{}.tumblr.com/posts/photo",
            self.api_url.trim_end_matches('/'),
            self.blog
        )
    }
}

#[async_trait]
impl PagedCatalog for TumblrCatalog {
    fn name(&self) -> &str {
        PROVIDER
    }

    /// Offsets run over `0..=total - page_size + 1`, so a full page starts
    /// at every offset except possibly the last, which may be one post
    /// short. A blog with `page_size - 1` posts is still sampled at offset
    /// 0; anything smaller cannot be sampled.
    fn addressable_range(&self, extent: usize) -> Option<usize> {
        (extent + 1).checked_sub(TUMBLR_PAGE_SIZE)
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        position: usize,
    ) -> Result<CatalogPage, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("limit", TUMBLR_PAGE_SIZE.to_string()),
        ];
        if position > 0 {
            params.push(("offset", position.to_string()));
        }
        if !criteria.is_empty() {
            params.push(("tag", criteria.terms().join("+")));
        }

        let response = self
            .client
            .get(self.posts_url())
            .query(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;

        let body: TumblrPostsResponse = decode_json(PROVIDER, response).await?;
        body.into_page()
    }
}

#[derive(Debug, Deserialize)]
struct TumblrPostsResponse {
    #[serde(default)]
    meta: Option<TumblrMeta>,
    #[serde(default)]
    response: TumblrPosts,
}

#[derive(Debug, Deserialize)]
struct TumblrMeta {
    status: u16,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Default, Deserialize)]
struct TumblrPosts {
    #[serde(default)]
    posts: Vec<TumblrPost>,
    #[serde(default)]
    total_posts: usize,
}

#[derive(Debug, Deserialize)]
struct TumblrPost {
    #[serde(default)]
    photos: Vec<TumblrPhoto>,
}

#[derive(Debug, Deserialize)]
struct TumblrPhoto {
    original_size: TumblrPhotoSize,
}

#[derive(Debug, Deserialize)]
struct TumblrPhotoSize {
    url: String,
}

impl TumblrPostsResponse {
    /// Flatten every photo of every post on the page into one pool.
    fn into_page(self) -> Result<CatalogPage, ProviderError> {
        if let Some(meta) = self.meta.filter(|m| !(200..300).contains(&m.status)) {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: format!("{} {}", meta.status, meta.msg),
            });
        }

        let urls = self
            .response
            .posts
            .into_iter()
            .flat_map(|post| post.photos)
            .map(|photo| photo.original_size.url)
            .collect();

        Ok(CatalogPage {
            extent: self.response.total_posts,
            urls,
        })
    }
}
