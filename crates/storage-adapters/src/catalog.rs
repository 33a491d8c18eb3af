//! HTTP client for a Modrinth-style mod catalog (`/v2/search`).
//!
//! Search sorts by relevance; "popular" is the same endpoint with no query,
//! sorted by downloads.

use anyhow::Context;
use async_trait::async_trait;
use domains::models::CatalogItem;
use domains::traits::ModCatalog;
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("forum-compose/", env!("CARGO_PKG_VERSION"));

pub struct HttpModCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    project_id: String,
    slug: String,
    title: String,
    #[serde(default)]
    description: String,
    author: Option<String>,
    #[serde(default)]
    downloads: u64,
    icon_url: Option<String>,
}

impl From<SearchHit> for CatalogItem {
    fn from(hit: SearchHit) -> Self {
        CatalogItem {
            id: hit.project_id,
            slug: hit.slug,
            title: hit.title,
            description: hit.description,
            author: hit.author,
            downloads: hit.downloads,
            icon_url: hit.icon_url.filter(|u| !u.is_empty()),
        }
    }
}

impl HttpModCatalog {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building catalog HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    async fn fetch(&self, query: Option<&str>, index: &str, limit: usize) -> anyhow::Result<Vec<CatalogItem>> {
        let url = format!("{}/v2/search", self.base_url.trim_end_matches('/'));
        let mut params = vec![("index", index.to_string()), ("limit", limit.to_string())];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }

        let mut request = self.client.get(&url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key);
        }

        // TODO: back off when X-Ratelimit-Remaining reaches zero instead of failing into the popular fallback
        let response: SearchResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding catalog response")?;
        debug!(index, hits = response.hits.len(), "catalog response");
        Ok(response.hits.into_iter().map(CatalogItem::from).collect())
    }
}

#[async_trait]
impl ModCatalog for HttpModCatalog {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CatalogItem>> {
        self.fetch(Some(query), "relevance", limit).await
    }

    async fn popular(&self, limit: usize) -> anyhow::Result<Vec<CatalogItem>> {
        self.fetch(None, "downloads", limit).await
    }
}
