//! Resource browser over the third-party mod catalog.
//!
//! A search that errors or comes back empty falls back to the catalog's
//! popular items; only when that also errors does browsing fail.

use std::sync::Arc;

use domains::error::{AppError, Result};
use domains::models::CatalogItem;
use domains::traits::ModCatalog;
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseSource {
    Search,
    Popular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResult {
    pub source: BrowseSource,
    pub items: Vec<CatalogItem>,
}

pub struct ResourceBrowser {
    catalog: Arc<dyn ModCatalog>,
    page_size: usize,
}

impl ResourceBrowser {
    pub fn new(catalog: Arc<dyn ModCatalog>, page_size: usize) -> Self {
        Self { catalog, page_size }
    }

    #[instrument(skip(self))]
    pub async fn browse(&self, query: &str) -> Result<BrowseResult> {
        let query = query.trim();
        if !query.is_empty() {
            match self.catalog.search(query, self.page_size).await {
                Ok(items) if !items.is_empty() => {
                    return Ok(BrowseResult { source: BrowseSource::Search, items });
                }
                Ok(_) => warn!("search returned nothing, falling back to popular items"),
                Err(e) => warn!(error = %e, "search failed, falling back to popular items"),
            }
        }

        let items = self
            .catalog
            .popular(self.page_size)
            .await
            .map_err(|e| AppError::CatalogUnavailable(e.to_string()))?;
        Ok(BrowseResult { source: BrowseSource::Popular, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::traits::MockModCatalog;

    fn item(slug: &str) -> CatalogItem {
        CatalogItem {
            id: format!("id-{slug}"),
            slug: slug.into(),
            title: slug.to_uppercase(),
            description: String::new(),
            author: None,
            downloads: 10,
            icon_url: None,
        }
    }

    #[tokio::test]
    async fn search_hits_are_returned() {
        let mut catalog = MockModCatalog::new();
        catalog
            .expect_search()
            .withf(|q, limit| q.to_string() == "sodium" && *limit == 20)
            .returning(|_, _| Ok(vec![item("sodium")]));
        catalog.expect_popular().never();

        let browser = ResourceBrowser::new(Arc::new(catalog), 20);
        let result = browser.browse(" sodium ").await.unwrap();
        assert_eq!(result.source, BrowseSource::Search);
        assert_eq!(result.items, vec![item("sodium")]);
    }

    #[tokio::test]
    async fn empty_or_failed_search_falls_back() {
        for failing in [false, true] {
            let mut catalog = MockModCatalog::new();
            catalog.expect_search().returning(move |_, _| {
                if failing {
                    Err(anyhow::anyhow!("502 Bad Gateway"))
                } else {
                    Ok(vec![])
                }
            });
            catalog.expect_popular().times(1).returning(|_| Ok(vec![item("lithium")]));

            let browser = ResourceBrowser::new(Arc::new(catalog), 20);
            let result = browser.browse("nothing-matches").await.unwrap();
            assert_eq!(result.source, BrowseSource::Popular);
            assert_eq!(result.items, vec![item("lithium")]);
        }
    }

    #[tokio::test]
    async fn blank_query_goes_straight_to_popular() {
        let mut catalog = MockModCatalog::new();
        catalog.expect_search().never();
        catalog.expect_popular().returning(|_| Ok(vec![item("iris")]));

        let browser = ResourceBrowser::new(Arc::new(catalog), 20);
        assert_eq!(browser.browse("  ").await.unwrap().source, BrowseSource::Popular);
    }

    #[tokio::test]
    async fn both_failing_is_an_error() {
        let mut catalog = MockModCatalog::new();
        catalog.expect_search().returning(|_, _| Err(anyhow::anyhow!("timeout")));
        catalog.expect_popular().returning(|_| Err(anyhow::anyhow!("timeout")));

        let browser = ResourceBrowser::new(Arc::new(catalog), 20);
        assert_eq!(
            browser.browse("x").await,
            Err(AppError::CatalogUnavailable("timeout".into()))
        );
    }
}
