//! Catalog browsing: paged category feeds with view-side sort and filter.
//!
//! Fetched pages accumulate per category, deduplicated by product ID so a
//! shifting server-side listing never shows the same product twice. Sort
//! order and filters rearrange the already-fetched set; they trigger no
//! refetch.

pub mod pagination;

pub use pagination::{PAGE_SIZE, PaginationState, Paginator};

use std::sync::Arc;

use tracing::instrument;

use thriftr_core::{LoadState, Product};

use crate::backend::{DocumentStore, FileStore};
use crate::error::Result;
use crate::repository::ProductRepository;

/// Fixed category tabs. Index 0 is the unfiltered home feed.
pub const CATEGORIES: &[&str] = &["Home", "Electronics", "Books", "Clothing", "Furniture", "Toys"];

/// Cap on the discounted-products section.
const BEST_DEALS_LIMIT: u32 = 25;

/// View-side price ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    PriceLowToHigh,
    PriceHighToLow,
}

/// View-side filter toggles; all off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filters {
    pub free_shipping: bool,
    pub in_stock: bool,
    pub on_sale: bool,
}

/// The catalog facade for one session.
pub struct CatalogService<B> {
    repo: Arc<ProductRepository<B>>,
    feeds: Vec<Vec<Product>>,
    paginator: Paginator,
    sort: Option<SortOrder>,
    filters: Filters,
    deals: LoadState<Vec<Product>>,
}

impl<B: DocumentStore + FileStore> CatalogService<B> {
    #[must_use]
    pub fn new(repo: Arc<ProductRepository<B>>) -> Self {
        Self {
            repo,
            feeds: vec![Vec::new(); CATEGORIES.len()],
            paginator: Paginator::new(CATEGORIES.len()),
            sort: None,
            filters: Filters::default(),
            deals: LoadState::Idle,
        }
    }

    /// Fetch the next page for a category tab, if one is due.
    ///
    /// Returns how many new products were added: zero when the fetch was
    /// skipped (in flight or exhausted) or every result was a duplicate.
    #[instrument(skip(self), level = "debug")]
    pub async fn load_next_page(&mut self, category: usize) -> Result<usize> {
        let Some(page) = self.paginator.try_begin(category) else {
            return Ok(0);
        };

        let filter = category_filter(category);
        let fetched = match self
            .repo
            .page(filter, PAGE_SIZE, page * PAGE_SIZE)
            .await
        {
            Ok(products) => products,
            Err(e) => {
                self.paginator.fail(category);
                return Err(e);
            }
        };
        self.paginator.complete(category, fetched.len());

        let Some(feed) = self.feeds.get_mut(category) else {
            return Ok(0);
        };
        let mut added = 0;
        for product in fetched {
            if !feed.iter().any(|p| p.id == product.id) {
                feed.push(product);
                added += 1;
            }
        }
        Ok(added)
    }

    /// The category feed with the current sort and filters applied.
    #[must_use]
    pub fn products(&self, category: usize) -> Vec<Product> {
        let Some(feed) = self.feeds.get(category) else {
            return Vec::new();
        };
        let mut view: Vec<Product> = feed
            .iter()
            .filter(|p| self.passes_filters(p))
            .cloned()
            .collect();
        match self.sort {
            Some(SortOrder::PriceLowToHigh) => {
                view.sort_by(|a, b| a.price.amount().cmp(&b.price.amount()));
            }
            Some(SortOrder::PriceHighToLow) => {
                view.sort_by(|a, b| b.price.amount().cmp(&a.price.amount()));
            }
            None => {}
        }
        view
    }

    /// Fetch the discounted-products section, tracking its load state.
    #[instrument(skip(self), level = "debug")]
    pub async fn load_best_deals(&mut self) {
        self.deals = LoadState::Loading;
        self.deals = match self.repo.best_deals(BEST_DEALS_LIMIT).await {
            Ok(products) => LoadState::Success(products),
            Err(e) => LoadState::Error(e.to_string()),
        };
    }

    /// The discounted-products section as last loaded.
    #[must_use]
    pub fn deals(&self) -> &LoadState<Vec<Product>> {
        &self.deals
    }

    /// Free-text search across the whole catalog, unpaged.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        self.repo.search(term).await
    }

    /// Change the price ordering. View-side only.
    pub fn set_sort(&mut self, sort: Option<SortOrder>) {
        self.sort = sort;
    }

    /// Change the filter toggles. View-side only.
    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    #[must_use]
    pub fn has_more(&self, category: usize) -> bool {
        self.paginator.has_more(category)
    }

    #[must_use]
    pub fn is_loading(&self, category: usize) -> bool {
        self.paginator.is_loading(category)
    }

    /// Drop one category's feed and rewind its cursor.
    pub fn reset_category(&mut self, category: usize) {
        if let Some(feed) = self.feeds.get_mut(category) {
            feed.clear();
        }
        self.paginator.reset_category(category);
    }

    /// Drop every fetched feed and rewind all cursors (pull-to-refresh).
    pub fn reset(&mut self) {
        for feed in &mut self.feeds {
            feed.clear();
        }
        self.paginator.reset();
        self.deals = LoadState::Idle;
    }

    fn passes_filters(&self, product: &Product) -> bool {
        (!self.filters.free_shipping || product.free_shipping)
            && (!self.filters.in_stock || product.is_in_stock())
            && (!self.filters.on_sale || product.is_on_sale())
    }
}

/// Map a category tab to its server-side filter. The home tab (index 0)
/// lists everything except the synthetic deals category.
fn category_filter(category: usize) -> Option<&'static str> {
    if category == 0 {
        None
    } else {
        CATEGORIES.get(category).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::repository::products::{BEST_DEALS_CATEGORY, product_body};

    fn service(backend: &Arc<MemoryBackend>) -> CatalogService<MemoryBackend> {
        CatalogService::new(Arc::new(ProductRepository::new(
            Arc::clone(backend),
            "products",
            "product-images",
        )))
    }

    fn seed_books(backend: &MemoryBackend, count: usize) {
        for i in 0..count {
            backend.seed(
                "products",
                &format!("b{i}"),
                product_body(&format!("Book {i}"), "Books", 5.0 + i as f64),
            );
        }
    }

    #[tokio::test]
    async fn test_pages_accumulate_without_duplicates() {
        let backend = Arc::new(MemoryBackend::new());
        seed_books(&backend, 6);
        let mut catalog = service(&backend);

        // Books is tab index 2.
        assert_eq!(catalog.load_next_page(2).await.expect("page"), 4);
        assert!(catalog.has_more(2));
        assert_eq!(catalog.load_next_page(2).await.expect("page"), 2);
        assert!(!catalog.has_more(2));

        // Exhausted: further loads are skipped.
        assert_eq!(catalog.load_next_page(2).await.expect("page"), 0);
        assert_eq!(catalog.products(2).len(), 6);
    }

    #[tokio::test]
    async fn test_home_feed_excludes_best_deals() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed("products", "p1", product_body("Lamp", "Furniture", 25.0));
        backend.seed("products", "d1", product_body("Deal", BEST_DEALS_CATEGORY, 5.0));
        let mut catalog = service(&backend);

        catalog.load_next_page(0).await.expect("page");
        let home = catalog.products(0);
        let ids: Vec<&str> = home.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1"]);

        catalog.load_best_deals().await;
        let deals = catalog.deals().success().expect("loaded");
        assert_eq!(deals.len(), 1);
    }

    #[tokio::test]
    async fn test_sort_and_filter_are_view_side() {
        let backend = Arc::new(MemoryBackend::new());
        seed_books(&backend, 5);
        let mut catalog = service(&backend);
        catalog.load_next_page(2).await.expect("page");

        catalog.set_sort(Some(SortOrder::PriceHighToLow));
        let prices: Vec<String> = catalog
            .products(2)
            .iter()
            .map(|p| p.price.to_string())
            .collect();
        assert_eq!(prices, ["$8.00", "$7.00", "$6.00", "$5.00"]);

        // Changing sort does not touch the cursor.
        assert!(catalog.has_more(2));
        catalog.set_sort(Some(SortOrder::PriceLowToHigh));
        assert_eq!(
            catalog.products(2).first().map(|p| p.price.to_string()),
            Some("$5.00".to_string())
        );
    }

    #[tokio::test]
    async fn test_filters_narrow_the_view() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            "products",
            "p1",
            serde_json::json!({
                "name": "Free Ship Book",
                "category": "Books",
                "price": 10.0,
                "freeShipping": true,
                "stock": 0,
            }),
        );
        backend.seed("products", "p2", product_body("Plain Book", "Books", 8.0));
        let mut catalog = service(&backend);
        catalog.load_next_page(2).await.expect("page");

        catalog.set_filters(Filters {
            free_shipping: true,
            ..Filters::default()
        });
        assert_eq!(catalog.products(2).len(), 1);

        catalog.set_filters(Filters {
            free_shipping: true,
            in_stock: true,
            ..Filters::default()
        });
        assert!(catalog.products(2).is_empty());

        catalog.set_filters(Filters::default());
        assert_eq!(catalog.products(2).len(), 2);
    }

    #[tokio::test]
    async fn test_reset_rewinds_feeds_and_cursors() {
        let backend = Arc::new(MemoryBackend::new());
        seed_books(&backend, 2);
        let mut catalog = service(&backend);

        catalog.load_next_page(2).await.expect("page");
        assert!(!catalog.has_more(2));

        catalog.reset();
        assert!(catalog.products(2).is_empty());
        assert!(catalog.has_more(2));
        assert_eq!(catalog.load_next_page(2).await.expect("page"), 2);
    }
}
