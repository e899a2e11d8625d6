//! Application state for Axum handlers.

use crate::catalog::{Item, ItemCatalog};
use crate::responses::AppError;
use cachet::{cached, CacheFacade, CacheOptions, Cached};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

/// Prefix under which item lookups are cached.
pub const ITEM_PREFIX: &str = "items";

/// Base key for item lookups.
pub const ITEM_KEY: &str = "get_item";

/// Boxed item lookup so the cached wrapper has a nameable type.
pub type ItemLookupFn = Box<dyn Fn(u64) -> BoxFuture<'static, Result<Item, AppError>> + Send + Sync>;

/// Item lookup behind the cache.
pub type ItemLookup = Cached<ItemLookupFn>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheFacade>,
    pub catalog: Arc<ItemCatalog>,
    pub items: Arc<ItemLookup>,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// `options` supplies expiry and fail-open behaviour; key and prefix are
    /// fixed to [`ITEM_KEY`] and [`ITEM_PREFIX`].
    pub fn new(cache: Arc<CacheFacade>, catalog: Arc<ItemCatalog>, options: CacheOptions) -> Self {
        let source = Arc::clone(&catalog);
        let lookup: ItemLookupFn = Box::new(move |id: u64| {
            let source = Arc::clone(&source);
            async move {
                source
                    .find(id)
                    .await
                    .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
            }
            .boxed()
        });

        let items = cached(
            Arc::clone(&cache),
            options.key(ITEM_KEY).prefix(ITEM_PREFIX),
            lookup,
        );

        Self {
            cache,
            catalog,
            items: Arc::new(items),
        }
    }
}
