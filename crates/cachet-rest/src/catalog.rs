//! In-process item catalog standing in for a slow upstream.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price_cents: u64,
}

/// Item source with configurable latency.
pub struct ItemCatalog {
    items: HashMap<u64, Item>,
    latency: Duration,
    lookups: AtomicU64,
}

impl ItemCatalog {
    /// Creates a catalog over `items`.
    pub fn new(items: impl IntoIterator<Item = Item>, latency: Duration) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            latency,
            lookups: AtomicU64::new(0),
        }
    }

    /// A few demo items.
    #[must_use]
    pub fn sample(latency: Duration) -> Self {
        let items = [
            (1, "Desk lamp", 2_499),
            (2, "Office chair", 14_900),
            (3, "Standing desk", 39_900),
            (4, "Monitor arm", 7_450),
        ]
        .into_iter()
        .map(|(id, name, price_cents)| Item {
            id,
            name: name.to_string(),
            price_cents,
        });
        Self::new(items, latency)
    }

    /// Looks up an item, paying the configured latency.
    pub async fn find(&self, id: u64) -> Option<Item> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        debug!(id, "Catalog lookup");
        self.items.get(&id).cloned()
    }

    /// How many lookups reached the catalog.
    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}
