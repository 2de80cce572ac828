use std::collections::HashSet;
use std::sync::Arc;

use crate::data::MediaItem;

/// Local persistent favorite ids.
pub trait FavoriteStore {
    fn snapshot(&self) -> HashSet<String>;

    fn contains(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<'a> {
    pub item: &'a MediaItem,
    pub is_favorite: bool,
}

/// Marks each item of a batch against a single snapshot of the store.
pub fn tag<'a, S>(store: &S, items: &'a [MediaItem]) -> Vec<Tagged<'a>>
where
    S: FavoriteStore + ?Sized,
{
    let favorites = store.snapshot();
    items
        .iter()
        .map(|item| Tagged {
            item,
            is_favorite: favorites.contains(&item.id),
        })
        .collect()
}

impl FavoriteStore for HashSet<String> {
    fn snapshot(&self) -> HashSet<String> {
        self.clone()
    }

    fn contains(&self, id: &str) -> bool {
        HashSet::contains(self, id)
    }
}

impl<T: FavoriteStore + ?Sized> FavoriteStore for Arc<T> {
    fn snapshot(&self) -> HashSet<String> {
        (**self).snapshot()
    }

    fn contains(&self, id: &str) -> bool {
        (**self).contains(id)
    }
}
