use crate::tiles::tile::Tile;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// In-memory tile cache keyed by identifier id, with LRU eviction.
///
/// The bounded LRU stands in for a soft-reference store: entries vanish under
/// pressure and a miss is always ordinary — callers rebuild the tile and
/// re-insert it through [`intern`](Self::intern). While an id is resident it
/// maps to exactly one live [`Tile`] instance.
#[derive(Debug)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<String, Arc<Tile>>>>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(2048).unwrap());
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Create a new tile cache with default capacity (2048 tiles)
    pub fn with_default_capacity() -> Self {
        Self::new(2048)
    }

    /// Insert a freshly built tile unless its id is already resident, and
    /// return the instance the cache now serves for that id.
    pub fn intern(&self, tile: Tile) -> Arc<Tile> {
        let key = tile.identifier().id();
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(existing) = cache.get(&key) {
                return existing.clone();
            }
            let tile = Arc::new(tile);
            cache.put(key, tile.clone());
            tile
        } else {
            Arc::new(tile)
        }
    }

    /// Get a tile from the cache
    pub fn get(&self, id: &str) -> Option<Arc<Tile>> {
        self.cache.lock().ok()?.get(id).cloned()
    }

    /// Check if a tile is in the cache
    pub fn contains(&self, id: &str) -> bool {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.contains(id))
            .unwrap_or(false)
    }

    /// Remove a tile from the cache
    pub fn remove(&self, id: &str) -> Option<Arc<Tile>> {
        self.cache.lock().ok()?.pop(id)
    }

    /// Clear all tiles from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.len())
            .unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
    }
}

impl Clone for TileCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::GeoExtent;
    use crate::tiles::id::{TileAddressing, TileIdentifier, ZoomLevel};

    fn tile(x: u32, y: u32) -> Tile {
        let id = TileIdentifier::new(
            x,
            y,
            ZoomLevel::new(3, 64),
            "test",
            TileAddressing::XyzPath,
        )
        .unwrap();
        let url = format!("https://tiles.test/3/{}/{}.png", x, y);
        Tile::new(id, GeoExtent::world(), 256, url)
    }

    #[test]
    fn test_intern_preserves_identity_per_id() {
        let cache = TileCache::new(8);

        let first = cache.intern(tile(1, 2));
        let second = cache.intern(tile(1, 2));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_basic_operations() {
        let cache = TileCache::new(8);
        assert!(cache.is_empty());

        let interned = cache.intern(tile(0, 0));
        let key = interned.identifier().id();

        assert!(cache.contains(&key));
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &interned));

        cache.remove(&key);
        assert!(!cache.contains(&key));

        cache.intern(tile(1, 1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = TileCache::new(2);

        let a = cache.intern(tile(0, 0)).identifier().id();
        let b = cache.intern(tile(1, 0)).identifier().id();
        let c = cache.intern(tile(2, 0)).identifier().id();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a)); // evicted
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn test_miss_after_eviction_is_rebuildable() {
        let cache = TileCache::new(1);

        let first = cache.intern(tile(4, 4));
        cache.intern(tile(5, 5)); // evicts (4,4)

        let rebuilt = cache.intern(tile(4, 4));
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.identifier().id(), rebuilt.identifier().id());
    }

    #[test]
    fn test_clone_shares_storage() {
        let cache = TileCache::new(4);
        let clone = cache.clone();

        let interned = cache.intern(tile(7, 7));
        assert!(Arc::ptr_eq(
            &clone.get(&interned.identifier().id()).unwrap(),
            &interned
        ));
    }
}
