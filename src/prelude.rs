//! Prelude module for common tilewalk types and traits
//!
//! Re-exports the most commonly used types, traits, and functions for easy
//! importing with `use tilewalk::prelude::*;`

pub use crate::core::{
    geo::{arithmetic_mod, normalize_degree_value, GeoExtent},
    transform::{ExtentTransform, IdentityTransform},
};

pub use crate::tiles::{
    cache::TileCache,
    factory::{QuadKeyTileFactory, TileFactory, XyzTileFactory},
    id::{TileAddressing, TileIdentifier, ZoomLevel},
    loader::{HttpImageLoader, ImageLoader},
    service::{TileService, TileServiceOptions},
    tile::{
        ContextState, RenderState, ScreenState, Tile, TileStateChangedListener, ValidatedState,
    },
};

pub use crate::{Result, TileError};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use std::sync::{Arc, Mutex};
