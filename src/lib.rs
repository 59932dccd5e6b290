//! # Tilewalk
//!
//! A Rust library for covering a geographic viewport with the minimal set of
//! pre-rendered raster tiles from a tiled map service (OSM-style z/x/y,
//! WMTS, quad-key services).
//!
//! The library provides tile addressing with dateline wraparound, a per-tile
//! render/visibility state machine with listener notification, an abstract
//! tiling-factory contract implemented per service family, and the
//! viewport-to-tile-set decomposition algorithm backed by a bounded tile
//! cache.

pub mod core;
pub mod prelude;
pub mod tiles;

// Re-export public API
pub use crate::core::{
    geo::GeoExtent,
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

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TileError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("coordinate transform error: {0}")]
    Transform(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = TileError;
