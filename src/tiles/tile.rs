use crate::{
    core::geo::GeoExtent,
    tiles::{
        id::TileIdentifier,
        loader::{placeholder_image, HttpImageLoader, ImageLoader},
    },
};
use image::RgbaImage;
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, Mutex},
};

/// Render lifecycle of a tile's image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    New,
    Rendered,
    Invalid,
}

/// Whether the symbology context a tile was rendered under is still current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Okay,
    Invalid,
}

/// Whether a tile currently sits inside the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    OnScreen,
    OffScreen,
}

/// Whether a refresh sweep has re-confirmed the tile as visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatedState {
    Validated,
    Old,
}

/// Observer for tile state transitions.
///
/// Each callback receives the mutated tile and runs synchronously on the
/// thread that performed the mutation. A tile carries at most one listener.
pub trait TileStateChangedListener: Send + Sync {
    fn screen_state_changed(&self, tile: &Tile);
    fn render_state_changed(&self, tile: &Tile);
    fn context_state_changed(&self, tile: &Tile);
    fn validation_state_changed(&self, tile: &Tile);
}

#[derive(Debug, Clone, Copy)]
struct StateSet {
    render: RenderState,
    context: ContextState,
    screen: ScreenState,
    validated: ValidatedState,
}

/// One raster tile of a service's pyramid.
///
/// Owns its address, geographic extent, four independent lifecycle states and
/// a lazily loaded image. Created by a
/// [`TileFactory`](crate::tiles::factory::TileFactory); shared through the
/// service cache as `Arc<Tile>`, so all mutation goes through `&self`.
///
/// Equality and hashing use the resolved URL, not the identifier.
pub struct Tile {
    id: TileIdentifier,
    extent: GeoExtent,
    tile_size: u32,
    url: String,
    states: Mutex<StateSet>,
    image: Mutex<Option<Arc<RgbaImage>>>,
    loader: Mutex<Arc<dyn ImageLoader>>,
    listener: Mutex<Option<Arc<dyn TileStateChangedListener>>>,
}

impl Tile {
    pub fn new(id: TileIdentifier, extent: GeoExtent, tile_size: u32, url: String) -> Self {
        Self {
            id,
            extent,
            tile_size,
            url,
            states: Mutex::new(StateSet {
                render: RenderState::New,
                context: ContextState::Okay,
                screen: ScreenState::OffScreen,
                validated: ValidatedState::Validated,
            }),
            image: Mutex::new(None),
            loader: Mutex::new(Arc::new(HttpImageLoader::new())),
            listener: Mutex::new(None),
        }
    }

    pub fn identifier(&self) -> &TileIdentifier {
        &self.id
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// The fully resolved URL this tile's image is fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn render_state(&self) -> RenderState {
        self.states.lock().unwrap().render
    }

    pub fn context_state(&self) -> ContextState {
        self.states.lock().unwrap().context
    }

    pub fn screen_state(&self) -> ScreenState {
        self.states.lock().unwrap().screen
    }

    pub fn validated_state(&self) -> ValidatedState {
        self.states.lock().unwrap().validated
    }

    fn listener(&self) -> Option<Arc<dyn TileStateChangedListener>> {
        self.listener.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn set_render_state(&self, state: RenderState) {
        if let Ok(mut states) = self.states.lock() {
            states.render = state;
        }
        if let Some(listener) = self.listener() {
            listener.render_state_changed(self);
        }
    }

    pub fn set_context_state(&self, state: ContextState) {
        if let Ok(mut states) = self.states.lock() {
            states.context = state;
        }
        if let Some(listener) = self.listener() {
            listener.context_state_changed(self);
        }
    }

    pub fn set_screen_state(&self, state: ScreenState) {
        if let Ok(mut states) = self.states.lock() {
            states.screen = state;
        }
        if let Some(listener) = self.listener() {
            listener.screen_state_changed(self);
        }
    }

    pub fn set_validated_state(&self, state: ValidatedState) {
        if let Ok(mut states) = self.states.lock() {
            states.validated = state;
        }
        if let Some(listener) = self.listener() {
            listener.validation_state_changed(self);
        }
    }

    /// Register the single state-change listener, replacing any previous one.
    pub fn set_state_listener(&self, listener: Arc<dyn TileStateChangedListener>) {
        if let Ok(mut slot) = self.listener.lock() {
            *slot = Some(listener);
        }
    }

    pub fn clear_state_listener(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            *slot = None;
        }
    }

    /// Replace the loader used by [`buffered_image`](Self::buffered_image).
    pub fn set_image_loader(&self, loader: Arc<dyn ImageLoader>) {
        if let Ok(mut slot) = self.loader.lock() {
            *slot = loader;
        }
    }

    /// Marks the tile as left the viewport. No resources are released here;
    /// the cache keeps the tile reclaimable.
    pub fn dispose(&self) {
        self.set_screen_state(ScreenState::OffScreen);
    }

    /// The tile's pixel image, loading it on first access.
    ///
    /// Never fails: a load error is logged, flips the render state to
    /// [`RenderState::Invalid`] and yields a placeholder of the tile's pixel
    /// size. A cached image is only ever present while the tile is
    /// [`RenderState::Rendered`] and the most recent load succeeded.
    pub fn buffered_image(&self) -> Arc<RgbaImage> {
        if self.render_state() == RenderState::Rendered {
            if let Some(image) = self.image.lock().ok().and_then(|slot| slot.clone()) {
                return image;
            }
        }

        let loader = self.loader.lock().unwrap().clone();
        match loader.load_tile_image(self) {
            Ok(image) => {
                let image = Arc::new(image);
                if let Ok(mut slot) = self.image.lock() {
                    *slot = Some(image.clone());
                }
                self.set_render_state(RenderState::Rendered);
                image
            }
            Err(e) => {
                log::error!("tile {}: image load failed: {}", self.id.id(), e);
                if let Ok(mut slot) = self.image.lock() {
                    *slot = None;
                }
                self.set_render_state(RenderState::Invalid);
                Arc::new(placeholder_image(self.tile_size))
            }
        }
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id.id())
            .field("url", &self.url)
            .field("extent", &self.extent)
            .field("render", &self.render_state())
            .finish()
    }
}
