use crate::{
    core::{
        geo::GeoExtent,
        transform::{ExtentTransform, IdentityTransform},
    },
    prelude::{Arc, HashSet, Mutex},
    tiles::{cache::TileCache, factory::TileFactory, tile::Tile},
    Result, TileError,
};
use serde::{Deserialize, Serialize};

/// Configuration for a tile service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileServiceOptions {
    /// Service name, also the namespace of tile ids
    pub name: String,
    /// Base URL tiles addresses are resolved against
    pub base_url: String,
    /// Geographic bounds the service declares coverage for
    pub bounds: GeoExtent,
    /// Scale denominator per zoom level; `None` marks an unsupported gap
    pub scales: Vec<Option<f64>>,
    /// Coordinate reference system of the service
    pub reference_system: String,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Number of tiles retained by the service cache
    pub cache_capacity: usize,
}

impl Default for TileServiceOptions {
    fn default() -> Self {
        Self {
            name: "osm".to_string(),
            base_url: "https://tile.openstreetmap.org".to_string(),
            bounds: GeoExtent::world(),
            scales: (0..=18)
                .map(|z| Some(559_082_264.0 / f64::from(1u32 << z)))
                .collect(),
            reference_system: "EPSG:4326".to_string(),
            tile_size: 256,
            cache_capacity: 2048,
        }
    }
}

/// One tiled map service: declared bounds, scale list, tile cache and the
/// viewport decomposition algorithm.
///
/// The grid math itself lives behind the service's [`TileFactory`]; the
/// service clamps extents, resolves scales to zoom levels and walks the grid.
pub struct TileService {
    options: TileServiceOptions,
    factory: Box<dyn TileFactory>,
    transform: Box<dyn ExtentTransform>,
    cache: TileCache,
    last_zoom: Mutex<Option<u8>>,
}

impl TileService {
    pub fn new(options: TileServiceOptions, factory: Box<dyn TileFactory>) -> Result<Self> {
        if options.name.trim().is_empty() {
            return Err(TileError::InvalidArgument(
                "tile service needs a non-empty name".to_string(),
            ));
        }
        if options.base_url.trim().is_empty() {
            return Err(TileError::InvalidArgument(
                "tile service needs a base URL".to_string(),
            ));
        }
        if !options.bounds.is_valid()
            || options.bounds.width() <= 0.0
            || options.bounds.height() <= 0.0
        {
            return Err(TileError::InvalidArgument(
                "tile service bounds must span a non-empty area".to_string(),
            ));
        }
        if !options.scales.iter().any(|scale| scale.is_some()) {
            return Err(TileError::InvalidArgument(
                "tile service scale list has no supported entries".to_string(),
            ));
        }

        let cache = TileCache::new(options.cache_capacity);
        Ok(Self {
            options,
            factory,
            transform: Box::new(IdentityTransform),
            cache,
            last_zoom: Mutex::new(None),
        })
    }

    /// Replace the extent transform used to bring requested viewports into
    /// this service's reference system.
    pub fn with_transform(mut self, transform: Box<dyn ExtentTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn base_url(&self) -> &str {
        &self.options.base_url
    }

    pub fn bounds(&self) -> GeoExtent {
        self.options.bounds
    }

    pub fn scales(&self) -> &[Option<f64>] {
        &self.options.scales
    }

    pub fn reference_system(&self) -> &str {
        &self.options.reference_system
    }

    pub fn tile_size(&self) -> u32 {
        self.options.tile_size
    }

    pub fn factory(&self) -> &dyn TileFactory {
        self.factory.as_ref()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Lowest zoom whose scale entry is supported. Some services have gaps in
    /// their zoom range.
    pub fn min_zoom_level(&self) -> Option<u8> {
        self.options
            .scales
            .iter()
            .position(|scale| scale.is_some())
            .map(|index| index as u8)
    }

    /// Highest zoom whose scale entry is supported
    pub fn max_zoom_level(&self) -> Option<u8> {
        self.options
            .scales
            .iter()
            .rposition(|scale| scale.is_some())
            .map(|index| index as u8)
    }

    fn scale_at(&self, zoom: u8) -> Option<f64> {
        self.options.scales.get(usize::from(zoom)).copied().flatten()
    }

    /// Derive a zoom level from a 0..=100 scale factor: 0 favors the coarsest
    /// supported level, 100 the finest. The target scale is bracketed by the
    /// two adjacent supported levels around it and the position inside that
    /// bracket is interpolated linearly.
    fn recommended_zoom(&self, scale_factor: f64) -> u8 {
        let (min_zoom, max_zoom) = match (self.min_zoom_level(), self.max_zoom_level()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return 0,
        };
        if max_zoom == 0 {
            return 0;
        }

        let fraction = scale_factor.clamp(0.0, 100.0) / 100.0;
        let coarse = self.scale_at(min_zoom).unwrap_or(f64::MAX);
        let fine = self.scale_at(max_zoom).unwrap_or(0.0);
        let target = coarse + (fine - coarse) * fraction;

        let supported: Vec<u8> = (min_zoom..=max_zoom)
            .filter(|zoom| self.scale_at(*zoom).is_some())
            .collect();
        let mut bracket = (min_zoom, max_zoom);
        for pair in supported.windows(2) {
            let lo_scale = self.scale_at(pair[0]).unwrap_or(f64::MAX);
            let hi_scale = self.scale_at(pair[1]).unwrap_or(0.0);
            if lo_scale >= target && target >= hi_scale {
                bracket = (pair[0], pair[1]);
                break;
            }
        }

        let (lower, upper) = bracket;
        let lower_scale = self.scale_at(lower).unwrap_or(f64::MAX);
        let upper_scale = self.scale_at(upper).unwrap_or(0.0);
        let span = lower_scale - upper_scale;
        let t = if span.abs() < f64::EPSILON {
            0.0
        } else {
            ((lower_scale - target) / span).clamp(0.0, 1.0)
        };

        (f64::from(lower) + t * f64::from(upper - lower)).round() as u8
    }

    /// Resolve the zoom to decompose at, remembering it across calls. When
    /// the caller opts out of the recommendation, the previously resolved
    /// zoom is reused as long as it still lies inside the valid range.
    fn resolve_zoom(&self, scale_factor: f64, use_recommended_zoom: bool) -> u8 {
        let remembered = if use_recommended_zoom {
            None
        } else {
            self.last_zoom.lock().ok().and_then(|slot| *slot)
        };

        let in_range = |zoom: u8| {
            self.min_zoom_level().map_or(false, |lo| zoom >= lo)
                && self.max_zoom_level().map_or(false, |hi| zoom <= hi)
        };

        let zoom = match remembered {
            Some(zoom) if in_range(zoom) => zoom,
            _ => self.recommended_zoom(scale_factor),
        };

        if let Ok(mut slot) = self.last_zoom.lock() {
            *slot = Some(zoom);
        }
        zoom
    }

    /// Cover `extent` with the minimal set of tiles of this service.
    ///
    /// The requested extent is reprojected into the service's reference
    /// system, clipped against the declared bounds (shrinking only) and then
    /// covered by walking the tile grid row by row from the upper-left
    /// corner. Discovered tiles are interned in the service cache before
    /// entering the result, so an id resolves to the same live instance
    /// across overlapping calls.
    ///
    /// The result carries no ordering and no duplicates. It is empty when the
    /// extent misses the service bounds entirely, or when covering it would
    /// take more than `max_tiles` tiles.
    pub fn find_tiles_in_extent(
        &self,
        extent: &GeoExtent,
        scale_factor: f64,
        use_recommended_zoom: bool,
        max_tiles: usize,
    ) -> Result<HashSet<Arc<Tile>>> {
        let requested = self
            .transform
            .transform_extent(extent, &self.options.reference_system)
            .map_err(|e| TileError::Transform(e.to_string()))?;

        let clipped = match requested.intersection(&self.options.bounds) {
            Some(clipped) => clipped,
            None => {
                log::debug!(
                    "requested extent misses the declared bounds of {}",
                    self.options.name
                );
                return Ok(HashSet::default());
            }
        };

        let resolved = self.resolve_zoom(scale_factor, use_recommended_zoom);
        // TODO: work out why the walk has to run one level below the
        // resolved zoom; behavior carried over as observed.
        let walk_zoom = resolved.saturating_sub(1);
        let zoom_level = self.factory.zoom_level(walk_zoom, self)?;

        let budget = max_tiles as u64;
        let give_up = || {
            log::warn!(
                "covering the extent on {} takes more than {} tiles, giving up",
                self.options.name,
                max_tiles
            );
            Ok(HashSet::default())
        };

        let mut result: HashSet<Arc<Tile>> = HashSet::default();
        let start =
            self.factory
                .find_tile_at_coordinate(clipped.min_x, clipped.max_y, &zoom_level, self)?;
        let start = self.cache.intern(start);

        let mut count: u64 = 1;
        if count > budget {
            return give_up();
        }
        result.insert(start.clone());

        // Neighbor-equality wraparound is the intended termination, but it is
        // unproven for irregular pyramids; the per-axis loop bounds keep a
        // degenerate grid from walking forever.
        let axis_cap = zoom_level.tiles_per_axis();
        let first = start.clone();
        let mut row_first = start;

        for _ in 0..axis_cap {
            let mut current = row_first.clone();
            for _ in 1..axis_cap {
                let candidate = self.factory.find_right_neighbor(&current, self)?;
                if !candidate.extent().intersects(&clipped) {
                    break;
                }
                if candidate == *row_first {
                    break;
                }
                count += 1;
                if count > budget {
                    return give_up();
                }
                let candidate = self.cache.intern(candidate);
                result.insert(candidate.clone());
                current = candidate;
            }

            if count >= zoom_level.max_tile_number() {
                break;
            }

            let candidate = self.factory.find_lower_neighbor(&row_first, self)?;
            if !candidate.extent().intersects(&clipped) {
                break;
            }
            if candidate == *first {
                break;
            }
            count += 1;
            if count > budget {
                return give_up();
            }
            let candidate = self.cache.intern(candidate);
            result.insert(candidate.clone());
            row_first = candidate;
        }

        log::debug!(
            "covered extent on {} with {} tiles at zoom {}",
            self.options.name,
            result.len(),
            walk_zoom
        );
        Ok(result)
    }
}
