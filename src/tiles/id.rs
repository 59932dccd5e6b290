use crate::{core::geo::arithmetic_mod, Result, TileError};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Descriptor for one level of a tile pyramid.
///
/// Produced by a [`TileFactory`](crate::tiles::factory::TileFactory) when
/// resolving an integer zoom against a service's scale list. The
/// `max_tile_number` ceiling bounds grid walks over the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoomLevel {
    level: u8,
    max_tile_number: u64,
}

impl ZoomLevel {
    pub fn new(level: u8, max_tile_number: u64) -> Self {
        Self {
            level,
            max_tile_number,
        }
    }

    /// The integer zoom level, 0 being the coarsest
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Total number of tiles at this level
    pub fn max_tile_number(&self) -> u64 {
        self.max_tile_number
    }

    /// Number of tile columns (and rows) at this level
    pub fn tiles_per_axis(&self) -> u64 {
        1u64 << u32::from(self.level.min(63))
    }
}

/// Addressing scheme used by a tile service family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileAddressing {
    /// OSM-style `z/x/y` path segments
    XyzPath,
    /// Interleaved quadrant digits, one per zoom level
    QuadKey,
}

/// Immutable address of a single tile within a service's pyramid.
///
/// Column 0 sits at the service's western edge, row 0 at its northern edge.
/// Neighbor navigation wraps through [`arithmetic_mod`] so a walk can cross
/// the antimeridian without ever producing a negative column.
#[derive(Debug, Clone)]
pub struct TileIdentifier {
    x: u32,
    y: u32,
    zoom: ZoomLevel,
    service_name: String,
    addressing: TileAddressing,
}

impl TileIdentifier {
    pub fn new(
        x: u32,
        y: u32,
        zoom: ZoomLevel,
        service_name: impl Into<String>,
        addressing: TileAddressing,
    ) -> Result<Self> {
        let service_name = service_name.into();
        if service_name.trim().is_empty() {
            return Err(TileError::InvalidArgument(
                "tile identifier needs a non-empty service name".to_string(),
            ));
        }

        Ok(Self {
            x,
            y,
            zoom,
            service_name,
            addressing,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn zoom(&self) -> &ZoomLevel {
        &self.zoom
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn addressing(&self) -> TileAddressing {
        self.addressing
    }

    /// File-safe identifier, globally unique per service, zoom, column and
    /// row. Used as the cache key.
    pub fn id(&self) -> String {
        let service = self
            .service_name
            .replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        format!("{}_{}_{}_{}", service, self.zoom.level(), self.x, self.y)
    }

    /// Service-specific address encoding. Not guaranteed file-safe.
    pub fn code(&self) -> String {
        match self.addressing {
            TileAddressing::XyzPath => format!("{}/{}/{}", self.zoom.level(), self.x, self.y),
            TileAddressing::QuadKey => self.quad_key(),
        }
    }

    /// The identifier one column to the right, wrapping at the eastern edge.
    pub fn right_neighbor(&self) -> TileIdentifier {
        let axis = self.zoom.tiles_per_axis() as i64;
        TileIdentifier {
            x: arithmetic_mod(i64::from(self.x) + 1, axis) as u32,
            y: self.y,
            zoom: self.zoom,
            service_name: self.service_name.clone(),
            addressing: self.addressing,
        }
    }

    /// The identifier one row down, wrapping at the southern edge.
    pub fn lower_neighbor(&self) -> TileIdentifier {
        let axis = self.zoom.tiles_per_axis() as i64;
        TileIdentifier {
            x: self.x,
            y: arithmetic_mod(i64::from(self.y) + 1, axis) as u32,
            zoom: self.zoom,
            service_name: self.service_name.clone(),
            addressing: self.addressing,
        }
    }

    fn quad_key(&self) -> String {
        let mut key = String::with_capacity(usize::from(self.zoom.level()));
        for i in (1..=self.zoom.level()).rev() {
            let mask = 1u32 << (i - 1);
            let mut digit = 0u8;
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            key.push(char::from(b'0' + digit));
        }
        key
    }
}

// Identifier equality follows id(): the addressing scheme never contributes.
impl PartialEq for TileIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.zoom.level() == other.zoom.level()
            && self.service_name == other.service_name
    }
}

impl Eq for TileIdentifier {}

impl Hash for TileIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
        self.zoom.level().hash(state);
        self.service_name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn zoom(level: u8) -> ZoomLevel {
        ZoomLevel::new(level, 1u64 << (2 * u32::from(level)))
    }

    fn hash_of(id: &TileIdentifier) -> u64 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_rejects_empty_service_name() {
        assert!(TileIdentifier::new(0, 0, zoom(1), "", TileAddressing::XyzPath).is_err());
        assert!(TileIdentifier::new(0, 0, zoom(1), "  ", TileAddressing::XyzPath).is_err());
    }

    #[test]
    fn test_equal_tuples_share_id_and_hash() {
        let a = TileIdentifier::new(3, 5, zoom(4), "osm", TileAddressing::XyzPath).unwrap();
        let b = TileIdentifier::new(3, 5, zoom(4), "osm", TileAddressing::QuadKey).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_id_is_file_safe() {
        let id = TileIdentifier::new(1, 2, zoom(3), "my tiles/v2", TileAddressing::XyzPath)
            .unwrap()
            .id();
        assert!(!id.contains('/'));
        assert!(!id.contains(' '));
    }

    #[test]
    fn test_xyz_code() {
        let id = TileIdentifier::new(7, 2, zoom(4), "osm", TileAddressing::XyzPath).unwrap();
        assert_eq!(id.code(), "4/7/2");
    }

    #[test]
    fn test_quad_key_code() {
        // Bing's documented example: tile (3, 5) at level 3 is "213"
        let id = TileIdentifier::new(3, 5, zoom(3), "bing", TileAddressing::QuadKey).unwrap();
        assert_eq!(id.code(), "213");

        let root = TileIdentifier::new(0, 0, zoom(0), "bing", TileAddressing::QuadKey).unwrap();
        assert_eq!(root.code(), "");
    }

    #[test]
    fn test_right_neighbor_wraps_at_antimeridian() {
        let id = TileIdentifier::new(7, 3, zoom(3), "osm", TileAddressing::XyzPath).unwrap();
        let right = id.right_neighbor();

        assert_eq!(right.x(), 0);
        assert_eq!(right.y(), 3);
        assert_eq!(right.zoom().level(), 3);
        assert_eq!(right.service_name(), "osm");
    }

    #[test]
    fn test_lower_neighbor_wraps_at_southern_edge() {
        let id = TileIdentifier::new(2, 7, zoom(3), "osm", TileAddressing::XyzPath).unwrap();
        let lower = id.lower_neighbor();

        assert_eq!(lower.x(), 2);
        assert_eq!(lower.y(), 0);
    }
}
