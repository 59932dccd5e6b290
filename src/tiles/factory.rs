use crate::{
    core::geo::{normalize_degree_value, GeoExtent},
    tiles::{
        id::{TileAddressing, TileIdentifier, ZoomLevel},
        service::TileService,
        tile::Tile,
    },
    Result, TileError,
};

/// Grid algorithm of a tile service family.
///
/// Implemented once per addressing family (OSM-style z/x/y, quad-key, ...).
/// Factories are the only producers of [`Tile`]s and [`ZoomLevel`]s; the
/// service layer stays ignorant of any concrete grid math.
pub trait TileFactory: Send + Sync {
    /// The tile covering the given coordinate at the given level.
    fn find_tile_at_coordinate(
        &self,
        lon: f64,
        lat: f64,
        zoom: &ZoomLevel,
        service: &TileService,
    ) -> Result<Tile>;

    /// Resolve an integer zoom into a level descriptor, bounds-checked
    /// against the service's scale list.
    fn zoom_level(&self, zoom: u8, service: &TileService) -> Result<ZoomLevel>;

    /// The tile one column to the right of `tile`, same zoom.
    fn find_right_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile>;

    /// The tile one row below `tile`, same zoom.
    fn find_lower_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile>;
}

fn grid_zoom_level(zoom: u8, service: &TileService) -> Result<ZoomLevel> {
    let scale_count = service.scales().len();
    if usize::from(zoom) >= scale_count {
        return Err(TileError::InvalidArgument(format!(
            "zoom {} is outside the {} scale list (0..{})",
            zoom,
            service.name(),
            scale_count
        )));
    }
    Ok(ZoomLevel::new(zoom, 1u64 << (2 * u32::from(zoom.min(31)))))
}

/// Locate the grid cell covering a coordinate, clamping into the service
/// bounds. Whole-degree wrapping handles coordinates from callers that walked
/// past the antimeridian or a pole.
fn locate_cell(lon: f64, lat: f64, zoom: &ZoomLevel, service: &TileService) -> (u32, u32) {
    let bounds = service.bounds();

    let lon = if !(-180.0..=180.0).contains(&lon) {
        f64::from(normalize_degree_value(lon as i32, 180))
    } else {
        lon
    };
    let lat = if !(-90.0..=90.0).contains(&lat) {
        f64::from(normalize_degree_value(lat as i32, 90))
    } else {
        lat
    };

    let lon = lon.clamp(bounds.min_x, bounds.max_x);
    let lat = lat.clamp(bounds.min_y, bounds.max_y);

    let axis = zoom.tiles_per_axis() as f64;
    let last = (zoom.tiles_per_axis() - 1) as f64;
    let col = ((lon - bounds.min_x) / bounds.width() * axis).floor();
    let row = ((bounds.max_y - lat) / bounds.height() * axis).floor();

    (col.clamp(0.0, last) as u32, row.clamp(0.0, last) as u32)
}

/// Geographic extent of a grid cell, row 0 at the service's northern edge.
fn cell_extent(id: &TileIdentifier, service: &TileService) -> GeoExtent {
    let bounds = service.bounds();
    let axis = id.zoom().tiles_per_axis() as f64;
    let tile_width = bounds.width() / axis;
    let tile_height = bounds.height() / axis;

    let min_x = bounds.min_x + f64::from(id.x()) * tile_width;
    let max_y = bounds.max_y - f64::from(id.y()) * tile_height;

    GeoExtent::new(min_x, max_y - tile_height, min_x + tile_width, max_y)
}

/// Factory for OSM-style services addressed by `z/x/y` path segments.
#[derive(Debug, Default)]
pub struct XyzTileFactory;

impl XyzTileFactory {
    pub fn new() -> Self {
        Self
    }

    fn build_tile(&self, id: TileIdentifier, service: &TileService) -> Tile {
        let extent = cell_extent(&id, service);
        let url = format!(
            "{}/{}.png",
            service.base_url().trim_end_matches('/'),
            id.code()
        );
        Tile::new(id, extent, service.tile_size(), url)
    }
}

impl TileFactory for XyzTileFactory {
    fn find_tile_at_coordinate(
        &self,
        lon: f64,
        lat: f64,
        zoom: &ZoomLevel,
        service: &TileService,
    ) -> Result<Tile> {
        let (col, row) = locate_cell(lon, lat, zoom, service);
        let id =
            TileIdentifier::new(col, row, *zoom, service.name(), TileAddressing::XyzPath)?;
        Ok(self.build_tile(id, service))
    }

    fn zoom_level(&self, zoom: u8, service: &TileService) -> Result<ZoomLevel> {
        grid_zoom_level(zoom, service)
    }

    fn find_right_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile> {
        Ok(self.build_tile(tile.identifier().right_neighbor(), service))
    }

    fn find_lower_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile> {
        Ok(self.build_tile(tile.identifier().lower_neighbor(), service))
    }
}

/// Factory for quad-key addressed services (Bing-style). Shares the z/x/y
/// grid math; only the address encoding and URL shape differ. The base URL is
/// treated as a prefix the quad-key is appended to.
#[derive(Debug, Default)]
pub struct QuadKeyTileFactory;

impl QuadKeyTileFactory {
    pub fn new() -> Self {
        Self
    }

    fn build_tile(&self, id: TileIdentifier, service: &TileService) -> Tile {
        let extent = cell_extent(&id, service);
        let url = format!("{}{}.jpeg", service.base_url(), id.code());
        Tile::new(id, extent, service.tile_size(), url)
    }
}

impl TileFactory for QuadKeyTileFactory {
    fn find_tile_at_coordinate(
        &self,
        lon: f64,
        lat: f64,
        zoom: &ZoomLevel,
        service: &TileService,
    ) -> Result<Tile> {
        let (col, row) = locate_cell(lon, lat, zoom, service);
        let id =
            TileIdentifier::new(col, row, *zoom, service.name(), TileAddressing::QuadKey)?;
        Ok(self.build_tile(id, service))
    }

    fn zoom_level(&self, zoom: u8, service: &TileService) -> Result<ZoomLevel> {
        grid_zoom_level(zoom, service)
    }

    fn find_right_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile> {
        Ok(self.build_tile(tile.identifier().right_neighbor(), service))
    }

    fn find_lower_neighbor(&self, tile: &Tile, service: &TileService) -> Result<Tile> {
        Ok(self.build_tile(tile.identifier().lower_neighbor(), service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::service::TileServiceOptions;

    fn world_service() -> TileService {
        let options = TileServiceOptions {
            name: "osm".to_string(),
            base_url: "https://tiles.test".to_string(),
            ..TileServiceOptions::default()
        };
        TileService::new(options, Box::new(XyzTileFactory::new())).unwrap()
    }

    #[test]
    fn test_find_tile_at_coordinate_world_grid() {
        let service = world_service();
        let zoom = service.factory().zoom_level(1, &service).unwrap();

        // zoom 1 splits the world into a 2x2 grid
        let tile = service
            .factory()
            .find_tile_at_coordinate(-170.0, 80.0, &zoom, &service)
            .unwrap();
        assert_eq!(tile.identifier().x(), 0);
        assert_eq!(tile.identifier().y(), 0);
        assert_eq!(*tile.extent(), GeoExtent::new(-180.0, 0.0, 0.0, 90.0));

        let tile = service
            .factory()
            .find_tile_at_coordinate(10.0, -10.0, &zoom, &service)
            .unwrap();
        assert_eq!(tile.identifier().x(), 1);
        assert_eq!(tile.identifier().y(), 1);
    }

    #[test]
    fn test_find_tile_accepts_wrapped_longitude() {
        let service = world_service();
        let zoom = service.factory().zoom_level(2, &service).unwrap();

        let direct = service
            .factory()
            .find_tile_at_coordinate(150.0, 0.0, &zoom, &service)
            .unwrap();
        let wrapped = service
            .factory()
            .find_tile_at_coordinate(-210.0, 0.0, &zoom, &service)
            .unwrap();

        assert_eq!(direct.identifier().x(), wrapped.identifier().x());
    }

    #[test]
    fn test_xyz_url_shape() {
        let service = world_service();
        let zoom = service.factory().zoom_level(3, &service).unwrap();

        let tile = service
            .factory()
            .find_tile_at_coordinate(0.0, 0.0, &zoom, &service)
            .unwrap();
        assert_eq!(
            tile.url(),
            format!(
                "https://tiles.test/3/{}/{}.png",
                tile.identifier().x(),
                tile.identifier().y()
            )
        );
    }

    #[test]
    fn test_neighbors_keep_zoom_and_abut_extents() {
        let service = world_service();
        let zoom = service.factory().zoom_level(2, &service).unwrap();

        let tile = service
            .factory()
            .find_tile_at_coordinate(-170.0, 80.0, &zoom, &service)
            .unwrap();
        let right = service.factory().find_right_neighbor(&tile, &service).unwrap();
        let lower = service.factory().find_lower_neighbor(&tile, &service).unwrap();

        assert_eq!(right.identifier().zoom().level(), 2);
        assert_eq!(right.extent().min_x, tile.extent().max_x);
        assert_eq!(lower.extent().max_y, tile.extent().min_y);
    }

    #[test]
    fn test_zoom_level_bounds_check() {
        let service = world_service();
        assert!(service.factory().zoom_level(18, &service).is_ok());
        assert!(service.factory().zoom_level(19, &service).is_err());
    }

    #[test]
    fn test_zoom_level_tile_ceiling() {
        let service = world_service();
        let zoom = service.factory().zoom_level(3, &service).unwrap();

        assert_eq!(zoom.tiles_per_axis(), 8);
        assert_eq!(zoom.max_tile_number(), 64);
    }

    #[test]
    fn test_quad_key_url_shape() {
        let options = TileServiceOptions {
            name: "bing".to_string(),
            base_url: "https://ecn.t0.tiles.test/tiles/a".to_string(),
            ..TileServiceOptions::default()
        };
        let service = TileService::new(options, Box::new(QuadKeyTileFactory::new())).unwrap();
        let zoom = service.factory().zoom_level(3, &service).unwrap();

        let tile = service
            .factory()
            .find_tile_at_coordinate(100.0, -40.0, &zoom, &service)
            .unwrap();
        assert!(tile.url().starts_with("https://ecn.t0.tiles.test/tiles/a"));
        assert!(tile.url().ends_with(".jpeg"));
        assert_eq!(tile.identifier().code().len(), 3);
    }
}
