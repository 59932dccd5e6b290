use crate::{core::geo::GeoExtent, Result};

/// Trait for reprojecting extents between coordinate reference systems.
///
/// A tile service declares its bounds in its own reference system; requested
/// viewports arrive in arbitrary ones. Implementations bridge the two. A
/// failed transform is fatal for the requesting call and is not retried.
pub trait ExtentTransform: Send + Sync {
    /// Reproject `extent` into the reference system named by `target_crs`.
    fn transform_extent(&self, extent: &GeoExtent, target_crs: &str) -> Result<GeoExtent>;
}

/// Pass-through transform for callers already working in the service's
/// reference system.
#[derive(Debug, Default)]
pub struct IdentityTransform;

impl ExtentTransform for IdentityTransform {
    fn transform_extent(&self, extent: &GeoExtent, _target_crs: &str) -> Result<GeoExtent> {
        Ok(*extent)
    }
}
