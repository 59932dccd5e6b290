use crate::{tiles::tile::Tile, Result, TileError};
use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use std::{thread, time::Duration};

/// Shared blocking HTTP client with a custom User-Agent so that public tile
/// servers (e.g. OpenStreetMap) don't reject the request. Building the client
/// once avoids the cost of TLS and connection pool setup for every tile.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("tilewalk/0.1 (+https://github.com/tilewalk/tilewalk)")
        .build()
        .expect("failed to build reqwest blocking client")
});

/// Trait representing anything that can produce a tile's pixel image.
pub trait ImageLoader: Send + Sync {
    /// Produce the image for `tile`. May fail with an I/O-kind error; the
    /// caller decides how to recover.
    fn load_tile_image(&self, tile: &Tile) -> Result<RgbaImage>;
}

/// Default loader that fetches a tile's resolved URL over HTTP and decodes
/// the response body.
pub struct HttpImageLoader {
    max_attempts: usize,
}

impl HttpImageLoader {
    pub fn new() -> Self {
        Self { max_attempts: 2 }
    }

    fn fetch(&self, url: &str) -> Result<RgbaImage> {
        let resp = HTTP_CLIENT.get(url).send()?;
        if !resp.status().is_success() {
            return Err(TileError::HttpStatus(resp.status().as_u16()));
        }
        let bytes = resp.bytes()?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

impl Default for HttpImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for HttpImageLoader {
    fn load_tile_image(&self, tile: &Tile) -> Result<RgbaImage> {
        let url = tile.url();
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            log::debug!("fetch tile {} attempt {}", tile.identifier().id(), attempt);
            match self.fetch(url) {
                Ok(image) => {
                    log::info!(
                        "downloaded tile {} ({}x{})",
                        tile.identifier().id(),
                        image.width(),
                        image.height()
                    );
                    return Ok(image);
                }
                Err(e) => {
                    log::warn!(
                        "tile {} download failed on attempt {}: {}",
                        tile.identifier().id(),
                        attempt,
                        e
                    );
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| TileError::InvalidArgument("no load attempts made".to_string())))
    }
}

/// A uniform stand-in image for tiles whose load failed.
pub fn placeholder_image(size: u32) -> RgbaImage {
    let size = size.max(1);
    RgbaImage::from_pixel(size, size, Rgba([224, 224, 224, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_dimensions() {
        let image = placeholder_image(256);
        assert_eq!(image.dimensions(), (256, 256));

        // degenerate size still produces a real image
        let image = placeholder_image(0);
        assert_eq!(image.dimensions(), (1, 1));
    }
}
