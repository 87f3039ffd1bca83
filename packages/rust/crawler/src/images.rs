//! Image resolution: fetch, decode and normalize images to embeddable PNG.

use std::collections::HashMap;
use std::io::Cursor;

use image::{GenericImageView, ImageOutputFormat};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;
use webdoc_shared::{ImageAsset, ImageRef, Result, WebdocError};

use crate::fetcher::Fetcher;
use crate::scope::normalize;

/// Width SVGs are rasterized to; height follows the aspect ratio.
pub const SVG_TARGET_WIDTH: u32 = 800;

/// Largest raster an SVG may produce, in pixels (800 x 10000).
pub const MAX_SVG_PIXELS: u64 = 8_000_000;

/// Length of the hex asset id taken from the SHA-256 digest.
const ASSET_ID_LEN: usize = 16;

/// Fetches images through the crawl's [`Fetcher`] and caches outcomes per
/// normalized URL for the whole run.
pub struct ImageResolver {
    fetcher: Fetcher,
    cache: Mutex<HashMap<String, Option<ImageAsset>>>,
}

impl ImageResolver {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve an image referenced from `page_url` into a PNG asset.
    ///
    /// Errors mean the image block should be dropped; they never concern
    /// the owning page.
    #[instrument(skip_all, fields(src = %image.src))]
    pub async fn resolve(&self, image: &ImageRef, page_url: &Url) -> Result<ImageAsset> {
        if image.src.starts_with("data:") {
            return Err(WebdocError::image(truncate(&image.src), "inline data URI skipped"));
        }

        let url = page_url
            .join(&image.src)
            .map_err(|e| WebdocError::image(&image.src, format!("invalid URL: {e}")))?;
        let key = normalize(&url).to_string();

        if let Some(cached) = self.cache.lock().await.get(&key) {
            return cached
                .clone()
                .ok_or_else(|| WebdocError::image(&key, "previously failed"));
        }

        let outcome = self.fetch_and_convert(&url).await;
        self.cache
            .lock()
            .await
            .insert(key, outcome.as_ref().ok().cloned());
        outcome
    }

    async fn fetch_and_convert(&self, url: &Url) -> Result<ImageAsset> {
        let response = self
            .fetcher
            .fetch_bytes(url)
            .await
            .map_err(|e| WebdocError::image(url.as_str(), e.to_string()))?;

        let (png, width, height) = if is_svg(&response.content_type, url, &response.bytes) {
            rasterize_svg(&response.bytes, SVG_TARGET_WIDTH)
        } else {
            to_png(&response.bytes)
        }
        .map_err(|message| WebdocError::image(url.as_str(), message))?;

        debug!(%url, width, height, bytes = png.len(), "image resolved");

        Ok(ImageAsset {
            id: asset_id(&png),
            source_url: url.to_string(),
            bytes: png,
            mime_type: "image/png".to_string(),
            width,
            height,
        })
    }
}

/// Content-hash asset id (SHA-256 hex prefix).
pub fn asset_id(bytes: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    digest[..ASSET_ID_LEN].to_string()
}

fn is_svg(content_type: &str, url: &Url, bytes: &[u8]) -> bool {
    if content_type.contains("svg") || url.path().to_ascii_lowercase().ends_with(".svg") {
        return true;
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Rasterize an SVG to PNG at `target_width`, preserving the aspect ratio.
pub fn rasterize_svg(data: &[u8], target_width: u32) -> std::result::Result<(Vec<u8>, u32, u32), String> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|e| format!("invalid SVG: {e}"))?;

    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err("SVG has no size".to_string());
    }

    let scale = target_width as f32 / size.width();
    let height = (f64::from(size.height()) * f64::from(scale)).round().max(1.0);
    if !height.is_finite() || u64::from(target_width) as f64 * height > MAX_SVG_PIXELS as f64 {
        return Err(format!("SVG raster {target_width}x{height} exceeds {MAX_SVG_PIXELS} pixels"));
    }
    let height = height as u32;

    let mut pixmap =
        Pixmap::new(target_width, height).ok_or_else(|| "cannot allocate pixmap".to_string())?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok((png, target_width, height))
}

/// Decode a raster image and re-encode it as PNG.
pub fn to_png(data: &[u8]) -> std::result::Result<(Vec<u8>, u32, u32), String> {
    let img = image::load_from_memory(data).map_err(|e| format!("unsupported image: {e}"))?;
    let (width, height) = img.dimensions();

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok((png, width, height))
}

fn truncate(src: &str) -> String {
    src.chars().take(48).collect()
}
