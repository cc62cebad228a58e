//! 3x3 composite assembly from provider image payloads.
//!
//! The provider answers with nine base64 payloads, row-major. Tiles 0-2
//! form the top row, 3-5 the middle, 6-8 the bottom. Adjoining tiles are
//! placed with a fixed 7-pixel overlap, first left-to-right within each
//! row, then top-to-bottom across rows, and the result is JPEG-encoded.
//! The whole pass is a pure function of its input.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops;
use thiserror::Error;

/// Number of tiles the provider returns per generation.
pub const GRID_TILES: usize = 9;
/// Tiles per row in the composite.
pub const ROW_TILES: usize = 3;
/// Overlap between adjoining tiles, in pixels. Applied in both passes.
const MERGE_OVERLAP: u32 = 7;
/// JPEG quality of the final composite.
const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("expected {GRID_TILES} images, got {0}")]
    NotEnoughImages(usize),
    #[error("image {index} is not valid base64: {source}")]
    Base64 {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("image {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode composite: {0}")]
    Encode(#[source] image::ImageError),
}

/// Assemble the nine payloads into one JPEG buffer.
///
/// Short input is rejected up front; a grid that silently dropped tiles is
/// worse than no grid. Extra entries beyond nine are ignored.
pub fn compose(images: &[String]) -> Result<Vec<u8>, ComposeError> {
    if images.len() < GRID_TILES {
        return Err(ComposeError::NotEnoughImages(images.len()));
    }

    let mut tiles = Vec::with_capacity(GRID_TILES);
    for (index, payload) in images.iter().take(GRID_TILES).enumerate() {
        tiles.push(decode_tile(index, payload)?);
    }

    let rows: Vec<RgbImage> = tiles.chunks(ROW_TILES).map(merge_row).collect();
    let composite = merge_rows(&rows);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&composite)
        .map_err(ComposeError::Encode)?;
    Ok(out)
}

/// Base64-decode one payload and decode the image bytes. Providers wrap
/// payloads with embedded newlines; those are stripped first.
fn decode_tile(index: usize, payload: &str) -> Result<RgbImage, ComposeError> {
    let cleaned: String = payload
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();
    let bytes = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|source| ComposeError::Base64 { index, source })?;
    let tile = image::load_from_memory(&bytes)
        .map_err(|source| ComposeError::Decode { index, source })?;
    Ok(tile.to_rgb8())
}

/// Placement offsets for a run of tile extents: each tile starts at the
/// previous tile's far edge pulled back by the overlap. Tiles narrower
/// than the overlap produce negative positions and clip at the canvas
/// edge.
fn overlap_positions(extents: &[u32]) -> Vec<i64> {
    let mut positions = Vec::with_capacity(extents.len());
    let mut next = 0i64;
    for (i, extent) in extents.iter().enumerate() {
        if i > 0 {
            next -= i64::from(MERGE_OVERLAP);
        }
        positions.push(next);
        next += i64::from(*extent);
    }
    positions
}

fn span(positions: &[i64], extents: &[u32]) -> u32 {
    positions
        .iter()
        .zip(extents)
        .map(|(pos, extent)| pos + i64::from(*extent))
        .max()
        .unwrap_or(1)
        .max(1) as u32
}

/// Merge three tiles left-to-right. Later tiles paint over earlier ones.
fn merge_row(tiles: &[RgbImage]) -> RgbImage {
    let widths: Vec<u32> = tiles.iter().map(RgbImage::width).collect();
    let xs = overlap_positions(&widths);
    let width = span(&xs, &widths);
    let height = tiles.iter().map(RgbImage::height).max().unwrap_or(1);

    let mut canvas = RgbImage::new(width, height);
    for (tile, x) in tiles.iter().zip(xs) {
        imageops::replace(&mut canvas, tile, x, 0);
    }
    canvas
}

/// Merge the row canvases top-to-bottom with the same overlap.
fn merge_rows(rows: &[RgbImage]) -> RgbImage {
    let heights: Vec<u32> = rows.iter().map(RgbImage::height).collect();
    let ys = overlap_positions(&heights);
    let height = span(&ys, &heights);
    let width = rows.iter().map(RgbImage::width).max().unwrap_or(1);

    let mut canvas = RgbImage::new(width, height);
    for (row, y) in rows.iter().zip(ys) {
        imageops::replace(&mut canvas, row, 0, y);
    }
    canvas
}
