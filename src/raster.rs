//! Pixel-exact raster comparison and raster file I/O.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::Result;

/// Returns `true` when both rasters have the same dimensions and every pixel
/// is bit-identical.
///
/// Dimensions are checked first, then whole rows are compared as byte slices.
/// Bytes of the backing buffers beyond the last pixel are ignored.
pub fn rasters_equal(a: &RgbImage, b: &RgbImage) -> bool {
    if a.dimensions() != b.dimensions() {
        return false;
    }

    let row_len = a.width() as usize * 3;
    if row_len == 0 {
        return true;
    }
    let len = row_len * a.height() as usize;

    a.as_raw()[..len]
        .chunks_exact(row_len)
        .zip(b.as_raw()[..len].chunks_exact(row_len))
        .all(|(row_a, row_b)| row_a == row_b)
}

/// Load a reference image (PNG or JPEG) from disk as 8-bit RGB.
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

/// Write `rasters` into `output_dir` as `img-<n>.png`, numbering from zero.
///
/// The directory is created if necessary. Returns the written paths in order.
pub fn save_rasters<'a, P, I>(output_dir: P, rasters: I) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a RgbImage>,
{
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (n, raster) in rasters.into_iter().enumerate() {
        let dest = dir.join(format!("img-{n}.png"));
        raster.save_with_format(&dest, image::ImageFormat::Png)?;
        written.push(dest);
    }
    Ok(written)
}
