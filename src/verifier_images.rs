use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::content_locator::{resources_contain_image, visit_images, ImageLocator, ImagePlacement};
use crate::geometry::Rect;
use crate::raster::{load_reference, save_rasters};
use crate::{Result, Verdict};

/// Image assertions and export for PdfVerifier.
impl super::PdfVerifier {
    // ── Placement ─────────────────────────────────────────────────────────────

    /// Interpret page `page` and return where `reference` is drawn inside
    /// `region`, if anywhere. The first qualifying placement wins.
    pub fn locate_image(
        &self,
        page: u32,
        reference: &RgbImage,
        region: Rect,
    ) -> Result<Option<ImagePlacement>> {
        let target = self.page(page)?;
        ImageLocator::new(self.document(), reference, region)
            .with_max_form_depth(self.config().max_form_depth)
            .locate(target)
    }

    /// Passes when an image pixel-identical to `reference` is drawn on page
    /// `page` entirely inside `region` (in points).
    pub fn page_contains_image_in_region(
        &self,
        page: u32,
        reference: &RgbImage,
        region: Rect,
    ) -> Result<Verdict> {
        match self.locate_image(page, reference, region)? {
            Some(placement) => {
                debug!(page, %placement, "reference image located");
                Ok(Verdict::Pass)
            }
            None => Ok(Verdict::Fail(format!(
                "image not drawn on page {page} inside region at ({}, {}) size {} x {}",
                region.x, region.y, region.width, region.height
            ))),
        }
    }

    /// Like [`page_contains_image_in_region`](Self::page_contains_image_in_region)
    /// with the reference image read from a PNG or JPEG file.
    pub fn page_contains_image_in_region_file<P: AsRef<Path>>(
        &self,
        page: u32,
        reference: P,
        region: Rect,
    ) -> Result<Verdict> {
        let reference = load_reference(reference)?;
        self.page_contains_image_in_region(page, &reference, region)
    }

    // ── Presence ──────────────────────────────────────────────────────────────

    /// Passes when an image pixel-identical to `reference` is available to
    /// page `page` through its resources, including nested forms. Whether and
    /// where it is drawn is not checked.
    pub fn page_contains_image(&self, page: u32, reference: &RgbImage) -> Result<Verdict> {
        let target = self.page(page)?;
        if resources_contain_image(self.document(), &target.resources, reference) {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail(format!(
                "no image on page {page} matches the {}x{} reference",
                reference.width(),
                reference.height()
            )))
        }
    }

    /// Like [`page_contains_image`](Self::page_contains_image) with the
    /// reference image read from a PNG or JPEG file.
    pub fn page_contains_image_file<P: AsRef<Path>>(&self, page: u32, reference: P) -> Result<Verdict> {
        let reference = load_reference(reference)?;
        self.page_contains_image(page, &reference)
    }

    // ── Export ────────────────────────────────────────────────────────────────

    /// Every distinct image reachable from the pages' resources, in page
    /// order.
    pub fn images(&self) -> Vec<&RgbImage> {
        let document = self.document();
        let mut seen = HashSet::new();
        let mut rasters = Vec::new();
        for page in &document.pages {
            let _ = visit_images(document, &page.resources, &mut seen, &mut |_, image| {
                rasters.push(&image.raster);
                ControlFlow::Continue(())
            });
        }
        rasters
    }

    /// Write every image returned by [`images`](Self::images) into
    /// `output_dir` as `img-<n>.png` and return the written paths.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdfverify::PdfVerifier;
    ///
    /// let verifier = PdfVerifier::from_path("brochure.pdf").unwrap();
    /// for path in verifier.export_images("./out").unwrap() {
    ///     println!("{}", path.display());
    /// }
    /// ```
    pub fn export_images<P: AsRef<Path>>(&self, output_dir: P) -> Result<Vec<PathBuf>> {
        save_rasters(output_dir, self.images())
    }
}
