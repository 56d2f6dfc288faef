//! # pdfverify
//!
//! A Rust library for making test assertions about PDF documents.
//!
//! ## What this crate does
//!
//! 1. **Action reachability**: walks every place an automation action can
//!    hang off a document (catalog triggers, the open action, page triggers,
//!    form field widgets) and follows each `/Next` chain, reporting actions of
//!    the requested kinds.
//! 2. **Visual content location**: interprets a page's content stream,
//!    tracking the current transformation matrix through `q`/`Q`/`cm` and
//!    nested Form XObjects, and reports whether a given raster image is drawn
//!    inside a target rectangle.
//! 3. **Raster comparison**: pixel-exact equality of decoded images.
//! 4. **Image export**: writes every image reachable from the pages as PNG.
//!
//! ## Quick example
//!
//! ```no_run
//! use pdfverify::{ActionKind, PdfVerifier, Rect};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = PdfVerifier::from_path("form.pdf")?;
//!
//! let verdict = verifier.contains_no_actions_of_type(&[ActionKind::JavaScript, ActionKind::Launch]);
//! println!("no scripts: {verdict}");
//!
//! let logo = verifier.page_contains_image_in_region_file(
//!     1,
//!     "logo.png",
//!     Rect::from_millimeters(10.0, 250.0, 40.0, 30.0),
//! )?;
//! println!("logo placed: {logo}");
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod action_walker;
mod content_locator;
mod geometry;
mod image_decode;
mod loader;
mod model;
mod pdf_utils;
mod raster;
mod verdict;
mod verifier;
mod verifier_actions;
mod verifier_images;

pub use action_walker::{ActionLocation, ActionMatch, ActionReport, ActionWalker, FindPolicy};
pub use content_locator::{resources_contain_image, ImageLocator, ImagePlacement};
pub use geometry::{Matrix, Rect, Unit, POINTS_PER_INCH, POINTS_PER_MILLIMETER};
pub use model::{
    AcroForm, Action, ActionId, ActionKind, ActionKinds, AdditionalActions, Catalog, Document,
    DocumentTrigger, Field, FieldTrigger, FormXObject, ImageXObject, NonTerminalField, Page,
    PageTrigger, Resources, TerminalField, Trigger, Widget, XObject, XObjectId,
};
pub use raster::{load_reference, rasters_equal, save_rasters};
pub use verdict::Verdict;
pub use verifier::PdfVerifier;

// ── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration for [`PdfVerifier`].
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Password used to decrypt encrypted documents. Either the user or the
    /// owner password is accepted.
    pub password: Option<String>,

    /// How deeply Form XObjects may invoke other forms before
    /// [`VerifyError::FormDepthExceeded`] is returned.
    pub max_form_depth: usize,

    /// When `true`, an image XObject that cannot be decoded fails loading with
    /// [`VerifyError::UnsupportedImage`] instead of being skipped.
    pub strict_image_decoding: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            password: None,
            max_form_depth: 32,
            strict_image_decoding: false,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
///
/// A query that simply finds nothing is not an error; it is reported through
/// [`Verdict`], `bool` or `Option` results.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A filesystem I/O error occurred (e.g. when loading or saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    /// A reference image could not be read or an exported image could not be written.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The document is encrypted and no password was configured.
    #[error("document is encrypted and no password was supplied")]
    PasswordRequired,

    /// The configured password did not decrypt the document.
    #[error("password rejected: {0}")]
    InvalidPassword(String),

    /// The document parsed but lacks a structure this crate depends on.
    #[error("invalid PDF: {0}")]
    InvalidPdf(String),

    /// A 1-based page number outside the document.
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    /// An image XObject uses an encoding or colour model that cannot be decoded.
    #[error("unsupported image '{0}': {1}")]
    UnsupportedImage(String, String),

    /// A Form XObject draws itself, directly or through other forms.
    #[error("form XObject '{0}' invokes itself")]
    RecursiveForm(String),

    /// Form XObjects are nested deeper than [`VerifierConfig::max_form_depth`].
    #[error("form XObjects nested deeper than {0} levels")]
    FormDepthExceeded(usize),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, VerifyError>;
