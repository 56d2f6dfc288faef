use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::loader::ModelLoader;
use crate::model::{Document, Page};
use crate::{Result, VerifierConfig, VerifyError};

// ── PdfVerifier ──────────────────────────────────────────────────────────────

/// Entry point for all action and image assertions on one document.
///
/// The PDF is parsed once at construction and converted into a read-only
/// [`Document`] model; every query afterwards works on that model.
///
/// # Creating a verifier
///
/// ```no_run
/// use pdfverify::{PdfVerifier, VerifierConfig};
///
/// // From a file path
/// let v = PdfVerifier::from_path("form.pdf").unwrap();
///
/// // From an in-memory buffer
/// let bytes = std::fs::read("form.pdf").unwrap();
/// let v = PdfVerifier::from_bytes(&bytes).unwrap();
///
/// // An encrypted document
/// let cfg = VerifierConfig {
///     password: Some("secret".into()),
///     ..Default::default()
/// };
/// let v = PdfVerifier::with_config("locked.pdf", cfg).unwrap();
/// ```
pub struct PdfVerifier {
    document: Document,
    config: VerifierConfig,
}

impl PdfVerifier {
    // ── Constructors ──────────────────────────────────────────────────────────

    /// Load a PDF from the file system.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, VerifierConfig::default())
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_config(data, VerifierConfig::default())
    }

    /// Load a PDF from any reader, e.g. an open file or a network body.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, VerifierConfig::default())
    }

    /// Load a PDF from the file system with a custom [`VerifierConfig`].
    pub fn with_config<P: AsRef<Path>>(path: P, config: VerifierConfig) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading PDF");
        Self::from_source(lopdf::Document::load(path)?, config)
    }

    /// Load a PDF from memory with a custom [`VerifierConfig`].
    pub fn from_bytes_with_config(data: &[u8], config: VerifierConfig) -> Result<Self> {
        Self::from_source(lopdf::Document::load_mem(data)?, config)
    }

    /// Load a PDF from a reader with a custom [`VerifierConfig`].
    pub fn from_reader_with_config<R: Read>(reader: R, config: VerifierConfig) -> Result<Self> {
        Self::from_source(lopdf::Document::load_from(reader)?, config)
    }

    /// Wrap a model that was assembled by hand.
    pub fn from_document(document: Document, config: VerifierConfig) -> Self {
        Self { document, config }
    }

    fn from_source(mut source: lopdf::Document, config: VerifierConfig) -> Result<Self> {
        unlock(&mut source, config.password.as_deref())?;
        let document = ModelLoader::new(&source, &config).load()?;
        Ok(Self { document, config })
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Returns a reference to the loaded document model.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns a reference to the active [`VerifierConfig`].
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn page_count(&self) -> usize {
        self.document.pages.len()
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, number: u32) -> Result<&Page> {
        self.document
            .page(number)
            .ok_or(VerifyError::PageOutOfRange {
                page: number,
                count: self.page_count(),
            })
    }
}

/// Decrypt `source` in place if it is encrypted.
///
/// The empty user password is tried first, so documents that are only
/// owner-protected open without configuration.
fn unlock(source: &mut lopdf::Document, password: Option<&str>) -> Result<()> {
    if !source.is_encrypted() {
        return Ok(());
    }
    if source.decrypt("").is_ok() {
        debug!("decrypted with the empty user password");
        return Ok(());
    }
    let password = password.ok_or(VerifyError::PasswordRequired)?;
    source
        .decrypt(password)
        .map_err(|e| VerifyError::InvalidPassword(e.to_string()))
}
