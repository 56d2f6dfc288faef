//! Content-stream interpretation for locating placed images.
//!
//! [`ImageLocator`] runs a page's operators once, front to back. Only the
//! operators that move the current transformation matrix (`q`, `Q`, `cm`)
//! and `Do` are acted on; everything else is skipped, including the text
//! operators and inline images. A `Do` naming a
//! Form XObject descends into the form's content with the current state, and
//! a `Do` naming an image compares it against the reference raster and the
//! target region.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::ops::{ControlFlow, Deref, DerefMut};

use image::RgbImage;
use lopdf::content::Content;
use tracing::debug;

use crate::geometry::{Matrix, Rect};
use crate::model::{Document, ImageXObject, Page, Resources, XObject, XObjectId};
use crate::raster::rasters_equal;
use crate::{Result, VerifyError};

/// Where a matching image was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// Resource name used by the `Do` that drew the image.
    pub name: String,
    pub xobject: XObjectId,
    /// The transformation matrix in effect when the image was drawn.
    pub ctm: Matrix,
    /// Number of enclosing Form XObjects; 0 when drawn by the page itself.
    pub form_depth: usize,
}

impl fmt::Display for ImagePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image /{} at ({:.2}, {:.2}) size {:.2} x {:.2}",
            self.name,
            self.ctm.translate_x(),
            self.ctm.translate_y(),
            self.ctm.scaling_factor_x(),
            self.ctm.scaling_factor_y()
        )
    }
}

// ── Graphics state ───────────────────────────────────────────────────────────

/// The transformation matrix plus the `q`/`Q` save stack.
///
/// `floor` marks the saved entries owned by enclosing form invocations; a
/// `Q` inside a form cannot pop below it.
#[derive(Debug, Default)]
struct GraphicsStack {
    current: Matrix,
    saved: Vec<Matrix>,
    floor: usize,
}

impl GraphicsStack {
    fn save(&mut self) {
        self.saved.push(self.current);
    }

    fn restore(&mut self) {
        if self.saved.len() > self.floor {
            if let Some(matrix) = self.saved.pop() {
                self.current = matrix;
            }
        } else {
            debug!("unbalanced Q ignored");
        }
    }

    fn concat(&mut self, matrix: &Matrix) {
        self.current = matrix.multiply(&self.current);
    }

    /// Save the state and return a guard that restores it, together with
    /// anything pushed after it, when dropped.
    fn scope(&mut self) -> StateScope<'_> {
        self.save();
        let depth = self.saved.len();
        let outer_floor = std::mem::replace(&mut self.floor, depth);
        StateScope {
            stack: self,
            depth,
            outer_floor,
        }
    }
}

struct StateScope<'s> {
    stack: &'s mut GraphicsStack,
    depth: usize,
    outer_floor: usize,
}

impl Deref for StateScope<'_> {
    type Target = GraphicsStack;

    fn deref(&self) -> &GraphicsStack {
        self.stack
    }
}

impl DerefMut for StateScope<'_> {
    fn deref_mut(&mut self) -> &mut GraphicsStack {
        self.stack
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        let stack = &mut *self.stack;
        stack.saved.truncate(self.depth);
        if let Some(matrix) = stack.saved.pop() {
            stack.current = matrix;
        }
        stack.floor = self.outer_floor;
    }
}

// ── Locator ──────────────────────────────────────────────────────────────────

/// Finds a reference image drawn inside a region of a page.
pub struct ImageLocator<'a> {
    document: &'a Document,
    reference: &'a RgbImage,
    region: Rect,
    max_form_depth: usize,
}

impl<'a> ImageLocator<'a> {
    pub fn new(document: &'a Document, reference: &'a RgbImage, region: Rect) -> Self {
        Self {
            document,
            reference,
            region,
            max_form_depth: 32,
        }
    }

    /// Bound the nesting of Form XObjects.
    pub fn with_max_form_depth(mut self, depth: usize) -> Self {
        self.max_form_depth = depth;
        self
    }

    /// Interpret `page` and return the first placement of the reference
    /// image that lies inside the region.
    ///
    /// Returns `Ok(None)` when there is no such placement. Errors are reserved
    /// for content streams that fail to parse, a form that draws itself, and
    /// forms nested deeper than the configured bound.
    pub fn locate(&self, page: &Page) -> Result<Option<ImagePlacement>> {
        let mut stack = GraphicsStack::default();
        let mut active = Vec::new();
        self.interpret(&page.content, &page.resources, &mut stack, &mut active)
    }

    fn interpret(
        &self,
        content: &[u8],
        resources: &Resources,
        stack: &mut GraphicsStack,
        active: &mut Vec<XObjectId>,
    ) -> Result<Option<ImagePlacement>> {
        let content = Content::decode(&strip_inline_images(content))?;

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => stack.save(),
                "Q" => stack.restore(),
                // `Tm` only sets the text matrix and never moves images.
                "cm" => match Matrix::from_operands(&op.operands) {
                    Some(m) => stack.concat(&m),
                    None => debug!("malformed cm operands ignored"),
                },
                "Do" => {
                    let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                        debug!("Do without a name operand ignored");
                        continue;
                    };
                    if let Some(found) = self.draw(name, resources, stack, active)? {
                        return Ok(Some(found));
                    }
                }
                _ => {}
            }
        }

        Ok(None)
    }

    fn draw(
        &self,
        name: &[u8],
        resources: &Resources,
        stack: &mut GraphicsStack,
        active: &mut Vec<XObjectId>,
    ) -> Result<Option<ImagePlacement>> {
        let display_name = String::from_utf8_lossy(name);
        let Some(id) = resources.xobject(name) else {
            debug!(xobject = %display_name, "unresolved XObject name");
            return Ok(None);
        };

        match self.document.xobject(id) {
            Some(XObject::Image(image)) => {
                if !rasters_equal(&image.raster, self.reference) {
                    return Ok(None);
                }
                if !self.region.contains_placement(&stack.current) {
                    debug!(xobject = %display_name, ctm = ?stack.current, "matching image outside region");
                    return Ok(None);
                }
                Ok(Some(ImagePlacement {
                    name: display_name.into_owned(),
                    xobject: id,
                    ctm: stack.current,
                    form_depth: active.len(),
                }))
            }
            Some(XObject::Form(form)) => {
                if active.contains(&id) {
                    return Err(VerifyError::RecursiveForm(display_name.into_owned()));
                }
                if active.len() >= self.max_form_depth {
                    return Err(VerifyError::FormDepthExceeded(self.max_form_depth));
                }

                active.push(id);
                let result = {
                    let mut scope = stack.scope();
                    scope.concat(&form.matrix);
                    let scope_resources = form.resources.as_ref().unwrap_or(resources);
                    self.interpret(&form.content, scope_resources, &mut scope, active)
                };
                active.pop();
                result
            }
            None => Ok(None),
        }
    }
}

// ── Inline images ────────────────────────────────────────────────────────────

/// Remove `BI … ID <data> EI` inline images, which the content parser does not
/// accept. Each one is replaced by a single space. A `BI` without a matching
/// `ID`/`EI` is left in place.
fn strip_inline_images(content: &[u8]) -> Cow<'_, [u8]> {
    let Some(first) = find_operator(content, b"BI", 0) else {
        return Cow::Borrowed(content);
    };

    let mut stripped = Vec::with_capacity(content.len());
    let mut copied = 0;
    let mut next = Some(first);
    while let Some(begin) = next {
        let Some(data) = find_operator(content, b"ID", begin + 2) else {
            break;
        };
        // The data starts after `ID` and one whitespace byte.
        let Some(end) = find_operator(content, b"EI", data + 3) else {
            break;
        };
        stripped.extend_from_slice(&content[copied..begin]);
        stripped.push(b' ');
        copied = end + 2;
        next = find_operator(content, b"BI", copied);
    }
    stripped.extend_from_slice(&content[copied..]);
    Cow::Owned(stripped)
}

/// Position of `operator` as a standalone token at or after `from`.
fn find_operator(content: &[u8], operator: &[u8], from: usize) -> Option<usize> {
    let last = content.len().checked_sub(operator.len())?;
    (from..=last).find(|&i| {
        content[i..].starts_with(operator)
            && (i == 0 || content[i - 1].is_ascii_whitespace())
            && content
                .get(i + operator.len())
                .map_or(true, |b| b.is_ascii_whitespace() || b"/[<(%".contains(b))
    })
}

// ── Resource search ──────────────────────────────────────────────────────────

/// Returns `true` when an image pixel-identical to `reference` is reachable
/// through `resources`, including the resources of nested forms. Placement
/// on the page is not considered.
pub fn resources_contain_image(
    document: &Document,
    resources: &Resources,
    reference: &RgbImage,
) -> bool {
    let mut seen = HashSet::new();
    visit_images(document, resources, &mut seen, &mut |_, image: &ImageXObject| {
        if rasters_equal(&image.raster, reference) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// Call `visit` once for each distinct image XObject reachable through
/// `resources`. XObjects already in `seen` are skipped.
pub(crate) fn visit_images<'d, F>(
    document: &'d Document,
    resources: &Resources,
    seen: &mut HashSet<XObjectId>,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(XObjectId, &'d ImageXObject) -> ControlFlow<()>,
{
    for (_, id) in resources.xobjects() {
        if !seen.insert(id) {
            continue;
        }
        match document.xobject(id) {
            Some(XObject::Image(image)) => visit(id, image)?,
            Some(XObject::Form(form)) => {
                if let Some(nested) = &form.resources {
                    visit_images(document, nested, seen, visit)?;
                }
            }
            None => {}
        }
    }
    ControlFlow::Continue(())
}
