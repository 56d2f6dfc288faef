//! Page-space geometry: regions in PDF points and the affine transform
//! tracked by the content stream interpreter.

use lopdf::Object;

/// Points per inch (1 point = 1/72 inch).
pub const POINTS_PER_INCH: f64 = 72.0;

/// Points per millimetre (72 / 25.4).
pub const POINTS_PER_MILLIMETER: f64 = 2.834645669291339;

// ── Unit ──────────────────────────────────────────────────────────────────────

/// Length unit a [`Rect`] can be specified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// PDF user-space points, the internal unit.
    #[default]
    Point,
    /// Imperial inches.
    Inch,
    /// Metric millimetres.
    Millimeter,
}

impl Unit {
    /// Convert a length in this unit to points.
    pub fn to_points(self, value: f64) -> f64 {
        match self {
            Unit::Point => value,
            Unit::Inch => value * POINTS_PER_INCH,
            Unit::Millimeter => value * POINTS_PER_MILLIMETER,
        }
    }
}

// ── Rect ──────────────────────────────────────────────────────────────────────

/// An axis-aligned page region in points, anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// A region given directly in points.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A region given in `unit`, converted to points.
    pub fn from_units(unit: Unit, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            unit.to_points(x),
            unit.to_points(y),
            unit.to_points(width),
            unit.to_points(height),
        )
    }

    /// A region given in inches.
    ///
    /// ```
    /// # use pdfverify::Rect;
    /// let r = Rect::from_inches(0.0, 0.0, 1.0, 1.0);
    /// assert_eq!((r.width, r.height), (72.0, 72.0));
    /// ```
    pub fn from_inches(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_units(Unit::Inch, x, y, width, height)
    }

    /// A region given in millimetres.
    pub fn from_millimeters(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_units(Unit::Millimeter, x, y, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Returns `true` when an image placed by `ctm` lies inside this region.
    ///
    /// Only the translation and the axis scaling factors of the matrix are
    /// considered: the placed origin must be inside the region, the scaled
    /// extent must not be larger than the region, and origin plus extent must
    /// not pass the far edge. Rotation and skew are not accounted for.
    pub fn contains_placement(&self, ctm: &Matrix) -> bool {
        let (x, y) = ctm.transform_point(0.0, 0.0);
        let width = ctm.scaling_factor_x();
        let height = ctm.scaling_factor_y();

        let origin_inside = x >= self.x && x <= self.right() && y >= self.y && y <= self.top();
        let fits_horizontally = width <= self.width && x + width <= self.right();
        let fits_vertically = height <= self.height && y + height <= self.top();

        origin_inside && fits_horizontally && fits_vertically
    }
}

// ── Matrix ────────────────────────────────────────────────────────────────────

/// A 2D affine transform `[a b c d e f]` in PDF notation.
///
/// Points are row vectors: `[x' y' 1] = [x y 1] × [[a b 0] [c d 0] [e f 1]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pure translation.
    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Pure axis scaling.
    pub const fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Build a matrix from six numeric operands (as used by `cm` and
    /// a form's `/Matrix`). Returns `None` unless there are exactly six numbers.
    pub fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut v = [0.0f64; 6];
        for (slot, operand) in v.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        Some(Self::new(v[0], v[1], v[2], v[3], v[4], v[5]))
    }

    /// `self × other`: apply `self` first, then `other`.
    ///
    /// The `cm` operator computes `operand.multiply(&ctm)`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through the transform.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    pub fn translate_x(&self) -> f64 {
        self.e
    }

    pub fn translate_y(&self) -> f64 {
        self.f
    }

    /// Horizontal scaling factor; the length of the transformed x unit
    /// vector when the matrix carries rotation or shear.
    pub fn scaling_factor_x(&self) -> f64 {
        if self.b != 0.0 {
            self.a.hypot(self.b)
        } else {
            self.a
        }
    }

    /// Vertical scaling factor; see [`Matrix::scaling_factor_x`].
    pub fn scaling_factor_y(&self) -> f64 {
        if self.c != 0.0 {
            self.c.hypot(self.d)
        } else {
            self.d
        }
    }
}

/// Read a PDF numeric object as `f64`.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
