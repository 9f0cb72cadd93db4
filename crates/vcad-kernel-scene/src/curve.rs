//! Curve control data: Bézier triples and polyline/NURBS points.

use vcad_kernel_math::Point3;

/// Bézier handle behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleType {
    /// Handles move independently.
    #[default]
    Free,
    /// Handles follow the neighbouring knots.
    Auto,
    /// Handles point at the neighbouring knots.
    Vector,
    /// Handles stay collinear through the knot.
    Aligned,
}

/// A Bézier knot with its two handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezTriple {
    /// Left handle, knot, right handle.
    pub vec: [Point3; 3],
    /// Selection of left handle, knot, right handle.
    pub select: [bool; 3],
    /// Left and right handle types.
    pub handles: [HandleType; 2],
    /// Hidden.
    pub hide: bool,
}

impl BezTriple {
    /// An unselected knot with free handles.
    pub fn new(left: Point3, knot: Point3, right: Point3) -> Self {
        Self {
            vec: [left, knot, right],
            select: [false; 3],
            handles: [HandleType::Free; 2],
            hide: false,
        }
    }
}

/// A polyline or NURBS control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BPoint {
    /// Position.
    pub co: Point3,
    /// Selected.
    pub select: bool,
    /// Hidden.
    pub hide: bool,
}

impl BPoint {
    /// An unselected visible point.
    pub fn new(co: Point3) -> Self {
        Self {
            co,
            select: false,
            hide: false,
        }
    }
}

/// One spline of a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum Nurb {
    /// Bézier spline.
    Bezier(Vec<BezTriple>),
    /// Poly or NURBS spline.
    Points(Vec<BPoint>),
}

impl Nurb {
    /// Number of control knots.
    pub fn len(&self) -> usize {
        match self {
            Nurb::Bezier(b) => b.len(),
            Nurb::Points(p) => p.len(),
        }
    }

    /// True without control knots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Curve object data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    /// Splines as stored.
    pub nurbs: Vec<Nurb>,
    /// Splines being edited; present while the owner is in edit mode.
    pub edit_nurbs: Option<Vec<Nurb>>,
}

impl Curve {
    /// Curve from splines.
    pub fn new(nurbs: Vec<Nurb>) -> Self {
        Self {
            nurbs,
            edit_nurbs: None,
        }
    }

    /// The splines to read while editing: the edit copy if present.
    pub fn editable_nurbs(&self) -> &[Nurb] {
        self.edit_nurbs.as_deref().unwrap_or(&self.nurbs)
    }
}
