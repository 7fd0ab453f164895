use crate::{CalibError, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

fn default_cell_size() -> Real {
    1.0
}

/// Checkerboard geometry in inner corners.
///
/// A board with 10x7 squares has `inner_width = 9`, `inner_height = 6`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckerboardSpec {
    /// Inner corners per row.
    pub inner_width: usize,
    /// Inner corners per column.
    pub inner_height: usize,
    /// Side length of one square; only fixes the unit of the recovered poses.
    #[serde(default = "default_cell_size")]
    pub cell_size: Real,
}

impl CheckerboardSpec {
    pub fn new(inner_width: usize, inner_height: usize) -> Self {
        Self {
            inner_width,
            inner_height,
            cell_size: default_cell_size(),
        }
    }

    pub fn with_cell_size(mut self, cell_size: Real) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn corner_count(&self) -> usize {
        self.inner_width * self.inner_height
    }

    pub fn validate(&self) -> Result<(), CalibError> {
        if self.inner_width < 2 || self.inner_height < 2 {
            return Err(CalibError::invalid(format!(
                "checkerboard needs at least 2x2 inner corners, got {}x{}",
                self.inner_width, self.inner_height
            )));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(CalibError::invalid(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        Ok(())
    }
}

/// Object-space corner positions of a validated checkerboard.
///
/// Points lie on `z = 0` at `(i * cell, j * cell)`, row-major with `j` as
/// the outer index. Computed once on construction.
#[derive(Clone, Debug)]
pub struct PatternModel {
    spec: CheckerboardSpec,
    points: Vec<Pt3>,
}

impl PatternModel {
    pub fn new(spec: CheckerboardSpec) -> Result<Self, CalibError> {
        spec.validate()?;
        let mut points = Vec::with_capacity(spec.corner_count());
        for j in 0..spec.inner_height {
            for i in 0..spec.inner_width {
                points.push(Pt3::new(
                    i as Real * spec.cell_size,
                    j as Real * spec.cell_size,
                    0.0,
                ));
            }
        }
        Ok(Self { spec, points })
    }

    pub fn spec(&self) -> &CheckerboardSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn object_points(&self) -> &[Pt3] {
        &self.points
    }

    /// Object points dropped onto the board plane.
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.points.iter().map(|p| Pt2::new(p.x, p.y)).collect()
    }

    /// Row-major index of corner `(i, j)`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.spec.inner_width + i
    }
}

/// Detected corners of one image, in [`PatternModel`] order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    points: Vec<Pt2>,
}

impl CornerSet {
    /// Wrap `points`, checking the count against `spec`.
    pub fn new(points: Vec<Pt2>, spec: &CheckerboardSpec) -> Result<Self, CalibError> {
        if points.len() != spec.corner_count() {
            return Err(CalibError::invalid(format!(
                "corner set has {} points, board {}x{} needs {}",
                points.len(),
                spec.inner_width,
                spec.inner_height,
                spec.corner_count()
            )));
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(CalibError::invalid("corner set contains non-finite points"));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Pt2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
