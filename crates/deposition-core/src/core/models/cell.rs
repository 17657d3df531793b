use nalgebra::{Point2, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CellError {
    #[error("Cell parameter '{name}' must be strictly positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("Cell angle '{name}' must lie strictly between 0 and 180 degrees (got {value})")]
    AngleOutOfRange { name: &'static str, value: f64 },
    #[error("Cell angles alpha={alpha}, beta={beta}, gamma={gamma} do not describe a valid box")]
    Degenerate { alpha: f64, beta: f64, gamma: f64 },
}

/// Restricted-triclinic box bounds in the convention used by LAMMPS data files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub tilt_xy: f64,
    pub tilt_xz: f64,
    pub tilt_yz: f64,
}

impl CellBounds {
    pub fn is_orthogonal(&self) -> bool {
        self.tilt_xy.abs() < 1e-10 && self.tilt_xz.abs() < 1e-10 && self.tilt_yz.abs() < 1e-10
    }
}

/// The periodic simulation cell, given as lattice lengths (Angstroms) and
/// angles (degrees).
///
/// The cell is immutable for the lifetime of a deposition run. Derived
/// geometry (lattice vectors, box bounds, the deposition footprint) is
/// computed on construction using the standard orientation: `a` along x,
/// `b` in the xy-plane, `c` pointing into positive z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    bounds: CellBounds,
}

impl SimulationCell {
    /// Creates a cell and derives its box geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`CellError`] if any length is not positive, any angle is
    /// outside `(0, 180)`, or the angles cannot close a parallelepiped.
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, CellError> {
        for (name, value) in [("a", a), ("b", b), ("c", c)] {
            if !(value > 0.0) {
                return Err(CellError::NonPositive { name, value });
            }
        }
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(value > 0.0 && value < 180.0) {
                return Err(CellError::AngleOutOfRange { name, value });
            }
        }

        let (cos_a, cos_b, cos_g) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sin_g = gamma.to_radians().sin();

        let tilt_xy = b * cos_g;
        let ly = b * sin_g;
        let tilt_xz = c * cos_b;
        let tilt_yz = c * (cos_a - cos_b * cos_g) / sin_g;
        let lz_squared = c * c - tilt_xz * tilt_xz - tilt_yz * tilt_yz;
        if lz_squared <= 0.0 {
            return Err(CellError::Degenerate { alpha, beta, gamma });
        }

        let bounds = CellBounds {
            x_min: 0.0,
            x_max: a,
            y_min: 0.0,
            y_max: ly,
            z_min: 0.0,
            z_max: lz_squared.sqrt(),
            tilt_xy,
            tilt_xz,
            tilt_yz,
        };

        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            bounds,
        })
    }

    /// An orthogonal box with the given edge lengths.
    pub fn orthogonal(a: f64, b: f64, c: f64) -> Result<Self, CellError> {
        Self::new(a, b, c, 90.0, 90.0, 90.0)
    }

    pub fn bounds(&self) -> &CellBounds {
        &self.bounds
    }

    pub fn a_vector(&self) -> Vector3<f64> {
        Vector3::new(self.bounds.x_max - self.bounds.x_min, 0.0, 0.0)
    }

    pub fn b_vector(&self) -> Vector3<f64> {
        Vector3::new(self.bounds.tilt_xy, self.bounds.y_max - self.bounds.y_min, 0.0)
    }

    pub fn c_vector(&self) -> Vector3<f64> {
        Vector3::new(
            self.bounds.tilt_xz,
            self.bounds.tilt_yz,
            self.bounds.z_max - self.bounds.z_min,
        )
    }

    /// Height of the box along z.
    pub fn height(&self) -> f64 {
        self.bounds.z_max - self.bounds.z_min
    }

    /// The xy-parallelogram spanned by the `a` and `b` vectors, shifted by the
    /// in-plane component of `c` so that it is the cross-section of the cell at
    /// height `z`. Vertices are ordered counter-clockwise.
    pub fn footprint_at(&self, z: f64) -> [Point2<f64>; 4] {
        let relative_height = (z - self.bounds.z_min) / self.height();
        let shift = self.c_vector().xy() * relative_height;
        let origin = Point2::new(self.bounds.x_min, self.bounds.y_min) + shift;
        let a = self.a_vector().xy();
        let b = self.b_vector().xy();
        [origin, origin + a, origin + a + b, origin + b]
    }
}
