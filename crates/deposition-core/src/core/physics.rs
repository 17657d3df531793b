//! Physical constants and small thermal-physics helpers.

use nalgebra::{Matrix3, Point3, Vector3};
use phf::phf_map;

/// Boltzmann constant in J/K.
pub const BOLTZMANN_CONSTANT: f64 = 1.380_649e-23;

/// Atomic mass unit in kg.
pub const ATOMIC_MASS_UNIT_KG: f64 = 1.660_539_066_60e-27;

pub const ANGSTROM_IN_METRES: f64 = 1e-10;

/// Principal moments below this fraction of the largest are treated as zero.
const NEGLIGIBLE_MOMENT_FRACTION: f64 = 1e-9;

/// Standard atomic weights (amu) of the elements commonly found in deposition
/// studies.
static ATOMIC_MASSES: phf::Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "He" => 4.0026,
    "Li" => 6.94,
    "Be" => 9.0122,
    "B" => 10.81,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "F" => 18.998,
    "Ne" => 20.180,
    "Na" => 22.990,
    "Mg" => 24.305,
    "Al" => 26.982,
    "Si" => 28.085,
    "P" => 30.974,
    "S" => 32.06,
    "Cl" => 35.45,
    "Ar" => 39.948,
    "K" => 39.098,
    "Ca" => 40.078,
    "Ti" => 47.867,
    "V" => 50.942,
    "Cr" => 51.996,
    "Mn" => 54.938,
    "Fe" => 55.845,
    "Co" => 58.933,
    "Ni" => 58.693,
    "Cu" => 63.546,
    "Zn" => 65.38,
    "Ga" => 69.723,
    "Ge" => 72.630,
    "As" => 74.922,
    "Se" => 78.971,
    "Kr" => 83.798,
    "Zr" => 91.224,
    "Mo" => 95.95,
    "Ag" => 107.87,
    "Sn" => 118.71,
    "Xe" => 131.29,
    "Hf" => 178.49,
    "Ta" => 180.95,
    "W" => 183.84,
    "Pt" => 195.08,
    "Au" => 196.97,
    "Pb" => 207.2,
};

/// Looks up the standard atomic weight of an element symbol, in amu.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.get(symbol).copied()
}

/// Standard deviation (m/s) of one Cartesian velocity component of a particle
/// of `mass_kg` in thermal equilibrium at `temperature` Kelvin.
pub fn thermal_velocity_sigma(temperature: f64, mass_kg: f64) -> f64 {
    if mass_kg <= 0.0 || temperature <= 0.0 {
        return 0.0;
    }
    (BOLTZMANN_CONSTANT * temperature / mass_kg).sqrt()
}

/// Expected variance of the instantaneous temperature of `num_atoms` particles
/// in a canonical ensemble at `temperature` Kelvin (three dimensions).
pub fn canonical_variance(num_atoms: usize, temperature: f64) -> f64 {
    const NUM_DIMENSIONS: f64 = 3.0;
    (2.0 * temperature * temperature) / (NUM_DIMENSIONS * num_atoms.max(1) as f64)
}

/// Mass-weighted centre of a group of particles. Masses are in amu; the
/// result is in the units of `coordinates`.
pub fn centre_of_mass(coordinates: &[Point3<f64>], masses: &[f64]) -> Point3<f64> {
    let total: f64 = masses.iter().sum();
    if total <= 0.0 || coordinates.is_empty() {
        return Point3::origin();
    }
    let weighted = coordinates
        .iter()
        .zip(masses)
        .fold(Vector3::zeros(), |acc, (p, m)| acc + p.coords * *m);
    Point3::from(weighted / total)
}

/// Inertia tensor (amu Angstrom^2) about the centre of mass, products of
/// inertia included.
pub fn inertia_tensor(coordinates: &[Point3<f64>], masses: &[f64]) -> Matrix3<f64> {
    let centre = centre_of_mass(coordinates, masses);
    coordinates
        .iter()
        .zip(masses)
        .fold(Matrix3::zeros(), |acc, (p, m)| {
            let r = *p - centre;
            acc + (Matrix3::identity() * r.norm_squared() - r * r.transpose()) * *m
        })
}

/// Principal moments of inertia with their axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalAxes {
    /// Moments in kg m^2; `moments[i]` belongs to the column `axes.column(i)`.
    pub moments: Vector3<f64>,
    /// Orthonormal axes as columns.
    pub axes: Matrix3<f64>,
}

/// Diagonalises the inertia tensor of a group of particles. Coordinates are
/// in Angstroms, masses in amu. A moment that vanishes relative to the
/// largest one (the bond axis of a linear molecule) is reported as exactly
/// zero.
pub fn principal_axes(coordinates: &[Point3<f64>], masses: &[f64]) -> PrincipalAxes {
    let eigen = inertia_tensor(coordinates, masses).symmetric_eigen();
    let largest = eigen.eigenvalues.max();
    let moments = eigen.eigenvalues.map(|moment| {
        if moment <= largest * NEGLIGIBLE_MOMENT_FRACTION {
            0.0
        } else {
            moment * ATOMIC_MASS_UNIT_KG * ANGSTROM_IN_METRES * ANGSTROM_IN_METRES
        }
    });
    PrincipalAxes {
        moments,
        axes: eigen.eigenvectors,
    }
}
