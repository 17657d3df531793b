use crate::core::models::cell::SimulationCell;
use nalgebra::{Point2, Point3};

/// Fraction of the cell height regarded as "the structure"; particles above it
/// are treated as periodic images that wrapped through the top of the box.
pub const STRUCTURE_FRACTION_OF_CELL: f64 = 0.8;

/// Tests whether `point` lies inside a simple polygon using the even-odd rule.
pub fn point_in_polygon(point: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Axis-aligned bounding box of a polygon as `(min, max)` corners.
pub fn polygon_extents(polygon: &[Point2<f64>]) -> (Point2<f64>, Point2<f64>) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in polygon {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Height of the existing surface: the highest z-coordinate among particles in
/// the lower [`STRUCTURE_FRACTION_OF_CELL`] of the box.
///
/// Returns `None` when no particle lies below the cutoff.
pub fn surface_height(cell: &SimulationCell, coordinates: &[Point3<f64>]) -> Option<f64> {
    let cutoff = cell.bounds().z_min + cell.height() * STRUCTURE_FRACTION_OF_CELL;
    coordinates
        .iter()
        .map(|p| p.z)
        .filter(|&z| z < cutoff)
        .fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |m| m.max(z))))
}

/// Moves particles above [`STRUCTURE_FRACTION_OF_CELL`] of the box down by one
/// c-vector so that material which crossed the top boundary is reunited with
/// the structure at the bottom.
pub fn wrap_coordinates_in_z(
    cell: &SimulationCell,
    coordinates: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    let cutoff = cell.bounds().z_min + cell.height() * STRUCTURE_FRACTION_OF_CELL;
    let c_vector = cell.c_vector();
    coordinates
        .iter()
        .map(|p| if p.z > cutoff { *p - c_vector } else { *p })
        .collect()
}

/// Counts, for each particle in `targets`, how many other particles lie closer
/// than `cutoff`, taking periodic images along the `a` and `b` directions
/// into account. Coordinates are z-wrapped first.
pub fn neighbour_counts(
    cell: &SimulationCell,
    coordinates: &[Point3<f64>],
    targets: impl IntoIterator<Item = usize>,
    cutoff: f64,
) -> Vec<usize> {
    let wrapped = wrap_coordinates_in_z(cell, coordinates);
    let (a, b) = (cell.a_vector(), cell.b_vector());
    let shifts: Vec<_> = (-1..=1)
        .flat_map(|i| (-1..=1).map(move |j| (i, j)))
        .map(|(i, j)| a * i as f64 + b * j as f64)
        .collect();
    let cutoff_squared = cutoff * cutoff;

    targets
        .into_iter()
        .map(|target| {
            let reference = wrapped[target];
            let mut count = 0;
            for (index, other) in wrapped.iter().enumerate() {
                for shift in &shifts {
                    if index == target && shift.norm_squared() == 0.0 {
                        continue;
                    }
                    if (*other + *shift - reference).norm_squared() < cutoff_squared {
                        count += 1;
                    }
                }
            }
            count
        })
        .collect()
}
