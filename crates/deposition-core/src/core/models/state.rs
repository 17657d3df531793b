use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error(
        "Mismatched state lengths: {coordinates} coordinates, {elements} elements, \
         {velocities} velocities"
    )]
    LengthMismatch {
        coordinates: usize,
        elements: usize,
        velocities: usize,
    },
}

/// The atomic configuration handed between the stages of a deposition.
///
/// Coordinates, element symbols and velocities are stored as parallel
/// sequences. Every constructor and mutator keeps the three sequences at the
/// same length, so a `State` observed anywhere in the library is always
/// consistent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    coordinates: Vec<Point3<f64>>,
    elements: Vec<String>,
    velocities: Vec<Vector3<f64>>,
}

impl State {
    /// Builds a state from parallel sequences.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LengthMismatch`] if the sequences differ in length.
    pub fn new(
        coordinates: Vec<Point3<f64>>,
        elements: Vec<String>,
        velocities: Vec<Vector3<f64>>,
    ) -> Result<Self, StateError> {
        if coordinates.len() != elements.len() || coordinates.len() != velocities.len() {
            return Err(StateError::LengthMismatch {
                coordinates: coordinates.len(),
                elements: elements.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            coordinates,
            elements,
            velocities,
        })
    }

    /// Builds a state whose particles are all at rest.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LengthMismatch`] if `coordinates` and `elements`
    /// differ in length.
    pub fn at_rest(
        coordinates: Vec<Point3<f64>>,
        elements: Vec<String>,
    ) -> Result<Self, StateError> {
        let velocities = vec![Vector3::zeros(); coordinates.len()];
        Self::new(coordinates, elements, velocities)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn coordinates(&self) -> &[Point3<f64>] {
        &self.coordinates
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    /// In-place access to the coordinates; the slice cannot change the
    /// particle count.
    pub fn coordinates_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.coordinates
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.velocities
    }

    /// Appends a single particle.
    pub fn push(&mut self, position: Point3<f64>, element: &str, velocity: Vector3<f64>) {
        self.coordinates.push(position);
        self.elements.push(element.to_string());
        self.velocities.push(velocity);
    }

    /// Returns a copy of this state with every coordinate replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LengthMismatch`] if the particle count changes.
    pub fn with_coordinates(&self, coordinates: Vec<Point3<f64>>) -> Result<Self, StateError> {
        Self::new(coordinates, self.elements.clone(), self.velocities.clone())
    }

    /// Returns a copy of this state with every velocity replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LengthMismatch`] if the particle count changes.
    pub fn with_velocities(&self, velocities: Vec<Vector3<f64>>) -> Result<Self, StateError> {
        Self::new(self.coordinates.clone(), self.elements.clone(), velocities)
    }
}
