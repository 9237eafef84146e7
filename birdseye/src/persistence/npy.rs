//! Particle snapshots as NumPy `.npy` files.
//!
//! Each snapshot is a C-ordered `f64` matrix of shape `(particles, STATE_DIM)`.

use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use ndarray_npy::{WriteNpyError, WriteNpyExt};

use crate::estimator::{Particle, STATE_DIM};

/// Particles as a `(rows, STATE_DIM)` matrix.
pub fn to_array(rows: &[Particle]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), STATE_DIM), |(i, j)| rows[i][j])
}

/// Write particles to `path` as a `.npy` file.
pub fn write(path: &Path, rows: &[Particle]) -> Result<(), WriteNpyError> {
    let file = File::create(path)?;
    to_array(rows).write_npy(file)
}
