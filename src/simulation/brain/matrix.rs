//! Weight matrix primitives and the matrix-level genetic operators.

use ndarray::{Array1, Array2, Zip, s};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use rand::Rng;

/// Creates a matrix with every element drawn uniformly from `[-1, 1)`.
pub fn random_matrix(rows: usize, cols: usize) -> Array2<f32> {
    Array2::random((rows, cols), Uniform::new(-1.0f32, 1.0))
}

/// Appends the constant bias input.
#[inline]
pub fn with_bias(values: &Array1<f32>) -> Array1<f32> {
    let mut biased = Array1::ones(values.len() + 1);
    biased.slice_mut(s![..values.len()]).assign(values);
    biased
}

/// One layer transition: bias, matrix product, ReLU.
#[inline]
pub fn forward(weights: &Array2<f32>, inputs: &Array1<f32>) -> Array1<f32> {
    let mut output = weights.dot(&with_bias(inputs));
    output.mapv_inplace(|x| x.max(0.0));
    output
}

/// Single-point crossover at a random cut.
///
/// Both parents must have the same shape.
pub fn crossover(parent1: &Array2<f32>, parent2: &Array2<f32>) -> Array2<f32> {
    let mut rng = rand::rng();
    let cut_row = rng.random_range(0..parent1.nrows());
    let cut_col = rng.random_range(0..parent1.ncols());
    crossover_at(parent1, parent2, cut_row, cut_col)
}

/// Single-point crossover in row-major order.
///
/// Elements up to and including `(cut_row, cut_col)` come from `parent1`,
/// the rest from `parent2`.
pub fn crossover_at(
    parent1: &Array2<f32>,
    parent2: &Array2<f32>,
    cut_row: usize,
    cut_col: usize,
) -> Array2<f32> {
    Array2::from_shape_fn(parent1.dim(), |(row, col)| {
        if row < cut_row || (row == cut_row && col <= cut_col) {
            parent1[[row, col]]
        } else {
            parent2[[row, col]]
        }
    })
}

/// Mutates each element independently with probability `rate`.
///
/// A mutated element is replaced by Gaussian noise scaled by 1/5 and
/// clamped to `[-1, 1]`; it does not build on the inherited value.
pub fn mutate(weights: &mut Array2<f32>, rate: f32) {
    if rate <= 0.0 {
        return;
    }
    let rolls = Array2::random(weights.dim(), Uniform::new(0.0f32, 1.0));
    let noise: Array2<f32> = Array2::random(weights.dim(), StandardNormal);

    Zip::from(weights)
        .and(&rolls)
        .and(&noise)
        .for_each(|weight, &roll, &gaussian| {
            if roll < rate {
                *weight = (gaussian / 5.0).clamp(-1.0, 1.0);
            }
        });
}
