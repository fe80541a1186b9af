//! Dense Linear Algebra Kernel
//!
//! ## Overview
//!
//! Small dense matrix primitives underlying the multi-scanner UKF:
//!
//! ```text
//! multiply      C = A × B
//! transpose     B = Aᵀ
//! outer         M = u × vᵀ
//! cholesky      A = L × Lᵀ          (lower triangular L)
//! invert        A⁻¹                 (Gauss-Jordan, partial pivoting)
//! quadratic     xᵀ × A × x
//! ```
//!
//! Dimensions follow the number of scanners a device is visible to, so the
//! matrix is sized at runtime rather than with const generics. Data is stored
//! row-major in a single `Vec<f64>`.
//!
//! ## Numerical Stability
//!
//! Covariance matrices in a long-running filter drift towards asymmetry and
//! near-singularity. The kernel answers that with fixed measures instead of
//! raising on every ill-conditioned input:
//!
//! - **Regularisation**: a fixed epsilon is added to the diagonal before
//!   decomposition and inversion
//! - **Symmetry**: [`make_symmetric`] averages off-diagonal pairs
//! - **Explicit failure**: a matrix that is still not positive definite (or
//!   still singular) after regularisation yields [`MatrixError`], and the
//!   caller switches to a cheaper approximation
//!
//! ## Backends
//!
//! The free functions here are the pure implementation. [`backend`] selects
//! between them and an optional accelerated implementation once per process.

pub mod backend;

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use thiserror_no_std::Error;

use crate::constants::ukf::{MATRIX_MAX_CONDITION, MATRIX_PIVOT_EPSILON, MATRIX_REGULARIZATION};

pub use backend::{
    active_backend, available_backends, init, is_acceleration_available, teardown, BackendKind,
    MatrixBackend, PureBackend,
};

/// Result type for matrix operations
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Reasons a matrix operation is unavailable
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixError {
    /// Not positive definite even after regularisation
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,
    /// Singular even after regularisation
    #[error("Matrix is singular")]
    Singular,
    /// Operand shapes are incompatible
    #[error("Dimension mismatch: {left_rows}x{left_cols} vs {right_rows}x{right_cols}")]
    DimensionMismatch {
        /// Rows of the left operand
        left_rows: usize,
        /// Columns of the left operand
        left_cols: usize,
        /// Rows of the right operand
        right_rows: usize,
        /// Columns of the right operand
        right_cols: usize,
    },
}

impl MatrixError {
    fn mismatch(a: &Matrix, b: &Matrix) -> Self {
        MatrixError::DimensionMismatch {
            left_rows: a.rows,
            left_cols: a.cols,
            right_rows: b.rows,
            right_cols: b.cols,
        }
    }
}

/// Dense row-major matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Diagonal matrix with the given entries
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diagonal.iter().enumerate() {
            m[(i, i)] = d;
        }
        m
    }

    /// Build from row-major data
    ///
    /// Returns `DimensionMismatch` when `data.len() != rows * cols`.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[f64]) -> MatrixResult<Self> {
        if data.len() != rows * cols {
            return Err(MatrixError::DimensionMismatch {
                left_rows: rows,
                left_cols: cols,
                right_rows: data.len(),
                right_cols: 1,
            });
        }
        Ok(Self {
            rows,
            cols,
            data: data.to_vec(),
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True for square matrices
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row-major backing data
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Diagonal entries
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self[(i, i)]).collect()
    }

    /// Add `value` to every diagonal entry
    pub fn add_diagonal(&mut self, value: f64) {
        for i in 0..self.rows.min(self.cols) {
            self[(i, i)] += value;
        }
    }

    /// Principal submatrix over `indices` (rows and columns alike)
    pub fn principal_submatrix(&self, indices: &[usize]) -> Self {
        let k = indices.len();
        let mut sub = Self::zeros(k, k);
        for (a, &i) in indices.iter().enumerate() {
            for (b, &j) in indices.iter().enumerate() {
                sub[(a, b)] = self[(i, j)];
            }
        }
        sub
    }

    /// Grow a square matrix by one row and column, zero except `diagonal`
    pub fn grow(&mut self, diagonal: f64) {
        let n = self.rows;
        let mut grown = Self::zeros(n + 1, n + 1);
        for i in 0..n {
            for j in 0..n {
                grown[(i, j)] = self[(i, j)];
            }
        }
        grown[(n, n)] = diagonal;
        *self = grown;
    }

    /// True when every entry is finite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

/// Matrix multiplication: C = A × B
///
/// Dimensions: A[R×K] × B[K×C] = C[R×C]
pub fn multiply(a: &Matrix, b: &Matrix) -> MatrixResult<Matrix> {
    if a.cols != b.rows {
        return Err(MatrixError::mismatch(a, b));
    }

    let mut result = Matrix::zeros(a.rows, b.cols);
    for i in 0..a.rows {
        for k in 0..a.cols {
            let aik = a[(i, k)];
            if aik == 0.0 {
                continue;
            }
            for j in 0..b.cols {
                result[(i, j)] += aik * b[(k, j)];
            }
        }
    }
    Ok(result)
}

/// Matrix transpose: B = Aᵀ
pub fn transpose(a: &Matrix) -> Matrix {
    let mut result = Matrix::zeros(a.cols, a.rows);
    for i in 0..a.rows {
        for j in 0..a.cols {
            result[(j, i)] = a[(i, j)];
        }
    }
    result
}

/// Outer product: M = u × vᵀ
pub fn outer(u: &[f64], v: &[f64]) -> Matrix {
    let mut result = Matrix::zeros(u.len(), v.len());
    for (i, &ui) in u.iter().enumerate() {
        for (j, &vj) in v.iter().enumerate() {
            result[(i, j)] = ui * vj;
        }
    }
    result
}

/// Matrix-vector multiplication: y = A × x
pub fn matvec(a: &Matrix, x: &[f64]) -> MatrixResult<Vec<f64>> {
    if a.cols != x.len() {
        return Err(MatrixError::DimensionMismatch {
            left_rows: a.rows,
            left_cols: a.cols,
            right_rows: x.len(),
            right_cols: 1,
        });
    }

    Ok((0..a.rows)
        .map(|i| (0..a.cols).map(|j| a[(i, j)] * x[j]).sum())
        .collect())
}

/// Quadratic form xᵀ × A × x
pub fn quadratic_form(a: &Matrix, x: &[f64]) -> MatrixResult<f64> {
    let ax = matvec(a, x)?;
    Ok(x.iter().zip(ax.iter()).map(|(xi, yi)| xi * yi).sum())
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Rounding in covariance updates leaves small asymmetries that Cholesky
/// rejects; averaging removes them.
pub fn make_symmetric(matrix: &mut Matrix) {
    let n = matrix.rows.min(matrix.cols);
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = (matrix[(i, j)] + matrix[(j, i)]) * 0.5;
            matrix[(i, j)] = avg;
            matrix[(j, i)] = avg;
        }
    }
}

/// Cholesky decomposition: A + εI = L × Lᵀ
///
/// ## Algorithm
///
/// For each element:
/// - Diagonal: L[j,j] = sqrt(A[j,j] - Σ(L[j,k]²))
/// - Below diagonal: L[i,j] = (A[i,j] - Σ(L[i,k]×L[j,k])) / L[j,j]
///
/// A fixed ε ([`MATRIX_REGULARIZATION`]) is added to the diagonal first.
/// Returns `NotPositiveDefinite` if a pivot is still not positive.
pub fn cholesky(a: &Matrix) -> MatrixResult<Matrix> {
    if !a.is_square() {
        return Err(MatrixError::mismatch(a, a));
    }

    let n = a.rows;
    let mut l = Matrix::zeros(n, n);

    for j in 0..n {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[(j, k)] * l[(j, k)];
        }

        let diag_val = a[(j, j)] + MATRIX_REGULARIZATION - sum;
        if !(diag_val > 0.0) || !diag_val.is_finite() {
            return Err(MatrixError::NotPositiveDefinite);
        }
        let ljj = libm::sqrt(diag_val);
        l[(j, j)] = ljj;

        for i in (j + 1)..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = (a[(i, j)] - sum) / ljj;
        }
    }

    Ok(l)
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// The input is regularised with [`MATRIX_REGULARIZATION`] on the diagonal.
/// Returns `Singular` when a pivot falls below [`MATRIX_PIVOT_EPSILON`].
pub fn invert(a: &Matrix) -> MatrixResult<Matrix> {
    if !a.is_square() {
        return Err(MatrixError::mismatch(a, a));
    }

    let n = a.rows;
    let width = 2 * n;
    let mut aug = vec![0.0; n * width];

    // [A + εI | I]
    for i in 0..n {
        for j in 0..n {
            aug[i * width + j] = a[(i, j)];
        }
        aug[i * width + i] += MATRIX_REGULARIZATION;
        aug[i * width + n + i] = 1.0;
    }

    for k in 0..n {
        let mut max_row = k;
        let mut max_val = libm::fabs(aug[k * width + k]);
        for i in (k + 1)..n {
            let v = libm::fabs(aug[i * width + k]);
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }

        if !(max_val > MATRIX_PIVOT_EPSILON) {
            return Err(MatrixError::Singular);
        }

        if max_row != k {
            for j in 0..width {
                aug.swap(k * width + j, max_row * width + j);
            }
        }

        let pivot = aug[k * width + k];
        for j in 0..width {
            aug[k * width + j] /= pivot;
        }

        for i in 0..n {
            if i != k {
                let factor = aug[i * width + k];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..width {
                    aug[i * width + j] -= factor * aug[k * width + j];
                }
            }
        }
    }

    let mut inv = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            inv[(i, j)] = aug[i * width + n + j];
        }
    }

    if inv.is_finite() && is_well_conditioned(a, &inv) {
        Ok(inv)
    } else {
        Err(MatrixError::Singular)
    }
}

/// Check an inverse against a crude condition number estimate
///
/// Uses ‖A‖max × ‖A⁻¹‖max. Regularisation turns exactly singular inputs into
/// merely huge inverses, which this catches.
pub fn is_well_conditioned(a: &Matrix, inv: &Matrix) -> bool {
    let max_abs = |m: &Matrix| m.as_slice().iter().fold(0.0f64, |acc, v| acc.max(libm::fabs(*v)));
    max_abs(a) * max_abs(inv) <= MATRIX_MAX_CONDITION
}
