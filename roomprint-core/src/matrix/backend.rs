//! Matrix Backend Selection
//!
//! The pure kernel in [`crate::matrix`] is always correct and always present.
//! With the `accelerated` feature, an `nalgebra` implementation can stand in
//! for it. Which one is used is decided once by [`init`] and held in
//! process-wide state until [`teardown`]:
//!
//! ```text
//! Uninitialised ──init()──→ Pure | Accelerated ──teardown()──→ Uninitialised
//! ```
//!
//! Before `init`, [`active_backend`] answers with the pure kernel, so callers
//! never need to check. Both implementations are held to the same test
//! vectors; results agree to floating-point tolerance.
//!
//! ```rust
//! use roomprint_core::matrix::{self, Matrix};
//!
//! matrix::init();
//! let a = Matrix::from_diagonal(&[4.0, 9.0]);
//! let l = matrix::active_backend().cholesky(&a).unwrap();
//! assert!((l[(1, 1)] - 3.0).abs() < 1e-6);
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

use super::{Matrix, MatrixResult};
use crate::logging::log_info;

const STATE_UNINITIALISED: u8 = 0;
const STATE_PURE: u8 = 1;
const STATE_ACCELERATED: u8 = 2;

static BACKEND_STATE: AtomicU8 = AtomicU8::new(STATE_UNINITIALISED);

/// Which kernel implementation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Portable implementation in this crate
    Pure,
    /// `nalgebra`-backed implementation
    Accelerated,
}

/// Operations the UKF delegates to a backend
pub trait MatrixBackend: Sync {
    /// Which implementation this is
    fn kind(&self) -> BackendKind;

    /// Lower Cholesky factor of a regularised symmetric matrix
    fn cholesky(&self, a: &Matrix) -> MatrixResult<Matrix>;

    /// Inverse of a regularised square matrix
    fn invert(&self, a: &Matrix) -> MatrixResult<Matrix>;

    /// Matrix product
    fn multiply(&self, a: &Matrix, b: &Matrix) -> MatrixResult<Matrix>;
}

/// Portable kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct PureBackend;

impl MatrixBackend for PureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pure
    }

    fn cholesky(&self, a: &Matrix) -> MatrixResult<Matrix> {
        super::cholesky(a)
    }

    fn invert(&self, a: &Matrix) -> MatrixResult<Matrix> {
        super::invert(a)
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> MatrixResult<Matrix> {
        super::multiply(a, b)
    }
}

static PURE: PureBackend = PureBackend;

#[cfg(feature = "accelerated")]
pub use accelerated::NalgebraBackend;

#[cfg(feature = "accelerated")]
mod accelerated {
    use nalgebra::DMatrix;

    use super::{BackendKind, MatrixBackend};
    use crate::constants::ukf::MATRIX_REGULARIZATION;
    use crate::matrix::{Matrix, MatrixError, MatrixResult};

    /// `nalgebra`-backed kernel
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NalgebraBackend;

    fn to_dmatrix(m: &Matrix) -> DMatrix<f64> {
        DMatrix::from_row_slice(m.rows(), m.cols(), m.as_slice())
    }

    fn from_dmatrix(m: &DMatrix<f64>) -> Matrix {
        let mut out = Matrix::zeros(m.nrows(), m.ncols());
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                out[(i, j)] = m[(i, j)];
            }
        }
        out
    }

    fn regularised(a: &Matrix) -> MatrixResult<DMatrix<f64>> {
        if !a.is_square() {
            return Err(MatrixError::DimensionMismatch {
                left_rows: a.rows(),
                left_cols: a.cols(),
                right_rows: a.rows(),
                right_cols: a.cols(),
            });
        }
        let n = a.rows();
        Ok(to_dmatrix(a) + DMatrix::<f64>::identity(n, n) * MATRIX_REGULARIZATION)
    }

    impl MatrixBackend for NalgebraBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Accelerated
        }

        fn cholesky(&self, a: &Matrix) -> MatrixResult<Matrix> {
            let m = regularised(a)?;
            m.cholesky()
                .map(|c| from_dmatrix(&c.l()))
                .ok_or(MatrixError::NotPositiveDefinite)
        }

        fn invert(&self, a: &Matrix) -> MatrixResult<Matrix> {
            let m = regularised(a)?;
            match m.try_inverse() {
                Some(inv) => {
                    let inv = from_dmatrix(&inv);
                    if inv.is_finite() && crate::matrix::is_well_conditioned(a, &inv) {
                        Ok(inv)
                    } else {
                        Err(MatrixError::Singular)
                    }
                }
                None => Err(MatrixError::Singular),
            }
        }

        fn multiply(&self, a: &Matrix, b: &Matrix) -> MatrixResult<Matrix> {
            if a.cols() != b.rows() {
                return Err(MatrixError::DimensionMismatch {
                    left_rows: a.rows(),
                    left_cols: a.cols(),
                    right_rows: b.rows(),
                    right_cols: b.cols(),
                });
            }
            Ok(from_dmatrix(&(to_dmatrix(a) * to_dmatrix(b))))
        }
    }

    pub(super) static NALGEBRA: NalgebraBackend = NalgebraBackend;
}

/// Detect the best available backend and make it active
///
/// Idempotent: once initialised, later calls return the existing choice.
pub fn init() -> BackendKind {
    let detected = if cfg!(feature = "accelerated") {
        STATE_ACCELERATED
    } else {
        STATE_PURE
    };

    match BACKEND_STATE.compare_exchange(
        STATE_UNINITIALISED,
        detected,
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => {
            let kind = kind_of(detected);
            log_info!("Matrix backend initialised: {:?}", kind);
            kind
        }
        Err(existing) => kind_of(existing),
    }
}

/// Return to the uninitialised state
///
/// [`active_backend`] falls back to the pure kernel until the next [`init`].
pub fn teardown() {
    BACKEND_STATE.store(STATE_UNINITIALISED, Ordering::Release);
}

/// True when [`init`] selected the accelerated backend
pub fn is_acceleration_available() -> bool {
    BACKEND_STATE.load(Ordering::Acquire) == STATE_ACCELERATED
}

/// Backend chosen by [`init`], or the pure kernel before initialisation
pub fn active_backend() -> &'static dyn MatrixBackend {
    match BACKEND_STATE.load(Ordering::Acquire) {
        #[cfg(feature = "accelerated")]
        STATE_ACCELERATED => &accelerated::NALGEBRA,
        _ => &PURE,
    }
}

/// Every backend compiled into this build, pure first
pub fn available_backends() -> alloc::vec::Vec<&'static dyn MatrixBackend> {
    #[allow(unused_mut)]
    let mut backends: alloc::vec::Vec<&'static dyn MatrixBackend> = alloc::vec![&PURE];
    #[cfg(feature = "accelerated")]
    backends.push(&accelerated::NALGEBRA);
    backends
}

fn kind_of(state: u8) -> BackendKind {
    if state == STATE_ACCELERATED {
        BackendKind::Accelerated
    } else {
        BackendKind::Pure
    }
}
