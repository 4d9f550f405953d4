//! enetcv-linalg: Linear algebra wrappers for enetcv
//!
//! Provides the dense matrix type shared by every enetcv crate and the
//! least-squares decompositions used for confound regression.

pub mod decomposition;
pub mod dense;

pub use decomposition::LinalgError;
pub use dense::DenseMatrix;
