//! Numeric helpers shared by families, the solver and statistics.

pub mod math;
