//! Cross-validation machinery: folds, confound removal, standardization,
//! permutations, nested model selection and the outer loop.

pub mod deconfound;
pub mod folds;
pub mod outer;
pub mod permutation;
pub mod selection;
pub mod standardize;

pub use deconfound::Deconfounder;
pub use folds::{make_folds, FoldAssignment};
pub use outer::{run_outer_loop, FoldSummary, OuterInputs, OuterResult};
pub use permutation::{is_bijection, DependencyStructure, PermutationEngine, PermutationMode};
pub use selection::{FeatureMap, SelectedModel, Selector};
pub use standardize::Standardizer;
