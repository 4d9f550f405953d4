//! enetcv-io: file formats for enetcv
//!
//! Delimited numeric tables, per-family responses, dependency structures
//! (dense or coordinate list), permutation sets and result files.

pub mod output;
pub mod response;
pub mod structure;
pub mod table;

pub use response::{parse_response, read_response, ResponseData};
pub use structure::{read_permutations, read_structure};
pub use table::{read_matrix, read_table, Table};
