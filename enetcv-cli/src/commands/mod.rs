pub mod folds;
pub mod permute;
pub mod predict;

use anyhow::{Context, Result};

/// Parse a comma-separated list.
pub fn parse_list<T: std::str::FromStr>(text: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .with_context(|| format!("Invalid {} value: '{}'", what, s))
        })
        .collect()
}
