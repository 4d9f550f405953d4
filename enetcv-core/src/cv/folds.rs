//! Fold generation.
//!
//! Samples linked by dependency pairs form atomic units that always land
//! in the same fold. Multi-sample units are placed first, largest first,
//! then singletons fill the folds to balance size and, for multi-class
//! responses, class representation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{PredictError, Result};
use crate::family::Response;

/// A partition of `0..n` into disjoint test groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    groups: Vec<Vec<usize>>,
    n: usize,
}

impl FoldAssignment {
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn n_folds(&self) -> usize {
        self.groups.len()
    }

    /// Test indices of fold `k`, ascending.
    pub fn test(&self, k: usize) -> &[usize] {
        &self.groups[k]
    }

    /// Training indices of fold `k`: everything outside its test group.
    pub fn train(&self, k: usize) -> Vec<usize> {
        let mut in_test = vec![false; self.n];
        for &i in &self.groups[k] {
            in_test[i] = true;
        }
        (0..self.n).filter(|&i| !in_test[i]).collect()
    }

    /// Fold index of every sample.
    pub fn fold_of(&self) -> Vec<usize> {
        let mut out = vec![0; self.n];
        for (k, group) in self.groups.iter().enumerate() {
            for &i in group {
                out[i] = k;
            }
        }
        out
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Connected components of the pair graph, each sorted, ordered by their
/// smallest member.
pub fn atomic_units(n: usize, pairs: &[(usize, usize)]) -> Result<Vec<Vec<usize>>> {
    let mut parent: Vec<usize> = (0..n).collect();
    for &(a, b) in pairs {
        if a >= n || b >= n {
            return Err(PredictError::InvalidInput(format!(
                "dependency pair ({}, {}) out of range for {} samples",
                a, b, n
            )));
        }
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut slot = vec![usize::MAX; n];
    let mut units: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        if slot[root] == usize::MAX {
            slot[root] = units.len();
            units.push(Vec::new());
        }
        units[slot[root]].push(i);
    }
    Ok(units)
}

/// Pairs with both members in `indices`, renumbered to positions within it.
pub fn local_pairs(pairs: &[(usize, usize)], indices: &[usize], n: usize) -> Vec<(usize, usize)> {
    let mut position = vec![usize::MAX; n];
    for (local, &i) in indices.iter().enumerate() {
        position[i] = local;
    }
    pairs
        .iter()
        .filter_map(|&(a, b)| {
            let (la, lb) = (*position.get(a)?, *position.get(b)?);
            (la != usize::MAX && lb != usize::MAX).then_some((la, lb))
        })
        .collect()
}

/// Partition the samples of `y` into `k` folds (0 = leave-one-out).
pub fn make_folds<R: Rng + ?Sized>(
    y: &Response,
    k: usize,
    pairs: &[(usize, usize)],
    rng: &mut R,
) -> Result<FoldAssignment> {
    let n = y.len();
    let mut units = atomic_units(n, pairs)?;

    if k == 0 {
        return Ok(FoldAssignment { groups: units, n });
    }
    if k == 1 || k > units.len() {
        return Err(PredictError::Configuration(format!(
            "cannot make {} folds from {} independent units",
            k,
            units.len()
        )));
    }

    units.shuffle(rng);
    units.sort_by(|a, b| b.len().cmp(&a.len()));

    let labels = y.labels();
    let n_classes = y.n_outputs();
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut class_counts = vec![vec![0usize; n_classes]; k];

    for unit in units {
        let target = if unit.len() == 1 {
            match labels {
                Some(labels) => {
                    let c = labels[unit[0]];
                    (0..k)
                        .min_by_key(|&g| (class_counts[g][c], groups[g].len(), g))
                        .unwrap_or(0)
                }
                None => (0..k).min_by_key(|&g| (groups[g].len(), g)).unwrap_or(0),
            }
        } else {
            (0..k).min_by_key(|&g| (groups[g].len(), g)).unwrap_or(0)
        };
        if let Some(labels) = labels {
            for &i in &unit {
                class_counts[target][labels[i]] += 1;
            }
        }
        groups[target].extend(unit);
    }

    for group in groups.iter_mut() {
        group.sort_unstable();
    }
    Ok(FoldAssignment { groups, n })
}
