//! Permutation engine.
//!
//! Generates the response relabelings used to build the null
//! distribution. Permutation 0 is always the identity. Later permutations
//! are uniform shuffles, structure-preserving exchanges of dependency
//! pairs, or columns of a caller-supplied set.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use enetcv_linalg::DenseMatrix;

use crate::error::{PredictError, Result};

/// Pairwise dependency structure among samples.
///
/// Type 1 pairs (e.g. twins) and type 2 pairs are exchanged within their
/// own pools; a sample has at most one partner of each type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStructure {
    n: usize,
    type1: Vec<(usize, usize)>,
    type2: Vec<(usize, usize)>,
}

impl DependencyStructure {
    /// Build from `(i, j, type)` triples. Entries of type 0 are ignored,
    /// the same pair may appear in both orientations.
    pub fn from_pairs(n: usize, entries: &[(usize, usize, u8)]) -> Result<Self> {
        let mut partner = [vec![None; n], vec![None; n]];
        let mut pools: [Vec<(usize, usize)>; 2] = [Vec::new(), Vec::new()];

        for &(i, j, t) in entries {
            if i >= n || j >= n {
                return Err(PredictError::InvalidInput(format!(
                    "structure entry ({}, {}) out of range for {} samples",
                    i + 1,
                    j + 1,
                    n
                )));
            }
            if t == 0 || i == j {
                continue;
            }
            if t > 2 {
                return Err(PredictError::InvalidInput(format!(
                    "structure entry ({}, {}) has type {}, expected 0, 1 or 2",
                    i + 1,
                    j + 1,
                    t
                )));
            }
            let slot = &mut partner[(t - 1) as usize];
            match (slot[i], slot[j]) {
                (Some(a), Some(b)) if a == j && b == i => continue,
                (None, None) => {
                    slot[i] = Some(j);
                    slot[j] = Some(i);
                    pools[(t - 1) as usize].push((i.min(j), i.max(j)));
                }
                _ => {
                    return Err(PredictError::InvalidInput(format!(
                        "sample {} or {} already has a type {} partner",
                        i + 1,
                        j + 1,
                        t
                    )))
                }
            }
        }

        let [mut type1, mut type2] = pools;
        type1.sort_unstable();
        type2.sort_unstable();
        Ok(Self { n, type1, type2 })
    }

    /// Build from a symmetric N x N matrix with entries in {0, 1, 2}.
    /// The diagonal is ignored.
    pub fn from_matrix(m: &DenseMatrix) -> Result<Self> {
        let n = m.nrows();
        if m.ncols() != n {
            return Err(PredictError::DimensionMismatch {
                what: "structure matrix columns",
                expected: n,
                got: m.ncols(),
            });
        }
        let mut entries = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let v = m.get(i, j);
                if v != m.get(j, i) {
                    return Err(PredictError::InvalidInput(format!(
                        "structure matrix is not symmetric at ({}, {})",
                        i + 1,
                        j + 1
                    )));
                }
                let t = match v {
                    v if v == 0.0 => continue,
                    v if v == 1.0 => 1,
                    v if v == 2.0 => 2,
                    _ => {
                        return Err(PredictError::InvalidInput(format!(
                            "structure matrix entry {} at ({}, {}) is not 0, 1 or 2",
                            v,
                            i + 1,
                            j + 1
                        )))
                    }
                };
                entries.push((i, j, t));
            }
        }
        Self::from_pairs(n, &entries)
    }

    pub fn n_samples(&self) -> usize {
        self.n
    }

    /// Pairs of type 1 or 2, each as (smaller, larger) index.
    pub fn pairs_of_type(&self, t: u8) -> &[(usize, usize)] {
        match t {
            1 => &self.type1,
            2 => &self.type2,
            _ => &[],
        }
    }

    /// Type 2 pairs with neither member in a type 1 pair, and the members
    /// of the remaining type 2 pairs that are not in a type 1 pair.
    pub fn type2_split(&self) -> (Vec<(usize, usize)>, Vec<usize>) {
        let mut in_type1 = vec![false; self.n];
        for &(a, b) in &self.type1 {
            in_type1[a] = true;
            in_type1[b] = true;
        }
        let mut whole = Vec::new();
        let mut halves = Vec::new();
        for &(a, b) in &self.type2 {
            match (in_type1[a], in_type1[b]) {
                (false, false) => whole.push((a, b)),
                (true, false) => halves.push(b),
                (false, true) => halves.push(a),
                (true, true) => {}
            }
        }
        (whole, halves)
    }

    /// Every pair regardless of type.
    pub fn all_pairs(&self) -> Vec<(usize, usize)> {
        self.type1.iter().chain(self.type2.iter()).copied().collect()
    }
}

/// How non-reference permutations are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermutationMode {
    Unconstrained,
    StructurePreserving,
    PreSupplied,
}

#[derive(Debug, Clone)]
enum Source {
    Unconstrained,
    StructurePreserving(DependencyStructure),
    PreSupplied(Vec<Vec<usize>>),
}

/// Produces the permutation for each pass of a run.
#[derive(Debug, Clone)]
pub struct PermutationEngine {
    n: usize,
    n_perm: usize,
    source: Source,
}

impl PermutationEngine {
    /// Choose the generation mode once. A supplied set takes precedence
    /// over a structure and fixes the permutation count to its width.
    pub fn new(
        n: usize,
        n_perm: usize,
        structure: Option<DependencyStructure>,
        supplied: Option<Vec<Vec<usize>>>,
    ) -> Result<Self> {
        if let Some(columns) = supplied {
            if columns.is_empty() {
                return Err(PredictError::Configuration("supplied permutation set is empty".into()));
            }
            for (k, col) in columns.iter().enumerate() {
                if col.len() != n {
                    return Err(PredictError::Configuration(format!(
                        "supplied permutation {} has {} entries, expected {}",
                        k + 1,
                        col.len(),
                        n
                    )));
                }
                if !is_bijection(col, n) {
                    return Err(PredictError::InvalidInput(format!(
                        "supplied permutation {} is not a permutation of the samples",
                        k + 1
                    )));
                }
            }
            if columns[0].iter().enumerate().any(|(i, &s)| i != s) {
                warn!("First supplied permutation is not the identity; the unpermuted data is used instead");
            }
            if n_perm != columns.len() {
                warn!(
                    "Using {} permutations from the supplied set instead of the requested {}",
                    columns.len(),
                    n_perm
                );
            }
            return Ok(Self {
                n,
                n_perm: columns.len(),
                source: Source::PreSupplied(columns),
            });
        }

        let source = match structure {
            Some(s) => {
                if s.n_samples() != n {
                    return Err(PredictError::DimensionMismatch {
                        what: "structure matrix samples",
                        expected: n,
                        got: s.n_samples(),
                    });
                }
                warn_small_pools(&s);
                Source::StructurePreserving(s)
            }
            None => Source::Unconstrained,
        };
        Ok(Self { n, n_perm, source })
    }

    pub fn n_perm(&self) -> usize {
        self.n_perm
    }

    pub fn mode(&self) -> PermutationMode {
        match self.source {
            Source::Unconstrained => PermutationMode::Unconstrained,
            Source::StructurePreserving(_) => PermutationMode::StructurePreserving,
            Source::PreSupplied(_) => PermutationMode::PreSupplied,
        }
    }

    /// Source index for every sample in permutation `index`: sample `i`
    /// takes the response of sample `perm[i]`.
    pub fn permutation<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Vec<usize>> {
        if index >= self.n_perm {
            return Err(PredictError::Configuration(format!(
                "permutation {} requested, only {} available",
                index + 1,
                self.n_perm
            )));
        }
        if index == 0 {
            return Ok((0..self.n).collect());
        }
        Ok(match &self.source {
            Source::Unconstrained => {
                let mut perm: Vec<usize> = (0..self.n).collect();
                perm.shuffle(rng);
                perm
            }
            Source::StructurePreserving(s) => structured_permutation(s, rng),
            Source::PreSupplied(columns) => columns[index].clone(),
        })
    }
}

fn warn_small_pools(s: &DependencyStructure) {
    let (whole, halves) = s.type2_split();
    for (what, len) in [
        ("type 1 pairs", s.pairs_of_type(1).len()),
        ("type 2 pairs", whole.len()),
        ("partly paired type 2 samples", halves.len()),
    ] {
        if len == 1 {
            warn!("Only one unit among {}; it keeps its own responses in every permutation", what);
        }
    }
}

/// Random derangement of `0..m` by rejection; identity when m < 2.
fn derangement<R: Rng + ?Sized>(m: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..m).collect();
    if m < 2 {
        return order;
    }
    loop {
        order.shuffle(rng);
        if order.iter().enumerate().all(|(i, &s)| i != s) {
            return order;
        }
    }
}

fn exchange_pairs<R: Rng + ?Sized>(
    pool: &[(usize, usize)],
    perm: &mut [Option<usize>],
    rng: &mut R,
) {
    let sources = derangement(pool.len(), rng);
    for (q, &(a, b)) in pool.iter().enumerate() {
        let (c, d) = pool[sources[q]];
        if rng.gen_bool(0.5) {
            perm[a] = Some(c);
            perm[b] = Some(d);
        } else {
            perm[a] = Some(d);
            perm[b] = Some(c);
        }
    }
}

fn structured_permutation<R: Rng + ?Sized>(s: &DependencyStructure, rng: &mut R) -> Vec<usize> {
    let n = s.n_samples();
    let mut perm: Vec<Option<usize>> = vec![None; n];

    exchange_pairs(s.pairs_of_type(1), &mut perm, rng);

    // A type 2 pair with a member already placed leaves its other member
    // to be shuffled among the other half-placed type 2 members
    let (whole, halves) = s.type2_split();
    exchange_pairs(&whole, &mut perm, rng);
    let sources = derangement(halves.len(), rng);
    for (q, &target) in halves.iter().enumerate() {
        perm[target] = Some(halves[sources[q]]);
    }

    let free: Vec<usize> = (0..n).filter(|&i| perm[i].is_none()).collect();
    let mut shuffled = free.clone();
    shuffled.shuffle(rng);
    for (&target, &source) in free.iter().zip(shuffled.iter()) {
        perm[target] = Some(source);
    }

    perm.into_iter().enumerate().map(|(i, s)| s.unwrap_or(i)).collect()
}

/// Whether `perm` contains each of `0..n` exactly once.
pub fn is_bijection(perm: &[usize], n: usize) -> bool {
    if perm.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &s in perm {
        if s >= n || seen[s] {
            return false;
        }
        seen[s] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn twins(n_pairs: usize) -> DependencyStructure {
        let entries: Vec<_> = (0..n_pairs).map(|q| (2 * q, 2 * q + 1, 1u8)).collect();
        DependencyStructure::from_pairs(2 * n_pairs, &entries).unwrap()
    }

    #[test]
    fn test_first_permutation_is_identity() {
        let engine = PermutationEngine::new(5, 3, None, None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(engine.permutation(0, &mut rng).unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(is_bijection(&engine.permutation(1, &mut rng).unwrap(), 5));
    }

    #[test]
    fn test_structure_matrix_validation() {
        let mut m = DenseMatrix::zeros(3, 3);
        m.set(0, 1, 1.0);
        assert!(DependencyStructure::from_matrix(&m).is_err());
        m.set(1, 0, 1.0);
        let s = DependencyStructure::from_matrix(&m).unwrap();
        assert_eq!(s.pairs_of_type(1), &[(0, 1)]);
        m.set(0, 2, 1.0);
        m.set(2, 0, 1.0);
        assert!(DependencyStructure::from_matrix(&m).is_err());
    }

    #[test]
    fn test_pairs_are_exchanged_as_units() {
        let s = twins(4);
        let engine = PermutationEngine::new(8, 20, Some(s), None).unwrap();
        assert_eq!(engine.mode(), PermutationMode::StructurePreserving);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for k in 1..20 {
            let perm = engine.permutation(k, &mut rng).unwrap();
            assert!(is_bijection(&perm, 8));
            for q in 0..4 {
                let (a, b) = (perm[2 * q], perm[2 * q + 1]);
                // Both sources come from one pair, never the pair itself
                assert_eq!(a / 2, b / 2);
                assert_ne!(a / 2, q);
            }
        }
    }

    #[test]
    fn test_overlapping_type2_pair_draws_from_type2_pool() {
        let entries = [(0, 1, 1), (2, 3, 1), (1, 4, 2), (5, 6, 2), (3, 7, 2), (8, 9, 2)];
        let s = DependencyStructure::from_pairs(11, &entries).unwrap();
        let (whole, halves) = s.type2_split();
        assert_eq!(whole, vec![(5, 6), (8, 9)]);
        assert_eq!(halves, vec![4, 7]);

        let engine = PermutationEngine::new(11, 200, Some(s), None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let type2_members = [1, 3, 4, 5, 6, 7, 8, 9];
        for k in 1..200 {
            let perm = engine.permutation(k, &mut rng).unwrap();
            assert!(is_bijection(&perm, 11));
            for i in [0, 1, 2, 3] {
                assert!(perm[i] < 4, "type 1 sample {} sourced from {}", i, perm[i]);
            }
            for i in [4, 5, 6, 7, 8, 9] {
                assert!(type2_members.contains(&perm[i]), "sample {} sourced from {}", i, perm[i]);
            }
            assert_eq!(perm[4], 7);
            assert_eq!(perm[7], 4);
            assert_eq!(perm[10], 10);
        }
    }

    #[test]
    fn test_single_pair_pool_is_fixed() {
        let entries = [(0, 1, 1), (2, 3, 1), (4, 5, 2)];
        let s = DependencyStructure::from_pairs(6, &entries).unwrap();
        let engine = PermutationEngine::new(6, 10, Some(s), None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for k in 1..10 {
            let perm = engine.permutation(k, &mut rng).unwrap();
            let mut lone = [perm[4], perm[5]];
            lone.sort_unstable();
            assert_eq!(lone, [4, 5]);
        }
    }

    #[test]
    fn test_supplied_set_overrides_count() {
        let cols = vec![vec![0, 1, 2], vec![2, 0, 1]];
        let engine = PermutationEngine::new(3, 100, None, Some(cols)).unwrap();
        assert_eq!(engine.n_perm(), 2);
        assert_eq!(engine.mode(), PermutationMode::PreSupplied);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(engine.permutation(1, &mut rng).unwrap(), vec![2, 0, 1]);
        assert!(engine.permutation(2, &mut rng).is_err());
    }

    #[test]
    fn test_supplied_set_width_mismatch() {
        let cols = vec![vec![0, 1, 2], vec![1, 0]];
        assert!(matches!(
            PermutationEngine::new(3, 2, None, Some(cols)),
            Err(PredictError::Configuration(_))
        ));
        let not_bijective = vec![vec![0, 1, 2], vec![0, 0, 1]];
        assert!(PermutationEngine::new(3, 2, None, Some(not_bijective)).is_err());
    }

    #[test]
    fn test_non_identity_first_column_ignored() {
        let cols = vec![vec![1, 0], vec![1, 0]];
        let engine = PermutationEngine::new(2, 2, None, Some(cols)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(engine.permutation(0, &mut rng).unwrap(), vec![0, 1]);
    }
}
