//! Dependency-structure and permutation-set readers.
//!
//! A structure file is either a dense N x N matrix of pair types or a
//! coordinate list of `i j type` lines (1-based), optionally in
//! MatrixMarket layout: `%` comment lines, then a `rows cols entries`
//! size line. Coordinate entries are symmetric; either orientation may
//! be listed.

use std::path::Path;

use anyhow::{bail, Context, Result};

use enetcv_core::cv::permutation::DependencyStructure;

use crate::table::parse_table;

fn parse_index(token: &str, n: usize, line_num: usize) -> Result<usize> {
    let i: usize = token
        .parse()
        .with_context(|| format!("line {}: '{}' is not a sample index", line_num, token))?;
    if i == 0 || i > n {
        bail!("line {}: sample index {} outside 1..={}", line_num, i, n);
    }
    Ok(i - 1)
}

fn parse_coordinates(contents: &str, n: usize) -> Result<DependencyStructure> {
    let market = contents.trim_start().starts_with("%%MatrixMarket");
    let mut size_seen = !market;
    let mut entries = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if !size_seen {
            size_seen = true;
            let dims: Vec<usize> = fields.iter().filter_map(|f| f.parse().ok()).collect();
            if dims.len() < 2 || dims[0] != n || dims[1] != n {
                bail!("line {}: structure is not {} x {}", line_num, n, n);
            }
            continue;
        }
        if fields.len() != 3 {
            bail!("line {}: expected 'i j type', found {} fields", line_num, fields.len());
        }
        let i = parse_index(fields[0], n, line_num)?;
        let j = parse_index(fields[1], n, line_num)?;
        let t: f64 = fields[2]
            .parse()
            .with_context(|| format!("line {}: '{}' is not a pair type", line_num, fields[2]))?;
        if t != 0.0 && t != 1.0 && t != 2.0 {
            bail!("line {}: pair type must be 0, 1 or 2, found {}", line_num, t);
        }
        entries.push((i, j, t as u8));
    }

    Ok(DependencyStructure::from_pairs(n, &entries)?)
}

/// Parse structure text for `n` samples. A table with `n` fields per
/// line is read as dense.
pub fn parse_structure(contents: &str, n: usize) -> Result<DependencyStructure> {
    let first = contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("");
    if first.starts_with('%') {
        return parse_coordinates(contents, n);
    }
    let width = first
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .count();
    if width == n {
        let table = parse_table(contents, "structure")?;
        let types_only = table.rows.iter().flatten().all(|&v| v == 0.0 || v == 1.0 || v == 2.0);
        // An n x n table of pair types; only n = 3 can also be a coordinate list
        if table.nrows() == n && (n != 3 || types_only) {
            return Ok(DependencyStructure::from_matrix(&table.to_matrix())?);
        }
        if n != 3 {
            bail!(
                "dense structure is {} x {}, expected {} x {}",
                table.nrows(),
                table.ncols(),
                n,
                n
            );
        }
    }
    parse_coordinates(contents, n)
}

/// Read a dependency structure for `n` samples.
pub fn read_structure(path: &Path, n: usize) -> Result<DependencyStructure> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read structure file: {}", path.display()))?;
    parse_structure(&contents, n).with_context(|| format!("Invalid structure file: {}", path.display()))
}

/// Read an N x P table of 1-based source indices into P 0-based columns.
pub fn read_permutations(path: &Path, n: usize) -> Result<Vec<Vec<usize>>> {
    let table = crate::table::read_table(path)?;
    if table.nrows() != n {
        bail!(
            "{}: {} rows, expected one per sample ({})",
            path.display(),
            table.nrows(),
            n
        );
    }
    (0..table.ncols())
        .map(|k| {
            table
                .column(k)
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    if v.fract() != 0.0 || v < 1.0 || v > n as f64 {
                        bail!(
                            "{}: permutation {} row {} holds {}, expected an index in 1..={}",
                            path.display(),
                            k + 1,
                            i + 1,
                            v,
                            n
                        );
                    }
                    Ok(v as usize - 1)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_dense_structure() {
        let s = parse_structure("0 1 0 0\n1 0 0 0\n0 0 0 2\n0 0 2 0\n", 4).unwrap();
        assert_eq!(s.pairs_of_type(1), &[(0, 1)]);
        assert_eq!(s.pairs_of_type(2), &[(2, 3)]);
    }

    #[test]
    fn test_matrix_market_structure() {
        let text = "%%MatrixMarket matrix coordinate integer symmetric\n% twins\n6 6 2\n1 2 1\n5 3 1\n";
        let s = parse_structure(text, 6).unwrap();
        assert_eq!(s.pairs_of_type(1), &[(0, 1), (2, 4)]);
    }

    #[test]
    fn test_plain_coordinate_list() {
        let s = parse_structure("1 2 1\n2 1 1\n3 4 2\n", 5).unwrap();
        assert_eq!(s.all_pairs(), vec![(0, 1), (2, 3)]);
        assert!(parse_structure("1 9 1\n", 5).is_err());
    }

    #[test]
    fn test_read_permutations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perms.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "1 3").unwrap();
        writeln!(f, "2 1").unwrap();
        writeln!(f, "3 2").unwrap();
        let cols = read_permutations(&path, 3).unwrap();
        assert_eq!(cols, vec![vec![0, 1, 2], vec![2, 0, 1]]);
        assert!(read_permutations(&path, 4).is_err());
    }
}
