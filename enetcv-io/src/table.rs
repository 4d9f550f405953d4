//! Delimited numeric table reader.
//!
//! Reads tab, comma or whitespace delimited files of numbers. A first row
//! that is not entirely numeric is taken as a header. Missing-value
//! tokens are rejected: every cell must hold a number.

use std::path::Path;

use anyhow::{bail, Context, Result};

use enetcv_linalg::DenseMatrix;

/// A parsed numeric table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Option<Vec<String>>,
    /// Row-major values.
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    pub fn to_matrix(&self) -> DenseMatrix {
        DenseMatrix::from_rows(&self.rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Delimiter {
    Tab,
    Comma,
    Whitespace,
}

impl Delimiter {
    fn detect(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Tab => line.split('\t').map(|s| s.trim()).collect(),
            Delimiter::Comma => line.split(',').map(|s| s.trim()).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

fn is_missing(token: &str) -> bool {
    matches!(token, "NA" | "na" | "Na" | "NaN" | "nan" | "." | "" | "-")
}

/// Parse table text. `source` names the input in error messages.
pub fn parse_table(contents: &str, source: &str) -> Result<Table> {
    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

    let Some((first_num, first)) = lines.next() else {
        bail!("{} is empty", source);
    };
    let delim = Delimiter::detect(first);

    let first_fields = delim.split(first);
    let numeric = first_fields
        .iter()
        .all(|f| is_missing(f) || f.parse::<f64>().is_ok());
    let mut header = None;
    let mut rows = Vec::new();
    if numeric {
        rows.push(parse_row(&first_fields, first_num, source)?);
    } else {
        header = Some(first_fields.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    let width = header
        .as_ref()
        .map(|h: &Vec<String>| h.len())
        .unwrap_or(first_fields.len());
    for (line_num, line) in lines {
        let fields = delim.split(line);
        if fields.len() != width {
            bail!(
                "{} line {}: expected {} fields, found {}",
                source,
                line_num,
                width,
                fields.len()
            );
        }
        rows.push(parse_row(&fields, line_num, source)?);
    }

    if rows.is_empty() {
        bail!("{} has no data rows", source);
    }
    Ok(Table { header, rows })
}

fn parse_row(fields: &[&str], line_num: usize, source: &str) -> Result<Vec<f64>> {
    fields
        .iter()
        .enumerate()
        .map(|(j, f)| {
            if is_missing(f) {
                bail!(
                    "{} line {} column {}: missing value '{}' is not supported",
                    source,
                    line_num,
                    j + 1,
                    f
                );
            }
            let v: f64 = f
                .parse()
                .with_context(|| format!("{} line {} column {}: '{}' is not a number", source, line_num, j + 1, f))?;
            if !v.is_finite() {
                bail!("{} line {} column {}: non-finite value", source, line_num, j + 1);
            }
            Ok(v)
        })
        .collect()
}

/// Read a delimited numeric file.
pub fn read_table(path: &Path) -> Result<Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table: {}", path.display()))?;
    parse_table(&contents, &path.display().to_string())
}

/// Read a delimited numeric file as a matrix, one row per line.
pub fn read_matrix(path: &Path) -> Result<DenseMatrix> {
    Ok(read_table(path)?.to_matrix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_header_detection() {
        let t = parse_table("a\tb\n1\t2\n3\t4\n", "test").unwrap();
        assert_eq!(t.header, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(t.rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let t = parse_table("1 2\n3   4\n", "test").unwrap();
        assert!(t.header.is_none());
        assert_eq!(t.column(1), vec![2.0, 4.0]);
    }

    #[test]
    fn test_comma_and_comments() {
        let t = parse_table("# features\n1.5,2\n-3,4e-1\n", "test").unwrap();
        assert_eq!(t.rows[1], vec![-3.0, 0.4]);
    }

    #[test]
    fn test_missing_rejected_with_line() {
        let err = parse_table("1\t2\n3\tNA\n", "pheno.tsv").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "{}", msg);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(parse_table("1 2\n3\n", "test").is_err());
    }

    #[test]
    fn test_read_matrix_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "f1\tf2\tf3").unwrap();
        writeln!(f, "1\t2\t3").unwrap();
        writeln!(f, "4\t5\t6").unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!((m.nrows(), m.ncols()), (2, 3));
        assert_eq!(m.get(1, 2), 6.0);
    }
}
