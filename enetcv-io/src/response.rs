//! Response parsing per family.

use std::path::Path;

use anyhow::{bail, Result};

use enetcv_core::family::{Family, MAX_CLASSES};
use enetcv_core::Response;

use crate::table::{read_table, Table};

/// A parsed response and, for multi-class data, the label value of each
/// class index.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub response: Response,
    pub class_values: Option<Vec<f64>>,
}

fn single_column(table: &Table, family: Family) -> Result<Vec<f64>> {
    if table.ncols() != 1 {
        bail!(
            "a {} response needs exactly one column, found {}",
            family,
            table.ncols()
        );
    }
    Ok(table.column(0))
}

/// Build a response of `family` from a table.
///
/// - gaussian: one column
/// - poisson: one column of non-negative counts
/// - multinomial: one column of integer labels, or a 0/1 indicator matrix
/// - cox: two columns, time and status (1 = event, 0 = censored)
pub fn parse_response(table: &Table, family: Family) -> Result<ResponseData> {
    let response = match family {
        Family::Gaussian => Response::Continuous(single_column(table, family)?),
        Family::Poisson => {
            let counts = single_column(table, family)?;
            if let Some(i) = counts.iter().position(|&c| c < 0.0) {
                bail!("count response row {} is negative ({})", i + 1, counts[i]);
            }
            Response::Count(counts)
        }
        Family::Multinomial => return parse_classes(table),
        Family::Cox => {
            if table.ncols() != 2 {
                bail!(
                    "a cox response needs two columns (time, status), found {}",
                    table.ncols()
                );
            }
            let status = table
                .column(1)
                .iter()
                .enumerate()
                .map(|(i, &s)| match s {
                    s if s == 1.0 => Ok(true),
                    s if s == 0.0 => Ok(false),
                    _ => bail!("status row {} must be 0 or 1, found {}", i + 1, s),
                })
                .collect::<Result<Vec<_>>>()?;
            Response::survival(table.column(0), status)?
        }
    };
    Ok(ResponseData {
        response,
        class_values: None,
    })
}

fn parse_classes(table: &Table) -> Result<ResponseData> {
    if table.ncols() == 1 {
        let values = table.column(0);
        if let Some(i) = values.iter().position(|v| v.fract() != 0.0) {
            bail!("class label in row {} is not an integer ({})", i + 1, values[i]);
        }
        let mut distinct = values.clone();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();
        if distinct.len() > MAX_CLASSES {
            bail!(
                "{} distinct class labels, at most {} are supported",
                distinct.len(),
                MAX_CLASSES
            );
        }
        let labels = values
            .iter()
            .map(|v| distinct.iter().position(|d| d == v).unwrap_or(0))
            .collect();
        let n_classes = distinct.len();
        return Ok(ResponseData {
            response: Response::classes(labels, n_classes)?,
            class_values: Some(distinct),
        });
    }

    // Indicator matrix: one 1 per row
    let labels = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let ones: Vec<usize> = (0..row.len()).filter(|&k| row[k] == 1.0).collect();
            let zeros = row.iter().filter(|&&v| v == 0.0).count();
            if ones.len() != 1 || zeros != row.len() - 1 {
                bail!("indicator row {} must hold a single 1 and zeros elsewhere", i + 1);
            }
            Ok(ones[0])
        })
        .collect::<Result<Vec<_>>>()?;
    let n_classes = table.ncols();
    Ok(ResponseData {
        response: Response::classes(labels, n_classes)?,
        class_values: Some((0..n_classes).map(|k| k as f64).collect()),
    })
}

/// Read and parse a response file.
pub fn read_response(path: &Path, family: Family) -> Result<ResponseData> {
    parse_response(&read_table(path)?, family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    #[test]
    fn test_labels_mapped_in_sorted_order() {
        let t = parse_table("5\n2\n5\n9\n", "y").unwrap();
        let r = parse_response(&t, Family::Multinomial).unwrap();
        assert_eq!(r.response.labels().unwrap(), &[1, 0, 1, 2]);
        assert_eq!(r.class_values, Some(vec![2.0, 5.0, 9.0]));
    }

    #[test]
    fn test_indicator_matrix() {
        let t = parse_table("1 0 0\n0 0 1\n0 1 0\n", "y").unwrap();
        let r = parse_response(&t, Family::Multinomial).unwrap();
        assert_eq!(r.response.labels().unwrap(), &[0, 2, 1]);
        let bad = parse_table("1 1 0\n0 0 1\n", "y").unwrap();
        assert!(parse_response(&bad, Family::Multinomial).is_err());
    }

    #[test]
    fn test_too_many_classes() {
        let text: String = (0..12).map(|k| format!("{}\n", k)).collect();
        let t = parse_table(&text, "y").unwrap();
        assert!(parse_response(&t, Family::Multinomial).is_err());
    }

    #[test]
    fn test_survival_columns() {
        let t = parse_table("time status\n3.5 1\n2.0 0\n", "y").unwrap();
        let r = parse_response(&t, Family::Cox).unwrap();
        assert_eq!(
            r.response,
            Response::Survival {
                time: vec![3.5, 2.0],
                status: vec![true, false]
            }
        );
        let bad = parse_table("3.5 2\n", "y").unwrap();
        assert!(parse_response(&bad, Family::Cox).is_err());
    }

    #[test]
    fn test_negative_counts_rejected() {
        let t = parse_table("1\n-2\n", "y").unwrap();
        assert!(parse_response(&t, Family::Poisson).is_err());
        assert!(parse_response(&t, Family::Gaussian).is_ok());
    }
}
