use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Tab-separated numeric table keyed by leaf identifier. The first header
/// cell names the id column and is discarded; every data row must carry one
/// value per remaining header column. The global minimum and maximum are
/// computed once for heatmap color scaling.
#[derive(Debug, Clone)]
pub struct MatrixTable {
    pub header: Vec<String>,
    rows: HashMap<String, Vec<f64>>,
    pub min: f64,
    pub max: f64,
}

impl MatrixTable {
    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn load_matrix(path: &Path) -> Result<MatrixTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read matrix file: {}", path.display()))?;
    parse_matrix(&raw)
}

pub fn parse_matrix(raw: &str) -> Result<MatrixTable> {
    let mut lines = raw.lines();

    let header_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .context("matrix file is missing a header line")?;
    let mut header: Vec<String> = header_line
        .split('\t')
        .map(|cell| cell.trim_end().to_string())
        .collect();
    header.remove(0); // first cell names the id column

    if header.is_empty() {
        bail!("matrix header declares no value columns");
    }

    let mut rows = HashMap::new();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut cells = line.split('\t');
        let id = cells.next().unwrap_or("").trim().to_string();
        if id.is_empty() {
            bail!("matrix row {} has an empty identifier", line_no + 2);
        }

        let mut values = Vec::with_capacity(header.len());
        for (col, cell) in cells.enumerate() {
            let value: f64 = cell.trim().parse().with_context(|| {
                format!(
                    "matrix row {} column \"{}\" is not numeric: {:?}",
                    line_no + 2,
                    header.get(col).map(String::as_str).unwrap_or("?"),
                    cell
                )
            })?;
            min = min.min(value);
            max = max.max(value);
            values.push(value);
        }

        if values.len() != header.len() {
            bail!(
                "matrix row {} has {} values but the header declares {} columns",
                line_no + 2,
                values.len(),
                header.len()
            );
        }

        rows.insert(id, values);
    }

    if rows.is_empty() {
        bail!("matrix file contains no data rows");
    }

    Ok(MatrixTable {
        header,
        rows,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let mat = parse_matrix("#Names\tc1\tc2\ntyr1\t0.5\t-1\ntyr2\t2\t0\n").unwrap();
        assert_eq!(mat.header, vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(mat.row_count(), 2);
        assert_eq!(mat.get("tyr1"), Some([0.5, -1.0].as_slice()));
        assert_eq!(mat.min, -1.0);
        assert_eq!(mat.max, 2.0);
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(parse_matrix("#Names\tc1\tc2\ntyr1\t0.5\n").is_err());
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let err = parse_matrix("#Names\tc1\ntyr1\tabc\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("c1"));
    }

    #[test]
    fn rejects_empty_tables() {
        assert!(parse_matrix("").is_err());
        assert!(parse_matrix("#Names\tc1\n").is_err());
    }
}
