use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::io::fasta::Alignment;
use crate::io::matrix::MatrixTable;
use crate::tree::Tree;

pub mod heatmap;

use heatmap::HeatmapScale;

/// Optional leaf id to family label lookup, consulted only at draw time.
#[derive(Debug, Clone, Default)]
pub struct FamilyMap {
    labels: HashMap<String, String>,
}

impl FamilyMap {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn label_for(&self, leaf_name: &str) -> Option<&str> {
        self.labels.get(leaf_name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Aligned data panel drawn next to the tips.
#[derive(Debug, Clone)]
pub enum LeafPanel {
    Alignment(AlignmentPanel),
    Heatmap(HeatmapPanel),
}

/// Per-leaf alignment rows, indexed by `NodeId`.
#[derive(Debug, Clone)]
pub struct AlignmentPanel {
    pub rows: Vec<Option<String>>,
    pub columns: usize,
}

/// Per-leaf matrix rows plus the shared color scale, indexed by `NodeId`.
#[derive(Debug, Clone)]
pub struct HeatmapPanel {
    pub header: Vec<String>,
    pub rows: Vec<Option<Vec<f64>>>,
    pub scale: HeatmapScale,
}

/// Attach the alignment to the tree. Every leaf must have a sequence.
pub fn bind_alignment(tree: &Tree, alignment: &Alignment) -> Result<AlignmentPanel> {
    let mut rows = vec![None; tree.nodes.len()];

    for leaf in tree.leaves() {
        let name = leaf.name.as_deref().unwrap_or("");
        match alignment.get(name) {
            Some(seq) => rows[leaf.id] = Some(seq.to_string()),
            None => bail!("no aligned sequence for leaf \"{name}\""),
        }
    }

    Ok(AlignmentPanel {
        rows,
        columns: alignment.columns(),
    })
}

/// Attach the numeric matrix to the tree. Every leaf must have a row.
pub fn bind_matrix(
    tree: &Tree,
    matrix: &MatrixTable,
    center: f64,
    base_lightness: f64,
) -> Result<HeatmapPanel> {
    let mut rows = vec![None; tree.nodes.len()];

    for leaf in tree.leaves() {
        let name = leaf.name.as_deref().unwrap_or("");
        match matrix.get(name) {
            Some(values) => rows[leaf.id] = Some(values.to_vec()),
            None => bail!("no matrix row for leaf \"{name}\""),
        }
    }

    Ok(HeatmapPanel {
        header: matrix.header.clone(),
        rows,
        scale: HeatmapScale::new(center, matrix.min, matrix.max, base_lightness),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{self, fasta, matrix};

    #[test]
    fn binds_sequences_to_leaves() {
        let tree = io::parse_tree("((A:1,B:1):1,C:1);").unwrap();
        let aln = fasta::parse_alignment(">A\nMK-\n>B\nMKV\n>C\nMLV\n").unwrap();
        let panel = bind_alignment(&tree, &aln).unwrap();

        assert_eq!(panel.columns, 3);
        let a = tree.find_leaf("A").unwrap();
        assert_eq!(panel.rows[a].as_deref(), Some("MK-"));
        let root = tree.root.unwrap();
        assert!(panel.rows[root].is_none());
    }

    #[test]
    fn missing_sequence_is_fatal() {
        let tree = io::parse_tree("(A:1,B:1);").unwrap();
        let aln = fasta::parse_alignment(">A\nMK\n").unwrap();
        let err = bind_alignment(&tree, &aln).unwrap_err().to_string();
        assert!(err.contains('B'));
    }

    #[test]
    fn binds_matrix_rows_and_scale() {
        let tree = io::parse_tree("(A:1,B:1);").unwrap();
        let mat = matrix::parse_matrix("#Names\tc1\tc2\nA\t1\t-2\nB\t4\t0\n").unwrap();
        let panel = bind_matrix(&tree, &mat, 0.0, 1.1).unwrap();

        assert_eq!(panel.header.len(), 2);
        assert!((panel.scale.max_magnitude - 4.0).abs() < 1e-12);
        let a = tree.find_leaf("A").unwrap();
        assert_eq!(panel.rows[a].as_deref(), Some([1.0, -2.0].as_slice()));
    }

    #[test]
    fn missing_matrix_row_is_fatal() {
        let tree = io::parse_tree("(A:1,B:1);").unwrap();
        let mat = matrix::parse_matrix("#Names\tc1\nA\t1\n").unwrap();
        assert!(bind_matrix(&tree, &mat, 0.0, 1.1).is_err());
    }
}
