use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use phylotree::tree::{NewickFormat, Tree as PhyloTree};

use crate::tree::Tree;

pub mod fasta;
pub mod matrix;

/// Load the first Newick tree from a file.
pub fn load_tree(path: &Path) -> Result<Tree> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;

    let candidate = raw
        .split_inclusive(';')
        .map(str::trim)
        .find(|chunk| !chunk.is_empty())
        .ok_or_else(|| anyhow!("tree file did not contain any trees"))?;

    if !candidate.ends_with(';') {
        bail!("tree file did not contain a semicolon-terminated newick tree");
    }

    parse_tree(candidate)
}

/// Parse a single Newick string into an owned [`Tree`].
pub fn parse_tree(raw: &str) -> Result<Tree> {
    let newick = normalise_newick(raw);
    let phylo = PhyloTree::from_newick(&newick)
        .map_err(|err| anyhow!("failed to parse newick tree: {err}"))?;
    let canonical_newick = phylo
        .to_formatted_newick(NewickFormat::NoComments)
        .unwrap_or_else(|_| newick.clone());

    Ok(Tree::new(None, canonical_newick, &phylo))
}

fn normalise_newick(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_end_matches(';').trim().to_owned();
    cleaned.push(';');
    cleaned
}

/// Two-column tab-separated leaf id to family label mapping. Lines without a
/// tab are skipped.
pub fn load_family_map(path: &Path) -> Result<HashMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read family file: {}", path.display()))?;

    let mut map = HashMap::new();
    for line in raw.lines() {
        if let Some((id, label)) = line.split_once('\t') {
            map.insert(id.to_string(), label.trim_end().to_string());
        }
    }
    Ok(map)
}

/// Leaf id list for pruning: one id per line, first tab-delimited column.
pub fn load_prune_list(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read prune file: {}", path.display()))?;

    let ids: Vec<String> = raw
        .lines()
        .map(|line| line.split('\t').next().unwrap_or("").trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        bail!("prune file {} contains no ids", path.display());
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_newick() {
        let tree = parse_tree("(A:0.1,B:0.2);").unwrap();
        assert_eq!(tree.leaf_count(), 2);
        assert!(tree.root.is_some());
        assert_eq!(tree.newick, "(A:0.1,B:0.2);");
    }

    #[test]
    fn normalises_missing_semicolon() {
        let tree = parse_tree("(A:0.1,B:0.2)").unwrap();
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn keeps_internal_support_labels() {
        let tree = parse_tree("((A:1,B:1)90:1,C:1);").unwrap();
        let labelled = tree
            .nodes
            .iter()
            .any(|node| !node.is_leaf() && node.name.as_deref() == Some("90"));
        assert!(labelled);
    }

    #[test]
    fn rejects_malformed_newick() {
        assert!(parse_tree("((A:1,B:1;").is_err());
    }

    #[test]
    fn family_map_splits_on_first_tab() {
        let dir = std::env::temp_dir().join("phylomap-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("families.tsv");
        std::fs::write(&path, "tyr1\tfamA\ntyr2\tfamB\nno-tab-line\n").unwrap();

        let map = load_family_map(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("tyr1").map(String::as_str), Some("famA"));
    }

    #[test]
    fn prune_list_takes_first_column() {
        let dir = std::env::temp_dir().join("phylomap-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prune.txt");
        std::fs::write(&path, "tyr1\textra\ntyr2\n\n").unwrap();

        let ids = load_prune_list(&path).unwrap();
        assert_eq!(ids, vec!["tyr1".to_string(), "tyr2".to_string()]);
    }
}
