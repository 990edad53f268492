use std::collections::HashSet;

use anyhow::{bail, Result};
use log::warn;

use super::Tree;

/// Restrict the tree to the leaves named in `keep`, plus the internal
/// structure connecting them. Cumulative root-to-leaf branch lengths of the
/// retained leaves are preserved; unary nodes left behind are spliced out
/// with their lengths folded into the child.
///
/// Identifiers that do not match any leaf are ignored, matching the original
/// pruning contract, but each one is reported at warn level.
pub fn prune_to(tree: &mut Tree, keep: &[String]) -> Result<()> {
    let mut wanted: HashSet<&str> = HashSet::with_capacity(keep.len());
    for id in keep {
        if tree.find_leaf(id).is_none() {
            warn!("prune id \"{id}\" does not match any leaf, ignoring");
        } else {
            wanted.insert(id.as_str());
        }
    }

    if wanted.is_empty() {
        bail!("none of the prune ids match a leaf in the tree");
    }

    // Closure of kept leaves and all their ancestors.
    let mut retained = vec![false; tree.nodes.len()];
    for node in tree.leaves() {
        let name = node.name.as_deref().unwrap_or("");
        if !wanted.contains(name) {
            continue;
        }
        let mut current = Some(node.id);
        while let Some(id) = current {
            if retained[id] {
                break;
            }
            retained[id] = true;
            current = tree.nodes[id].parent;
        }
    }

    for id in 0..tree.nodes.len() {
        if retained[id] {
            tree.nodes[id].children.retain(|&child| retained[child]);
        } else {
            tree.nodes[id].parent = None;
            tree.nodes[id].children.clear();
        }
    }

    tree.splice_unary();
    tree.compact();
    Ok(())
}
