use std::collections::HashMap;

use anyhow::{bail, Result};
use log::info;

use super::{NodeId, Tree, TreeNode};

/// Pick the midpoint outgroup: the node whose parent branch contains the
/// halfway point of the longest leaf-to-leaf path. Uses the double-sweep
/// farthest-leaf search over an undirected view of the tree.
pub fn midpoint_outgroup(tree: &Tree) -> Option<NodeId> {
    let adjacency = build_adjacency(tree);
    if adjacency.is_empty() {
        return None;
    }

    let edge_lengths = collect_edge_lengths(tree);
    let start = tree.leaves().next().map(|node| node.id)?;

    let (first_leaf, _, _) = farthest_leaf(&adjacency, start);
    let (_, diameter, path) = farthest_leaf(&adjacency, first_leaf);

    if path.len() < 2 || diameter <= f64::EPSILON {
        return None;
    }

    let midpoint_distance = diameter / 2.0;
    let mut traversed = 0.0;

    for window in path.windows(2) {
        let a = window[0];
        let b = window[1];
        let length = edge_lengths.get(&(a, b)).copied().unwrap_or(1.0);

        if traversed + length >= midpoint_distance {
            // The midpoint sits on the undirected edge a--b; the outgroup is
            // whichever endpoint owns that edge as its parent branch.
            let outgroup = if tree.nodes[a].parent == Some(b) { a } else { b };
            return Some(outgroup);
        }
        traversed += length;
    }

    path.last().copied()
}

/// Lowest common ancestor of the named tips. Errors if any name is missing.
pub fn common_ancestor(tree: &Tree, tip_names: &[String]) -> Result<NodeId> {
    if tip_names.is_empty() {
        bail!("no tips given for LCA rooting");
    }

    let mut tips = Vec::with_capacity(tip_names.len());
    for name in tip_names {
        match tree.find_leaf(name) {
            Some(id) => tips.push(id),
            None => bail!("tip \"{name}\" not found in tree"),
        }
    }

    let mut lineage = Vec::new();
    let mut current = Some(tips[0]);
    while let Some(id) = current {
        lineage.push(id);
        current = tree.nodes[id].parent;
    }

    let mut lca_index = 0;
    for &tip in &tips[1..] {
        let mut current = Some(tip);
        'walk: while let Some(id) = current {
            for (index, &ancestor) in lineage.iter().enumerate().skip(lca_index) {
                if ancestor == id {
                    lca_index = index;
                    break 'walk;
                }
            }
            current = tree.nodes[id].parent;
        }
    }

    Ok(lineage[lca_index])
}

/// Re-root the tree on the branch above `outgroup`, splitting that branch in
/// half with a new root node. The previous root is spliced out if it is left
/// with a single child, so repeated rooting on the same edge is stable.
pub fn set_outgroup(tree: &mut Tree, outgroup: NodeId) {
    let Some(parent_id) = tree.nodes[outgroup].parent else {
        return; // already the root
    };

    let split_length = tree.nodes[outgroup].length.map(|len| len / 2.0);

    let mut adjacency = build_adjacency(tree);
    let mut edge_lengths = collect_edge_lengths(tree);

    // Replace the outgroup--parent edge with two half-length edges through a
    // fresh root node.
    let new_root_id = tree.nodes.len();
    tree.nodes.push(TreeNode::new(new_root_id, None, None));
    adjacency.push(Vec::new());

    adjacency[outgroup].retain(|&(next, _)| next != parent_id);
    adjacency[parent_id].retain(|&(next, _)| next != outgroup);
    edge_lengths.remove(&(outgroup, parent_id));
    edge_lengths.remove(&(parent_id, outgroup));

    let half = split_length.unwrap_or(0.5);
    adjacency[new_root_id].push((outgroup, half));
    adjacency[outgroup].push((new_root_id, half));
    adjacency[new_root_id].push((parent_id, half));
    adjacency[parent_id].push((new_root_id, half));
    edge_lengths.insert((new_root_id, outgroup), half);
    edge_lengths.insert((outgroup, new_root_id), half);
    edge_lengths.insert((new_root_id, parent_id), half);
    edge_lengths.insert((parent_id, new_root_id), half);

    let mut visited = vec![false; tree.nodes.len()];
    orient_tree(tree, new_root_id, None, &adjacency, &edge_lengths, &mut visited);
    tree.root = Some(new_root_id);

    tree.splice_unary();
    tree.compact();
}

/// Root at the midpoint, or at the LCA of `root_tips` when given.
pub fn root_tree(tree: &mut Tree, root_tips: Option<&[String]>) -> Result<()> {
    let outgroup = match root_tips {
        Some(tips) => {
            let lca = common_ancestor(tree, tips)?;
            info!("rooting at LCA of {} tip(s)", tips.len());
            lca
        }
        None => match midpoint_outgroup(tree) {
            Some(id) => id,
            None => return Ok(()), // degenerate tree, keep as parsed
        },
    };

    set_outgroup(tree, outgroup);
    Ok(())
}

fn build_adjacency(tree: &Tree) -> Vec<Vec<(NodeId, f64)>> {
    if tree.nodes.is_empty() {
        return Vec::new();
    }

    let mut adjacency = vec![Vec::new(); tree.nodes.len()];
    for node in &tree.nodes {
        if let Some(parent) = node.parent {
            let length = node.length.unwrap_or(1.0);
            adjacency[node.id].push((parent, length));
            adjacency[parent].push((node.id, length));
        }
    }

    adjacency
}

fn collect_edge_lengths(tree: &Tree) -> HashMap<(NodeId, NodeId), f64> {
    let mut lengths = HashMap::new();
    for node in &tree.nodes {
        if let Some(parent) = node.parent {
            let value = node.length.unwrap_or(1.0);
            lengths.insert((node.id, parent), value);
            lengths.insert((parent, node.id), value);
        }
    }
    lengths
}

fn farthest_leaf(adjacency: &[Vec<(NodeId, f64)>], start: NodeId) -> (NodeId, f64, Vec<NodeId>) {
    if adjacency.is_empty() {
        return (start, 0.0, vec![start]);
    }

    let mut parents: Vec<Option<NodeId>> = vec![None; adjacency.len()];
    let mut best_node = start;
    let mut best_distance = -1.0;

    fn dfs(
        node: NodeId,
        parent: Option<NodeId>,
        distance: f64,
        adjacency: &[Vec<(NodeId, f64)>],
        parents: &mut [Option<NodeId>],
        best_node: &mut NodeId,
        best_distance: &mut f64,
    ) {
        parents[node] = parent;
        let mut has_child = false;
        for &(next, weight) in &adjacency[node] {
            if Some(next) == parent {
                continue;
            }
            has_child = true;
            dfs(
                next,
                Some(node),
                distance + weight,
                adjacency,
                parents,
                best_node,
                best_distance,
            );
        }

        if !has_child && distance > *best_distance {
            *best_distance = distance;
            *best_node = node;
        }
    }

    dfs(
        start,
        None,
        0.0,
        adjacency,
        &mut parents,
        &mut best_node,
        &mut best_distance,
    );

    if best_distance < 0.0 {
        return (start, 0.0, vec![start]);
    }

    let mut path = Vec::new();
    let mut current = best_node;
    path.push(current);
    while let Some(parent) = parents[current] {
        current = parent;
        path.push(current);
    }
    path.reverse();

    (best_node, best_distance, path)
}

fn orient_tree(
    tree: &mut Tree,
    node: NodeId,
    parent: Option<NodeId>,
    adjacency: &[Vec<(NodeId, f64)>],
    edge_lengths: &HashMap<(NodeId, NodeId), f64>,
    visited: &mut [bool],
) {
    if visited[node] {
        return;
    }
    visited[node] = true;

    let neighbors: Vec<NodeId> = adjacency[node]
        .iter()
        .filter_map(|&(next, _)| if Some(next) == parent { None } else { Some(next) })
        .collect();

    if let Some(entry) = tree.nodes.get_mut(node) {
        entry.parent = parent;
        entry.length = parent.and_then(|p| edge_lengths.get(&(node, p)).copied());
        if parent.is_none() {
            entry.length = None;
        }
        entry.children.clear();
        entry.children.extend(neighbors.iter().copied());
    }

    for next in neighbors {
        orient_tree(tree, next, Some(node), adjacency, edge_lengths, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;
    use std::collections::BTreeSet;

    fn clade_leaves(tree: &Tree, id: NodeId) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &tree.nodes[current];
            if node.is_leaf() {
                if let Some(name) = &node.name {
                    names.insert(name.clone());
                }
            }
            stack.extend(node.children.iter().copied());
        }
        names
    }

    fn root_partition(tree: &Tree) -> BTreeSet<BTreeSet<String>> {
        let root = tree.root.unwrap();
        tree.nodes[root]
            .children
            .iter()
            .map(|&child| clade_leaves(tree, child))
            .collect()
    }

    #[test]
    fn midpoint_root_lands_on_long_branch() {
        let mut tree = io::parse_tree("(A:1,(B:1,C:10):1);").unwrap();
        root_tree(&mut tree, None).unwrap();

        // The diameter path is A..C (12); its midpoint is inside C's branch,
        // so C sits alone on one side of the root.
        let partition = root_partition(&tree);
        assert!(partition.contains(&BTreeSet::from(["C".to_string()])));
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn midpoint_rooting_is_idempotent_up_to_the_edge() {
        let mut tree = io::parse_tree("((A:1,B:2):1,(C:3,D:1):2);").unwrap();
        root_tree(&mut tree, None).unwrap();
        let first = root_partition(&tree);

        root_tree(&mut tree, None).unwrap();
        let second = root_partition(&tree);

        assert_eq!(first, second);
    }

    #[test]
    fn rooting_preserves_pairwise_leaf_distance() {
        let mut tree = io::parse_tree("((A:1,B:2):0.5,(C:3,D:1):2);").unwrap();
        root_tree(&mut tree, None).unwrap();

        let a = tree.find_leaf("A").unwrap();
        let c = tree.find_leaf("C").unwrap();
        // A..C through the original root: 1 + 0.5 + 2 + 3.
        let through_root = tree.distance_to_root(a) + tree.distance_to_root(c);
        assert!((through_root - 6.5).abs() < 1e-9);
    }

    #[test]
    fn lca_of_sibling_tips_is_their_parent_clade() {
        let tree = io::parse_tree("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let lca = common_ancestor(&tree, &["C".to_string(), "D".to_string()]).unwrap();
        assert_eq!(clade_leaves(&tree, lca).len(), 2);

        let wide = common_ancestor(&tree, &["A".to_string(), "D".to_string()]).unwrap();
        assert_eq!(Some(wide), tree.root);
    }

    #[test]
    fn lca_rooting_with_unknown_tip_fails() {
        let mut tree = io::parse_tree("((A:1,B:1):1,C:1);").unwrap();
        let err = root_tree(&mut tree, Some(&["A".to_string(), "Zzz".to_string()]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Zzz"));
    }

    #[test]
    fn lca_rooting_separates_the_named_clade() {
        let mut tree = io::parse_tree("((A:1,B:1):1,(C:1,(D:1,E:1):1):1);").unwrap();
        root_tree(&mut tree, Some(&["D".to_string(), "E".to_string()])).unwrap();

        let partition = root_partition(&tree);
        assert!(partition.contains(&BTreeSet::from(["D".to_string(), "E".to_string()])));
    }
}
