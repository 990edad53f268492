use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

pub mod layout;
pub mod prune;
pub mod root;
pub mod support;

pub type NodeId = phylotree::tree::NodeId;

/// Representation of a phylogenetic tree with an explicit node list.
///
/// Nodes are stored in a flat vector indexed by `NodeId`. Structural edits
/// (collapsing, pruning, rerooting) detach nodes in place and finish with
/// [`Tree::compact`], so outside of those operations every stored node is
/// reachable from the root.
#[derive(Debug, Clone)]
pub struct Tree {
    pub label: Option<String>,
    pub newick: String,
    pub root: Option<NodeId>,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new(label: Option<String>, newick: String, phylo: &PhyloTree) -> Self {
        let root = phylo.get_root().ok();
        let nodes = Self::build_nodes_from_phylo(phylo);
        Self {
            label,
            newick,
            root,
            nodes,
        }
    }

    fn build_nodes_from_phylo(phylo: &PhyloTree) -> Vec<TreeNode> {
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::new(idx, None, None)),
            }
        }
        nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    pub fn find_leaf(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.is_leaf() && node.name.as_deref() == Some(name))
            .map(|node| node.id)
    }

    /// Node ids in parent-before-children order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let Some(root_id) = self.root else {
            return order;
        };

        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child_id in self.nodes[id].children.iter().rev() {
                stack.push(child_id);
            }
        }
        order
    }

    /// Sum of branch lengths from the root down to `id`.
    pub fn distance_to_root(&self, id: NodeId) -> f64 {
        let mut distance = 0.0;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if node.parent.is_some() {
                distance += node.length.unwrap_or(0.0);
            }
            current = node.parent;
        }
        distance
    }

    /// Calculate the number of leaf descendants for each node.
    fn calculate_clade_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.nodes.len()];

        fn calculate_size(node_id: NodeId, nodes: &[TreeNode], sizes: &mut [usize]) -> usize {
            let node = &nodes[node_id];

            if node.is_leaf() {
                sizes[node_id] = 1;
                return 1;
            }

            let mut size = 0;
            for &child_id in &node.children {
                size += calculate_size(child_id, nodes, sizes);
            }

            sizes[node_id] = size;
            size
        }

        if let Some(root_id) = self.root {
            calculate_size(root_id, &self.nodes, &mut sizes);
        }

        sizes
    }

    /// Order every node's children by clade size.
    /// If `increasing` is true, smaller clades come first; otherwise larger clades come first.
    pub fn ladderize(&mut self, increasing: bool) {
        let sizes = self.calculate_clade_sizes();

        for node in &mut self.nodes {
            if node.children.len() > 1 {
                node.children.sort_by(|&a, &b| {
                    let size_a = sizes[a];
                    let size_b = sizes[b];

                    if increasing {
                        size_a.cmp(&size_b)
                    } else {
                        size_b.cmp(&size_a)
                    }
                });
            }
        }
    }

    pub fn layout(&self) -> Option<layout::TreeLayout> {
        layout::TreeLayout::from_tree(self)
    }

    /// Merge `id` into its parent: the node's children take its place in the
    /// parent's child list, each inheriting the removed node's branch length
    /// additively. No-op for the root.
    pub(crate) fn delete_node(&mut self, id: NodeId) {
        let Some(parent_id) = self.nodes[id].parent else {
            return;
        };

        let children = self.nodes[id].children.clone();
        let removed_length = self.nodes[id].length;

        for &child_id in &children {
            let child = &mut self.nodes[child_id];
            child.parent = Some(parent_id);
            child.length = add_lengths(child.length, removed_length);
        }

        let parent = &mut self.nodes[parent_id];
        if let Some(pos) = parent.children.iter().position(|&c| c == id) {
            parent.children.splice(pos..=pos, children);
        }

        self.nodes[id].parent = None;
        self.nodes[id].children.clear();
    }

    /// Splice out non-root nodes with exactly one child, summing branch
    /// lengths so cumulative root-to-leaf distances are unchanged.
    pub(crate) fn splice_unary(&mut self) {
        loop {
            let target = self
                .preorder()
                .into_iter()
                .find(|&id| Some(id) != self.root && self.nodes[id].children.len() == 1);
            let Some(id) = target else {
                break;
            };

            let child_id = self.nodes[id].children[0];
            let removed_length = self.nodes[id].length;
            let parent_id = self.nodes[id].parent.expect("non-root node has a parent");

            let child = &mut self.nodes[child_id];
            child.parent = Some(parent_id);
            child.length = add_lengths(child.length, removed_length);

            let parent = &mut self.nodes[parent_id];
            if let Some(pos) = parent.children.iter().position(|&c| c == id) {
                parent.children[pos] = child_id;
            }

            self.nodes[id].parent = None;
            self.nodes[id].children.clear();
        }
    }

    /// Drop detached nodes and renumber the remainder in preorder.
    pub(crate) fn compact(&mut self) {
        let order = self.preorder();
        if order.len() == self.nodes.len() && order.iter().enumerate().all(|(i, &id)| i == id) {
            return;
        }

        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            remap[old_id] = new_id;
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &old_id in &order {
            let mut node = self.nodes[old_id].clone();
            node.id = remap[old_id];
            node.parent = node.parent.map(|p| remap[p]);
            for child in &mut node.children {
                *child = remap[*child];
            }
            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = self.root.map(|_| 0);
    }
}

/// Node within a phylogenetic tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn new(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            length,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let mut tree_node = TreeNode::new(node.id, node.name.clone(), node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}

pub(crate) fn add_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        _ => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use crate::io;

    #[test]
    fn preorder_visits_parents_first() {
        let tree = io::parse_tree("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let order = tree.preorder();
        assert_eq!(order.len(), tree.nodes.len());
        for &id in &order {
            if let Some(parent) = tree.nodes[id].parent {
                let parent_pos = order.iter().position(|&o| o == parent).unwrap();
                let node_pos = order.iter().position(|&o| o == id).unwrap();
                assert!(parent_pos < node_pos);
            }
        }
    }

    #[test]
    fn distance_to_root_sums_branch_lengths() {
        let tree = io::parse_tree("((A:1.5,B:2):0.5,C:3);").unwrap();
        let a = tree.find_leaf("A").unwrap();
        let c = tree.find_leaf("C").unwrap();
        assert!((tree.distance_to_root(a) - 2.0).abs() < 1e-9);
        assert!((tree.distance_to_root(c) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ladderize_orders_children_by_clade_size() {
        let mut tree = io::parse_tree("(((A:1,B:1):1,C:1):1,D:1);").unwrap();
        tree.ladderize(true);
        let root = tree.root.unwrap();
        let first_child = tree.nodes[root].children[0];
        assert!(tree.nodes[first_child].is_leaf(), "smallest clade first");

        tree.ladderize(false);
        let first_child = tree.nodes[root].children[0];
        assert!(!tree.nodes[first_child].is_leaf(), "largest clade first");
    }

    #[test]
    fn compact_renumbers_reachable_nodes() {
        let mut tree = io::parse_tree("((A:1,B:1):1,C:1);").unwrap();
        let inner = tree
            .find_leaf("A")
            .and_then(|id| tree.nodes[id].parent)
            .unwrap();
        tree.delete_node(inner);
        tree.compact();

        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.leaf_count(), 3);
        for node in &tree.nodes {
            for &child in &node.children {
                assert_eq!(tree.nodes[child].parent, Some(node.id));
            }
        }
    }
}
