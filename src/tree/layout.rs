use super::{NodeId, Tree};

pub(super) const DEFAULT_BRANCH_LENGTH: f32 = 1.0;
pub(super) const ROOT_LENGTH_PROPORTION: f32 = 0.01;

/// Rectangular phylogram layout: tips at consecutive integer y slots,
/// internal nodes centered over their children, x proportional to cumulative
/// branch length.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub positions: Vec<(f32, f32)>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub width: f32,
    pub height: f32,
    pub leaf_count: usize,
    pub segments: Vec<RectSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectSegmentKind {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone)]
pub struct RectSegment {
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub parent: NodeId,
    pub child: Option<NodeId>,
    pub kind: RectSegmentKind,
}

struct LayoutState {
    next_tip_index: usize,
    max_x: f32,
    segments: Vec<RectSegment>,
}

impl TreeLayout {
    pub fn from_tree(tree: &Tree) -> Option<Self> {
        let root_id = tree.root?;
        let tip_count = tree.leaf_count().max(1);

        let mut positions = vec![(0.0f32, 0.0f32); tree.nodes.len()];
        let mut edges = Vec::with_capacity(tree.nodes.len().saturating_mul(2));

        let total_height = calculate_tree_height(tree, root_id, 0.0);
        let root_length = total_height * ROOT_LENGTH_PROPORTION;

        let mut state = LayoutState {
            next_tip_index: 0,
            max_x: root_length,
            segments: Vec::new(),
        };

        assign_positions(
            tree,
            root_id,
            root_length,
            &mut positions,
            &mut edges,
            &mut state,
        );

        let root_y = positions[root_id].1;
        state.segments.push(RectSegment {
            start: (0.0, root_y),
            end: (positions[root_id].0, root_y),
            parent: root_id,
            child: None,
            kind: RectSegmentKind::Horizontal,
        });

        let layout_height = if tip_count > 1 {
            (tip_count - 1) as f32
        } else {
            1.0
        };

        Some(TreeLayout {
            positions,
            edges,
            width: state.max_x.max(1e-6),
            height: layout_height.max(1e-6),
            leaf_count: tip_count,
            segments: state.segments,
        })
    }
}

fn assign_positions(
    tree: &Tree,
    node_id: NodeId,
    x_pos: f32,
    positions: &mut [(f32, f32)],
    edges: &mut Vec<(NodeId, NodeId)>,
    state: &mut LayoutState,
) -> f32 {
    let node = &tree.nodes[node_id];

    let y_pos = if node.children.is_empty() {
        let y = state.next_tip_index as f32;
        state.next_tip_index += 1;
        y
    } else {
        let mut first_y = f32::MAX;
        let mut last_y = f32::MIN;
        let mut child_segments = Vec::with_capacity(node.children.len());

        for &child_id in &node.children {
            edges.push((node_id, child_id));

            let branch_length = tree.nodes[child_id]
                .length
                .map(|value| value as f32)
                .unwrap_or(DEFAULT_BRANCH_LENGTH);
            let child_x = x_pos + branch_length;

            let child_y = assign_positions(tree, child_id, child_x, positions, edges, state);

            first_y = first_y.min(child_y);
            last_y = last_y.max(child_y);
            child_segments.push((child_id, child_x, child_y));
        }

        if child_segments.len() > 1 {
            state.segments.push(RectSegment {
                start: (x_pos, first_y),
                end: (x_pos, last_y),
                parent: node_id,
                child: None,
                kind: RectSegmentKind::Vertical,
            });
        }

        for (child_id, child_x, child_y) in &child_segments {
            state.segments.push(RectSegment {
                start: (x_pos, *child_y),
                end: (*child_x, *child_y),
                parent: node_id,
                child: Some(*child_id),
                kind: RectSegmentKind::Horizontal,
            });
        }

        if first_y.is_finite() && last_y.is_finite() {
            (first_y + last_y) / 2.0
        } else {
            0.0
        }
    };

    positions[node_id] = (x_pos, y_pos);
    state.max_x = state.max_x.max(x_pos);

    y_pos
}

fn calculate_tree_height(tree: &Tree, node_id: NodeId, current_height: f32) -> f32 {
    let node = &tree.nodes[node_id];
    let mut max_height = current_height;

    for &child_id in &node.children {
        let branch_length = tree.nodes[child_id]
            .length
            .map(|value| value as f32)
            .unwrap_or(DEFAULT_BRANCH_LENGTH);
        let child_height = calculate_tree_height(tree, child_id, current_height + branch_length);
        max_height = max_height.max(child_height);
    }

    max_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;

    #[test]
    fn lays_out_tips_on_consecutive_rows() {
        let tree = io::parse_tree("((A:1,B:1):1,C:2);").unwrap();
        let layout = tree.layout().unwrap();

        assert_eq!(layout.leaf_count, 3);
        assert_eq!(layout.positions.len(), tree.nodes.len());

        let mut tip_ys: Vec<f32> = tree
            .leaves()
            .map(|node| layout.positions[node.id].1)
            .collect();
        tip_ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(tip_ys, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn x_positions_track_cumulative_branch_length() {
        let tree = io::parse_tree("((A:1,B:1):1,C:2);").unwrap();
        let layout = tree.layout().unwrap();

        let a = tree.find_leaf("A").unwrap();
        let c = tree.find_leaf("C").unwrap();
        let root = tree.root.unwrap();
        let root_x = layout.positions[root].0;

        assert!((layout.positions[a].0 - root_x - 2.0).abs() < 1e-6);
        assert!((layout.positions[c].0 - root_x - 2.0).abs() < 1e-6);
        assert!(layout.width >= 2.0);
    }

    #[test]
    fn emits_orthogonal_segments_per_internal_node() {
        let tree = io::parse_tree("((A:1,B:1):1,C:2);").unwrap();
        let layout = tree.layout().unwrap();

        let vertical = layout
            .segments
            .iter()
            .filter(|seg| seg.kind == RectSegmentKind::Vertical)
            .count();
        // One vertical bar per multi-child internal node (root and inner).
        assert_eq!(vertical, 2);

        // Every edge has a matching horizontal segment.
        let horizontal = layout
            .segments
            .iter()
            .filter(|seg| seg.kind == RectSegmentKind::Horizontal && seg.child.is_some())
            .count();
        assert_eq!(horizontal, layout.edges.len());
    }
}
