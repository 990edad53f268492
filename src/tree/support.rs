use anyhow::{bail, Result};
use log::debug;

use super::Tree;

/// Branch-support dialect carried in the Newick internal node labels.
///
/// `Bootstrap` labels are a single replicate percentage. `Iqtree` labels hold
/// SH-aLRT and ultrafast-bootstrap values separated by a slash, as written by
/// IQ-TREE when both tests are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportScheme {
    Bootstrap,
    Iqtree,
}

impl SupportScheme {
    pub fn from_flag(value: &str) -> Result<Self> {
        match value {
            "bootstrap" => Ok(Self::Bootstrap),
            "iqtree" => Ok(Self::Iqtree),
            other => bail!("--support must be either \"iqtree\" or \"bootstrap\", got \"{other}\""),
        }
    }
}

/// Collapse thresholds. An internal branch is kept when its support meets the
/// threshold for its scheme; under the dual scheme both values must fall short
/// before the branch is collapsed.
#[derive(Debug, Clone, Copy)]
pub struct SupportThresholds {
    pub bootstrap: f64,
    pub sh_alrt: f64,
    pub ufboot: f64,
}

impl Default for SupportThresholds {
    fn default() -> Self {
        Self {
            bootstrap: 70.0,
            sh_alrt: 80.0,
            ufboot: 95.0,
        }
    }
}

/// Collapse weakly supported internal branches in place.
///
/// Traverses parent-before-children; a failing node is merged into its parent
/// with its branch length added to each child, so descendant depths are
/// preserved. Leaves and the root are never evaluated, and labels that do not
/// parse under the scheme are treated as adequately supported. Returns the
/// number of branches collapsed.
pub fn collapse_unsupported(
    tree: &mut Tree,
    scheme: SupportScheme,
    thresholds: &SupportThresholds,
) -> usize {
    let order = tree.preorder();
    let mut collapsed = 0;

    for id in order {
        let node = &tree.nodes[id];
        if node.parent.is_none() || node.is_leaf() {
            continue;
        }

        if fails_support(node.name.as_deref(), scheme, thresholds) {
            debug!(
                "collapsing internal node {} (label {:?})",
                id,
                tree.nodes[id].name
            );
            tree.delete_node(id);
            collapsed += 1;
        }
    }

    if collapsed > 0 {
        tree.compact();
    }
    collapsed
}

fn fails_support(label: Option<&str>, scheme: SupportScheme, thresholds: &SupportThresholds) -> bool {
    let Some(label) = label else {
        return false;
    };

    match scheme {
        SupportScheme::Bootstrap => label
            .parse::<f64>()
            .map(|support| support < thresholds.bootstrap)
            .unwrap_or(false),
        SupportScheme::Iqtree => {
            let Some((alrt, ufboot)) = label.split_once('/') else {
                return false;
            };
            match (alrt.parse::<f64>(), ufboot.parse::<f64>()) {
                (Ok(alrt), Ok(ufboot)) => {
                    alrt < thresholds.sh_alrt && ufboot < thresholds.ufboot
                }
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;

    fn thresholds() -> SupportThresholds {
        SupportThresholds::default()
    }

    #[test]
    fn bootstrap_below_threshold_fails() {
        let th = thresholds();
        assert!(fails_support(Some("69.9"), SupportScheme::Bootstrap, &th));
        assert!(!fails_support(Some("70"), SupportScheme::Bootstrap, &th));
        assert!(!fails_support(Some("95"), SupportScheme::Bootstrap, &th));
    }

    #[test]
    fn unparseable_bootstrap_label_is_retained() {
        let th = thresholds();
        assert!(!fails_support(Some("node7"), SupportScheme::Bootstrap, &th));
        assert!(!fails_support(None, SupportScheme::Bootstrap, &th));
    }

    #[test]
    fn dual_scheme_requires_both_values_inadequate() {
        let th = thresholds();
        assert!(fails_support(Some("79.9/94.9"), SupportScheme::Iqtree, &th));
        assert!(!fails_support(Some("80/94.9"), SupportScheme::Iqtree, &th));
        assert!(!fails_support(Some("79.9/95"), SupportScheme::Iqtree, &th));
        assert!(!fails_support(Some("85/99"), SupportScheme::Iqtree, &th));
    }

    #[test]
    fn dual_scheme_without_slash_is_retained() {
        let th = thresholds();
        assert!(!fails_support(Some("60"), SupportScheme::Iqtree, &th));
        assert!(!fails_support(Some("x/y"), SupportScheme::Iqtree, &th));
    }

    #[test]
    fn collapses_weak_clade_and_keeps_strong_one() {
        let mut tree = io::parse_tree("((A:1,B:1)90:1,(C:1,D:1)60:1):0;").unwrap();
        let collapsed =
            collapse_unsupported(&mut tree, SupportScheme::Bootstrap, &thresholds());

        assert_eq!(collapsed, 1);
        assert_eq!(tree.leaf_count(), 4);

        // A and B still share an inner parent; C and D now hang off the root.
        let a_parent = tree.nodes[tree.find_leaf("A").unwrap()].parent.unwrap();
        let b_parent = tree.nodes[tree.find_leaf("B").unwrap()].parent.unwrap();
        assert_eq!(a_parent, b_parent);
        assert_ne!(Some(a_parent), tree.root);

        let root = tree.root.unwrap();
        let c = tree.find_leaf("C").unwrap();
        let d = tree.find_leaf("D").unwrap();
        assert_eq!(tree.nodes[c].parent, Some(root));
        assert_eq!(tree.nodes[d].parent, Some(root));

        // Branch length of the collapsed node was folded into its children.
        assert!((tree.nodes[c].length.unwrap() - 2.0).abs() < 1e-9);
        assert!((tree.distance_to_root(c) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn collapse_depth_preserved_for_nested_failures() {
        // Both inner nodes fail; the star that remains keeps leaf depths.
        let mut tree = io::parse_tree("(((A:1,B:1)10:1,C:1)20:1,D:1)99;").unwrap();
        let a = tree.find_leaf("A").unwrap();
        let before = tree.distance_to_root(a);

        collapse_unsupported(&mut tree, SupportScheme::Bootstrap, &thresholds());

        let a = tree.find_leaf("A").unwrap();
        assert!((tree.distance_to_root(a) - before).abs() < 1e-9);
        let root = tree.root.unwrap();
        assert_eq!(tree.nodes[root].children.len(), 4);
    }

    #[test]
    fn iqtree_scheme_collapses_on_dual_labels() {
        let mut tree = io::parse_tree("((A:1,B:1)95/99:1,(C:1,D:1)50/80:1);").unwrap();
        let collapsed = collapse_unsupported(&mut tree, SupportScheme::Iqtree, &thresholds());
        assert_eq!(collapsed, 1);
        let ab = tree.nodes[tree.find_leaf("A").unwrap()].parent.unwrap();
        assert_eq!(tree.nodes[ab].name.as_deref(), Some("95/99"));
    }

    #[test]
    fn scheme_flag_parsing() {
        assert_eq!(
            SupportScheme::from_flag("bootstrap").unwrap(),
            SupportScheme::Bootstrap
        );
        assert_eq!(
            SupportScheme::from_flag("iqtree").unwrap(),
            SupportScheme::Iqtree
        );
        assert!(SupportScheme::from_flag("raxml").is_err());
    }
}
