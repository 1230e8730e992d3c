//! §3 Data Model ("Path", "Path-Bundle") and §4.2.4 Path Enumeration.

use indexmap::IndexMap;

/// One hop of a concrete path: the node arrived at, and the tuple of parallel edge
/// ids used to reach it from the previous step. The final step's `edges` is always
/// empty (there is no "next hop" from the destination).
#[derive(Debug, Clone)]
pub struct PathStep {
    pub node: String,
    pub edges: Vec<String>,
}

/// A concrete path from source to destination. Two paths compare equal iff their
/// step sequences are structurally equal (cost is a derived, not compared, field).
#[derive(Debug, Clone)]
pub struct Path {
    pub steps: Vec<PathStep>,
    pub cost: f64,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        if self.steps.len() != other.steps.len() {
            return false;
        }
        self.steps.iter().zip(other.steps.iter()).all(|(a, b)| a.node == b.node && a.edges == b.edges)
    }
}

impl Path {
    pub fn source(&self) -> Option<&str> {
        self.steps.first().map(|s| s.node.as_str())
    }

    pub fn destination(&self) -> Option<&str> {
        self.steps.last().map(|s| s.node.as_str())
    }

    pub fn nodes(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node.as_str()).collect()
    }
}

/// A reverse predecessor DAG from `dst` back to `src`, produced by SPF or one Yen
/// iteration of KSP: `preds[v]` maps each predecessor `u` to the parallel edge ids
/// selected for `u -> v`.
#[derive(Debug, Clone)]
pub struct PathBundle {
    pub src: String,
    pub dst: String,
    pub cost: f64,
    pub preds: IndexMap<String, IndexMap<String, Vec<String>>>,
}

impl PathBundle {
    /// Enumerate concrete paths by reverse DFS from `dst` to `src`. Assumes the
    /// predecessor graph is acyclic (no runtime cycle check, per §4.2.4).
    ///
    /// With `split_parallel_edges`, each parallel-edge group yields one path per
    /// edge (Cartesian product across all hops); otherwise each hop keeps its full
    /// edge tuple and exactly one path per predecessor combination is produced.
    pub fn enumerate(&self, split_parallel_edges: bool) -> Vec<Path> {
        let mut out = Vec::new();
        let mut frontier: Vec<Vec<PathStep>> = vec![vec![PathStep {
            node: self.dst.clone(),
            edges: Vec::new(),
        }]];

        while let Some(partial) = frontier.pop() {
            let head = partial.last().expect("partial path is never empty").node.clone();
            if head == self.src {
                let mut steps = partial;
                steps.reverse();
                out.push(Path { steps, cost: self.cost });
                continue;
            }
            let Some(preds) = self.preds.get(&head) else {
                continue;
            };
            for (pred, edges) in preds {
                if split_parallel_edges {
                    for edge in edges {
                        let mut next = partial.clone();
                        next.push(PathStep {
                            node: pred.clone(),
                            edges: vec![edge.clone()],
                        });
                        frontier.push(next);
                    }
                } else {
                    let mut next = partial.clone();
                    next.push(PathStep {
                        node: pred.clone(),
                        edges: edges.clone(),
                    });
                    frontier.push(next);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond_bundle() -> PathBundle {
        // src -> {m1,m2} -> dst, each hop a single edge (no ties), mirroring a
        // two-predecessor equal-cost DAG.
        let mut preds = IndexMap::new();
        let mut dst_preds = IndexMap::new();
        dst_preds.insert("m1".to_string(), vec!["m1_dst".to_string()]);
        dst_preds.insert("m2".to_string(), vec!["m2_dst".to_string()]);
        preds.insert("dst".to_string(), dst_preds);
        let mut m1_preds = IndexMap::new();
        m1_preds.insert("src".to_string(), vec!["src_m1".to_string()]);
        preds.insert("m1".to_string(), m1_preds);
        let mut m2_preds = IndexMap::new();
        m2_preds.insert("src".to_string(), vec!["src_m2".to_string()]);
        preds.insert("m2".to_string(), m2_preds);
        PathBundle {
            src: "src".to_string(),
            dst: "dst".to_string(),
            cost: 2.0,
            preds,
        }
    }

    #[test]
    fn enumerate_yields_one_path_per_branch() {
        let bundle = diamond_bundle();
        let paths = bundle.enumerate(false);
        assert_eq!(paths.len(), 2);
        for path in &paths {
            assert_eq!(path.source(), Some("src"));
            assert_eq!(path.destination(), Some("dst"));
            assert!(path.steps.last().unwrap().edges.is_empty());
        }
    }

    #[test]
    fn split_parallel_edges_cartesian_products_tied_hops() {
        let mut preds = IndexMap::new();
        let mut dst_preds = IndexMap::new();
        dst_preds.insert("src".to_string(), vec!["e1".to_string(), "e2".to_string()]);
        preds.insert("dst".to_string(), dst_preds);
        let bundle = PathBundle {
            src: "src".to_string(),
            dst: "dst".to_string(),
            cost: 1.0,
            preds,
        };
        let grouped = bundle.enumerate(false);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].steps[0].edges.len(), 2);

        let split = bundle.enumerate(true);
        assert_eq!(split.len(), 2);
        assert_ne!(split[0], split[1]);
    }
}
