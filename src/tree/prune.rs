//! Cost-complexity pruning.
//!
//! For a subtree `T_t` rooted at node `t`, with `R` the deviance and
//! `L` the number of leaves, `t` is collapsed into a leaf whenever
//! `R(t) - R(T_t) <= alpha * (L(T_t) - 1)`,
//! with `alpha = cp * R(root)`.
use log::debug;
use serde::{Serialize, Deserialize};

use std::fmt;

use crate::constants::NUMERIC_TOLERANCE;
use crate::error::{Result, TreeError};
use super::model::TreeModel;
use super::node::{Node, NodeId};


/// One row of the complexity-parameter table.
///
/// `n_split` is the number of splits of the optimal subtree for
/// every `cp` from this row's value up to the previous row's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpEntry {
    /// Complexity parameter, relative to the root deviance.
    pub cp: f64,
    /// Number of splits.
    pub n_split: usize,
    /// Training deviance relative to the root.
    pub rel_error: f64,
    /// Cross-validated relative error.
    /// `None` until filled by
    /// [`CrossValidation`](crate::research::CrossValidation).
    pub xerror: Option<f64>,
    /// Standard error of `xerror`.
    pub xstd: Option<f64>,
}


impl fmt::Display for CpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10.6} {:>7} {:>10.6}",
            self.cp, self.n_split, self.rel_error
        )?;
        if let (Some(xerror), Some(xstd)) = (self.xerror, self.xstd) {
            write!(f, " {xerror:>10.6} {xstd:>10.6}")?;
        }
        Ok(())
    }
}


impl TreeModel {
    /// Prune the tree at the complexity parameter `cp`.
    ///
    /// `cp = 0` removes only the splits whose subtree does not lower
    /// the deviance; `cp = inf` leaves the root alone.
    /// Pruning twice at the same `cp` gives the same tree.
    pub fn prune(&self, cp: f64) -> Result<TreeModel> {
        if cp.is_nan() || cp < 0f64 {
            return Err(TreeError::config(
                format!("cp must be non-negative, got {cp}")
            ));
        }

        let alpha = if cp.is_infinite() {
            f64::INFINITY
        } else {
            cp * self.root().deviance
        };

        let n_nodes = self.nodes.len();
        let mut keep = vec![false; n_nodes];
        let mut risk = vec![0f64; n_nodes];
        let mut leaves = vec![1usize; n_nodes];

        // Children come after their parent in pre-order.
        for i in (0..n_nodes).rev() {
            let node = &self.nodes[i];
            risk[i] = node.deviance;
            let Some(branch) = &node.branch else { continue; };

            let (l, r) = (branch.left.0, branch.right.0);
            let sub_risk = risk[l] + risk[r];
            let sub_leaves = leaves[l] + leaves[r];

            let gain = node.deviance - sub_risk
                - alpha * (sub_leaves - 1) as f64;
            if gain > 0f64 {
                keep[i] = true;
                risk[i] = sub_risk;
                leaves[i] = sub_leaves;
            }
        }

        let nodes = compact(&self.nodes[..], &keep[..]);
        debug!(
            "pruned at cp {cp}: {} -> {} nodes",
            self.nodes.len(), nodes.len(),
        );

        let mut stopping = self.stopping;
        stopping.cp = stopping.cp.max(cp);

        Ok(TreeModel::from_components(
            nodes,
            self.features.clone(),
            self.target.clone(),
            self.method,
            self.split_by,
            self.missing,
            stopping,
        ))
    }
}


/// Copy the nodes reachable through kept branches into a new
/// pre-order arena.
fn compact(nodes: &[Node], keep: &[bool]) -> Vec<Node> {
    let mut arena = Vec::with_capacity(nodes.len());
    copy_subtree(nodes, keep, NodeId(0), &mut arena);
    arena
}


fn copy_subtree(
    nodes: &[Node],
    keep: &[bool],
    id: NodeId,
    arena: &mut Vec<Node>,
) -> NodeId
{
    let new_id = NodeId(arena.len());
    let mut node = nodes[id.0].clone();

    if !keep[id.0] {
        node.collapse();
        arena.push(node);
        return new_id;
    }

    let (left, right) = match &node.branch {
        Some(branch) => (branch.left, branch.right),
        None => {
            arena.push(node);
            return new_id;
        },
    };
    arena.push(node);

    let new_left = copy_subtree(nodes, keep, left, arena);
    let new_right = copy_subtree(nodes, keep, right, arena);
    if let Some(branch) = arena[new_id.0].branch.as_mut() {
        branch.left = new_left;
        branch.right = new_right;
    }
    new_id
}


/// Deviance and number of leaves of every subtree,
/// where only the branches marked `active` count.
fn subtree_risk(nodes: &[Node], active: &[bool]) -> (Vec<f64>, Vec<usize>) {
    let n_nodes = nodes.len();
    let mut risk = vec![0f64; n_nodes];
    let mut leaves = vec![1usize; n_nodes];
    for i in (0..n_nodes).rev() {
        risk[i] = nodes[i].deviance;
        if !active[i] { continue; }
        if let Some(branch) = &nodes[i].branch {
            let (l, r) = (branch.left.0, branch.right.0);
            risk[i] = risk[l] + risk[r];
            leaves[i] = leaves[l] + leaves[r];
        }
    }
    (risk, leaves)
}


/// The weakest-link sequence of nested subtrees.
///
/// Returns the table from the root-only tree down to the full tree.
/// `floor` is the `cp` the full tree was grown or pruned with.
pub(super) fn weakest_links(nodes: &[Node], floor: f64) -> Vec<CpEntry> {
    let n_nodes = nodes.len();
    let root_deviance = nodes[0].deviance;
    let rel = |risk: f64| {
        if root_deviance > 0f64 { risk / root_deviance } else { 1f64 }
    };

    let mut active = nodes.iter()
        .map(|n| n.branch.is_some())
        .collect::<Vec<_>>();

    // `(alpha, n_split, rel_error)` from the full tree upwards.
    let mut sequence: Vec<(f64, usize, f64)> = Vec::new();
    let mut alpha = if floor.is_finite() { floor * root_deviance } else { 0f64 };

    loop {
        let (risk, leaves) = subtree_risk(nodes, &active[..]);
        sequence.push((alpha, leaves[0] - 1, rel(risk[0])));

        // Internal nodes of the current subtree.
        let mut reachable = vec![false; n_nodes];
        reachable[0] = true;
        let mut weakest = f64::INFINITY;
        for i in 0..n_nodes {
            if !reachable[i] || !active[i] { continue; }
            let Some(branch) = &nodes[i].branch else { continue; };
            reachable[branch.left.0] = true;
            reachable[branch.right.0] = true;

            let g = (nodes[i].deviance - risk[i]) / (leaves[i] - 1) as f64;
            weakest = weakest.min(g);
        }

        if weakest == f64::INFINITY { break; }

        let tolerance = NUMERIC_TOLERANCE * weakest.abs().max(1f64);
        for i in 0..n_nodes {
            if !reachable[i] || !active[i] { continue; }
            let g = (nodes[i].deviance - risk[i]) / (leaves[i] - 1) as f64;
            if g <= weakest + tolerance {
                active[i] = false;
            }
        }
        alpha = alpha.max(weakest);
    }

    let scale = if root_deviance > 0f64 { root_deviance } else { 1f64 };
    sequence.into_iter()
        .rev()
        .map(|(alpha, n_split, rel_error)| CpEntry {
            cp: (alpha / scale).max(0f64),
            n_split,
            rel_error,
            xerror: None,
            xstd: None,
        })
        .collect()
}
