//! A kd-tree-queryable point cloud with graph-edge relationships
//! between points: a thin unifying container over a nodes `Dataset`, an
//! edges `Dataset`, and a `KDTree` `MultiQuery` cache.

use std::rc::Rc;
use std::cell::RefCell;

use crate::array::Element;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::kdtree::MultiQuery;

/// Nodes Dataset + edges Dataset + a shared k-d tree query cache.
#[derive(Clone, Debug)]
pub struct PointGraph {
    nodes: Rc<RefCell<Dataset>>,
    edges: Rc<RefCell<Dataset>>,
    mquery: Rc<RefCell<MultiQuery>>,
}

impl Default for PointGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PointGraph {
    /// An empty node set and empty edge set.
    pub fn new() -> Self {
        PointGraph {
            nodes: Rc::new(RefCell::new(Dataset::new())),
            edges: Rc::new(RefCell::new(Dataset::new())),
            mquery: Rc::new(RefCell::new(MultiQuery::new())),
        }
    }

    /// A graph with the given node set and no edges.
    pub fn with_nodes(nodes: Dataset) -> Self {
        PointGraph {
            nodes: Rc::new(RefCell::new(nodes)),
            edges: Rc::new(RefCell::new(Dataset::new())),
            mquery: Rc::new(RefCell::new(MultiQuery::new())),
        }
    }

    /// A graph with the given node and edge sets.
    pub fn with_nodes_and_edges(nodes: Dataset, edges: Dataset) -> Self {
        PointGraph {
            nodes: Rc::new(RefCell::new(nodes)),
            edges: Rc::new(RefCell::new(edges)),
            mquery: Rc::new(RefCell::new(MultiQuery::new())),
        }
    }

    /// The node-point Dataset.
    pub fn nodes(&self) -> Rc<RefCell<Dataset>> {
        self.nodes.clone()
    }

    /// The edge Dataset. Conventionally holds integer `tails`/`heads`
    /// arrays indexing into `nodes()`.
    pub fn edges(&self) -> Rc<RefCell<Dataset>> {
        self.edges.clone()
    }

    /// The shared k-d tree query cache over `nodes()`.
    pub fn mquery(&self) -> Rc<RefCell<MultiQuery>> {
        self.mquery.clone()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().size_major()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.borrow().size_major()
    }

    /// Reads the `tails`/`heads` edge arrays (by default named `"tails"`
    /// and `"heads"`) as an adjacency list: `(tail_index, head_index)`
    /// pairs with `T`-typed array entries widened to `usize`.
    pub fn adjacency<T>(&self, tails: &str, heads: &str) -> Result<Vec<(usize, usize)>>
    where
        T: Element + Into<i64>,
    {
        let edges = self.edges.borrow();
        if self.num_edges() == 0 {
            return Ok(Vec::new());
        }
        let t = edges.get(tails).ok_or_else(|| Error::value(format!("no such edge array: {tails}")))?;
        let h = edges.get(heads).ok_or_else(|| Error::value(format!("no such edge array: {heads}")))?;
        let t = t.borrow();
        let h = h.borrow();
        let tv: Vec<T> = t.elements::<T>()?.to_vec();
        let hv: Vec<T> = h.elements::<T>()?.to_vec();
        Ok(tv
            .into_iter()
            .zip(hv)
            .map(|(a, b)| (a.into() as usize, b.into() as usize))
            .collect())
    }

    /// A compact forward-star adjacency representation: `adjacency[n]`
    /// lists every node reachable from node `n` by a single edge.
    pub fn adjacency_lists<T>(&self, tails: &str, heads: &str) -> Result<Vec<Vec<usize>>>
    where
        T: Element + Into<i64> + Copy,
    {
        let pairs = self.adjacency::<T>(tails, heads)?;
        let mut out = vec![Vec::new(); self.num_nodes()];
        for (t, h) in pairs {
            if t >= out.len() || h >= self.num_nodes() {
                return Err(Error::index(t.max(h), out.len()));
            }
            out[t].push(h);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn node_dataset(coords: &[[f64; 2]]) -> Dataset {
        let mut ds = Dataset::new();
        let n = coords.len();
        let xs: Vec<f64> = coords.iter().map(|p| p[0]).collect();
        let ys: Vec<f64> = coords.iter().map(|p| p[1]).collect();
        ds.add("x", Array::from_slice(&xs, &[n], false).unwrap()).unwrap();
        ds.add("y", Array::from_slice(&ys, &[n], false).unwrap()).unwrap();
        ds
    }

    #[test]
    fn empty_graph_has_no_nodes_or_edges() {
        let g = PointGraph::new();
        assert_eq!(g.num_nodes(), 0);
        assert_eq!(g.num_edges(), 0);
    }

    #[test]
    fn adjacency_lists_from_edge_arrays() {
        let nodes = node_dataset(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let mut edges = Dataset::new();
        edges.add("tails", Array::from_slice(&[0i32, 1], &[2], false).unwrap()).unwrap();
        edges.add("heads", Array::from_slice(&[1i32, 2], &[2], false).unwrap()).unwrap();
        let g = PointGraph::with_nodes_and_edges(nodes, edges);
        assert_eq!(g.num_nodes(), 3);
        assert_eq!(g.num_edges(), 2);
        let adj = g.adjacency_lists::<i32>("tails", "heads").unwrap();
        assert_eq!(adj, vec![vec![1], vec![2], vec![]]);
    }

    #[test]
    fn adjacency_rejects_out_of_range_index() {
        let nodes = node_dataset(&[[0.0, 0.0]]);
        let mut edges = Dataset::new();
        edges.add("tails", Array::from_slice(&[0i32], &[1], false).unwrap()).unwrap();
        edges.add("heads", Array::from_slice(&[5i32], &[1], false).unwrap()).unwrap();
        let g = PointGraph::with_nodes_and_edges(nodes, edges);
        assert!(g.adjacency_lists::<i32>("tails", "heads").is_err());
    }
}
