//! `Points`: the NaryTree value type binding node-local named Datasets,
//! scoped disjoint views, and scoped k-d trees.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::array::TypeTag;
use crate::dataset::Dataset;
use crate::disjoint_dataset::DisjointDataset;
use crate::error::{Error, Result};
use crate::kdtree::{KdTree, Metric};
use crate::nary_tree::{Node, Notify, WeakNode};

/// The (pcname, coord-names, max-depth) equivalence class selecting a
/// flattened view across a PointTree subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Name of the local Dataset this scope flattens.
    pub pcname: String,
    /// Names of the coordinate arrays within that Dataset.
    pub coords: Vec<String>,
    /// Maximum node depth (relative to the scope's root node) included
    /// in the view; 0 means unlimited.
    pub max_depth: usize,
}

impl Scope {
    /// Builds a Scope from borrowed string slices.
    pub fn new(pcname: &str, coords: &[&str], max_depth: usize) -> Self {
        Scope {
            pcname: pcname.to_string(),
            coords: coords.iter().map(|s| s.to_string()).collect(),
            max_depth,
        }
    }

    fn node_in_scope(&self, node: &Node<Points>) -> bool {
        node.with_value(|pts| match pts.local.get(&self.pcname) {
            Some(ds) => {
                let ds = ds.borrow();
                self.coords.iter().all(|c| ds.has(c))
            }
            None => false,
        })
    }
}

struct ScopeCache {
    djds: DisjointDataset,
    kd: Option<(TypeTag, Rc<RefCell<KdTree>>)>,
}

/// A PointTree node value: node-local named Datasets plus lazily built,
/// cached scoped views.
pub struct Points {
    local: BTreeMap<String, Rc<RefCell<Dataset>>>,
    own: Option<WeakNode<Points>>,
    scopes: RefCell<HashMap<Scope, ScopeCache>>,
}

impl Default for Points {
    fn default() -> Self {
        Points {
            local: BTreeMap::new(),
            own: None,
            scopes: RefCell::new(HashMap::new()),
        }
    }
}

impl Points {
    /// A fresh, empty Points value (use `Node::new` to attach to a tree).
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a local Dataset under `name`.
    pub fn set_local(&mut self, name: impl Into<String>, ds: Dataset) {
        self.local.insert(name.into(), Rc::new(RefCell::new(ds)));
    }

    /// The local Dataset named `name`, if present.
    pub fn local(&self, name: &str) -> Option<Rc<RefCell<Dataset>>> {
        self.local.get(name).cloned()
    }

    /// Names of this node's local Datasets.
    pub fn local_names(&self) -> Vec<&str> {
        self.local.keys().map(String::as_str).collect()
    }

    fn own_node(&self) -> Node<Points> {
        self.own
            .as_ref()
            .and_then(WeakNode::upgrade)
            .expect("Points value used before being attached to a Node")
    }

    fn depth_capped_nodes(&self, max_depth: usize) -> Vec<Node<Points>> {
        let root = self.own_node();
        if max_depth == 0 {
            root.depth_first(0)
        } else {
            root.depth_first(max_depth + 1)
        }
    }

    /// Returns the cached DisjointDataset for `scope`, building it
    /// lazily by a depth-capped descent that collects each in-scope
    /// node's Dataset named `scope.pcname`.
    pub fn scoped_pc(&self, scope: &Scope) -> DisjointDataset {
        self.ensure_scope(scope);
        // DisjointDataset has no Clone; rebuild a lightweight view by
        // re-reading the cache's dataset handles.
        let cache = self.scopes.borrow();
        let entry = &cache[scope];
        let mut out = DisjointDataset::new();
        for ds in entry.djds.datasets() {
            out.push(ds.clone());
        }
        out
    }

    fn ensure_scope(&self, scope: &Scope) {
        if self.scopes.borrow().contains_key(scope) {
            return;
        }
        let mut djds = DisjointDataset::new();
        for node in self.depth_capped_nodes(scope.max_depth) {
            if scope.node_in_scope(&node) {
                let ds = node.with_value(|pts| pts.local(&scope.pcname)).unwrap();
                djds.push(ds);
            }
        }
        trace!(pcname = %scope.pcname, n = djds.num_ranges(), "built scoped point cloud");
        self.scopes
            .borrow_mut()
            .insert(scope.clone(), ScopeCache { djds, kd: None });
    }

    /// Returns the cached k-d tree over `scope`'s coordinate arrays,
    /// building it lazily. Raises `ValueError` if a k-d tree was
    /// previously cached for this scope with a different element type.
    pub fn scoped_kd<T: crate::array::Element>(
        &self,
        scope: &Scope,
        metric: Metric,
    ) -> Result<Rc<RefCell<KdTree>>> {
        self.ensure_scope(scope);
        let mut cache = self.scopes.borrow_mut();
        let entry = cache.get_mut(scope).expect("ensured above");
        if let Some((tag, kd)) = &entry.kd {
            if *tag != T::TAG {
                return Err(Error::type_mismatch(*tag, T::TAG));
            }
            return Ok(kd.clone());
        }
        let coords: Vec<&str> = scope.coords.iter().map(String::as_str).collect();
        let pts = flatten_djds(&entry.djds, &coords)?;
        let dim = coords.len();
        let kd = Rc::new(RefCell::new(KdTree::build_dynamic(dim, pts, metric)));
        entry.kd = Some((T::TAG, kd.clone()));
        Ok(kd)
    }
}

fn flatten_djds(djds: &DisjointDataset, coords: &[&str]) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(djds.size() * coords.len());
    for ds in djds.datasets() {
        let ds = ds.borrow();
        let sel = ds.selection(coords);
        for row in 0..sel.size_major() {
            out.extend(sel.row_f64(row)?);
        }
    }
    Ok(out)
}

impl Notify for Points {
    fn on_construct(&mut self, node: &Node<Self>) {
        self.own = Some(node.downgrade());
    }

    fn on_insert(&mut self, path: &[Node<Self>]) -> bool {
        let inserted = &path[0];
        let depth = path.len() - 1;
        let mut cache = self.scopes.borrow_mut();
        for (scope, entry) in cache.iter_mut() {
            if scope.max_depth != 0 && depth > scope.max_depth {
                continue;
            }
            if !scope.node_in_scope(inserted) {
                continue;
            }
            let ds = inserted.with_value(|pts| pts.local(&scope.pcname)).unwrap();
            let coords: Vec<&str> = scope.coords.iter().map(String::as_str).collect();
            let new_points = {
                let ds_ref = ds.borrow();
                let sel = ds_ref.selection(&coords);
                (0..sel.size_major())
                    .flat_map(|row| sel.row_f64(row).unwrap_or_default())
                    .collect::<Vec<_>>()
            };
            entry.djds.push(ds);
            if let Some((_, kd)) = &entry.kd {
                let _ = kd.borrow_mut().add_points(&new_points);
            }
        }
        true
    }

    fn on_remove(&mut self, path: &[Node<Self>]) -> bool {
        let removed = &path[0];
        let mut cache = self.scopes.borrow_mut();
        cache.retain(|scope, _| !scope.node_in_scope(removed));
        true
    }
}

/// A PointTree node: a NaryTree node whose value is `Points`.
pub type PointNode = Node<Points>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn pc3d(n: usize, offset: f64) -> Dataset {
        let xs: Vec<f64> = (0..n).map(|i| offset + i as f64).collect();
        let ys = xs.clone();
        let zs = xs.clone();
        let mut ds = Dataset::new();
        ds.add("x", Array::from_slice(&xs, &[n], false).unwrap()).unwrap();
        ds.add("y", Array::from_slice(&ys, &[n], false).unwrap()).unwrap();
        ds.add("z", Array::from_slice(&zs, &[n], false).unwrap()).unwrap();
        ds
    }

    #[test]
    fn scoped_pc_collects_in_scope_datasets() {
        let root = Node::new(Points::new());
        let c1 = Node::new(Points::new());
        let c2 = Node::new(Points::new());
        c1.with_value_mut(|p| p.set_local("3d", pc3d(100, 0.0)));
        c2.with_value_mut(|p| p.set_local("3d", pc3d(100, 1000.0)));
        root.insert(c1);
        root.insert(c2);

        let scope = Scope::new("3d", &["x", "y", "z"], 0);
        let djds = root.with_value(|p| p.scoped_pc(&scope));
        assert_eq!(djds.size(), 200);
    }

    #[test]
    fn scoped_kd_knn_resolves_via_disjoint_range() {
        let root = Node::new(Points::new());
        let c1 = Node::new(Points::new());
        let c2 = Node::new(Points::new());
        c1.with_value_mut(|p| p.set_local("3d", pc3d(100, 0.0)));
        c2.with_value_mut(|p| p.set_local("3d", pc3d(100, 1000.0)));
        root.insert(c1);
        root.insert(c2);

        let scope = Scope::new("3d", &["x", "y", "z"], 0);
        let kd = root
            .with_value(|p| p.scoped_kd::<f64>(&scope, Metric::L2))
            .unwrap();
        let res = kd.borrow().knn(3, &[0.0, 0.0, 0.0]);
        assert_eq!(res.len(), 3);

        let djds = root.with_value(|p| p.scoped_pc(&scope));
        let (range_idx, _) = djds.locate(res[0].index).unwrap();
        assert_eq!(range_idx, 0);
    }

    #[test]
    fn scoped_kd_rejects_type_collision() {
        let root = Node::new(Points::new());
        let c1 = Node::new(Points::new());
        c1.with_value_mut(|p| p.set_local("3d", pc3d(10, 0.0)));
        root.insert(c1);
        let scope = Scope::new("3d", &["x", "y", "z"], 0);
        root.with_value(|p| p.scoped_kd::<f64>(&scope, Metric::L2))
            .unwrap();
        assert!(
            root.with_value(|p| p.scoped_kd::<f32>(&scope, Metric::L2))
                .is_err()
        );
    }

    #[test]
    fn insert_after_scope_cached_extends_view() {
        let root = Node::new(Points::new());
        let c1 = Node::new(Points::new());
        c1.with_value_mut(|p| p.set_local("3d", pc3d(10, 0.0)));
        root.insert(c1);

        let scope = Scope::new("3d", &["x", "y", "z"], 0);
        assert_eq!(root.with_value(|p| p.scoped_pc(&scope)).size(), 10);

        let c2 = Node::new(Points::new());
        c2.with_value_mut(|p| p.set_local("3d", pc3d(5, 100.0)));
        root.insert(c2);

        assert_eq!(root.with_value(|p| p.scoped_pc(&scope)).size(), 15);
    }
}
