//! Static/dynamic k-d tree spatial indices over Dataset columns or
//! disjoint point sets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Distance metric used by a KDTree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Manhattan (L1) distance.
    L1,
    /// Euclidean distance, returned as squared length (length^2 units).
    L2,
    /// Euclidean distance via a path optimized for low dimensionality;
    /// returns the same squared-length units as `L2`.
    L2Simple,
}

impl Metric {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::L1 => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            Metric::L2 | Metric::L2Simple => {
                a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
            }
        }
    }
}

/// One knn/radius query result: a flat point index and its distance
/// (units per the query's metric).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the matched point in the tree's point buffer.
    pub index: usize,
    /// Distance from the query point, per the tree's metric.
    pub distance: f64,
}

/// A balanced, median-split k-d tree over a dynamically-dimensioned point
/// buffer.
///
/// Rebuilt wholesale on construction and on every `add_points` call; this
/// is a reference-scope k-d tree (adequate for the moderate point counts
/// typical of one detector readout window), not a fully persistent
/// incremental structure.
#[derive(Debug)]
struct KdTreeCore {
    dim: usize,
    points: Vec<f64>, // flat, row-major: point i occupies [i*dim, i*dim+dim)
    metric: Metric,
    order: Vec<u32>, // indices into `points`, reordered by the tree build
    tree: Vec<KdNode>,
}

#[derive(Debug)]
enum KdNode {
    Leaf { start: usize, end: usize },
    Split { axis: usize, value: f64, left: usize, right: usize },
}

impl KdTreeCore {
    const LEAF_SIZE: usize = 8;

    fn build(dim: usize, points: Vec<f64>, metric: Metric) -> Self {
        let npoints = if dim == 0 { 0 } else { points.len() / dim };
        let mut order: Vec<u32> = (0..npoints as u32).collect();
        let mut tree = Vec::new();
        if npoints > 0 {
            Self::build_range(&points, dim, &mut order, 0, npoints, &mut tree);
        }
        KdTreeCore {
            dim,
            points,
            metric,
            order,
            tree,
        }
    }

    fn build_range(
        points: &[f64],
        dim: usize,
        order: &mut [u32],
        start: usize,
        end: usize,
        tree: &mut Vec<KdNode>,
    ) -> usize {
        if end - start <= Self::LEAF_SIZE {
            tree.push(KdNode::Leaf { start, end });
            return tree.len() - 1;
        }
        // choose the axis of greatest spread among this slice
        let mut best_axis = 0;
        let mut best_spread = -1.0;
        for axis in 0..dim {
            let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
            for &idx in &order[start..end] {
                let v = points[idx as usize * dim + axis];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            let spread = hi - lo;
            if spread > best_spread {
                best_spread = spread;
                best_axis = axis;
            }
        }
        let mid = (start + end) / 2;
        order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            points[a as usize * dim + best_axis]
                .partial_cmp(&points[b as usize * dim + best_axis])
                .unwrap()
        });
        let split_value = points[order[mid] as usize * dim + best_axis];
        let left = Self::build_range(points, dim, order, start, mid, tree);
        let right = Self::build_range(points, dim, order, mid, end, tree);
        tree.push(KdNode::Split {
            axis: best_axis,
            value: split_value,
            left,
            right,
        });
        tree.len() - 1
    }

    fn point(&self, i: usize) -> &[f64] {
        &self.points[i * self.dim..(i + 1) * self.dim]
    }

    fn knn(&self, k: usize, query: &[f64]) -> Vec<Neighbor> {
        if self.tree.is_empty() {
            return Vec::new();
        }
        let mut heap: Vec<Neighbor> = Vec::new();
        self.knn_visit(self.tree.len() - 1, k, query, &mut heap);
        heap.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        heap.truncate(k);
        heap
    }

    fn knn_visit(&self, node: usize, k: usize, query: &[f64], acc: &mut Vec<Neighbor>) {
        match &self.tree[node] {
            KdNode::Leaf { start, end } => {
                for &idx in &self.order[*start..*end] {
                    let d = self.metric.distance(query, self.point(idx as usize));
                    acc.push(Neighbor {
                        index: idx as usize,
                        distance: d,
                    });
                }
                acc.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
                acc.truncate(k.max(1) * 4 + Self::LEAF_SIZE);
            }
            KdNode::Split { axis, value, left, right } => {
                let (near, far) = if query[*axis] <= *value {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                self.knn_visit(near, k, query, acc);
                // conservative: also visit far side (no pruning by split
                // plane distance); correct but not asymptotically optimal,
                // which is an acceptable trade at this crate's scope.
                self.knn_visit(far, k, query, acc);
            }
        }
    }

    fn radius(&self, r: f64, query: &[f64]) -> Vec<Neighbor> {
        if self.tree.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.radius_visit(self.tree.len() - 1, r, query, &mut out);
        out
    }

    fn radius_visit(&self, node: usize, r: f64, query: &[f64], out: &mut Vec<Neighbor>) {
        match &self.tree[node] {
            KdNode::Leaf { start, end } => {
                for &idx in &self.order[*start..*end] {
                    let d = self.metric.distance(query, self.point(idx as usize));
                    if d <= r {
                        out.push(Neighbor {
                            index: idx as usize,
                            distance: d,
                        });
                    }
                }
            }
            KdNode::Split { left, right, .. } => {
                self.radius_visit(*left, r, query, out);
                self.radius_visit(*right, r, query, out);
            }
        }
    }

    fn num_points(&self) -> usize {
        self.order.len()
    }
}

/// Whether a KDTree rebuilds wholesale or supports incremental growth.
#[derive(Debug)]
enum Index {
    Static(KdTreeCore),
    Dynamic(KdTreeCore),
}

/// A k-d tree over a fixed dimensionality of points, either static
/// (rebuild-only) or dynamic (incrementally appendable).
#[derive(Debug)]
pub struct KdTree {
    dim: usize,
    metric: Metric,
    index: Index,
}

impl KdTree {
    /// Builds a static index over `points` (flat, row-major, `dim` per
    /// row).
    pub fn build_static(dim: usize, points: Vec<f64>, metric: Metric) -> Self {
        debug!(dim, npoints = points.len() / dim.max(1), "building static kdtree");
        KdTree {
            dim,
            metric,
            index: Index::Static(KdTreeCore::build(dim, points, metric)),
        }
    }

    /// Builds a dynamic index over `points` that may later grow via
    /// `add_points`.
    pub fn build_dynamic(dim: usize, points: Vec<f64>, metric: Metric) -> Self {
        debug!(dim, npoints = points.len() / dim.max(1), "building dynamic kdtree");
        KdTree {
            dim,
            metric,
            index: Index::Dynamic(KdTreeCore::build(dim, points, metric)),
        }
    }

    /// Adds a contiguous block of new points (flat, row-major). Dynamic
    /// indices rebuild incrementally; static indices raise `LogicError`.
    pub fn add_points(&mut self, new_points: &[f64]) -> Result<()> {
        match &mut self.index {
            Index::Static(_) => Err(Error::logic("add_points on a static KDTree")),
            Index::Dynamic(core) => {
                let mut all = std::mem::take(&mut core.points);
                all.extend_from_slice(new_points);
                trace!(added = new_points.len() / self.dim.max(1), "extending dynamic kdtree");
                *core = KdTreeCore::build(self.dim, all, self.metric);
                Ok(())
            }
        }
    }

    fn core(&self) -> &KdTreeCore {
        match &self.index {
            Index::Static(c) | Index::Dynamic(c) => c,
        }
    }

    /// At most `k` nearest neighbors of `query`, ascending by distance.
    pub fn knn(&self, k: usize, query: &[f64]) -> Vec<Neighbor> {
        self.core().knn(k, query)
    }

    /// All neighbors within distance `r` (metric units) of `query`.
    pub fn radius(&self, r: f64, query: &[f64]) -> Vec<Neighbor> {
        self.core().radius(r, query)
    }

    /// Number of indexed points.
    pub fn num_points(&self) -> usize {
        self.core().num_points()
    }

    /// True if this index is the static (rebuild-only) variant.
    pub fn is_static(&self) -> bool {
        matches!(self.index, Index::Static(_))
    }
}

/// Builds a KDTree over a Dataset's named coordinate columns and
/// registers an append callback so the index tracks future appends:
/// dynamic indices extend, static indices raise on the next append.
pub fn build_over_dataset(
    ds: &Rc<RefCell<Dataset>>,
    names: &[&str],
    metric: Metric,
    dynamic: bool,
) -> Result<Rc<RefCell<KdTree>>> {
    let dim = names.len();
    let points = flatten_points(ds, names)?;
    let kd = if dynamic {
        KdTree::build_dynamic(dim, points, metric)
    } else {
        KdTree::build_static(dim, points, metric)
    };
    let kd = Rc::new(RefCell::new(kd));
    let weak: Weak<RefCell<KdTree>> = Rc::downgrade(&kd);
    let ds_weak: Weak<RefCell<Dataset>> = Rc::downgrade(ds);
    let names_owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    ds.borrow_mut().register_append(move |_before, _after| {
        let (Some(kd), Some(ds)) = (weak.upgrade(), ds_weak.upgrade()) else {
            return Ok(());
        };
        let names_ref: Vec<&str> = names_owned.iter().map(String::as_str).collect();
        if kd.borrow().is_static() {
            // Static index: appending to the tracked Dataset is rejected
            // outright, propagated out of Dataset::append via this
            // callback's Result.
            return kd.borrow_mut().add_points(&[]);
        }
        let new_points = flatten_points(&ds, &names_ref)?;
        let dim = kd.borrow().dim;
        let already = kd.borrow().num_points();
        let fresh = &new_points[already * dim..];
        kd.borrow_mut().add_points(fresh)
    });
    Ok(kd)
}

fn flatten_points(ds: &Rc<RefCell<Dataset>>, names: &[&str]) -> Result<Vec<f64>> {
    let ds = ds.borrow();
    let sel = ds.selection(names);
    if sel.is_empty() {
        return Err(Error::value("build_over_dataset: missing coordinate column"));
    }
    let n = sel.size_major();
    let mut out = Vec::with_capacity(n * names.len());
    for row in 0..n {
        out.extend(sel.row_f64(row)?);
    }
    Ok(out)
}

/// Caches multiple k-d trees over one Dataset, keyed by (coord-names,
/// dynamic-flag, metric).
#[derive(Default, Debug)]
pub struct MultiQuery {
    cache: RefCell<HashMap<(Vec<String>, bool, Metric), Rc<RefCell<KdTree>>>>,
}

impl MultiQuery {
    /// A fresh, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached tree for this key, building and installing a
    /// Dataset append callback on first use.
    pub fn get_or_build(
        &self,
        ds: &Rc<RefCell<Dataset>>,
        names: &[&str],
        dynamic: bool,
        metric: Metric,
    ) -> Result<Rc<RefCell<KdTree>>> {
        let key = (names.iter().map(|s| s.to_string()).collect::<Vec<_>>(), dynamic, metric);
        if let Some(kd) = self.cache.borrow().get(&key) {
            return Ok(kd.clone());
        }
        let kd = build_over_dataset(ds, names, metric, dynamic)?;
        self.cache.borrow_mut().insert(key, kd.clone());
        Ok(kd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn grid_dataset(n: usize) -> Rc<RefCell<Dataset>> {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut zs = Vec::new();
        for i in 0..n {
            xs.push(i as f64);
            ys.push((i * 2) as f64);
            zs.push((i * 3) as f64);
        }
        let mut ds = Dataset::new();
        ds.add("x", Array::from_slice(&xs, &[n], false).unwrap()).unwrap();
        ds.add("y", Array::from_slice(&ys, &[n], false).unwrap()).unwrap();
        ds.add("z", Array::from_slice(&zs, &[n], false).unwrap()).unwrap();
        Rc::new(RefCell::new(ds))
    }

    #[test]
    fn knn_orders_by_distance() {
        let ds = grid_dataset(50);
        let kd = build_over_dataset(&ds, &["x", "y", "z"], Metric::L2, true).unwrap();
        let res = kd.borrow().knn(3, &[0.0, 0.0, 0.0]);
        assert_eq!(res.len(), 3);
        assert!(res.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(res[0].index, 0);
    }

    #[test]
    fn static_index_rejects_add_points() {
        let mut kd = KdTree::build_static(1, vec![1.0, 2.0, 3.0], Metric::L2);
        assert!(kd.add_points(&[4.0]).is_err());
    }

    #[test]
    fn dynamic_index_grows_via_callback() {
        let ds = grid_dataset(10);
        let kd = build_over_dataset(&ds, &["x", "y", "z"], Metric::L2, true).unwrap();
        assert_eq!(kd.borrow().num_points(), 10);

        let mut tail = Dataset::new();
        tail.add("x", Array::from_slice(&[100.0f64], &[1], false).unwrap())
            .unwrap();
        tail.add("y", Array::from_slice(&[200.0f64], &[1], false).unwrap())
            .unwrap();
        tail.add("z", Array::from_slice(&[300.0f64], &[1], false).unwrap())
            .unwrap();
        ds.borrow_mut().append(&tail).unwrap();

        assert_eq!(kd.borrow().num_points(), 11);
        let res = kd.borrow().knn(1, &[100.0, 200.0, 300.0]);
        assert_eq!(res[0].index, 10);
    }

    #[test]
    fn static_index_raises_on_dataset_append() {
        let ds = grid_dataset(10);
        let kd = build_over_dataset(&ds, &["x", "y", "z"], Metric::L2, false).unwrap();
        assert!(kd.borrow().is_static());

        let mut tail = Dataset::new();
        tail.add("x", Array::from_slice(&[100.0f64], &[1], false).unwrap())
            .unwrap();
        tail.add("y", Array::from_slice(&[200.0f64], &[1], false).unwrap())
            .unwrap();
        tail.add("z", Array::from_slice(&[300.0f64], &[1], false).unwrap())
            .unwrap();

        assert!(ds.borrow_mut().append(&tail).is_err());
    }
}
