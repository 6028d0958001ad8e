//! A `DisjointRange` specialized for flattening a list of Datasets into
//! one coordinate-queryable view, as used by scoped point-tree caches.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dataset::Dataset;
use crate::disjoint::{DisjointRange, IndexableLen};
use crate::error::Result;

type DatasetHandle = Rc<RefCell<Dataset>>;

impl IndexableLen for DatasetHandle {
    // Each "element" of a Dataset range is just its own row index; actual
    // coordinate extraction goes through `DisjointDataset::row_f64`,
    // which needs the name list and thus cannot live on this blanket impl.
    type Item = usize;
    fn len(&self) -> usize {
        self.borrow().size_major()
    }
    fn get(&self, i: usize) -> usize {
        i
    }
}

/// A flat view over the local Dataset (named `pcname`) of every in-scope
/// node in a subtree.
pub struct DisjointDataset {
    inner: DisjointRange<DatasetHandle>,
}

impl Default for DisjointDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl DisjointDataset {
    /// An empty disjoint dataset.
    pub fn new() -> Self {
        DisjointDataset {
            inner: DisjointRange::new(),
        }
    }

    /// Appends one node's Dataset to the flattened view.
    pub fn push(&mut self, ds: DatasetHandle) {
        self.inner.push(ds);
    }

    /// Total point count across all constituent datasets.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Number of constituent datasets.
    pub fn num_ranges(&self) -> usize {
        self.inner.num_ranges()
    }

    /// Resolves a flat index into (dataset-index, row-within-dataset).
    pub fn locate(&self, flat: usize) -> Result<(usize, usize)> {
        self.inner.locate(flat)
    }

    /// Reads the named columns at flat row `flat` as f64s.
    pub fn row_f64(&self, names: &[&str], flat: usize) -> Result<Vec<f64>> {
        let (ri, off) = self.locate(flat)?;
        let ds = self.inner.ranges()[ri].borrow();
        ds.selection(names).row_f64(off)
    }

    /// The underlying per-node dataset handles.
    pub fn datasets(&self) -> &[DatasetHandle] {
        self.inner.ranges()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    #[test]
    fn flattens_across_datasets() {
        let mut a = Dataset::new();
        a.add("x", Array::from_slice(&[1.0f64, 2.0], &[2], false).unwrap())
            .unwrap();
        let mut b = Dataset::new();
        b.add("x", Array::from_slice(&[3.0f64], &[1], false).unwrap())
            .unwrap();

        let mut dd = DisjointDataset::new();
        dd.push(Rc::new(RefCell::new(a)));
        dd.push(Rc::new(RefCell::new(b)));

        assert_eq!(dd.size(), 3);
        assert_eq!(dd.row_f64(&["x"], 2).unwrap(), vec![3.0]);
        assert_eq!(dd.locate(2).unwrap(), (1, 0));
    }
}
