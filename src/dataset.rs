//! Name→Array collections sharing a major-axis invariant, with append
//! change-notification callbacks.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::array::Array;
use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// A shared, interior-mutable handle to an Array, as held by a Dataset.
pub type ArrayHandle = Rc<RefCell<Array>>;

type AppendCallback = Box<dyn FnMut(usize, usize) -> Result<()>>;

/// An ordered collection of named Arrays sharing one major-axis length.
pub struct Dataset {
    arrays: BTreeMap<String, ArrayHandle>,
    metadata: Metadata,
    callbacks: Vec<AppendCallback>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset {
    /// An empty dataset.
    pub fn new() -> Self {
        Dataset {
            arrays: BTreeMap::new(),
            metadata: Metadata::Null,
            callbacks: Vec::new(),
        }
    }

    /// Builds a dataset from a name→Array map; fails if the arrays do not
    /// share a common major-axis size.
    pub fn from_map(map: impl IntoIterator<Item = (String, Array)>) -> Result<Self> {
        let mut ds = Dataset::new();
        for (name, arr) in map {
            ds.add(name, arr)?;
        }
        Ok(ds)
    }

    /// Installs `arr` under `name`. Fails with `ValueError` on duplicate
    /// name or a major-axis size mismatch with existing arrays.
    pub fn add(&mut self, name: impl Into<String>, arr: Array) -> Result<()> {
        let name = name.into();
        if self.arrays.contains_key(&name) {
            return Err(Error::value(format!("duplicate array name {name:?}")));
        }
        if let Some(expected) = self.size_major_opt() {
            if arr.size_major() != expected {
                return Err(Error::value(format!(
                    "add({name:?}): major axis {} does not match dataset major axis {expected}",
                    arr.size_major()
                )));
            }
        }
        self.arrays.insert(name, Rc::new(RefCell::new(arr)));
        Ok(())
    }

    /// The array named `name`, if present.
    pub fn get(&self, name: &str) -> Option<ArrayHandle> {
        self.arrays.get(name).cloned()
    }

    /// Mutable access to the array named `name`, bypassing the append
    /// callback machinery. Direct mutation through this handle is
    /// documented as undefined with respect to derived caches (k-d
    /// trees, disjoint views) since no callback fires.
    pub fn get_mut(&self, name: &str) -> Option<ArrayHandle> {
        if self.arrays.contains_key(name) {
            warn!(
                name,
                "get_mut bypasses Dataset's append-callback machinery; \
                 derived caches (KDTree, DisjointDataset) will not observe this mutation"
            );
        }
        self.arrays.get(name).cloned()
    }

    /// True if an array named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Array names, in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.arrays.keys().map(String::as_str).collect()
    }

    /// Number of arrays in this dataset.
    pub fn size(&self) -> usize {
        self.arrays.len()
    }

    fn size_major_opt(&self) -> Option<usize> {
        self.arrays.values().next().map(|a| a.borrow().size_major())
    }

    /// The point count (major-axis size), 0 if empty.
    pub fn size_major(&self) -> usize {
        self.size_major_opt().unwrap_or(0)
    }

    /// This dataset's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to this dataset's metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// An ordered Selection of the named arrays; empty if any name is
    /// missing.
    pub fn selection(&self, names: &[&str]) -> Selection {
        let mut arrays = Vec::with_capacity(names.len());
        for &name in names {
            match self.get(name) {
                Some(a) => arrays.push(a),
                None => return Selection { arrays: Vec::new() },
            }
        }
        Selection { arrays }
    }

    /// Installs a callback invoked after each successful `append`, with
    /// `(size_major_before, size_major_after)`. A callback returning
    /// `Err` aborts the append: later callbacks are not invoked and the
    /// error propagates out of `append` to the caller, even though the
    /// arrays themselves have already been extended.
    pub fn register_append(&mut self, f: impl FnMut(usize, usize) -> Result<()> + 'static) {
        self.callbacks.push(Box::new(f));
    }

    /// Appends `tail`'s arrays into the matching-named arrays of this
    /// dataset. `tail`'s key set must be a superset of this dataset's.
    /// If this dataset is empty, it first adopts `tail`'s shape (keys).
    pub fn append(&mut self, tail: &Dataset) -> Result<()> {
        let my_keys: Vec<String> = self.arrays.keys().cloned().collect();
        for k in &my_keys {
            if !tail.has(k) {
                return Err(Error::value(format!(
                    "append: tail dataset is missing key {k:?}"
                )));
            }
        }
        if self.arrays.is_empty() {
            for name in tail.keys() {
                let cloned = tail.get(name).unwrap().borrow().zeros_like(0);
                self.arrays.insert(name.to_string(), Rc::new(RefCell::new(cloned)));
            }
        }

        let n0 = self.size_major();
        let tail_major = tail.size_major();
        for name in self.keys().into_iter().map(str::to_owned).collect::<Vec<_>>() {
            let tail_arr = tail.get(&name).expect("checked above");
            let mut mine = self.arrays.get(&name).unwrap().borrow_mut();
            mine.append_array(&tail_arr.borrow())?;
        }
        let n1 = n0 + tail_major;
        trace!(n0, n1, ncallbacks = self.callbacks.len(), "dataset append");
        for cb in &mut self.callbacks {
            cb(n0, n1)?;
        }
        Ok(())
    }

    /// Per-array `zeros_like(nmaj)`, assembled into a new Dataset with
    /// the same keys (but no metadata or callbacks).
    pub fn zeros_like(&self, nmaj: usize) -> Dataset {
        let mut ds = Dataset::new();
        for (name, arr) in &self.arrays {
            ds.arrays
                .insert(name.clone(), Rc::new(RefCell::new(arr.borrow().zeros_like(nmaj))));
        }
        ds
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        if self.metadata != other.metadata {
            return false;
        }
        if self.keys() != other.keys() {
            return false;
        }
        self.arrays.iter().all(|(k, v)| {
            other
                .arrays
                .get(k)
                .is_some_and(|ov| *v.borrow() == *ov.borrow())
        })
    }
}

impl Clone for Dataset {
    fn clone(&self) -> Self {
        let mut arrays = BTreeMap::new();
        for (k, v) in &self.arrays {
            arrays.insert(k.clone(), Rc::new(RefCell::new(v.borrow().to_owned_clone())));
        }
        Dataset {
            arrays,
            metadata: self.metadata.clone(),
            callbacks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("keys", &self.keys())
            .field("size_major", &self.size_major())
            .finish()
    }
}

/// An ordered sequence of shared Array references drawn from one Dataset
/// by name list.
#[derive(Clone)]
pub struct Selection {
    arrays: Vec<ArrayHandle>,
}

impl Selection {
    /// True if no names resolved (a missing-name selection).
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Number of columns in this selection.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// The i-th column's array handle.
    pub fn column(&self, i: usize) -> &ArrayHandle {
        &self.arrays[i]
    }

    /// The major-axis size shared by this selection's arrays (0 if
    /// empty).
    pub fn size_major(&self) -> usize {
        self.arrays
            .first()
            .map(|a| a.borrow().size_major())
            .unwrap_or(0)
    }

    /// Reads row `row` as an f64 vector (one entry per column),
    /// regardless of the columns' underlying element type, so long as it
    /// is one of the floating or integer primitives.
    pub fn row_f64(&self, row: usize) -> Result<Vec<f64>> {
        use crate::array::TypeTag;
        let mut out = Vec::with_capacity(self.arrays.len());
        for col in &self.arrays {
            let a = col.borrow();
            let v = match a.type_tag() {
                TypeTag::F64 => a.elements::<f64>()?[row],
                TypeTag::F32 => a.elements::<f32>()?[row] as f64,
                TypeTag::I64 => a.elements::<i64>()?[row] as f64,
                TypeTag::I32 => a.elements::<i32>()?[row] as f64,
                TypeTag::U32 => a.elements::<u32>()?[row] as f64,
                TypeTag::U64 => a.elements::<u64>()?[row] as f64,
                other => return Err(Error::value(format!("row_f64: unsupported tag {other:?}"))),
            };
            out.push(v);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_invokes_callback_with_range() {
        let mut d = Dataset::new();
        d.add("one", Array::from_slice(&[1i64, 2, 3], &[3], false).unwrap())
            .unwrap();
        d.add(
            "two",
            Array::from_slice(&[1.1f64, 2.2, 3.3], &[3], false).unwrap(),
        )
        .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        d.register_append(move |a, b| {
            seen2.borrow_mut().push((a, b));
            Ok(())
        });

        let mut tail = Dataset::new();
        tail.add("one", Array::from_slice(&[4i64, 5], &[2], false).unwrap())
            .unwrap();
        tail.add(
            "two",
            Array::from_slice(&[4.4f64, 5.4], &[2], false).unwrap(),
        )
        .unwrap();

        d.append(&tail).unwrap();
        assert_eq!(*seen.borrow(), vec![(3, 5)]);
        assert_eq!(d.size_major(), 5);
        assert_eq!(
            d.get("one").unwrap().borrow().elements::<i64>().unwrap(),
            &[1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn append_callback_error_propagates_out_of_append() {
        let mut d = Dataset::new();
        d.add("one", Array::from_slice(&[1i64, 2, 3], &[3], false).unwrap())
            .unwrap();
        d.register_append(|_before, _after| Err(Error::logic("rejecting append")));

        let mut tail = Dataset::new();
        tail.add("one", Array::from_slice(&[4i64], &[1], false).unwrap())
            .unwrap();

        assert!(d.append(&tail).is_err());
    }

    #[test]
    fn add_duplicate_name_errors() {
        let mut d = Dataset::new();
        d.add("a", Array::from_slice(&[1i32], &[1], false).unwrap())
            .unwrap();
        assert!(
            d.add("a", Array::from_slice(&[2i32], &[1], false).unwrap())
                .is_err()
        );
    }

    #[test]
    fn add_major_axis_mismatch_errors() {
        let mut d = Dataset::new();
        d.add("a", Array::from_slice(&[1i32, 2], &[2], false).unwrap())
            .unwrap();
        assert!(
            d.add("b", Array::from_slice(&[1i32], &[1], false).unwrap())
                .is_err()
        );
    }
}
