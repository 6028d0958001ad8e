//! Tensor data model: a self-describing, path-addressed flattening of
//! Arrays, Datasets, PointGraphs, PointTrees, Frames, and Clusters into
//! `Tensor`s, and back.
//!
//! Each `Tensor` carries a `datatype` and `datapath` in its metadata;
//! cross-tensor references (parent/child, node/edge sets) are recorded
//! as further metadata keys rather than as live pointers, so a
//! `Vec<Tensor>` round-trips through serialization on its own.

pub mod array;
pub mod cluster;
pub mod dataset;
pub mod frame;
pub mod graph;
pub mod pctree;

use regex::Regex;
use std::collections::BTreeMap;

use crate::array::TypeTag;
use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// A self-describing tensor: shape, element-type tag, raw bytes, and a
/// metadata tree. `datatype`/`datapath` are conventionally stored under
/// those keys in `metadata` rather than as separate fields, matching
/// the "metadata carries cross-references" design of §4.10.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Axis sizes; empty for a metadata-only (array-less) tensor.
    pub shape: Vec<usize>,
    /// Element type of `bytes`; `TypeTag::Byte` for a metadata-only
    /// tensor.
    pub type_tag: TypeTag,
    /// Raw element bytes, row-major.
    pub bytes: Vec<u8>,
    /// Free-form metadata, always including `datatype` and `datapath`.
    pub metadata: Metadata,
}

impl Tensor {
    /// This tensor's `datatype` metadata key.
    pub fn datatype(&self) -> &str {
        self.metadata.get("datatype").and_then(Metadata::as_str).unwrap_or("")
    }

    /// This tensor's `datapath` metadata key.
    pub fn datapath(&self) -> &str {
        self.metadata.get("datapath").and_then(Metadata::as_str).unwrap_or("")
    }
}

/// Builds a metadata-only (array-less) tensor with `datatype`/`datapath`
/// set, merged with any additional keys in `extra`.
pub fn make_metadata_tensor(datatype: &str, datapath: &str, extra: Metadata) -> Tensor {
    let mut md = extra;
    if md.is_null() {
        md = Metadata::object();
    }
    md.insert("datatype", datatype).insert("datapath", datapath);
    Tensor {
        shape: Vec::new(),
        type_tag: TypeTag::Byte,
        bytes: Vec::new(),
        metadata: md,
    }
}

/// Indexes tensors by their `datapath`, as positions in `tens`.
pub fn index_datapaths(tens: &[Tensor]) -> BTreeMap<String, usize> {
    tens.iter()
        .enumerate()
        .map(|(i, t)| (t.datapath().to_string(), i))
        .collect()
}

/// The first tensor whose `datatype` matches.
pub fn first_of<'a>(tens: &'a [Tensor], datatype: &str) -> Option<&'a Tensor> {
    tens.iter().find(|t| t.datatype() == datatype)
}

/// The tensor of the given `datatype`, further constrained to
/// `datapath` if non-empty. Fails if none match.
pub fn top_tensor<'a>(tens: &'a [Tensor], datatype: &str, datapath: &str) -> Result<&'a Tensor> {
    tens.iter()
        .find(|t| t.datatype() == datatype && (datapath.is_empty() || t.datapath() == datapath))
        .ok_or_else(|| Error::value(format!("top_tensor: no {datatype:?} tensor at {datapath:?}")))
}

/// All tensors whose `datapath` matches `pattern`.
pub fn match_at<'a>(tens: &'a [Tensor], pattern: &str) -> Result<Vec<&'a Tensor>> {
    let re = Regex::new(pattern).map_err(|e| Error::value(format!("match_at: bad pattern: {e}")))?;
    Ok(tens.iter().filter(|t| re.is_match(t.datapath())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_tensor_carries_datatype_and_path() {
        let t = make_metadata_tensor("pcdataset", "foo/bar", Metadata::object());
        assert_eq!(t.datatype(), "pcdataset");
        assert_eq!(t.datapath(), "foo/bar");
    }

    #[test]
    fn match_at_filters_by_regex() {
        let tens = vec![
            make_metadata_tensor("pcarray", "a/arrays/x", Metadata::object()),
            make_metadata_tensor("pcarray", "a/arrays/y", Metadata::object()),
            make_metadata_tensor("pcdataset", "a", Metadata::object()),
        ];
        let hits = match_at(&tens, "^a/arrays/").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn top_tensor_requires_datapath_when_given() {
        let tens = vec![
            make_metadata_tensor("pcdataset", "a", Metadata::object()),
            make_metadata_tensor("pcdataset", "b", Metadata::object()),
        ];
        assert_eq!(top_tensor(&tens, "pcdataset", "b").unwrap().datapath(), "b");
        assert!(top_tensor(&tens, "pcdataset", "z").is_err());
    }
}
