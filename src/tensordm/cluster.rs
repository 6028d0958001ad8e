//! `cluster`/`clnodeset`/`cledgeset` encoding for a minimal, ambient
//! `Cluster` value type: a set of typed node Datasets plus typed edge
//! Datasets relating pairs of node types.

use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::tensordm::dataset::{as_dataset, as_tensors as dataset_as_tensors};
use crate::tensordm::{first_of, make_metadata_tensor, top_tensor, Tensor};

/// A typed node/edge point cloud collection, as emitted by cluster
/// finders: named sets of nodes, and named sets of edges relating two
/// (possibly equal) node types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    /// Node type name → its Dataset of node attribute arrays.
    pub node_sets: BTreeMap<String, Dataset>,
    /// Edge type name → (edge Dataset, tail node type, head node type).
    pub edge_sets: BTreeMap<String, (Dataset, String, String)>,
}

impl Cluster {
    /// An empty cluster.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Converts `cluster` to tensors: a `cluster` head tensor at `datapath`
/// naming `nodesets`/`edgesets` subpaths (the latter also recording
/// each edge type's tail/head node type names), followed by one
/// `clnodeset`/`cledgeset` `pcdataset` subtree per entry.
pub fn as_tensors(cluster: &Cluster, datapath: &str) -> Vec<Tensor> {
    let mut out = Vec::new();
    let mut nodesets_md = Metadata::object();
    for name in cluster.node_sets.keys() {
        let dp = format!("{datapath}/nodesets/{name}");
        nodesets_md.insert(name.clone(), dp.clone());
        out.extend(dataset_as_tensors(&cluster.node_sets[name], &dp));
    }
    let mut edgesets_md = Metadata::object();
    for (name, (ds, tail_type, head_type)) in &cluster.edge_sets {
        let dp = format!("{datapath}/edgesets/{name}");
        let mut entry = Metadata::object();
        entry.insert("datapath", dp.clone());
        entry.insert("tail_type", tail_type.clone());
        entry.insert("head_type", head_type.clone());
        edgesets_md.insert(name.clone(), entry);
        out.extend(dataset_as_tensors(ds, &dp));
    }
    let mut head_md = Metadata::object();
    head_md.insert("nodesets", nodesets_md);
    head_md.insert("edgesets", edgesets_md);
    out.insert(0, make_metadata_tensor("cluster", datapath, head_md));
    out
}

/// Recovers a `Cluster` from a `cluster` tensor tree.
pub fn as_cluster(tensors: &[Tensor], datapath: &str) -> Result<Cluster> {
    let head = if datapath.is_empty() {
        first_of(tensors, "cluster").ok_or_else(|| Error::value("as_cluster: no cluster tensor"))?
    } else {
        top_tensor(tensors, "cluster", datapath)?
    };
    let nodesets_md = head
        .metadata
        .get("nodesets")
        .and_then(Metadata::as_object)
        .ok_or_else(|| Error::value("as_cluster: missing 'nodesets' metadata"))?;
    let mut node_sets = BTreeMap::new();
    for (name, path_md) in nodesets_md {
        let path = path_md.as_str().unwrap_or_default();
        node_sets.insert(name.clone(), as_dataset(tensors, path, false)?);
    }

    let edgesets_md = head
        .metadata
        .get("edgesets")
        .and_then(Metadata::as_object)
        .ok_or_else(|| Error::value("as_cluster: missing 'edgesets' metadata"))?;
    let mut edge_sets = BTreeMap::new();
    for (name, entry) in edgesets_md {
        let path = entry.get("datapath").and_then(Metadata::as_str).unwrap_or_default();
        let tail_type = entry.get("tail_type").and_then(Metadata::as_str).unwrap_or_default().to_string();
        let head_type = entry.get("head_type").and_then(Metadata::as_str).unwrap_or_default().to_string();
        let ds = as_dataset(tensors, path, false)?;
        edge_sets.insert(name.clone(), (ds, tail_type, head_type));
    }

    Ok(Cluster { node_sets, edge_sets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn wire_nodes() -> Dataset {
        let mut ds = Dataset::new();
        ds.add("channel", Array::from_slice(&[10i32, 11, 12], &[3], false).unwrap()).unwrap();
        ds
    }

    fn blob_nodes() -> Dataset {
        let mut ds = Dataset::new();
        ds.add("charge", Array::from_slice(&[1.5f64, 2.5], &[2], false).unwrap()).unwrap();
        ds
    }

    fn wire_blob_edges() -> Dataset {
        let mut ds = Dataset::new();
        ds.add("tails", Array::from_slice(&[0i32, 1], &[2], false).unwrap()).unwrap();
        ds.add("heads", Array::from_slice(&[0i32, 0], &[2], false).unwrap()).unwrap();
        ds
    }

    #[test]
    fn cluster_roundtrips_through_tensors() {
        let mut cl = Cluster::new();
        cl.node_sets.insert("wire".to_string(), wire_nodes());
        cl.node_sets.insert("blob".to_string(), blob_nodes());
        cl.edge_sets.insert("wire_blob".to_string(), (wire_blob_edges(), "wire".to_string(), "blob".to_string()));

        let tens = as_tensors(&cl, "clusters/0");
        assert_eq!(tens[0].datatype(), "cluster");

        let back = as_cluster(&tens, "clusters/0").unwrap();
        assert_eq!(back, cl);
        assert_eq!(back.edge_sets["wire_blob"].1, "wire");
        assert_eq!(back.edge_sets["wire_blob"].2, "blob");
    }

    #[test]
    fn empty_cluster_roundtrips() {
        let cl = Cluster::new();
        let tens = as_tensors(&cl, "c");
        let back = as_cluster(&tens, "c").unwrap();
        assert_eq!(back, cl);
    }
}
