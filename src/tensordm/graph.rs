//! `pcgraph` encoding for `PointGraph`.

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::pointgraph::PointGraph;
use crate::tensordm::dataset::{as_dataset, as_tensors as dataset_as_tensors};
use crate::tensordm::{first_of, make_metadata_tensor, top_tensor, Tensor};

/// Converts `graph` to tensors: a `pcgraph` head tensor at `datapath`
/// naming `nodes`/`edges` subpaths, followed by the two `pcdataset`
/// subtrees.
pub fn as_tensors(graph: &PointGraph, datapath: &str) -> Vec<Tensor> {
    let nodes_path = format!("{datapath}/nodes");
    let edges_path = format!("{datapath}/edges");
    let mut head_md = Metadata::object();
    head_md.insert("nodes", nodes_path.clone());
    head_md.insert("edges", edges_path.clone());
    let mut out = vec![make_metadata_tensor("pcgraph", datapath, head_md)];
    out.extend(dataset_as_tensors(&graph.nodes().borrow(), &nodes_path));
    out.extend(dataset_as_tensors(&graph.edges().borrow(), &edges_path));
    out
}

/// Recovers a `PointGraph` from a `pcgraph` tensor tree.
pub fn as_pointgraph(tensors: &[Tensor], datapath: &str) -> Result<PointGraph> {
    let head = if datapath.is_empty() {
        first_of(tensors, "pcgraph").ok_or_else(|| Error::value("as_pointgraph: no pcgraph tensor"))?
    } else {
        top_tensor(tensors, "pcgraph", datapath)?
    };
    let nodes_path = head.metadata.get("nodes").and_then(Metadata::as_str).unwrap_or_default();
    let edges_path = head.metadata.get("edges").and_then(Metadata::as_str).unwrap_or_default();
    let nodes = as_dataset(tensors, nodes_path, false)?;
    let edges = as_dataset(tensors, edges_path, false)?;
    Ok(PointGraph::with_nodes_and_edges(nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::dataset::Dataset;

    #[test]
    fn graph_roundtrips_through_tensors() {
        let mut nodes = Dataset::new();
        nodes.add("x", Array::from_slice(&[0.0f64, 1.0, 2.0], &[3], false).unwrap()).unwrap();
        let mut edges = Dataset::new();
        edges.add("tails", Array::from_slice(&[0i32], &[1], false).unwrap()).unwrap();
        edges.add("heads", Array::from_slice(&[1i32], &[1], false).unwrap()).unwrap();
        let g = PointGraph::with_nodes_and_edges(nodes, edges);

        let tens = as_tensors(&g, "g");
        assert_eq!(tens[0].datatype(), "pcgraph");
        let back = as_pointgraph(&tens, "g").unwrap();
        assert_eq!(back.num_nodes(), 3);
        assert_eq!(back.num_edges(), 1);
    }
}
