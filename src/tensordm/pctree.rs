//! `pctree` encoding for a `PointTree` subtree.
//!
//! This traversal is this crate's own design: a walk computing each
//! visited node's datapath from its position relative to the subtree
//! root, with a single `pctree` head tensor recording parent/child
//! datapath edges so the exact shape can be replayed on decode without
//! re-deriving indices from path strings.

use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::point_tree::{PointNode, Points};
use crate::tensordm::dataset::{as_pcnamedset, pcnamedset_as_tensors};
use crate::tensordm::{first_of, make_metadata_tensor, top_tensor, Tensor};

fn child_datapath(base: &str, path: &[usize]) -> String {
    if path.is_empty() {
        format!("{base}/nodes/root")
    } else {
        let joined = path.iter().map(usize::to_string).collect::<Vec<_>>().join("/");
        format!("{base}/nodes/{joined}")
    }
}

fn collect(node: &PointNode, path: Vec<usize>, base: &str, out: &mut Vec<(PointNode, String, Option<String>, Vec<String>)>) {
    let dp = child_datapath(base, &path);
    let children = node.children();
    let child_paths: Vec<String> = (0..children.len())
        .map(|i| {
            let mut cp = path.clone();
            cp.push(i);
            child_datapath(base, &cp)
        })
        .collect();
    let parent_dp = if path.is_empty() { None } else { Some(child_datapath(base, &path[..path.len() - 1])) };
    out.push((node.clone(), dp, parent_dp, child_paths));
    for (i, child) in children.into_iter().enumerate() {
        let mut cp = path.clone();
        cp.push(i);
        collect(&child, cp, base, out);
    }
}

/// Converts the subtree rooted at `node` to tensors: a `pctree` head
/// tensor at `datapath` recording every visited node's datapath,
/// parent datapath, and ordered child datapaths, followed by each
/// node's local point clouds as a `pcnamedset` subtree.
pub fn as_tensors(node: &PointNode, datapath: &str) -> Vec<Tensor> {
    let mut visited = Vec::new();
    collect(node, Vec::new(), datapath, &mut visited);

    let mut nodes_md = Metadata::object();
    let mut out = Vec::new();
    for (n, dp, parent_dp, child_dps) in &visited {
        let mut info = Metadata::object();
        info.insert("parent", parent_dp.clone().unwrap_or_default());
        info.insert("children", child_dps.clone());
        nodes_md.insert(dp.clone(), info);

        let local_map: BTreeMap<String, Dataset> = n.with_value(|pts| {
            pts.local_names()
                .into_iter()
                .map(|name| (name.to_string(), pts.local(name).unwrap().borrow().clone()))
                .collect()
        });
        out.extend(pcnamedset_as_tensors(&local_map, dp, None));
    }

    let mut head_md = Metadata::object();
    head_md.insert("nodes", nodes_md);
    head_md.insert("root", child_datapath(datapath, &[]));
    out.insert(0, make_metadata_tensor("pctree", datapath, head_md));
    out
}

fn build_node(dp: &str, nodes_md: &BTreeMap<String, Metadata>, tensors: &[Tensor]) -> Result<PointNode> {
    let info = nodes_md
        .get(dp)
        .ok_or_else(|| Error::value(format!("as_pctree: missing node entry for {dp}")))?;
    let node = PointNode::new(Points::new());
    if let Ok(local) = as_pcnamedset(tensors, dp) {
        node.with_value_mut(|pts| {
            for (name, ds) in local {
                pts.set_local(name, ds);
            }
        });
    }
    let children = info.get("children").and_then(Metadata::as_array).unwrap_or(&[]);
    for child_md in children {
        let child_dp = child_md
            .as_str()
            .ok_or_else(|| Error::value("as_pctree: non-string child datapath"))?;
        let child = build_node(child_dp, nodes_md, tensors)?;
        node.insert(child);
    }
    Ok(node)
}

/// Recovers the subtree recorded by a `pctree` tensor tree, rebuilding
/// parent/child structure by replaying the recorded edges in the
/// recorded order.
pub fn as_pctree(tensors: &[Tensor], datapath: &str) -> Result<PointNode> {
    let head = if datapath.is_empty() {
        first_of(tensors, "pctree").ok_or_else(|| Error::value("as_pctree: no pctree tensor"))?
    } else {
        top_tensor(tensors, "pctree", datapath)?
    };
    let nodes_md = head
        .metadata
        .get("nodes")
        .and_then(Metadata::as_object)
        .ok_or_else(|| Error::value("as_pctree: missing 'nodes' metadata"))?;
    let root_dp = head.metadata.get("root").and_then(Metadata::as_str).unwrap_or_default();
    build_node(root_dp, nodes_md, tensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::nary_tree::Node;

    fn pc(n: usize, offset: f64) -> Dataset {
        let xs: Vec<f64> = (0..n).map(|i| offset + i as f64).collect();
        let mut ds = Dataset::new();
        ds.add("x", Array::from_slice(&xs, &[n], false).unwrap()).unwrap();
        ds
    }

    #[test]
    fn pctree_roundtrips_structure_and_local_data() {
        let root = Node::new(Points::new());
        root.with_value_mut(|p| p.set_local("3d", pc(3, 0.0)));
        let c1 = Node::new(Points::new());
        c1.with_value_mut(|p| p.set_local("3d", pc(2, 10.0)));
        let c2 = Node::new(Points::new());
        c2.with_value_mut(|p| p.set_local("3d", pc(4, 20.0)));
        root.insert(c1);
        root.insert(c2);

        let tens = as_tensors(&root, "tree");
        assert_eq!(tens[0].datatype(), "pctree");

        let back = as_pctree(&tens, "tree").unwrap();
        assert_eq!(back.num_children(), 2);
        let root_local = back.with_value(|p| p.local("3d").unwrap().borrow().clone());
        assert_eq!(root_local, pc(3, 0.0));
        let kids = back.children();
        let k0_local = kids[0].with_value(|p| p.local("3d").unwrap().borrow().clone());
        assert_eq!(k0_local, pc(2, 10.0));
    }
}
