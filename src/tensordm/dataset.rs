//! `pcdataset` and `pcnamedset` encodings.

use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::tensordm::array::{as_array, as_tensor};
use crate::tensordm::{first_of, index_datapaths, make_metadata_tensor, top_tensor, Tensor};

/// Converts `dataset` to tensors: a `pcdataset` head tensor at
/// `datapath` listing array subpaths under `<datapath>/arrays/<name>`,
/// followed by one `pcarray` tensor per array.
pub fn as_tensors(dataset: &Dataset, datapath: &str) -> Vec<Tensor> {
    let mut out = Vec::with_capacity(1 + dataset.size());
    let mut arrays_md = Metadata::object();
    for name in dataset.keys() {
        arrays_md.insert(name, format!("{datapath}/arrays/{name}"));
    }
    let mut head_md = dataset.metadata().clone();
    head_md.insert("arrays", arrays_md);
    let head = make_metadata_tensor("pcdataset", datapath, head_md);
    out.push(head);
    for name in dataset.keys() {
        let arr = dataset.get(name).unwrap();
        out.push(as_tensor(&arr.borrow(), &format!("{datapath}/arrays/{name}")));
    }
    out
}

/// Recovers a `Dataset` from tensors at (or, if empty, the first)
/// `pcdataset` datapath.
pub fn as_dataset(tensors: &[Tensor], datapath: &str, share: bool) -> Result<Dataset> {
    let head = if datapath.is_empty() {
        first_of(tensors, "pcdataset").ok_or_else(|| Error::value("as_dataset: no pcdataset tensor"))?
    } else {
        top_tensor(tensors, "pcdataset", datapath)?
    };
    let index = index_datapaths(tensors);
    let arrays_md = head
        .metadata
        .get("arrays")
        .and_then(Metadata::as_object)
        .ok_or_else(|| Error::value("as_dataset: pcdataset tensor missing 'arrays' metadata"))?;

    let mut ds = Dataset::new();
    for (name, path_md) in arrays_md {
        let path = path_md
            .as_str()
            .ok_or_else(|| Error::value(format!("as_dataset: array {name:?} has non-string datapath")))?;
        let &idx = index
            .get(path)
            .ok_or_else(|| Error::value(format!("as_dataset: missing array tensor at {path}")))?;
        let arr = as_array(&tensors[idx], share)?;
        ds.add(name.clone(), arr)?;
    }
    let mut md = head.metadata.clone();
    if let Metadata::Object(m) = &mut md {
        m.remove("datatype");
        m.remove("datapath");
        m.remove("arrays");
        if m.is_empty() {
            md = Metadata::Null;
        }
    }
    *ds.metadata_mut() = md;
    Ok(ds)
}

/// Converts a name→Dataset map to tensors: a `pcnamedset` head tensor
/// with an `items` map (name → datapath), followed by each entry's
/// `pcdataset` subtree under `<store>/<name>` (`store` defaults to
/// `<datapath>/namedpcs`).
pub fn pcnamedset_as_tensors(items: &BTreeMap<String, Dataset>, datapath: &str, store: Option<&str>) -> Vec<Tensor> {
    let store = store.map(str::to_string).unwrap_or_else(|| format!("{datapath}/namedpcs"));
    let mut items_md = Metadata::object();
    let mut out = vec![];
    for (name, ds) in items {
        let dp = format!("{store}/{name}");
        items_md.insert(name.clone(), dp.clone());
        out.extend(as_tensors(ds, &dp));
    }
    let mut head_md = Metadata::object();
    head_md.insert("items", items_md);
    out.insert(0, make_metadata_tensor("pcnamedset", datapath, head_md));
    out
}

/// Recovers a name→Dataset map from a `pcnamedset` tensor tree.
pub fn as_pcnamedset(tensors: &[Tensor], datapath: &str) -> Result<BTreeMap<String, Dataset>> {
    let head = if datapath.is_empty() {
        first_of(tensors, "pcnamedset").ok_or_else(|| Error::value("as_pcnamedset: no pcnamedset tensor"))?
    } else {
        top_tensor(tensors, "pcnamedset", datapath)?
    };
    let items_md = head
        .metadata
        .get("items")
        .and_then(Metadata::as_object)
        .ok_or_else(|| Error::value("as_pcnamedset: missing 'items' metadata"))?;
    let mut out = BTreeMap::new();
    for (name, path_md) in items_md {
        let path = path_md.as_str().unwrap_or_default();
        let ds = as_dataset(tensors, path, false)?;
        out.insert(name.clone(), ds);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn sample_dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.add("x", Array::from_slice(&[1.0f64, 2.0], &[2], false).unwrap()).unwrap();
        ds.add("y", Array::from_slice(&[3i32, 4], &[2], false).unwrap()).unwrap();
        ds
    }

    #[test]
    fn dataset_roundtrips_through_tensors() {
        let ds = sample_dataset();
        let tens = as_tensors(&ds, "p");
        assert_eq!(tens.len(), 3);
        assert_eq!(tens[0].datatype(), "pcdataset");
        let back = as_dataset(&tens, "p", false).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn namedset_roundtrips() {
        let mut items = BTreeMap::new();
        items.insert("a".to_string(), sample_dataset());
        items.insert("b".to_string(), sample_dataset());
        let tens = pcnamedset_as_tensors(&items, "root", None);
        assert_eq!(tens[0].datatype(), "pcnamedset");
        let back = as_pcnamedset(&tens, "root").unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back["a"], sample_dataset());
    }
}
