//! Optional `serde` bridges for the Metadata tree and a read-only
//! Dataset shape snapshot. Additive, cfg-gated, never required by the
//! core.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::metadata::Metadata;

impl Serialize for Metadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            Metadata::Null => serializer.serialize_unit(),
            Metadata::Bool(b) => serializer.serialize_bool(*b),
            Metadata::Int(i) => serializer.serialize_i64(*i),
            Metadata::Float(f) => serializer.serialize_f64(*f),
            Metadata::String(s) => serializer.serialize_str(s),
            Metadata::Array(items) => items.serialize(serializer),
            Metadata::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a JSON-like metadata value")
            }

            fn visit_unit<E>(self) -> Result<Metadata, E> {
                Ok(Metadata::Null)
            }
            fn visit_bool<E>(self, v: bool) -> Result<Metadata, E> {
                Ok(Metadata::Bool(v))
            }
            fn visit_i64<E>(self, v: i64) -> Result<Metadata, E> {
                Ok(Metadata::Int(v))
            }
            fn visit_u64<E>(self, v: u64) -> Result<Metadata, E> {
                Ok(Metadata::Int(v as i64))
            }
            fn visit_f64<E>(self, v: f64) -> Result<Metadata, E> {
                Ok(Metadata::Float(v))
            }
            fn visit_str<E>(self, v: &str) -> Result<Metadata, E> {
                Ok(Metadata::String(v.to_string()))
            }
            fn visit_string<E>(self, v: String) -> Result<Metadata, E> {
                Ok(Metadata::String(v))
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Metadata, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(v) = seq.next_element()? {
                    items.push(v);
                }
                Ok(Metadata::Array(items))
            }
            fn visit_map<A>(self, mut map: A) -> Result<Metadata, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut out = std::collections::BTreeMap::new();
                while let Some((k, v)) = map.next_entry()? {
                    out.insert(k, v);
                }
                Ok(Metadata::Object(out))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// A read-only snapshot of a Dataset's shape: array names, their
/// element type tags and shapes, and the dataset's own metadata. Does
/// not carry array bytes; intended for inspection/logging, not
/// round-tripping.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSnapshot {
    /// Array names in dataset order.
    pub names: Vec<String>,
    /// Per-array shape descriptions, aligned with `names`.
    pub arrays: Vec<ArraySnapshot>,
    /// The dataset's own metadata tree.
    pub metadata: Metadata,
}

/// One array's shape description within a `DatasetSnapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct ArraySnapshot {
    /// The array's element type, as its `Debug` name (e.g. `"F64"`).
    pub type_tag: String,
    /// Axis sizes.
    pub shape: Vec<usize>,
}

/// Builds a read-only snapshot of `dataset`'s shape.
pub fn snapshot_dataset(dataset: &Dataset) -> DatasetSnapshot {
    let names: Vec<String> = dataset.keys().into_iter().map(str::to_string).collect();
    let arrays = names
        .iter()
        .map(|name| {
            let arr = dataset.get(name).expect("name came from dataset.keys()");
            let arr = arr.borrow();
            ArraySnapshot { type_tag: format!("{:?}", arr.type_tag()), shape: arr.shape().to_vec() }
        })
        .collect();
    DatasetSnapshot { names, arrays, metadata: dataset.metadata().clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;

    fn json_roundtrip(md: &Metadata) -> Metadata {
        let bytes = serde_json::to_vec(md).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn metadata_roundtrips_through_json() {
        let mut md = Metadata::object();
        md.insert("datatype", "pcarray");
        md.insert("count", 3i64);
        md.insert("tags", vec!["raw".to_string(), "gauss".to_string()]);
        assert_eq!(json_roundtrip(&md), md);
    }

    #[test]
    fn dataset_snapshot_lists_names_and_shapes() {
        let mut ds = Dataset::new();
        ds.add("x", Array::from_slice(&[1.0f64, 2.0, 3.0], &[3], false).unwrap()).unwrap();
        let snap = snapshot_dataset(&ds);
        assert_eq!(snap.names, vec!["x".to_string()]);
        assert_eq!(snap.arrays[0].shape, vec![3]);
    }
}
