//! `pcarray` encoding: one `Tensor` per `Array`.

use crate::array::{tag_size, Array, Element};
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::tensordm::Tensor;

/// Converts `array` into a `pcarray` tensor at `datapath`. The tensor's
/// metadata is `array`'s own metadata plus `datatype`/`datapath`.
pub fn as_tensor(array: &Array, datapath: &str) -> Tensor {
    let mut md = array.metadata().clone();
    md.insert("datatype", "pcarray").insert("datapath", datapath);
    Tensor {
        shape: array.shape().to_vec(),
        type_tag: array.type_tag(),
        bytes: array.bytes().to_vec(),
        metadata: md,
    }
}

/// Recovers an `Array` from a `pcarray` tensor. If `share` is true, the
/// array's storage aliases `tensor`'s own byte buffer (`tensor` must
/// outlive the array); otherwise the bytes are copied.
pub fn as_array(tensor: &Tensor, share: bool) -> Result<Array> {
    if tensor.datatype() != "pcarray" {
        return Err(Error::value(format!(
            "as_array: expected pcarray tensor, got {:?}",
            tensor.datatype()
        )));
    }
    let ele_size = tag_size(tensor.type_tag);
    let mut arr = Array::from_tagged_bytes(&tensor.bytes, tensor.type_tag, ele_size, &tensor.shape, share)?;
    *arr.metadata_mut() = strip_tdm_keys(tensor.metadata.clone());
    Ok(arr)
}

/// Reads back a tensor's typed elements, checking `T::TAG` against the
/// tensor's stored tag first.
pub fn as_typed<T: Element>(tensor: &Tensor) -> Result<Vec<T>> {
    let arr = as_array(tensor, false)?;
    Ok(arr.elements::<T>()?.to_vec())
}

fn strip_tdm_keys(mut md: Metadata) -> Metadata {
    if let Metadata::Object(map) = &mut md {
        map.remove("datatype");
        map.remove("datapath");
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_roundtrips_through_tensor() {
        let arr = Array::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2], false).unwrap();
        let t = as_tensor(&arr, "p/arrays/x");
        assert_eq!(t.datatype(), "pcarray");
        let back = as_array(&t, false).unwrap();
        assert_eq!(back.shape(), arr.shape());
        assert_eq!(back.elements::<f64>().unwrap(), arr.elements::<f64>().unwrap());
    }

    #[test]
    fn shared_decode_aliases_tensor_bytes() {
        let arr = Array::from_slice(&[7i32, 8, 9], &[3], false).unwrap();
        let t = as_tensor(&arr, "p/arrays/x");
        let shared = as_array(&t, true).unwrap();
        assert_eq!(shared.elements::<i32>().unwrap(), &[7, 8, 9]);
    }
}
