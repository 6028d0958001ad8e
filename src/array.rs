//! Typed, heterogeneous dense N-D arrays with owning or borrowed storage.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::OnceLock;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// Inline capacity for array shapes; most point clouds are 1-D or 2-D.
pub type Shape = SmallVec<[usize; 4]>;

/// Tag identifying an Array's element type.
///
/// Covers the primitive element types the point-cloud and tensor data
/// models must carry through generic data paths (signed/unsigned integers
/// at each width, float/double, complex variants, byte, char) plus an
/// escape hatch for caller-defined types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    /// Opaque bytes; element size 1.
    Byte = 0,
    /// UTF-8 code unit; element size 1.
    Char = 1,
    /// `i8`
    I8 = 2,
    /// `u8`
    U8 = 3,
    /// `i16`
    I16 = 4,
    /// `u16`
    U16 = 5,
    /// `i32`
    I32 = 6,
    /// `u32`
    U32 = 7,
    /// `i64`
    I64 = 8,
    /// `u64`
    U64 = 9,
    /// `f32`
    F32 = 10,
    /// `f64`
    F64 = 11,
    /// Complex single precision (two `f32`s).
    ComplexF32 = 12,
    /// Complex double precision (two `f64`s).
    ComplexF64 = 13,
    /// A caller-defined type, identified only by size; type equality for
    /// this tag is advisory rather than load-bearing.
    Other = 255,
}

/// A primitive type usable as an Array element.
///
/// This is the safe-Rust realization of the type-erasure strategy in
/// the design notes: rather than a detection idiom over arbitrary types,
/// element access is bounded on a small sealed trait whose impls are
/// exactly the primitives `TypeTag` enumerates, so byte-reinterpretation
/// of the backing buffer is always sound.
///
/// # Safety
/// Implementors must be `Copy`, contain no padding, and have a size and
/// alignment consistent with being reinterpreted from/to a raw byte
/// buffer (i.e. be plain-old-data).
pub unsafe trait Element: Copy + 'static {
    /// The type tag this element type corresponds to.
    const TAG: TypeTag;
}

macro_rules! impl_element {
    ($t:ty, $tag:expr) => {
        unsafe impl Element for $t {
            const TAG: TypeTag = $tag;
        }
    };
}

impl_element!(u8, TypeTag::Byte);
impl_element!(i8, TypeTag::I8);
impl_element!(i16, TypeTag::I16);
impl_element!(u16, TypeTag::U16);
impl_element!(i32, TypeTag::I32);
impl_element!(u32, TypeTag::U32);
impl_element!(i64, TypeTag::I64);
impl_element!(u64, TypeTag::U64);
impl_element!(f32, TypeTag::F32);
impl_element!(f64, TypeTag::F64);

/// Byte size of one element of the given tag, for the primitive tags;
/// `0` for `Other` (size is caller-tracked via `register_other_type_size`).
pub(crate) fn tag_size(tag: TypeTag) -> usize {
    match tag {
        TypeTag::Byte | TypeTag::Char | TypeTag::I8 | TypeTag::U8 => 1,
        TypeTag::I16 | TypeTag::U16 => 2,
        TypeTag::I32 | TypeTag::U32 | TypeTag::F32 => 4,
        TypeTag::I64 | TypeTag::U64 | TypeTag::F64 | TypeTag::ComplexF32 => 8,
        TypeTag::ComplexF64 => 16,
        TypeTag::Other => 0,
    }
}

fn other_tag_size() -> &'static std::sync::Mutex<HashMap<TypeId, usize>> {
    static MAP: OnceLock<std::sync::Mutex<HashMap<TypeId, usize>>> = OnceLock::new();
    MAP.get_or_init(Default::default)
}

/// The byte storage backing an Array: either an owned buffer or a
/// borrowed view over caller-provided memory.
///
/// The borrowed variant is the one place in this crate that reaches for
/// `unsafe`: it is a literal raw-pointer alias into memory the caller
/// continues to own, matching the `share = true` construction contract.
/// Promotion to owned storage (`assure_mutable`) is the only transition
/// out of this state.
enum Storage {
    Owned(Vec<u8>),
    Borrowed {
        ptr: *const u8,
        len: usize,
        _marker: PhantomData<*const ()>,
    },
}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            // SAFETY: constructors of `Borrowed` require the caller to
            // keep the aliased memory alive and unmoved for the lifetime
            // of this Array; this mirrors the documented `share=true`
            // contract of Array::assign.
            Storage::Borrowed { ptr, len, .. } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Owned(v) => v.len(),
            Storage::Borrowed { len, .. } => *len,
        }
    }

    fn is_borrowed(&self) -> bool {
        matches!(self, Storage::Borrowed { .. })
    }
}

/// A dense N-D array of homogeneous element type, with owning or borrowed
/// byte storage.
pub struct Array {
    shape: Shape,
    ele_size: usize,
    type_tag: TypeTag,
    store: Storage,
    metadata: Metadata,
}

impl Array {
    /// An empty array: no shape, zero element size, `Byte` tag.
    pub fn empty() -> Self {
        Array {
            shape: Shape::new(),
            ele_size: 0,
            type_tag: TypeTag::Byte,
            store: Storage::Owned(Vec::new()),
            metadata: Metadata::Null,
        }
    }

    fn trailing_product(shape: &[usize]) -> usize {
        shape.iter().skip(1).product::<usize>().max(1)
    }

    fn major(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Discards current state and adopts `data` with the given `shape`,
    /// either borrowing it (`share = true`, zero-copy) or copying it
    /// (`share = false`).
    pub fn assign<T: Element>(&mut self, data: &[T], shape: &[usize], share: bool) -> Result<()> {
        let nelems: usize = shape.iter().product();
        if nelems != data.len() {
            return Err(Error::value(format!(
                "assign: shape {shape:?} implies {nelems} elements but got {}",
                data.len()
            )));
        }
        let ele_size = std::mem::size_of::<T>();
        let byte_len = nelems * ele_size;
        self.ele_size = ele_size;
        self.type_tag = T::TAG;
        self.shape = Shape::from_slice(shape);
        self.metadata = Metadata::Null;
        if share {
            self.store = Storage::Borrowed {
                ptr: data.as_ptr() as *const u8,
                len: byte_len,
                _marker: PhantomData,
            };
        } else {
            let bytes =
                unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, byte_len) };
            self.store = Storage::Owned(bytes.to_vec());
        }
        Ok(())
    }

    /// Constructs an array by borrowing (`share = true`) or copying
    /// (`share = false`) `data` with the given shape.
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize], share: bool) -> Result<Self> {
        let mut arr = Array::empty();
        arr.assign(data, shape, share)?;
        Ok(arr)
    }

    /// If currently borrowing, copies the borrowed bytes into a freshly
    /// owned buffer and redirects the view. A one-way transition.
    pub fn assure_mutable(&mut self) {
        if self.store.is_borrowed() {
            let owned = self.store.as_slice().to_vec();
            self.store = Storage::Owned(owned);
        }
    }

    /// Shape (ordered axis sizes).
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element size in bytes.
    pub fn element_size(&self) -> usize {
        self.ele_size
    }

    /// The element type tag.
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Total number of elements (product of shape).
    pub fn num_elements(&self) -> usize {
        if self.ele_size == 0 {
            return 0;
        }
        self.store.len() / self.ele_size
    }

    /// Size of the major (leading) axis, i.e. the point count.
    pub fn size_major(&self) -> usize {
        self.major()
    }

    /// Raw bytes backing this array.
    pub fn bytes(&self) -> &[u8] {
        self.store.as_slice()
    }

    /// This array's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to this array's metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// A typed flat view of this array's elements.
    ///
    /// Fails with `TypeMismatch` if `sizeof(T)` differs from the stored
    /// element size.
    pub fn elements<T: Element>(&self) -> Result<&[T]> {
        self.check_type::<T>()?;
        let bytes = self.store.as_slice();
        let n = self.num_elements();
        Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, n) })
    }

    /// The i-th element, without bounds checking (matches the source
    /// contract's `element<T>(i)`, which performs no bounds check; use
    /// `elements::<T>()?.get(i)` for a checked variant).
    pub fn element<T: Element>(&self, i: usize) -> Result<T> {
        let es = self.elements::<T>()?;
        Ok(es[i])
    }

    fn check_type<T: Element>(&self) -> Result<()> {
        let want = std::mem::size_of::<T>();
        if want != self.ele_size || T::TAG != self.type_tag {
            return Err(Error::type_mismatch(self.type_tag, T::TAG));
        }
        Ok(())
    }

    /// An N-dimensional random-access adaptor over this array's elements.
    ///
    /// Fails with `ValueError` if `N` does not equal `shape.len()`, or if
    /// `sizeof(T)` does not equal the stored element size.
    pub fn indexed<T: Element>(&self, ndim: usize) -> Result<Indexed<'_, T>> {
        if ndim != self.shape.len() {
            return Err(Error::value(format!(
                "indexed: requested {ndim} dims but array has {}",
                self.shape.len()
            )));
        }
        let data = self.elements::<T>()?;
        Ok(Indexed {
            data,
            shape: &self.shape,
        })
    }

    /// Appends raw bytes representing `n` whole rows (a whole multiple of
    /// the trailing-axis product) to the major axis. Promotes borrowed
    /// storage to owned first.
    pub fn append_bytes(&mut self, bytes: &[u8], n_major: usize) -> Result<()> {
        let trailing = Self::trailing_product(&self.shape);
        let row_bytes = trailing * self.ele_size.max(1);
        if row_bytes == 0 {
            return Err(Error::value("append: zero-sized element or row"));
        }
        if bytes.len() != row_bytes * n_major {
            return Err(Error::value(format!(
                "append: {} bytes is not a whole number of rows of {} bytes",
                bytes.len(),
                row_bytes
            )));
        }
        self.assure_mutable();
        if let Storage::Owned(buf) = &mut self.store {
            buf.extend_from_slice(bytes);
        }
        if self.shape.is_empty() {
            self.shape.push(n_major);
        } else {
            self.shape[0] += n_major;
        }
        Ok(())
    }

    /// Appends `data` (typed elements) as `n_major` whole rows.
    pub fn append<T: Element>(&mut self, data: &[T]) -> Result<()> {
        self.check_type::<T>()?;
        let trailing = Self::trailing_product(&self.shape);
        if trailing == 0 || data.len() % trailing != 0 {
            return Err(Error::value(format!(
                "append: {} elements is not a whole number of rows (trailing={trailing})",
                data.len()
            )));
        }
        let n_major = data.len() / trailing;
        let bytes =
            unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) };
        self.append_bytes(bytes, n_major)
    }

    /// Appends the contents of `other`, which must share this array's
    /// element type and trailing shape.
    pub fn append_array(&mut self, other: &Array) -> Result<()> {
        if other.type_tag != self.type_tag || other.ele_size != self.ele_size {
            return Err(Error::type_mismatch(self.type_tag, other.type_tag));
        }
        let my_trailing = &self.shape[1.min(self.shape.len())..];
        let other_trailing = &other.shape[1.min(other.shape.len())..];
        if !self.shape.is_empty() && my_trailing != other_trailing {
            return Err(Error::value("append_array: trailing shape mismatch"));
        }
        let n_major = other.major().max(if other.shape.is_empty() { 0 } else { 1 });
        if self.shape.is_empty() {
            self.shape = other.shape.clone();
            self.shape[0] = 0;
            self.ele_size = other.ele_size;
            self.type_tag = other.type_tag;
        }
        self.append_bytes(other.bytes(), n_major)
    }

    /// Same element type and trailing shape, major axis `nmaj`, bytes
    /// zeroed.
    pub fn zeros_like(&self, nmaj: usize) -> Self {
        let mut shape = self.shape.clone();
        if shape.is_empty() {
            shape.push(nmaj);
        } else {
            shape[0] = nmaj;
        }
        let trailing = Self::trailing_product(&shape);
        let nbytes = trailing * nmaj * self.ele_size;
        Array {
            shape,
            ele_size: self.ele_size,
            type_tag: self.type_tag,
            store: Storage::Owned(vec![0u8; nbytes]),
            metadata: Metadata::Null,
        }
    }

    /// Builds an array whose element type/shape are given explicitly and
    /// whose storage either borrows `bytes` (`share = true`, the
    /// zero-copy path used when decoding a Tensor in place) or copies it.
    ///
    /// Unlike `assign`, the caller supplies the tag/size directly rather
    /// than through an `Element` type parameter, since tensor decoding
    /// recovers these from metadata rather than from a compile-time type.
    pub(crate) fn from_tagged_bytes(
        bytes: &[u8],
        tag: TypeTag,
        ele_size: usize,
        shape: &[usize],
        share: bool,
    ) -> Result<Self> {
        let nelems: usize = shape.iter().product();
        if ele_size > 0 && bytes.len() != nelems * ele_size {
            return Err(Error::value(format!(
                "from_tagged_bytes: shape {shape:?} x size {ele_size} does not match {} bytes",
                bytes.len()
            )));
        }
        let store = if share {
            Storage::Borrowed {
                ptr: bytes.as_ptr(),
                len: bytes.len(),
                _marker: PhantomData,
            }
        } else {
            Storage::Owned(bytes.to_vec())
        };
        Ok(Array {
            shape: Shape::from_slice(shape),
            ele_size,
            type_tag: tag,
            store,
            metadata: Metadata::Null,
        })
    }

    /// Deep-clones this array, always into owned storage regardless of
    /// the source's storage kind.
    pub fn to_owned_clone(&self) -> Self {
        Array {
            shape: self.shape.clone(),
            ele_size: self.ele_size,
            type_tag: self.type_tag,
            store: Storage::Owned(self.store.as_slice().to_vec()),
            metadata: self.metadata.clone(),
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.ele_size == other.ele_size
            && self.type_tag == other.type_tag
            && self.store.as_slice() == other.store.as_slice()
    }
}

impl Clone for Array {
    fn clone(&self) -> Self {
        self.to_owned_clone()
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape)
            .field("type_tag", &self.type_tag)
            .field("ele_size", &self.ele_size)
            .finish()
    }
}

/// An N-dimensional random-access view over an Array's elements.
pub struct Indexed<'a, T> {
    data: &'a [T],
    shape: &'a [usize],
}

impl<'a, T: Copy> Indexed<'a, T> {
    /// Element at the given multi-index (row-major, no bounds check
    /// beyond a debug assertion).
    pub fn at(&self, idx: &[usize]) -> T {
        debug_assert_eq!(idx.len(), self.shape.len());
        let mut flat = 0usize;
        for (d, &i) in idx.iter().enumerate() {
            flat = flat * self.shape[d] + i;
        }
        self.data[flat]
    }
}

/// Marks a type usable as Array element without it implementing
/// `Element` via the macro above; reserved for future caller-defined
/// types identified only by size (see `TypeTag::Other`). Not currently
/// exercised by the core, which only ever constructs `Element` arrays.
pub fn register_other_type_size(id: TypeId, size: usize) {
    other_tag_size().lock().unwrap().insert(id, size);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_vs_owned_storage() {
        let mut v = vec![1i32, 2, 3];
        let mut s = Array::from_slice(&v, &[3], true).unwrap();
        let c = Array::from_slice(&v, &[3], false).unwrap();
        v[0] = 42;
        assert_eq!(s.element::<i32>(0).unwrap(), 42);
        assert_eq!(c.element::<i32>(0).unwrap(), 1);
        s.assure_mutable();
        v[0] = 7;
        assert_eq!(s.element::<i32>(0).unwrap(), 42);
    }

    #[test]
    fn append_requires_whole_rows() {
        let mut a = Array::from_slice(&[1i32, 2, 3, 4], &[2, 2], false).unwrap();
        assert!(a.append::<i32>(&[5, 6]).is_ok());
        assert_eq!(a.shape(), &[3, 2]);
        assert!(a.append::<i32>(&[7]).is_err());
    }

    #[test]
    fn elements_type_mismatch() {
        let a = Array::from_slice(&[1i32, 2, 3], &[3], false).unwrap();
        assert!(a.elements::<f64>().is_err());
    }

    #[test]
    fn zeros_like_preserves_trailing_shape() {
        let a = Array::from_slice(&[1.0f64; 6], &[2, 3], false).unwrap();
        let z = a.zeros_like(5);
        assert_eq!(z.shape(), &[5, 3]);
        assert!(z.elements::<f64>().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn indexed_access() {
        let a = Array::from_slice(&[1i32, 2, 3, 4, 5, 6], &[2, 3], false).unwrap();
        let idx = a.indexed::<i32>(2).unwrap();
        assert_eq!(idx.at(&[1, 2]), 6);
        assert!(a.indexed::<i32>(1).is_err());
    }
}
