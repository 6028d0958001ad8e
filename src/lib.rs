#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Typed, shape-aware contiguous buffers and their tag-based type
/// erasure.
pub mod array;
/// Hand-rolled complex number type used by the spectral toolkit.
pub mod complex;
/// Ordered name→Array containers with append notification.
pub mod dataset;
/// Discrete Fourier transform backends.
pub mod dft;
/// Cooperative multi-input/multi-output graph-node contract and a
/// worked `FrameSync` example.
pub mod hydra;
/// Flat views over concatenated sub-ranges of indexable collections.
pub mod disjoint;
/// A `Dataset` built as a flattened, cumulative-offset view over many
/// member Datasets.
pub mod disjoint_dataset;
/// Shared error and result types.
pub mod error;
/// Nearest-neighbor search over point-cloud Datasets.
pub mod kdtree;
/// Free-form, JSON-like metadata attached to Arrays and Datasets.
pub mod metadata;
/// N-ary tree with parent-aware nodes and user-supplied notification.
pub mod nary_tree;
/// Noise spectrum estimation and synthetic noise generation.
pub mod noise;
/// Tree of named local point clouds with scope-aggregated caches.
pub mod point_tree;
/// Graph of points: a node Dataset, an edge Dataset, and adjacency
/// derivation.
pub mod pointgraph;
/// Random fluctuation sources used by noise synthesis.
pub mod rand_tools;
/// Frequency-domain helpers: resampling, convolution, and spectral
/// replacement.
pub mod spectrum;
/// Tensor data model: flattening Arrays, Datasets, PointGraphs,
/// PointTrees, Frames, and Clusters to/from self-describing Tensors.
pub mod tensordm;

#[cfg(feature = "serde")]
/// Optional `serde` bridges for `Metadata` and a read-only `Dataset`
/// shape snapshot.
pub mod serde_support;

pub use array::{Array, Element, TypeTag};
pub use complex::Complex64;
pub use dataset::{ArrayHandle, Dataset};
pub use dft::{Dft, NaiveDft};
pub use disjoint::DisjointRange;
pub use disjoint_dataset::DisjointDataset;
pub use error::{Error, Result};
pub use hydra::{FrameSync, HydraNode, SyncItem};
pub use kdtree::{KdTree, Metric, MultiQuery, Neighbor};
pub use nary_tree::{Node, Notify, WeakNode};
pub use noise::{NoiseCollector, NoiseCollectorBuilder, NoiseGenerator, relative_rms_difference};
pub use point_tree::{PointNode, Points, Scope};
pub use pointgraph::PointGraph;
pub use rand_tools::{Fresh, NormalSource, Recycling, UniformSource};
pub use tensordm::cluster::{Cluster, as_cluster, as_tensors as cluster_as_tensors};
pub use tensordm::frame::{Frame, FrameTensorMode, Trace, as_frame, as_tensors as frame_as_tensors};
pub use tensordm::{Tensor, index_datapaths, make_metadata_tensor, match_at};
