//! `frame`/`trace` encoding for a minimal, TDM-exercising `Frame` value
//! type.

use crate::array::Array;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::tensordm::array::{as_array, as_tensor};
use crate::tensordm::{first_of, make_metadata_tensor, top_tensor, Tensor};

/// A single detector-channel waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Readout channel identifier.
    pub channel: i32,
    /// First tick of `charge` relative to the frame's time origin.
    pub tbin: i32,
    /// Sample values, 1-D.
    pub charge: Array,
    /// Optional selection tag.
    pub tag: Option<String>,
}

/// A minimal, ambient frame value: a readout window's worth of traces.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame identifier.
    pub ident: i32,
    /// Frame time origin.
    pub time: f64,
    /// Sample period.
    pub tick: f64,
    /// Frame-level tags.
    pub frame_tags: Vec<String>,
    /// The frame's traces, in trace-index order.
    pub traces: Vec<Trace>,
}

/// How a Frame's traces are mapped to trace Tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTensorMode {
    /// One 1-D trace tensor per source trace. Lossless.
    Sparse,
    /// One 2-D trace tensor over all channels x ticks, zero-padded.
    /// Loses per-trace tbin and channel multiplicity.
    Unified,
    /// One 2-D trace tensor per tag; untagged traces are dropped.
    Tagged,
}

fn trace_tensor(trace: &Trace, datapath: &str) -> Tensor {
    let mut t = as_tensor(&trace.charge, datapath);
    t.metadata.insert("channel", trace.channel as i64);
    t.metadata.insert("tbin", trace.tbin as i64);
    if let Some(tag) = &trace.tag {
        t.metadata.insert("tag", tag.clone());
    }
    t
}

fn trace_from_tensor(t: &Tensor) -> Result<Trace> {
    let charge = as_array(t, false)?;
    let channel = t.metadata.get("channel").and_then(Metadata::as_int).unwrap_or(0) as i32;
    let tbin = t.metadata.get("tbin").and_then(Metadata::as_int).unwrap_or(0) as i32;
    let tag = t.metadata.get("tag").and_then(Metadata::as_str).map(str::to_string);
    Ok(Trace { channel, tbin, charge, tag })
}

fn pad_row(data: &[f64], len: usize) -> Vec<f64> {
    let mut v = data[..data.len().min(len)].to_vec();
    v.resize(len, 0.0);
    v
}

/// Converts `frame` into tensors per `mode`; see `FrameTensorMode`.
pub fn as_tensors(frame: &Frame, datapath: &str, mode: FrameTensorMode) -> Vec<Tensor> {
    let mut out = Vec::new();
    let mut head_md = Metadata::object();
    head_md.insert("ident", frame.ident as i64);
    head_md.insert("time", frame.time);
    head_md.insert("tick", frame.tick);
    head_md.insert("frame_tags", frame.frame_tags.clone());

    match mode {
        FrameTensorMode::Sparse => {
            head_md.insert("mode", "sparse");
            let mut paths = Vec::new();
            for (i, tr) in frame.traces.iter().enumerate() {
                let dp = format!("{datapath}/traces/{i}");
                paths.push(dp.clone());
                out.push(trace_tensor(tr, &dp));
            }
            head_md.insert("traces", paths);
        }
        FrameTensorMode::Unified => {
            head_md.insert("mode", "unified");
            let nticks = frame.traces.iter().map(|t| t.charge.num_elements()).max().unwrap_or(0);
            let nrows = frame.traces.len();
            let mut flat = Vec::with_capacity(nrows * nticks);
            let mut channels = Vec::with_capacity(nrows);
            for tr in &frame.traces {
                let data = tr.charge.elements::<f64>().unwrap_or_default();
                flat.extend(pad_row(data, nticks));
                channels.push(tr.channel as i64);
            }
            let arr = Array::from_slice(&flat, &[nrows, nticks], false).unwrap_or_else(|_| Array::empty());
            let dp = format!("{datapath}/traces/0");
            let mut t = as_tensor(&arr, &dp);
            t.metadata.insert("channels", channels);
            out.push(t);
            head_md.insert("traces", vec![dp]);
        }
        FrameTensorMode::Tagged => {
            head_md.insert("mode", "tagged");
            let mut tags: Vec<String> = frame.traces.iter().filter_map(|t| t.tag.clone()).collect();
            tags.sort();
            tags.dedup();
            let mut paths = Vec::new();
            for tag in &tags {
                let group: Vec<&Trace> = frame.traces.iter().filter(|t| t.tag.as_deref() == Some(tag.as_str())).collect();
                let nticks = group.iter().map(|t| t.charge.num_elements()).max().unwrap_or(0);
                let mut flat = Vec::with_capacity(group.len() * nticks);
                let mut channels = Vec::with_capacity(group.len());
                for tr in &group {
                    let data = tr.charge.elements::<f64>().unwrap_or_default();
                    flat.extend(pad_row(data, nticks));
                    channels.push(tr.channel as i64);
                }
                let arr = Array::from_slice(&flat, &[group.len(), nticks], false).unwrap_or_else(|_| Array::empty());
                let dp = format!("{datapath}/tracedata/{tag}");
                let mut t = as_tensor(&arr, &dp);
                t.metadata.insert("channels", channels);
                t.metadata.insert("tag", tag.clone());
                out.push(t);
                paths.push(dp);
            }
            head_md.insert("traces", paths);
        }
    }

    out.insert(0, make_metadata_tensor("frame", datapath, head_md));
    out
}

/// Recovers a `Frame` from a `frame` tensor tree. For `unified`/`tagged`
/// tensors, `tbin` is reconstructed as 0 and traces are split back out
/// by row.
pub fn as_frame(tensors: &[Tensor], datapath: &str) -> Result<Frame> {
    let head = if datapath.is_empty() {
        first_of(tensors, "frame").ok_or_else(|| Error::value("as_frame: no frame tensor"))?
    } else {
        top_tensor(tensors, "frame", datapath)?
    };
    let ident = head.metadata.get("ident").and_then(Metadata::as_int).unwrap_or(0) as i32;
    let time = head.metadata.get("time").and_then(Metadata::as_f64).unwrap_or(0.0);
    let tick = head.metadata.get("tick").and_then(Metadata::as_f64).unwrap_or(0.0);
    let frame_tags = head
        .metadata
        .get("frame_tags")
        .and_then(Metadata::as_array)
        .map(|v| v.iter().filter_map(Metadata::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let mode = head.metadata.get("mode").and_then(Metadata::as_str).unwrap_or("sparse");
    let trace_paths: Vec<String> = head
        .metadata
        .get("traces")
        .and_then(Metadata::as_array)
        .map(|v| v.iter().filter_map(Metadata::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let index = crate::tensordm::index_datapaths(tensors);

    let mut traces = Vec::new();
    match mode {
        "sparse" => {
            for path in &trace_paths {
                let &i = index.get(path).ok_or_else(|| Error::value(format!("as_frame: missing trace tensor {path}")))?;
                traces.push(trace_from_tensor(&tensors[i])?);
            }
        }
        "unified" | "tagged" => {
            for path in &trace_paths {
                let &i = index.get(path).ok_or_else(|| Error::value(format!("as_frame: missing trace tensor {path}")))?;
                let t = &tensors[i];
                let arr = as_array(t, false)?;
                let nrows = arr.shape().first().copied().unwrap_or(0);
                let ncols = arr.shape().get(1).copied().unwrap_or(0);
                let data = arr.elements::<f64>()?;
                let channels: Vec<i64> = t
                    .metadata
                    .get("channels")
                    .and_then(Metadata::as_array)
                    .map(|v| v.iter().filter_map(Metadata::as_int).collect())
                    .unwrap_or_default();
                let tag = t.metadata.get("tag").and_then(Metadata::as_str).map(str::to_string);
                for row in 0..nrows {
                    let row_data = &data[row * ncols..(row + 1) * ncols];
                    let charge = Array::from_slice(row_data, &[ncols], false)?;
                    traces.push(Trace {
                        channel: channels.get(row).copied().unwrap_or(row as i64) as i32,
                        tbin: 0,
                        charge,
                        tag: tag.clone(),
                    });
                }
            }
        }
        other => return Err(Error::value(format!("as_frame: unknown frame mode {other:?}"))),
    }

    Ok(Frame { ident, time, tick, frame_tags, traces })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame {
            ident: 7,
            time: 0.0,
            tick: 0.5,
            frame_tags: vec!["raw".to_string()],
            traces: vec![
                Trace { channel: 0, tbin: 10, charge: Array::from_slice(&[1.0f64, 2.0, 3.0], &[3], false).unwrap(), tag: Some("gauss".to_string()) },
                Trace { channel: 1, tbin: 0, charge: Array::from_slice(&[4.0f64, 5.0], &[2], false).unwrap(), tag: None },
            ],
        }
    }

    #[test]
    fn sparse_mode_is_exact_roundtrip() {
        let frame = sample_frame();
        let tens = as_tensors(&frame, "frames/7", FrameTensorMode::Sparse);
        let back = as_frame(&tens, "frames/7").unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn unified_mode_preserves_channels_and_zero_pads() {
        let frame = sample_frame();
        let tens = as_tensors(&frame, "frames/7", FrameTensorMode::Unified);
        let back = as_frame(&tens, "frames/7").unwrap();
        assert_eq!(back.traces.len(), 2);
        assert_eq!(back.traces[0].channel, 0);
        assert_eq!(back.traces[1].charge.elements::<f64>().unwrap(), &[4.0, 5.0, 0.0]);
    }
}
