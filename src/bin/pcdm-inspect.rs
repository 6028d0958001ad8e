//! A thin smoke-test driver over the tensor decode path: loads a
//! directory of `<name>.json`/`<name>.bin` sidecar pairs as Tensors and
//! prints a one-line summary of each. Not a pipeline runtime.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use pcdm_toolkit::array::TypeTag;
use pcdm_toolkit::metadata::Metadata;
use pcdm_toolkit::tensordm::Tensor;
use pcdm_toolkit::{Error, Result};

#[derive(Parser)]
#[command(about = "Summarizes a directory of tensor sidecar files")]
struct Cli {
    /// Directory containing `<name>.json`/`<name>.bin` tensor sidecar pairs.
    dir: PathBuf,

    /// Only show tensors whose datapath matches this regex.
    #[arg(long)]
    datapath: Option<String>,
}

fn json_to_metadata(value: &serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Null => Metadata::Null,
        serde_json::Value::Bool(b) => Metadata::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Metadata::from(i)
            } else {
                Metadata::from(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Metadata::from(s.as_str()),
        serde_json::Value::Array(items) => Metadata::Array(items.iter().map(json_to_metadata).collect()),
        serde_json::Value::Object(map) => {
            let mut md = Metadata::object();
            for (k, v) in map {
                md.insert(k.clone(), json_to_metadata(v));
            }
            md
        }
    }
}

fn load_tensor(json_path: &Path) -> Result<Tensor> {
    let text = fs::read_to_string(json_path).map_err(Error::from)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| Error::Value(format!("{}: {e}", json_path.display())))?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Value(format!("{}: top-level JSON must be an object", json_path.display())))?;

    let shape: Vec<usize> = obj
        .get("shape")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::Value(format!("{}: missing 'shape'", json_path.display())))?
        .iter()
        .map(|v| v.as_u64().unwrap_or(0) as usize)
        .collect();
    let type_tag_raw = obj
        .get("type_tag")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::Value(format!("{}: missing 'type_tag'", json_path.display())))? as u8;
    let type_tag = TypeTag::try_from(type_tag_raw)
        .map_err(|_| Error::Value(format!("{}: unknown type_tag {type_tag_raw}", json_path.display())))?;

    let bin_path = json_path.with_extension("bin");
    let bytes = fs::read(&bin_path).map_err(Error::from)?;

    let mut metadata = Metadata::object();
    for (k, v) in obj {
        if k == "shape" || k == "type_tag" {
            continue;
        }
        metadata.insert(k.clone(), json_to_metadata(v));
    }
    metadata.insert("datapath", obj.get("datapath").and_then(|v| v.as_str()).unwrap_or_default());
    metadata.insert("datatype", obj.get("datatype").and_then(|v| v.as_str()).unwrap_or_default());

    Ok(Tensor { shape, type_tag, bytes, metadata })
}

fn run() -> Result<Vec<Tensor>> {
    let cli = Cli::parse();
    let mut tensors = Vec::new();
    let entries = fs::read_dir(&cli.dir).map_err(Error::from)?;
    let mut json_paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    json_paths.sort();
    for path in &json_paths {
        tensors.push(load_tensor(path)?);
    }

    if let Some(pattern) = &cli.datapath {
        let matched = pcdm_toolkit::match_at(&tensors, pattern)?;
        Ok(matched.into_iter().cloned().collect())
    } else {
        Ok(tensors)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(tensors) => {
            for t in &tensors {
                println!("{}\t{}\tshape={:?}\tbytes={}", t.datatype(), t.datapath(), t.shape, t.bytes.len());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("pcdm-inspect: {e}");
            ExitCode::FAILURE
        }
    }
}
