//! Manifest writer for Glycosense model artifacts.
//!
//! Hashes the random forest and neural network exports and writes
//! `manifest.json` next to them. The service checks every artifact it loads
//! against this file when it is present.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin write_manifest -- <model_dir> [--forest <file>] [--network <file>]
//! ```

use std::env;
use std::path::PathBuf;

use glycosense::adapters::artifact::{ModelManifest, MANIFEST_FILE};
use glycosense::config::Config;

struct Args {
    model_dir: PathBuf,
    forest: String,
    network: String,
}

fn usage() -> String {
    "Usage: write_manifest <model_dir> [--forest <file>] [--network <file>]".to_string()
}

fn parse_args() -> Result<Args, String> {
    let defaults = Config::default();
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut forest = defaults.forest_model;
    let mut network = defaults.network_model;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--forest" => forest = args.next().ok_or_else(usage)?,
            "--network" => network = args.next().ok_or_else(usage)?,
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    Ok(Args {
        model_dir: model_dir.ok_or_else(usage)?,
        forest,
        network,
    })
}

fn main() -> Result<(), String> {
    let args = parse_args()?;

    let model_dir = if args.model_dir.is_file() {
        args.model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        args.model_dir
    };

    let files = [args.forest.as_str(), args.network.as_str()];
    let manifest = ModelManifest::from_files(&model_dir, &files).map_err(|e| e.to_string())?;
    manifest
        .write(&model_dir)
        .map_err(|e| format!("Failed to write {MANIFEST_FILE}: {e}"))?;

    println!("Wrote {:?}", model_dir.join(MANIFEST_FILE));
    for (name, digest) in &manifest.files {
        println!("  {name}  sha256:{digest}");
    }
    Ok(())
}
