//! Build script for the Celesta web crate.
//!
//! Fingerprints the stylesheet and the site script so both can be served
//! with long-lived cache headers. Each asset is copied to a `derived/`
//! directory under a name containing the first eight hex digits of its
//! SHA-256, and the digest is exposed to the crate as an env var.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// (source path under the manifest dir, env var, derived file prefix, extension)
const ASSETS: &[(&str, &str, &str, &str)] = &[
    ("static/css/main.css", "CSS_HASH", "main", "css"),
    ("static/js/site.js", "JS_HASH", "site", "js"),
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let root = Path::new(&manifest_dir);

    for &(source, var, stem, ext) in ASSETS {
        fingerprint(root, source, var, stem, ext);
    }
}

fn fingerprint(root: &Path, source: &str, var: &str, stem: &str, ext: &str) {
    let path = root.join(source);
    println!("cargo:rerun-if-changed={}", path.display());

    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {source}: {e}");
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short = &digest[..8];
    println!("cargo:rustc-env={var}={short}");

    let derived_dir = path
        .parent()
        .map_or_else(|| root.join("static"), Path::to_path_buf)
        .join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(&path, derived_dir.join(format!("{stem}.{short}.{ext}")))
        .expect("Failed to copy asset to derived directory");
}
