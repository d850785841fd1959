// Build script to extract version from Cargo.toml
// and optionally override patch version from CI/CD pipeline

use std::env;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");

    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        panic!("Invalid version format in Cargo.toml: {}", version);
    }

    // Release pipelines stamp the build number into the patch segment
    let patch = env::var("PLACES_PATCH_VERSION").unwrap_or_else(|_| parts[2].to_string());

    println!(
        "cargo:rustc-env=PLACES_VERSION={}.{}.{}",
        parts[0], parts[1], patch
    );
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=PLACES_PATCH_VERSION");
}
