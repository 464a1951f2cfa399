//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "binary"
//! np_type: "source"
//! np_scope: "build"
//! np_description: "Build script embedding git metadata into the daemon."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Without a git checkout the sha falls back to a placeholder.
    EmitBuilder::builder().git_sha(true).emit()?;
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
