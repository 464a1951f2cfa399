//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "build"
//! np_description: "Build metadata emission for version reporting."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Without fail_on_error vergen falls back to placeholder values when git is unavailable.
    EmitBuilder::builder()
        .build_timestamp()
        .cargo_target_triple()
        .cargo_opt_level()
        .git_sha(true)
        .emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
