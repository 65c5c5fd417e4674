//! Purpose: Embed the prebuilt `libglide_rs` binaries into the crate as packaged resources.
//! Role: Cargo build-script; generates `$OUT_DIR/embedded_resources.rs` with `include_bytes!` entries.
//! Invariants: Only the four known library filenames are embedded; missing files are skipped.
//! Invariants: `GLIDE_NATIVE_RESOURCES` overrides the default `<crate>/resources` directory.
//! Invariants: `cargo:rerun-if-*` covers the resource directory, each library file, and the override.
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const LIBRARY_FILE_NAMES: [&str; 4] = [
    "libglide_rs-osx-aarch_64.dylib",
    "libglide_rs-osx-x86_64.dylib",
    "libglide_rs-linux-aarch_64.so",
    "libglide_rs-linux-x86_64.so",
];

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let resource_dir = env::var_os("GLIDE_NATIVE_RESOURCES")
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("resources"));

    println!("cargo:rerun-if-env-changed=GLIDE_NATIVE_RESOURCES");
    println!("cargo:rerun-if-changed={}", resource_dir.display());

    let mut table = String::from("static EMBEDDED: &[(&str, &[u8])] = &[\n");
    for name in LIBRARY_FILE_NAMES {
        let path = resource_dir.join(name);
        println!("cargo:rerun-if-changed={}", path.display());
        if !path.is_file() {
            continue;
        }
        let path = path
            .canonicalize()
            .unwrap_or_else(|err| panic!("failed to resolve {}: {err}", path.display()));
        let literal = path
            .to_str()
            .unwrap_or_else(|| panic!("resource path is not UTF-8: {}", path.display()));
        writeln!(table, "    (\"/{name}\", include_bytes!({literal:?})),")
            .expect("write to string");
    }
    table.push_str("];\n");

    fs::write(out_dir.join("embedded_resources.rs"), table)
        .expect("failed to write embedded resource table");
}
