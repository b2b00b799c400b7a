use std::{env, path::PathBuf, process::Command};

use bindgen::callbacks::{DeriveInfo, ParseCallbacks};

/// Extra derives for generated types.
#[derive(Debug)]
struct Derives;

impl ParseCallbacks for Derives {
    fn add_derives(&self, info: &DeriveInfo<'_>) -> Vec<String> {
        match info.name {
            "PrRoute" => vec!["PartialEq".into(), "Eq".into()],
            _ => vec![],
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=include/types.h");
    println!("cargo:rerun-if-env-changed=RUSTC");

    let bindings = bindgen::Builder::default()
        .header("include/types.h")
        .allowlist_type("Pr.*|RustString")
        .allowlist_var("PGROUTE_.*")
        .generate_comments(true)
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .parse_callbacks(Box::new(Derives))
        .generate()
        .expect("Unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Unable to write bindings");

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".into());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .unwrap_or_default();

    println!("cargo:rustc-env=RUSTC_VERSION={}", version.trim());
}
