//! Build-time helpers for pgroute plugins.
//!
//! Include this package as a build dependency only.
//!

use std::fs::read_to_string;

/// Extracts the `pg_query` crate version from `Cargo.toml`
/// and sets it as an environment variable.
///
/// This should be used at build time only. It expects `Cargo.toml` to be present in the same
/// folder as `build.rs`.
///
/// ### Note
///
/// You should have a strict version constraint on `pg_query`, for example:
///
/// ```toml
/// pg_query = "6.1.0"
/// ```
///
/// If the version in your plugin doesn't match what the host is using, your plugin won't be loaded.
///
pub fn pg_query_version() {
    println!("cargo:rerun-if-changed=Cargo.toml");

    let contents = match read_to_string("Cargo.toml") {
        Ok(contents) => contents,
        Err(_) => panic!("Cargo.toml not found"),
    };

    if let Some(version) = pg_query_version_from(&contents) {
        println!("cargo:rustc-env=PGROUTE_PGQUERY_VERSION={}", version);
    }
}

/// Find the `pg_query` version in the contents of a `Cargo.toml`.
///
/// Both `pg_query = "6.1.0"` and `pg_query = { version = "6.1.0" }` are understood.
///
/// ### Example
///
/// ```
/// use pgroute_plugin_build::pg_query_version_from;
///
/// let manifest = r#"
/// [dependencies]
/// pg_query = "6.1.0"
/// "#;
/// assert_eq!(pg_query_version_from(manifest).as_deref(), Some("6.1.0"));
/// ```
pub fn pg_query_version_from(contents: &str) -> Option<String> {
    let contents: toml::Value = toml::from_str(contents).ok()?;
    let pg_query = contents.get("dependencies")?.get("pg_query")?;

    pg_query
        .as_str()
        .or_else(|| pg_query.get("version").and_then(|version| version.as_str()))
        .map(|version| version.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_version() {
        let manifest = r#"
[package]
name = "plugin"

[dependencies]
pg_query = { version = "6.1.0", default-features = false }
"#;
        assert_eq!(pg_query_version_from(manifest).as_deref(), Some("6.1.0"));
    }

    #[test]
    fn test_missing() {
        assert!(pg_query_version_from("[dependencies]\nserde = \"1\"\n").is_none());
        assert!(pg_query_version_from("[dependencies]\npg_query = { git = \"https://example.com\" }\n").is_none());
        assert!(pg_query_version_from("not toml = = =").is_none());
    }
}
