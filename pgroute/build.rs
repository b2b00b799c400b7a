fn main() {
    // Plugins built against another pg_query release are skipped at load time.
    pgroute_plugin_build::pg_query_version();
}
