fn main() {
    pgroute_plugin_build::pg_query_version();
}
