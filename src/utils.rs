/// Rewrites Windows separators so entry points match the oracle's
/// `/`-separated file names.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Entry points that name configuration or data files rather than sources.
/// `tsconfig.json` style project files are passed alongside sources by
/// callers and are not converted.
pub fn is_source_entry(path: &str) -> bool {
    !path.to_ascii_lowercase().ends_with(".json")
}

/// The module name of a source file: its path without the source extension,
/// with `./` prefixes dropped.
pub fn module_name(file_name: &str) -> String {
    let path = normalize_path(file_name);
    let path = path.trim_start_matches("./");
    const EXTENSIONS: [&str; 8] = [".d.ts", ".d.mts", ".d.cts", ".tsx", ".ts", ".mts", ".jsx", ".js"];
    let stem = EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path);
    stem.to_string()
}
