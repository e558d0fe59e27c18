//! Startup check that the asset tree can satisfy the offline manifest.

use cache::AssetManifest;
use std::path::Path;

/// Manifest paths the server would answer with 404.
///
/// `well_known` maps route paths to the files that back them. Absolute
/// third-party URLs are not checked.
pub fn missing_paths(manifest: &AssetManifest, root: &Path, well_known: &[(&str, &Path)]) -> Vec<String> {
    manifest
        .local_paths()
        .filter(|path| !is_servable(path, root, well_known))
        .map(str::to_string)
        .collect()
}

/// Log a warning per missing path and return how many were missing.
pub fn warn_missing(manifest: &AssetManifest, root: &Path, well_known: &[(&str, &Path)]) -> usize {
    let missing = missing_paths(manifest, root, well_known);
    for path in &missing {
        tracing::warn!(
            path = %path,
            root = %root.display(),
            "manifest entry is not served; offline install will fail"
        );
    }
    missing.len()
}

fn is_servable(path: &str, root: &Path, well_known: &[(&str, &Path)]) -> bool {
    if let Some((_, file)) = well_known.iter().find(|(route, _)| *route == path) {
        return file.is_file();
    }

    // Query and fragment never reach the file system.
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    let target = root.join(decoded.trim_start_matches('/'));

    if target.is_dir() {
        target.join("index.html").is_file()
    } else {
        target.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_complete_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        fs::write(dir.path().join("style.css"), "").unwrap();
        let web_manifest = dir.path().join("app.webmanifest");
        fs::write(&web_manifest, "{}").unwrap();

        let well_known = [("/manifest.json", web_manifest.as_path())];
        let missing = missing_paths(&AssetManifest::default(), dir.path(), &well_known);
        assert!(missing.is_empty(), "{:?}", missing);
    }

    #[test]
    fn test_reports_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        let absent = dir.path().join("absent.json");

        let well_known = [("/manifest.json", absent.as_path())];
        let missing = missing_paths(&AssetManifest::default(), dir.path(), &well_known);
        assert_eq!(missing, vec!["/style.css", "/manifest.json"]);
        assert_eq!(warn_missing(&AssetManifest::default(), dir.path(), &well_known), 2);
    }

    #[test]
    fn test_directory_needs_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("editor")).unwrap();

        let manifest = AssetManifest::new(["/editor/"]).unwrap();
        assert_eq!(missing_paths(&manifest, dir.path(), &[]), vec!["/editor/"]);

        fs::write(dir.path().join("editor/index.html"), "").unwrap();
        assert!(missing_paths(&manifest, dir.path(), &[]).is_empty());
    }
}
