use doc_convoy::resolve::{group_by_extension, resolve_files};
use std::fs;
use std::path::Path;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"x").unwrap();
}

#[test]
fn non_recursive_stays_at_top_level() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.md"));
    touch(&dir.path().join("b.pdf"));
    touch(&dir.path().join("sub/nested.md"));

    let files = resolve_files(dir.path(), None, false).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.md", "b.pdf"]);
}

#[test]
fn recursive_discovers_nested_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.md"));
    touch(&dir.path().join("sub/nested.md"));
    touch(&dir.path().join("sub/deeper/more.epub"));

    let files = resolve_files(dir.path(), None, true).unwrap();
    assert_eq!(files.len(), 3);
}

#[test]
fn filter_restricts_to_exact_extension() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.pdf"));
    touch(&dir.path().join("b.md"));
    touch(&dir.path().join("sub/c.pdf"));

    let files = resolve_files(dir.path(), Some("pdf"), true).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .all(|f| f.extension().unwrap().eq_ignore_ascii_case("pdf")));

    // Leading dot is tolerated.
    let files = resolve_files(dir.path(), Some(".md"), true).unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn unsupported_extensions_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.md"));
    touch(&dir.path().join("binary.exe"));
    touch(&dir.path().join("noext"));

    let files = resolve_files(dir.path(), None, true).unwrap();
    assert_eq!(files.len(), 1);
}

#[test]
fn single_file_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let f = dir.path().join("doc.odt");
    touch(&f);

    let files = resolve_files(&f, None, false).unwrap();
    assert_eq!(files, vec![f]);
}

#[test]
fn single_unsupported_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let f = dir.path().join("image.png");
    touch(&f);

    assert!(resolve_files(&f, None, false).is_err());
}

#[test]
fn missing_path_is_an_error() {
    assert!(resolve_files(Path::new("/no/such/path"), None, false).is_err());
}

#[test]
fn empty_directory_yields_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let files = resolve_files(dir.path(), None, true).unwrap();
    assert!(files.is_empty());
}

#[test]
fn grouping_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("a.pdf"));
    touch(&dir.path().join("b.pdf"));
    touch(&dir.path().join("c.md"));

    let files = resolve_files(dir.path(), None, true).unwrap();
    let groups = group_by_extension(&files);
    assert_eq!(groups["pdf"].len(), 2);
    assert_eq!(groups["md"].len(), 1);
}
