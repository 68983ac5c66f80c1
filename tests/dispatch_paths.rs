use doc_convoy::dispatch::{plan_batch_destination, plan_single_destination};
use std::path::Path;

#[test]
fn explicit_file_destination_is_kept() {
    let dst = plan_single_destination(
        Path::new("in/doc.pdf"),
        Path::new("out/result.odt"),
        "odt",
    );
    assert_eq!(dst, Path::new("out/result.odt"));
}

#[test]
fn extensionless_destination_means_directory() {
    let dst = plan_single_destination(Path::new("in/doc.pdf"), Path::new("outdir"), "markdown");
    assert_eq!(dst, Path::new("outdir/doc.md"));
}

#[test]
fn existing_directory_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dst = plan_single_destination(Path::new("in/doc.pdf"), dir.path(), "latex");
    assert_eq!(dst, dir.path().join("doc.tex"));
}

#[test]
fn batch_destination_preserves_relative_structure() {
    let dst = plan_batch_destination(
        Path::new("docs/sub/deep/paper.pdf"),
        Path::new("docs"),
        Path::new("out"),
        "markdown",
    );
    assert_eq!(dst, Path::new("out/sub/deep/paper.md"));
}

#[test]
fn batch_destination_swaps_extension() {
    let dst = plan_batch_destination(
        Path::new("docs/notes.epub"),
        Path::new("docs"),
        Path::new("out"),
        "txt",
    );
    assert_eq!(dst, Path::new("out/notes.txt"));
}
