use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use dax_manager::error::DaxError;
use dax_manager::location::Location;
use dax_manager::manifest::{ManifestKind, parse_manifest, read_manifest};

const LIST: &str = "\
/lcls/fah/data/PROJ10009/RUN0/CLONE0/results-000.tar.bz2

/lcls/fah/data/PROJ10009/RUN0/CLONE0/results-001.tar.bz2
";

#[test]
fn local_manifest_builds_file_urls() {
    let locations = parse_manifest(LIST, &ManifestKind::Local).unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(
        locations[0].url(),
        "file:///lcls/fah/data/PROJ10009/RUN0/CLONE0/results-000.tar.bz2"
    );
    assert!(!locations[1].is_remote());
}

#[test]
fn chirp_manifest_builds_chirp_urls() {
    let kind = ManifestKind::Chirp {
        host: "localhost".to_string(),
        port: Some(9887),
    };
    let locations = parse_manifest(LIST, &kind).unwrap();
    assert_eq!(
        locations[1].url(),
        "chirp://localhost:9887/lcls/fah/data/PROJ10009/RUN0/CLONE0/results-001.tar.bz2"
    );
    let Location::Chirp(file) = &locations[1] else {
        panic!("expected chirp location");
    };
    assert_eq!(file.port(), Some(9887));
}

#[test]
fn entries_with_scheme_are_taken_as_is() {
    let content = "chirp://store/a/results-000.tar.bz2\n/b/results-001.tar.bz2\n";
    let locations = parse_manifest(content, &ManifestKind::Local).unwrap();
    assert!(locations[0].is_remote());
    assert!(!locations[1].is_remote());

    let err = parse_manifest("ftp://x/y\n", &ManifestKind::Local).unwrap_err();
    assert_matches!(err, DaxError::UnsupportedScheme(_));
}

#[test]
fn read_manifest_from_disk() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("p10009.xtclist")).unwrap();
    fs::write(&path, LIST).unwrap();
    let locations = read_manifest(&path, &ManifestKind::Local).unwrap();
    assert_eq!(locations.len(), 2);

    let missing = read_manifest(&path.with_extension("missing"), &ManifestKind::Local);
    assert_matches!(missing, Err(DaxError::Filesystem(_)));
}
