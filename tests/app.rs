use std::fs;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use dax_manager::app::App;
use dax_manager::config::ResolvedConfig;
use dax_manager::error::DaxError;
use dax_manager::fetch::{FetchRequest, Transport};
use dax_manager::location::PersistOptions;
use dax_manager::manifest::ManifestKind;
use dax_manager::output::JsonOutput;

#[derive(Default)]
struct MockChirp {
    calls: Mutex<usize>,
}

impl Transport for MockChirp {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), DaxError> {
        let mut guard = self.calls.lock().unwrap();
        *guard += 1;
        fs::write(request.destination, b"data").unwrap();
        Ok(())
    }
}

fn app_in(dir: &Utf8PathBuf) -> App<MockChirp> {
    let config = ResolvedConfig {
        prefix: dir.join("projects"),
        group: "lcls".to_string(),
        platform: "fah".to_string(),
        projid: 10009,
        scratch_dir: dir.join("scratch"),
        fetch_command: "chirp_get".to_string(),
        persist: PersistOptions::default(),
    };
    App::new(config, MockChirp::default())
}

#[test]
fn ingest_then_list_and_locate() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let manifest = dir.join("p10009.xtclist");
    fs::write(
        &manifest,
        "/lcls/fah/data/PROJ10009/RUN0/CLONE0/results-000.tar.bz2\n\
         /lcls/fah/data/PROJ10009/RUN0/CLONE0/results-001.tar.bz2\n\
         /lcls/fah/data/PROJ10009/RUN1/CLONE4/results-000.tar.bz2\n",
    )
    .unwrap();
    let kind = ManifestKind::Chirp {
        host: "localhost".to_string(),
        port: Some(9887),
    };

    let app = app_in(&dir);
    let result = app.ingest(&manifest, &kind, &JsonOutput).unwrap();
    assert_eq!(result.ingested, 3);
    assert_eq!(result.written, 3);
    assert!(result.root.ends_with("lcls.fah.10009"));

    let again = app.ingest(&manifest, &kind, &JsonOutput).unwrap();
    assert_eq!(again.skipped, 3);

    let listed = app.list(&JsonOutput).unwrap();
    assert_eq!(listed.trajectories.len(), 2);
    assert_eq!(listed.trajectories[0].generations.len(), 2);
    assert_eq!(
        listed.trajectories[1].generations[0].files[0].url,
        "chirp://localhost:9887/lcls/fah/data/PROJ10009/RUN1/CLONE4/results-000.tar.bz2"
    );

    let located = app.locate("results-*", false, &JsonOutput).unwrap();
    assert_eq!(located.matches.len(), 3);
    assert_eq!(
        located.matches[2].coordinate.as_deref(),
        Some("RUN0001/CLONE0004/GEN0000")
    );

    let files = app.locate("*.bz2", true, &JsonOutput).unwrap();
    assert!(files.matches.iter().all(|entry| entry.value.starts_with(dir.as_str())));
}

#[test]
fn fetch_reports_cache_hits() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let app = app_in(&dir);
    let url = "chirp://localhost:9887/lcls/RUN0/CLONE0/results-000.tar.bz2";

    let first = app.fetch(url, &JsonOutput).unwrap();
    assert!(!first.cached);
    let second = app.fetch(url, &JsonOutput).unwrap();
    assert!(second.cached);
    assert_eq!(first.local_path, second.local_path);
    assert_eq!(*app.cache().transport().calls.lock().unwrap(), 1);
}
