use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use dax_manager::error::DaxError;
use dax_manager::fetch::{FetchCache, FetchRequest, Transport};
use dax_manager::location::{Location, PersistMode, PersistOptions, WriteOutcome};

#[derive(Default)]
struct MockTransport {
    calls: Mutex<usize>,
    fail: bool,
    write_nothing: bool,
}

impl MockTransport {
    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Transport for MockTransport {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<(), DaxError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(DaxError::Fetch {
                command: self.describe(request),
                code: Some(1),
            });
        }
        if !self.write_nothing {
            fs::write(request.destination, request.remote.as_bytes()).unwrap();
        }
        Ok(())
    }
}

fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, path)
}

const REMOTE_URL: &str = "chirp://storage:9094/lcls/fah/RUN0/CLONE0/results-000.tar.bz2";

#[test]
fn remote_resolve_hits_cache_second_time() {
    let (_temp, dir) = utf8_tempdir();
    let cache = FetchCache::new(dir.join("scratch"), MockTransport::default());
    let loc = Location::from_url(REMOTE_URL).unwrap();

    let first = loc.resolve(&cache).unwrap();
    let second = loc.resolve(&cache).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.transport().calls(), 1);
    assert_eq!(
        first.file_name(),
        Some("!lcls!fah!RUN0!CLONE0!results-000.tar.bz2")
    );
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        "/lcls/fah/RUN0/CLONE0/results-000.tar.bz2"
    );
}

#[test]
fn acquire_removes_fetched_copy_on_scope_exit() {
    let (_temp, dir) = utf8_tempdir();
    let cache = FetchCache::new(dir.join("scratch"), MockTransport::default());
    let loc = Location::from_url(REMOTE_URL).unwrap();

    let path = {
        let copy = loc.acquire(&cache).unwrap();
        assert!(copy.path().as_std_path().exists());
        copy.path().to_path_buf()
    };
    assert!(!path.as_std_path().exists());
}

#[test]
fn acquire_removes_fetched_copy_when_scope_fails() {
    let (_temp, dir) = utf8_tempdir();
    let cache = FetchCache::new(dir.join("scratch"), MockTransport::default());
    let loc = Location::from_url(REMOTE_URL).unwrap();
    let cached = cache.cache_path("/lcls/fah/RUN0/CLONE0/results-000.tar.bz2");

    let result: Result<(), DaxError> = loc.with_local(&cache, |path| {
        assert!(path.as_std_path().exists());
        Err(DaxError::Filesystem("analysis failed".to_string()))
    });

    assert_matches!(result, Err(DaxError::Filesystem(_)));
    assert!(!cached.as_std_path().exists());
}

#[test]
fn acquire_leaves_local_files_alone() {
    let (_temp, dir) = utf8_tempdir();
    let original = dir.join("frame0.xtc");
    fs::write(&original, b"xtc").unwrap();
    let cache = FetchCache::new(dir.join("scratch"), MockTransport::default());
    let loc = Location::local(&original).unwrap();

    {
        let copy = loc.acquire(&cache).unwrap();
        assert_eq!(copy.path(), original.as_path());
    }
    assert!(original.as_std_path().exists());
    assert_eq!(cache.transport().calls(), 0);
}

#[test]
fn failed_fetch_reports_command_and_leaves_no_cache_file() {
    let (_temp, dir) = utf8_tempdir();
    let transport = MockTransport {
        fail: true,
        ..Default::default()
    };
    let cache = FetchCache::new(dir.join("scratch"), transport);
    let loc = Location::from_url(REMOTE_URL).unwrap();

    let err = loc.resolve(&cache).unwrap_err();
    assert_matches!(err, DaxError::Fetch { ref command, code: Some(1) } if command.contains("storage:9094"));
    let cached = cache.cache_path("/lcls/fah/RUN0/CLONE0/results-000.tar.bz2");
    assert!(!cached.as_std_path().exists());
    assert_eq!(fs::read_dir(dir.join("scratch")).unwrap().count(), 0);
}

#[test]
fn fetch_without_output_is_an_error() {
    let (_temp, dir) = utf8_tempdir();
    let transport = MockTransport {
        write_nothing: true,
        ..Default::default()
    };
    let cache = FetchCache::new(dir.join("scratch"), transport);
    let err = Location::from_url(REMOTE_URL)
        .unwrap()
        .resolve(&cache)
        .unwrap_err();
    assert_matches!(err, DaxError::FetchOutputMissing { .. });
}

#[test]
fn local_resolve_requires_original() {
    let (_temp, dir) = utf8_tempdir();
    let cache = FetchCache::new(dir.join("scratch"), MockTransport::default());
    let loc = Location::local(&dir.join("missing.xtc")).unwrap();
    assert_matches!(loc.resolve(&cache), Err(DaxError::OriginalMissing(_)));
}

#[test]
fn pointer_write_skips_unless_forced() {
    let (_temp, dir) = utf8_tempdir();
    let pointer = dir.join("results-000.tar.bz2");
    let first = Location::from_url(REMOTE_URL).unwrap();
    let second = Location::from_url("chirp://other/lcls/results-000.tar.bz2").unwrap();

    assert_eq!(first.write_pointer(&pointer, false).unwrap(), WriteOutcome::Written);
    assert_eq!(fs::read_to_string(&pointer).unwrap(), format!("{REMOTE_URL}\n"));

    assert_eq!(second.write_pointer(&pointer, false).unwrap(), WriteOutcome::Skipped);
    assert_eq!(Location::read_pointer(&pointer).unwrap(), first);

    assert_eq!(second.write_pointer(&pointer, true).unwrap(), WriteOutcome::Overwritten);
    assert_eq!(Location::read_pointer(&pointer).unwrap(), second);
}

#[test]
fn read_pointer_trims_whitespace() {
    let (_temp, dir) = utf8_tempdir();
    let pointer = dir.join("frame0.xtc");
    fs::write(&pointer, "  file:///data/frame0.xtc \r\n\n").unwrap();
    let loc = Location::read_pointer(&pointer).unwrap();
    assert_eq!(loc.url(), "file:///data/frame0.xtc");
}

#[test]
fn read_pointer_rejects_unknown_scheme() {
    let (_temp, dir) = utf8_tempdir();
    let pointer = dir.join("frame0.xtc");
    fs::write(&pointer, "http://foo.bar/frame0.xtc\n").unwrap();
    assert_matches!(
        Location::read_pointer(&pointer),
        Err(DaxError::UnsupportedScheme(_))
    );
}

#[cfg(unix)]
#[test]
fn symlink_persist_points_at_original() {
    let (_temp, dir) = utf8_tempdir();
    let original = dir.join("frame0.xtc");
    fs::write(&original, b"xtc").unwrap();
    let link = dir.join("link.xtc");
    let options = PersistOptions {
        force: false,
        mode: PersistMode::Symlink,
    };

    let loc = Location::local(&original).unwrap();
    assert_eq!(loc.persist(&link, options).unwrap(), WriteOutcome::Written);
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(Location::from_entry(&link).unwrap(), loc);

    fs::remove_file(&original).unwrap();
    assert_matches!(Location::from_entry(&link), Err(DaxError::OriginalMissing(_)));
}

#[test]
fn symlink_mode_writes_pointer_for_remote() {
    let (_temp, dir) = utf8_tempdir();
    let entry = dir.join("results-000.tar.bz2");
    let options = PersistOptions {
        force: false,
        mode: PersistMode::Symlink,
    };
    let loc = Location::from_url(REMOTE_URL).unwrap();
    loc.persist(&entry, options).unwrap();
    assert!(!fs::symlink_metadata(&entry).unwrap().file_type().is_symlink());
    assert_eq!(Location::from_entry(&entry).unwrap(), loc);
}
