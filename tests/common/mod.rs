#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use keep_testing_test_utils::builders;
pub use keep_testing_test_utils::fakes;
pub use keep_testing_test_utils::{init_tracing, with_timeout};

/// Write `content` to `dir/name`, creating parent directories, and return
/// the absolute path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// A canonical temp directory, so paths compare equal to what the engine
/// reports (macOS `/var` vs `/private/var`).
pub fn temp_root() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();
    (tmp, root)
}

/// Render changes the way the reporter prints them.
pub fn rendered<T: ToString>(changes: &[T]) -> Vec<String> {
    changes.iter().map(ToString::to_string).collect()
}
