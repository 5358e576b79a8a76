// tests/snapshot.rs

mod common;
use crate::common::{init_tracing, rendered};

use std::path::{Path, PathBuf};

use keep_testing::fs::mock::MockFileSystem;
use keep_testing::types::FingerprintPolicy;
use keep_testing::watch::{IgnoreSet, TreeSnapshot};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.go", b"package main".to_vec());
    fs.add_file("/proj/src/util/util.go", b"package util".to_vec());
    fs.add_file("/proj/src/run.log", b"log line".to_vec());
    fs.add_file("/proj/src/build/out.bin", b"binary".to_vec());
    fs
}

fn snap(fs: &MockFileSystem, ignore: &IgnoreSet) -> TreeSnapshot {
    TreeSnapshot::build(fs, Path::new("/proj/src"), ignore, FingerprintPolicy::Content)
}

#[test]
fn snapshot_records_files_and_dirs() {
    init_tracing();
    let fs = project();
    let s = snap(&fs, &IgnoreSet::default());

    assert!(s.exists());
    assert_eq!(s.root(), Path::new("/proj/src"));
    let files: Vec<&PathBuf> = s.files().keys().collect();
    assert_eq!(
        files,
        vec![
            &PathBuf::from("/proj/src/build/out.bin"),
            &PathBuf::from("/proj/src/main.go"),
            &PathBuf::from("/proj/src/run.log"),
            &PathBuf::from("/proj/src/util/util.go"),
        ]
    );
    assert!(s.dirs().contains(Path::new("/proj/src/util")));
    assert!(s.dirs().contains(Path::new("/proj/src/build")));
    assert!(!s.dirs().contains(Path::new("/proj/src")));
}

#[test]
fn ignored_files_and_directories_are_left_out() {
    let fs = project();
    let ignore = IgnoreSet::new([r".*\.log", r".*/build"]).unwrap();
    let s = snap(&fs, &ignore);

    assert!(s.files().keys().all(|p| !p.to_string_lossy().ends_with(".log")));
    // Neither the ignored directory nor anything below it.
    assert!(!s.dirs().contains(Path::new("/proj/src/build")));
    assert!(!s.files().contains_key(Path::new("/proj/src/build/out.bin")));
    assert!(s.files().contains_key(Path::new("/proj/src/main.go")));
}

#[test]
fn ignore_patterns_match_the_whole_path() {
    let ignore = IgnoreSet::new([r"\.log"]).unwrap();
    assert!(!ignore.is_ignored(Path::new("/proj/src/run.log")));

    let ignore = IgnoreSet::new([r".*\.log"]).unwrap();
    assert!(ignore.is_ignored(Path::new("/proj/src/run.log")));
    assert!(!ignore.is_ignored(Path::new("/proj/src/run.log.go")));
}

#[test]
fn invalid_ignore_pattern_is_a_configuration_error() {
    let err = IgnoreSet::new(["ok", "(unclosed"]).unwrap_err();
    assert!(err.to_string().contains("(unclosed"), "{err}");
}

#[test]
fn identical_trees_have_no_diff() {
    let fs = project();
    let a = snap(&fs, &IgnoreSet::default());
    let b = snap(&fs, &IgnoreSet::default());
    assert!(TreeSnapshot::diff(&a, &b).is_empty());
}

#[test]
fn diff_reports_created_changed_deleted_sorted() {
    let fs = project();
    let ignore = IgnoreSet::new([r".*\.log"]).unwrap();
    let before = snap(&fs, &ignore);

    fs.add_file("/proj/src/main.go", b"package main // edited".to_vec());
    fs.add_file("/proj/src/new/new.go", b"package new".to_vec());
    fs.remove("/proj/src/util");
    fs.add_file("/proj/src/other.log", b"ignored".to_vec());

    let after = snap(&fs, &ignore);
    let changes = rendered(&TreeSnapshot::diff(&before, &after));

    assert_eq!(
        changes,
        vec![
            "Changed /proj/src/main.go",
            "Created /proj/src/new",
            "Created /proj/src/new/new.go",
            "Deleted /proj/src/util",
            "Deleted /proj/src/util/util.go",
        ]
    );
}

#[test]
fn root_disappearing_and_reappearing() {
    let fs = project();
    let before = snap(&fs, &IgnoreSet::default());

    fs.remove("/proj/src");
    let gone = snap(&fs, &IgnoreSet::default());
    assert!(!gone.exists());
    assert!(gone.files().is_empty());

    let changes = rendered(&TreeSnapshot::diff(&before, &gone));
    assert!(changes.contains(&"Deleted /proj/src".to_string()));
    assert!(changes.contains(&"Deleted /proj/src/main.go".to_string()));

    fs.add_file("/proj/src/main.go", b"package main".to_vec());
    let back = snap(&fs, &IgnoreSet::default());
    let changes = rendered(&TreeSnapshot::diff(&gone, &back));
    assert_eq!(
        changes,
        vec!["Created /proj/src", "Created /proj/src/main.go"]
    );
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_recorded_but_not_followed() -> TestResult {
    use std::os::unix::fs::symlink;

    use crate::common::{temp_root, write_file};
    use keep_testing::fs::RealFileSystem;

    let (_tmp, base) = temp_root();
    let root = base.join("root");
    let outside = base.join("outside");
    write_file(&root, "a.txt", "a");
    write_file(&outside, "secret.txt", "s");
    // A cycle back to the root and a link leaving the tree.
    symlink(&root, root.join("loop"))?;
    symlink(&outside, root.join("out"))?;

    let s = TreeSnapshot::build(
        &RealFileSystem,
        &root,
        &IgnoreSet::default(),
        FingerprintPolicy::Content,
    );

    assert!(s.dirs().contains(&root.join("loop")));
    assert!(s.dirs().contains(&root.join("out")));
    let files: Vec<&PathBuf> = s.files().keys().collect();
    assert_eq!(files, vec![&root.join("a.txt")]);
    assert!(!s.files().contains_key(&root.join("out/secret.txt")));
    assert!(!s.files().contains_key(&root.join("loop/a.txt")));
    Ok(())
}
