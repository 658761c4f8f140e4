//! Tests for directory-tree processing: walking, gating, failure
//! isolation, and the dry-run/apply split.
#![allow(clippy::unwrap_used)]

use flagprune::commands::{run_rewrite, RewriteOptions};
use flagprune::flag::FlagSpec;
use flagprune::gate::{ModuleGate, IGNORE_CHECK_TEST_PREFIX};
use flagprune::processing::{run_batch, FileStatus};
use flagprune::specializer::{SkipReason, Specializer};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn specializer() -> Specializer {
    let spec = FlagSpec::bare("FLAG").unwrap();
    let gate = ModuleGate::with_named_check(&spec, IGNORE_CHECK_TEST_PREFIX).unwrap();
    Specializer::new(spec, gate)
}

fn status_of<'a>(
    outcomes: &'a [flagprune::processing::FileOutcome],
    name: &str,
) -> &'a FileStatus {
    &outcomes
        .iter()
        .find(|o| Path::new(&o.display_path).file_name().unwrap() == name)
        .unwrap()
        .status
}

#[test]
fn test_broken_files_do_not_poison_their_siblings() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("good.py"), "if FLAG:\n    a()\n").unwrap();
    fs::write(dir.path().join("bad.py"), "if FLAG:\n").unwrap();

    let outcomes = run_batch(&specializer(), &[dir.path().to_path_buf()], &[], None);
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        status_of(&outcomes, "good.py"),
        FileStatus::Rewritten { .. }
    ));
    assert!(matches!(status_of(&outcomes, "bad.py"), FileStatus::Failed(_)));
}

#[test]
fn test_gate_reasons_are_reported_per_file() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg").join("test_api.py"), "if FLAG:\n    a()\n").unwrap();
    fs::write(dir.path().join("plain.py"), "print('hi')\n").unwrap();
    fs::write(dir.path().join("reads.py"), "print(FLAG)\n").unwrap();

    let outcomes = run_batch(&specializer(), &[dir.path().to_path_buf()], &[], None);
    assert_eq!(
        status_of(&outcomes, "test_api.py"),
        &FileStatus::Skipped(SkipReason::IgnoredModule)
    );
    assert_eq!(
        status_of(&outcomes, "plain.py"),
        &FileStatus::Skipped(SkipReason::NoFlagMention)
    );
    assert_eq!(status_of(&outcomes, "reads.py"), &FileStatus::Unchanged);
}

#[test]
fn test_excluded_folders_are_not_walked() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("vendor")).unwrap();
    fs::write(dir.path().join("vendor").join("mod.py"), "if FLAG:\n    a()\n").unwrap();
    fs::write(dir.path().join("mine.py"), "if FLAG:\n    a()\n").unwrap();

    let outcomes = run_batch(
        &specializer(),
        &[dir.path().to_path_buf()],
        &["vendor".to_owned()],
        None,
    );
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].display_path.ends_with("mine.py"));
}

#[test]
fn test_default_excludes_cover_caches() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("__pycache__")).unwrap();
    fs::write(
        dir.path().join("__pycache__").join("mod.py"),
        "if FLAG:\n    a()\n",
    )
    .unwrap();

    let outcomes = run_batch(&specializer(), &[dir.path().to_path_buf()], &[], None);
    assert!(outcomes.is_empty());
}

#[test]
fn test_single_file_roots_are_processed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.py");
    fs::write(&path, "if FLAG:\n    a()\n").unwrap();

    let outcomes = run_batch(&specializer(), &[path], &[], None);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].status,
        FileStatus::Rewritten { .. }
    ));
}

#[test]
fn test_dry_run_then_apply_across_a_tree() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.py");
    let second = dir.path().join("second.py");
    fs::write(&first, "if FLAG:\n    a()\nelse:\n    b()\n").unwrap();
    fs::write(&second, "x = 1\nif FLAG:\n    y = 2\n").unwrap();

    let mut buffer = Vec::new();
    let summary = run_rewrite(
        &specializer(),
        &[dir.path().to_path_buf()],
        &RewriteOptions::default(),
        &mut buffer,
    )
    .unwrap();
    assert_eq!(summary.rewritten, 2);
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        "if FLAG:\n    a()\nelse:\n    b()\n"
    );

    let mut buffer = Vec::new();
    let summary = run_rewrite(
        &specializer(),
        &[dir.path().to_path_buf()],
        &RewriteOptions {
            apply: true,
            ..RewriteOptions::default()
        },
        &mut buffer,
    )
    .unwrap();
    assert_eq!(summary.rewritten, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(fs::read_to_string(&first).unwrap(), "a()\n");
    assert_eq!(fs::read_to_string(&second).unwrap(), "x = 1\ny = 2\n");
}

#[test]
fn test_json_report_carries_files_and_summary() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("mod.py"), "if FLAG:\n    a()\n").unwrap();
    fs::write(dir.path().join("plain.py"), "print('hi')\n").unwrap();

    let mut buffer = Vec::new();
    run_rewrite(
        &specializer(),
        &[dir.path().to_path_buf()],
        &RewriteOptions {
            json: true,
            ..RewriteOptions::default()
        },
        &mut buffer,
    )
    .unwrap();

    let report: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(report["flag"], "FLAG");
    assert_eq!(report["mode"], "dry-run");
    assert_eq!(report["summary"]["scanned"], 2);
    assert_eq!(report["summary"]["rewritten"], 1);
    assert_eq!(report["summary"]["skipped"], 1);

    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    let skipped = files
        .iter()
        .find(|f| f["status"] == "skipped")
        .unwrap();
    assert_eq!(skipped["reason"], "no_flag_mention");
}
