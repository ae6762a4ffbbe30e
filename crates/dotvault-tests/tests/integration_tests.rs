//! Integration tests for DotVault
//!
//! These tests drive a full backup and restore through the public crates,
//! using a temporary directory as the home.

use dotvault_config::{SettingsBuilder, SettingsLoader};
use dotvault_engine::{
    always_overwrite, always_rename, always_skip, resolver_for, spawn_backup, verify_tree,
    BackupRequest, RestoreEngine,
};
use dotvault_tests::test_utils::{file_names, snapshot, TestDataPattern, TestHome};
use dotvault_types::{
    ArchiveFormat, BackupOptions, Cancellable, ConflictPolicy, ConflictResolution, EngineState,
    ProgressStatus, RestoreOptions,
};
use rstest::rstest;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn dotfiles(home: &TestHome) -> std::io::Result<()> {
    home.write(".bashrc", b"alias ll='ls -la'\n")?;
    home.write(".config/nvim/init.vim", b"set number\n")?;
    home.write(".config/nvim/lua/plugins.lua", b"return {}\n")?;
    home.write_pattern(".config/git/config", 4096, TestDataPattern::Text)?;
    home.write_pattern(".local/share/fonts/icons.bin", 20_000, TestDataPattern::Binary)?;
    Ok(())
}

fn plain_options() -> BackupOptions {
    BackupOptions::default()
        .with_exclude_patterns(["*.log"])
        .with_timestamp_subfolder(false)
}

#[test]
fn test_example_scenario() -> TestResult {
    let home = TestHome::new()?;
    let out = TempDir::new()?;
    home.write_pattern(".config/app/config.json", 50, TestDataPattern::Text)?;
    let log = home.write_pattern(".config/app/app.log", 20, TestDataPattern::Text)?;

    let entries = vec![home.entry(".config/app")];
    assert_eq!(entries[0].size_bytes, 70);

    let result = home.engine().backup(&entries, out.path(), &plain_options(), |_| {});

    assert!(result.success);
    assert_eq!(result.total_files, 1);
    assert_eq!(result.total_bytes, 50);
    assert_eq!(result.skipped_files, vec![log.display().to_string()]);
    assert_eq!(file_names(out.path()), vec![".config/app/config.json".to_string()]);
    Ok(())
}

#[rstest]
#[case::zip(ArchiveFormat::Zip, "dots.zip")]
#[case::tar_gz(ArchiveFormat::TarGz, "dots.tar.gz")]
fn test_archive_round_trip(#[case] format: ArchiveFormat, #[case] file_name: &str) -> TestResult {
    let home = TestHome::new()?;
    dotfiles(&home)?;
    let out = TempDir::new()?;
    let restored = TempDir::new()?;

    let entries = vec![
        home.entry(".bashrc"),
        home.entry(".config"),
        home.entry(".local/share/fonts"),
    ];
    let options = plain_options().compressed(format);
    let result = home
        .engine()
        .backup(&entries, &out.path().join("dots"), &options, |_| {});

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.output_path, out.path().join(file_name));
    assert_eq!(result.total_files, 5);

    let restore = RestoreEngine::new().restore(
        &result.output_path,
        restored.path(),
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );

    assert!(restore.success, "{:?}", restore.errors);
    assert_eq!(restore.restored_files, 5);
    assert_eq!(snapshot(restored.path()), snapshot(home.path()));
    Ok(())
}

#[test]
fn test_tree_round_trip_verifies_clean() -> TestResult {
    let home = TestHome::new()?;
    dotfiles(&home)?;
    let out = TempDir::new()?;
    let restored = TempDir::new()?;

    let entries = vec![home.entry(".bashrc"), home.entry(".config")];
    let result = home
        .engine()
        .backup(&entries, out.path(), &BackupOptions::default(), |_| {});
    assert!(result.success);

    // Default options put the copy in a timestamped folder
    let folder = result.output_path.clone();
    assert_ne!(folder, out.path());
    assert!(folder.starts_with(out.path()));

    RestoreEngine::new().restore(
        &folder,
        restored.path(),
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );

    let report = verify_tree(&folder, restored.path())?;
    assert!(report.is_clean());
    assert_eq!(report.matched.len(), 4);
    Ok(())
}

#[test]
fn test_long_names_survive_tar_gz() -> TestResult {
    let home = TestHome::new()?;
    let deep = format!(".config/{}/{}.toml", "nested".repeat(12), "settings".repeat(8));
    assert!(deep.len() > 100);
    home.write(&deep, b"key = 1\n")?;
    let out = TempDir::new()?;
    let restored = TempDir::new()?;

    let options = plain_options().compressed(ArchiveFormat::TarGz);
    let result = home
        .engine()
        .backup(&[home.entry(".config")], &out.path().join("long"), &options, |_| {});
    assert!(result.success);

    RestoreEngine::new().restore(
        &result.output_path,
        restored.path(),
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );
    assert_eq!(fs::read(restored.path().join(&deep))?, b"key = 1\n");
    Ok(())
}

#[cfg(unix)]
#[rstest]
#[case::plain(None)]
#[case::zip(Some(ArchiveFormat::Zip))]
#[case::tar_gz(Some(ArchiveFormat::TarGz))]
fn test_permissions_round_trip(#[case] format: Option<ArchiveFormat>) -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let home = TestHome::new()?;
    let key = home.write(".ssh/id_ed25519", b"PRIVATE")?;
    fs::set_permissions(&key, fs::Permissions::from_mode(0o600))?;
    let script = home.write(".local/bin/hello", b"#!/bin/sh\necho hi\n")?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let out = TempDir::new()?;
    let restored = TempDir::new()?;
    let mut options = plain_options();
    if let Some(format) = format {
        options = options.compressed(format);
    }

    let entries = vec![home.entry(".ssh"), home.entry(".local/bin")];
    let result = home
        .engine()
        .backup(&entries, &out.path().join("perm"), &options, |_| {});
    assert!(result.success, "{:?}", result.errors);

    RestoreEngine::new().restore(
        &result.output_path,
        restored.path(),
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );

    let mode = |path: &Path| fs::metadata(path).map(|m| m.permissions().mode() & 0o777);
    assert_eq!(mode(&restored.path().join(".ssh/id_ed25519"))?, 0o600);
    assert_eq!(mode(&restored.path().join(".local/bin/hello"))?, 0o755);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_read_only_dotfile_survives_repeated_runs() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let home = TestHome::new()?;
    let netrc = home.write(".netrc", b"machine example login me")?;
    fs::set_permissions(&netrc, fs::Permissions::from_mode(0o444))?;
    let out = TempDir::new()?;
    let restored = TempDir::new()?;
    let engine = home.engine();

    for _ in 0..2 {
        let plain = engine.backup(&[home.entry(".netrc")], out.path(), &plain_options(), |_| {});
        assert!(plain.errors.is_empty(), "{:?}", plain.errors);
    }

    let options = plain_options().compressed(ArchiveFormat::Zip);
    let archive = engine.backup(&[home.entry(".netrc")], &out.path().join("dots"), &options, |_| {});
    let restore = RestoreEngine::new();
    for _ in 0..2 {
        let result = restore.restore(
            &archive.output_path,
            restored.path(),
            &RestoreOptions::default(),
            &always_overwrite(),
            |_| {},
        );
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.restored_files, 1);
    }

    assert_eq!(fs::read(restored.path().join(".netrc"))?, b"machine example login me");
    Ok(())
}

#[rstest]
#[case(ConflictPolicy::Overwrite, b"backup", false)]
#[case(ConflictPolicy::Skip, b"live", false)]
#[case(ConflictPolicy::Rename, b"backup", true)]
fn test_conflict_policies(
    #[case] policy: ConflictPolicy,
    #[case] expected: &[u8],
    #[case] renamed: bool,
) -> TestResult {
    let home = TestHome::new()?;
    home.write(".gitconfig", b"backup")?;
    let out = TempDir::new()?;
    let target = TempDir::new()?;
    fs::write(target.path().join(".gitconfig"), b"live")?;

    let result = home
        .engine()
        .backup(&[home.entry(".gitconfig")], out.path(), &plain_options(), |_| {});
    assert!(result.success);

    let resolver = resolver_for(policy);
    let restore = RestoreEngine::new().restore(
        &result.output_path,
        target.path(),
        &RestoreOptions::default(),
        resolver.as_ref(),
        |_| {},
    );

    assert_eq!(restore.conflicts.len(), 1);
    assert_eq!(fs::read(target.path().join(".gitconfig"))?, expected);
    assert_eq!(target.path().join(".gitconfig.bak").exists(), renamed);
    Ok(())
}

#[test]
fn test_mixed_resolutions_are_recorded() -> TestResult {
    let home = TestHome::new()?;
    for name in [".a", ".b", ".c"] {
        home.write(name, b"new")?;
    }
    let out = TempDir::new()?;
    let target = TempDir::new()?;
    for name in [".a", ".b"] {
        fs::write(target.path().join(name), b"old")?;
    }

    let entries: Vec<_> = [".a", ".b", ".c"].iter().map(|n| home.entry(n)).collect();
    let result = home.engine().backup(&entries, out.path(), &plain_options(), |_| {});

    let resolver = |info: &dotvault_types::ConflictInfo| {
        if info.destination_path.ends_with(".a") {
            ConflictResolution::Skip
        } else {
            ConflictResolution::Rename
        }
    };
    let mut statuses = Vec::new();
    let restore = RestoreEngine::new().restore(
        &result.output_path,
        target.path(),
        &RestoreOptions::default(),
        &resolver,
        |event| statuses.push(event.status),
    );

    assert!(restore.success);
    assert_eq!(restore.restored_files, 2);
    assert_eq!(restore.skipped_files, 1);
    assert_eq!(restore.warnings.len(), 1);
    let resolutions: Vec<_> = restore.conflicts.iter().map(|c| c.resolution).collect();
    assert_eq!(
        resolutions,
        vec![Some(ConflictResolution::Skip), Some(ConflictResolution::Rename)]
    );
    assert_eq!(
        statuses,
        vec![ProgressStatus::Skipped, ProgressStatus::Restored, ProgressStatus::Restored]
    );
    Ok(())
}

#[test]
fn test_skip_policy_twice_leaves_target_unchanged() -> TestResult {
    let home = TestHome::new()?;
    dotfiles(&home)?;
    let out = TempDir::new()?;
    let target = TempDir::new()?;

    let result = home
        .engine()
        .backup(&[home.entry(".config")], out.path(), &plain_options(), |_| {});

    let engine = RestoreEngine::new();
    let first = engine.restore(
        &result.output_path,
        target.path(),
        &RestoreOptions::default(),
        &always_skip(),
        |_| {},
    );
    let before = snapshot(target.path());
    let second = engine.restore(
        &result.output_path,
        target.path(),
        &RestoreOptions::default(),
        &always_skip(),
        |_| {},
    );

    assert_eq!(first.restored_files, 3);
    assert_eq!(second.restored_files, 0);
    assert_eq!(second.skipped_files, 3);
    assert!(second.success);
    assert_eq!(second.conflicts.len(), 3);
    assert!(second
        .conflicts
        .iter()
        .all(|c| c.resolution == Some(ConflictResolution::Skip)));
    assert_eq!(snapshot(target.path()), before);
    Ok(())
}

#[test]
fn test_rename_twice_keeps_latest_aside() -> TestResult {
    let home = TestHome::new()?;
    home.write(".zshrc", b"v2")?;
    let out = TempDir::new()?;
    let target = TempDir::new()?;
    fs::write(target.path().join(".zshrc"), b"v1")?;

    let result = home
        .engine()
        .backup(&[home.entry(".zshrc")], out.path(), &plain_options(), |_| {});
    let engine = RestoreEngine::new();
    for _ in 0..2 {
        engine.restore(
            &result.output_path,
            target.path(),
            &RestoreOptions::default(),
            &always_rename(),
            |_| {},
        );
    }

    assert_eq!(fs::read(target.path().join(".zshrc"))?, b"v2");
    assert_eq!(fs::read(target.path().join(".zshrc.bak"))?, b"v2");
    Ok(())
}

#[test]
fn test_unsafe_archive_entries_are_rejected() -> TestResult {
    use dotvault_archive::create_archive_writer;
    use dotvault_types::ArchiveEntryRecord;

    let dir = TempDir::new()?;
    let archive = dir.path().join("evil.zip");
    let mut writer = create_archive_writer(ArchiveFormat::Zip, &archive, false)?;
    for name in ["../escape.txt", ".bashrc"] {
        let record = ArchiveEntryRecord {
            relative_path: name.to_string(),
            source_absolute_path: dir.path().join(name),
            size_bytes: 2,
            permission_bits: None,
            modified: None,
            is_directory: false,
        };
        writer.add_entry(&record, &mut &b"hi"[..])?;
    }
    writer.finalize()?;

    let target = dir.path().join("restore");
    let restore = RestoreEngine::new().restore(
        &archive,
        &target,
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );

    assert_eq!(restore.restored_files, 1);
    assert_eq!(restore.errors.len(), 1);
    assert!(restore.errors[0].contains("Unsafe entry path: ../escape.txt"));
    assert!(restore.success);
    assert!(!dir.path().join("escape.txt").exists());
    Ok(())
}

#[test]
fn test_corrupt_archive_fails() -> TestResult {
    let dir = TempDir::new()?;
    let archive = dir.path().join("broken.tar.gz");
    fs::write(&archive, b"this is not gzip")?;

    let restore = RestoreEngine::new().restore(
        &archive,
        &dir.path().join("out"),
        &RestoreOptions::default(),
        &always_overwrite(),
        |_| {},
    );
    assert!(!restore.success);
    assert_eq!(restore.restored_files, 0);
    Ok(())
}

#[test]
fn test_cancellation_from_another_thread() -> TestResult {
    let home = TestHome::new()?;
    for i in 0..200 {
        home.write(&format!(".config/many/file{:03}", i), b"x")?;
    }
    let out = TempDir::new()?;

    let engine = Arc::new(home.engine());
    let token = engine.cancellation_token();
    let request = BackupRequest::new(vec![home.entry(".config/many")], out.path())
        .with_options(plain_options());

    let watched = Arc::clone(&engine);
    let worker = spawn_backup(engine, request, move |event| {
        if event.files_processed == 5 {
            token.cancel();
        }
    })?;
    let result = worker.join()?;

    assert_eq!(result.total_files, 5);
    assert!(result.errors.is_empty());
    assert_eq!(watched.state(), EngineState::Cancelled);
    assert_eq!(file_names(out.path()).len(), 5);
    Ok(())
}

#[test]
fn test_engine_runs_again_after_cancel() -> TestResult {
    let home = TestHome::new()?;
    home.write(".bashrc", b"x")?;
    let engine = home.engine();

    engine.cancel();
    let out = TempDir::new()?;
    let result = engine.backup(&[home.entry(".bashrc")], out.path(), &plain_options(), |_| {});

    assert_eq!(result.total_files, 1);
    assert_eq!(engine.state(), EngineState::Completed);
    Ok(())
}

#[test]
fn test_partial_failure_is_success() -> TestResult {
    let home = TestHome::new()?;
    home.write(".bashrc", b"ok")?;
    let out = TempDir::new()?;
    let mut vanished = home.entry(".bashrc");
    vanished.path = "~/.vanished".to_string();

    let entries = vec![home.entry(".bashrc"), vanished];
    let result = home.engine().backup(&entries, out.path(), &plain_options(), |_| {});

    assert!(result.success);
    assert_eq!(result.total_files, 1);
    assert_eq!(result.errors.len(), 1);
    Ok(())
}

#[test]
fn test_settings_drive_backup_options() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("dotvault.yaml");
    fs::write(
        &path,
        "backup:\n  compress: true\n  archive_format: tar_gz\n  exclude_patterns: ['*.bin']\n",
    )?;
    let settings = SettingsBuilder::new().add_source_file(&path).build()?;

    let home = TestHome::new()?;
    dotfiles(&home)?;
    let out = TempDir::new()?;
    let result = home.engine().backup(
        &[home.entry(".local")],
        &out.path().join("fonts"),
        &settings.backup_options(),
        |_| {},
    );

    assert_eq!(result.output_path, out.path().join("fonts.tar.gz"));
    assert_eq!(result.total_files, 0);
    assert_eq!(result.skipped_files.len(), 1);
    Ok(())
}

#[test]
fn test_generated_settings_load_back() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    SettingsLoader::generate_default(&path)?;

    let settings = SettingsLoader::load_from_file(&path)?;
    assert_eq!(settings.restore.conflict_policy, ConflictPolicy::Overwrite);
    assert_eq!(settings.backup_options(), BackupOptions::default());
    Ok(())
}

mod properties {
    use dotvault_archive::sanitize_entry_name;
    use dotvault_engine::{matches_glob, should_skip};
    use dotvault_types::BackupOptions;
    use proptest::prelude::*;
    use std::path::{Component, Path};

    proptest! {
        #[test]
        fn sanitized_names_stay_below_root(name in "[a-z./\\\\]{0,24}") {
            if let Ok(relative) = sanitize_entry_name(&name) {
                prop_assert!(relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))));
            }
        }

        #[test]
        fn literal_globs_match_themselves(name in "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,15}") {
            prop_assert!(matches_glob(Path::new(&name), &name));
        }

        #[test]
        fn suffix_patterns_skip_matching_files(stem in "[a-z]{1,12}") {
            let options = BackupOptions::default().with_exclude_patterns(["*.log"]);
            let logged = format!("/home/u/.cache/{}.log", stem);
            let kept = format!("/home/u/.cache/{}.json", stem);
            prop_assert!(should_skip(Path::new(&logged), &options));
            prop_assert!(!should_skip(Path::new(&kept), &options));
        }
    }
}
