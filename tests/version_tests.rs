mod common;

use anyhow::Result;
use common::TestProject;
use std::fs;
use treelens::fs::LocalFs;
use treelens::versions::VersionManager;
use treelens::{METADATA_DIR, VERSION_DESCRIPTOR};

fn no_progress() -> impl FnMut(u8) {
    |_| {}
}

#[test]
fn test_restore_round_trip() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    project.write("B.md", "# b")?;
    project.write("src/lib.rs", "pub fn f() {}\n")?;
    project.write("assets/logo.png", [0x89u8, b'P', b'N', b'G', 0, 1])?;
    let before = project.files();

    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    let id = manager.create_backup(&fs, "v1", &mut no_progress())?;

    project.write("A-new.txt", "added after backup")?;
    project.remove("B.md")?;
    project.write("src/lib.rs", "pub fn g() {}\n")?;
    project.write("src/extra/deep.rs", "")?;

    manager.restore(&fs, &id, &mut no_progress())?;

    assert_eq!(project.files(), before);
    assert!(!project.path().join("src/extra").exists());
    Ok(())
}

#[test]
fn test_restore_leaves_ignored_and_vcs_paths() -> Result<()> {
    let project = TestProject::new()?;
    project.write(".gitignore", "target/\n")?;
    project.write("main.rs", "fn main() {}")?;
    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    let id = manager.create_backup(&fs, "clean", &mut no_progress())?;

    project.write("target/debug/app", "binary")?;
    project.write(".git/HEAD", "ref: refs/heads/main")?;

    manager.restore(&fs, &id, &mut no_progress())?;

    assert_eq!(project.read("target/debug/app")?, b"binary");
    assert_eq!(project.read(".git/HEAD")?, b"ref: refs/heads/main");
    Ok(())
}

#[test]
fn test_restore_keeps_ignored_files_in_new_directories() -> Result<()> {
    let project = TestProject::new()?;
    project.write(".gitignore", "*.log\n")?;
    project.write("a.txt", "alpha")?;
    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    let id = manager.create_backup(&fs, "clean", &mut no_progress())?;

    project.write("newdir/keep.log", "ignored")?;
    project.write("newdir/x.txt", "included")?;
    project.write("vendor/lib/.git/HEAD", "ref: refs/heads/main")?;

    let summary = manager.restore(&fs, &id, &mut no_progress())?;

    assert_eq!(project.read("newdir/keep.log")?, b"ignored");
    assert_eq!(project.read("vendor/lib/.git/HEAD")?, b"ref: refs/heads/main");
    assert!(!project.path().join("newdir/x.txt").exists());
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failed, 0);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_restore_preserves_executable_bit() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new()?;
    project.write("run.sh", "#!/bin/sh\necho hi\n")?;
    project.write("notes.txt", "plain")?;
    let script = project.path().join("run.sh");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;
    let notes = project.path().join("notes.txt");
    let notes_mode = fs::metadata(&notes)?.permissions().mode();

    let local = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    let id = manager.create_backup(&local, "modes", &mut no_progress())?;

    fs::set_permissions(&script, fs::Permissions::from_mode(0o600))?;
    project.remove("notes.txt")?;
    manager.restore(&local, &id, &mut no_progress())?;

    assert_eq!(fs::metadata(&script)?.permissions().mode() & 0o777, 0o755);
    assert_eq!(fs::metadata(&notes)?.permissions().mode(), notes_mode);
    Ok(())
}

#[test]
fn test_backup_layout() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    project.write(".git/config", "[core]")?;
    let fs = LocalFs::new(project.path())?;

    let id = VersionManager::default().create_backup(&fs, "layout", &mut no_progress())?;

    let version_dir = project.path().join(METADATA_DIR).join(&id);
    assert_eq!(fs::read(version_dir.join("a.txt"))?, b"alpha");
    assert!(!version_dir.join(".git").exists());

    let descriptor: serde_json::Value =
        serde_json::from_slice(&fs::read(version_dir.join(VERSION_DESCRIPTOR))?)?;
    assert_eq!(descriptor["versionTitle"], "layout");
    assert!(descriptor["backupTime"].is_string());
    Ok(())
}

#[test]
fn test_three_backups_listed_newest_first() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();

    let ids = [
        manager.create_backup(&fs, "first", &mut no_progress())?,
        manager.create_backup(&fs, "second", &mut no_progress())?,
        manager.create_backup(&fs, "third", &mut no_progress())?,
    ];

    let versions = manager.list_versions(&fs)?;

    let titles: Vec<&str> = versions.iter().map(|v| v.version_title.as_str()).collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
    assert!(
        versions
            .windows(2)
            .all(|w| w[0].backup_time > w[1].backup_time)
    );
    assert_eq!(versions[0].folder_name, ids[2]);
    Ok(())
}

#[test]
fn test_corrupt_descriptor_is_skipped() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    manager.create_backup(&fs, "good", &mut no_progress())?;

    project.write(
        &format!("{METADATA_DIR}/2001-01-01_00-00-00/{VERSION_DESCRIPTOR}"),
        "not json",
    )?;

    let versions = manager.list_versions(&fs)?;

    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_title, "good");
    Ok(())
}

#[test]
fn test_delete_version() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    let fs = LocalFs::new(project.path())?;
    let manager = VersionManager::default();
    let keep = manager.create_backup(&fs, "keep", &mut no_progress())?;
    let drop = manager.create_backup(&fs, "drop", &mut no_progress())?;

    manager.delete_version(&fs, &drop)?;

    let versions = manager.list_versions(&fs)?;
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].folder_name, keep);
    assert!(manager.delete_version(&fs, &drop).is_err());
    assert!(manager.delete_version(&fs, "../outside").is_err());
    Ok(())
}

#[test]
fn test_workspace_restore_round_trip() -> Result<()> {
    let project = TestProject::new()?;
    project.write("a.txt", "alpha")?;
    project.write("b.txt", "beta")?;
    let before = project.files();
    let workspace = project.workspace()?;
    workspace.refresh();

    let id = workspace.create_backup("v1", &mut no_progress())?;
    project.write("c.txt", "gamma")?;
    project.remove("b.txt")?;

    let mut seen = Vec::new();
    let summary = workspace.restore(&id, &mut |pct: u8| seen.push(pct))?;

    assert_eq!(project.files(), before);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(workspace.refresh().is_empty());
    Ok(())
}
