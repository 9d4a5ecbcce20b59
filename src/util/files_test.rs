use std::{ffi::OsString, fs, path::PathBuf};

use super::*;

fn temp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "fsfs-core-test-{}-{}-{:?}",
        std::process::id(),
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    p
}

#[test]
fn test_create_file_a_creates_parent_dirs() {
    let mut dir = temp_path("create-parent");
    dir.push("nested");
    dir.push("file.dat");

    let fd = create_file_a(dir.as_os_str());
    assert!(fd.is_ok());
    assert!(dir.exists());

    fs::remove_dir_all(dir.parent().unwrap().parent().unwrap()).ok();
}

#[test]
fn test_create_file_a_rejects_existing_file() {
    let path = temp_path("create-twice");
    create_file_a(path.as_os_str()).unwrap();
    assert!(create_file_a(path.as_os_str()).is_err());
    fs::remove_file(&path).ok();
}

#[test]
fn test_write_atomic_replaces_existing_contents() {
    let path = temp_path("atomic");
    write_atomic(path.as_os_str(), b"first").unwrap();
    write_atomic(path.as_os_str(), b"second-longer-payload").unwrap();

    let got = fs::read(&path).unwrap();
    assert_eq!(got, b"second-longer-payload");

    let tmp: OsString = {
        let mut t = path.as_os_str().to_os_string();
        t.push(".tmp");
        t
    };
    assert!(!PathBuf::from(tmp).exists());

    fs::remove_file(&path).ok();
}

#[test]
fn test_remove_if_exists_tolerates_missing_file() {
    let path = temp_path("remove-missing");
    assert!(!path.exists());
    assert!(remove_if_exists(path.as_os_str()).is_ok());
}

#[test]
fn test_remove_if_exists_removes_present_file() {
    let path = temp_path("remove-present");
    fs::write(&path, b"x").unwrap();
    remove_if_exists(path.as_os_str()).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_rename_into_place() {
    let src = temp_path("rename-src");
    let dest = temp_path("rename-dest");

    fs::write(&src, b"payload").unwrap();
    rename_into_place(src.as_os_str(), dest.as_os_str()).unwrap();

    assert!(!src.exists());
    assert_eq!(fs::read(&dest).unwrap(), b"payload");

    fs::remove_file(&dest).ok();
}
