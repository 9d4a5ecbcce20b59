use super::*;
use crate::item::PropertyList;

mod tempdir {
    use std::path::PathBuf;

    pub struct TempDir(pub PathBuf);

    impl TempDir {
        pub fn new(tag: &str) -> TempDir {
            let pid = std::process::id();
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos();
            let dir = std::env::temp_dir().join(format!("fsfs-core-{}-{}-{}", tag, pid, nanos));
            std::fs::create_dir_all(&dir).unwrap();
            TempDir(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}

#[test]
fn test_write_then_read_round_trip() {
    let dir = tempdir::TempDir::new("revprops_unpacked_test");
    let layout = Layout::new(dir.0.clone(), 1000);

    let mut props = PropertyList::new();
    props.set("svn:log", b"hello world".to_vec());
    props.set("svn:author", b"bob".to_vec());

    write(&layout, 42, &props).unwrap();
    let read_back = read(&layout, 42).unwrap();
    assert_eq!(read_back, props);
}

#[test]
fn test_read_missing_revision_fails() {
    let dir = tempdir::TempDir::new("revprops_unpacked_missing_test");
    let layout = Layout::new(dir.0.clone(), 1000);
    assert!(read(&layout, 7).is_err());
}

#[test]
fn test_write_overwrites_existing_file() {
    let dir = tempdir::TempDir::new("revprops_unpacked_overwrite_test");
    let layout = Layout::new(dir.0.clone(), 1000);

    let mut first = PropertyList::new();
    first.set("svn:log", b"first".to_vec());
    write(&layout, 1, &first).unwrap();

    let mut second = PropertyList::new();
    second.set("svn:log", b"second".to_vec());
    write(&layout, 1, &second).unwrap();

    assert_eq!(read(&layout, 1).unwrap(), second);
}
