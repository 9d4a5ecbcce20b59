use super::*;

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

fn props(log: &str) -> PropertyList {
    let mut p = PropertyList::new();
    p.set("svn:log", log.as_bytes().to_vec());
    p
}

fn seed_packed_shard(layout: &Layout, store: &RevpropStore, entries: Vec<PropertyList>) {
    let manifest = Manifest(vec![ManifestEntry {
        first_revision: 0,
        count: entries.len() as u64,
        seq: 0,
    }]);
    store.save_manifest(0, &manifest).unwrap();
    store
        .save_pack(0, 0, 0, &PackFile::new(0, entries))
        .unwrap();
    let _ = layout;
}

#[test]
fn test_read_unpacked_dispatch() {
    let dir = tempdir::TempDir::new("revprops_mod_unpacked");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 1 << 20, false);

    unpacked::write(&layout, 10, &props("hi")).unwrap();
    let read_back = store.read(10, 5).unwrap();
    assert_eq!(read_back, props("hi"));
}

#[test]
fn test_read_packed_dispatch() {
    let dir = tempdir::TempDir::new("revprops_mod_packed_read");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 1 << 20, false);
    seed_packed_shard(&layout, &store, vec![props("a"), props("b"), props("c")]);

    assert_eq!(store.read(0, 10).unwrap(), props("a"));
    assert_eq!(store.read(2, 10).unwrap(), props("c"));
}

#[test]
fn test_read_packed_missing_revision_fails() {
    let dir = tempdir::TempDir::new("revprops_mod_packed_missing");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 1 << 20, false);
    seed_packed_shard(&layout, &store, vec![props("a")]);

    assert!(store.read(99, 10).is_err());
}

#[test]
fn test_write_packed_without_split() {
    let dir = tempdir::TempDir::new("revprops_mod_packed_write_nosplit");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 1 << 20, false);
    seed_packed_shard(&layout, &store, vec![props("a"), props("b"), props("c")]);

    store.write_packed(1, &props("updated")).unwrap();
    assert_eq!(store.read(1, 10).unwrap(), props("updated"));
    assert_eq!(store.read(0, 10).unwrap(), props("a"));
    assert_eq!(store.read(2, 10).unwrap(), props("c"));

    let manifest = store.load_manifest(0).unwrap();
    assert_eq!(manifest.0.len(), 1);
}

#[test]
fn test_write_packed_splits_when_over_threshold() {
    let dir = tempdir::TempDir::new("revprops_mod_packed_write_split");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 16, false);
    seed_packed_shard(&layout, &store, vec![props("a"), props("b"), props("c")]);

    store.write_packed(1, &props("a much longer value that forces a split")).unwrap();

    let manifest = store.load_manifest(0).unwrap();
    assert_eq!(manifest.0.len(), 3);

    assert_eq!(store.read(0, 10).unwrap(), props("a"));
    assert_eq!(
        store.read(1, 10).unwrap(),
        props("a much longer value that forces a split")
    );
    assert_eq!(store.read(2, 10).unwrap(), props("c"));
}

#[test]
fn test_pack_shard_builds_manifest_from_unpacked_files() {
    let dir = tempdir::TempDir::new("revprops_mod_pack_shard");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 1 << 20, false);

    unpacked::write(&layout, 0, &props("a")).unwrap();
    unpacked::write(&layout, 1, &props("b")).unwrap();
    unpacked::write(&layout, 2, &props("c")).unwrap();

    store.pack_shard(0, 0, 2).unwrap();

    let manifest = store.load_manifest(0).unwrap();
    assert_eq!(manifest.0.len(), 1);
    assert_eq!(store.read(0, 0).unwrap(), props("a"));
    assert_eq!(store.read(1, 0).unwrap(), props("b"));
    assert_eq!(store.read(2, 0).unwrap(), props("c"));
}

#[test]
fn test_pack_shard_splits_when_over_threshold() {
    let dir = tempdir::TempDir::new("revprops_mod_pack_shard_split");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 16, false);

    unpacked::write(&layout, 0, &props("a")).unwrap();
    unpacked::write(&layout, 1, &props("a much longer value that forces a split")).unwrap();
    unpacked::write(&layout, 2, &props("c")).unwrap();

    store.pack_shard(0, 0, 2).unwrap();

    let manifest = store.load_manifest(0).unwrap();
    assert!(manifest.0.len() >= 2);
    assert_eq!(store.read(0, 0).unwrap(), props("a"));
    assert_eq!(
        store.read(1, 0).unwrap(),
        props("a much longer value that forces a split")
    );
    assert_eq!(store.read(2, 0).unwrap(), props("c"));
}

#[test]
fn test_write_packed_splits_first_revision_has_no_before_piece() {
    let dir = tempdir::TempDir::new("revprops_mod_packed_write_split_first");
    let layout = Layout::new(dir.0.clone(), 1000);
    let store = RevpropStore::new(&layout, 16, false);
    seed_packed_shard(&layout, &store, vec![props("a"), props("b")]);

    store.write_packed(0, &props("a much longer value that forces a split")).unwrap();

    let manifest = store.load_manifest(0).unwrap();
    assert_eq!(manifest.0.len(), 2);
    assert_eq!(store.read(0, 10).unwrap(), props("a much longer value that forces a split"));
    assert_eq!(store.read(1, 10).unwrap(), props("b"));
}
