use super::*;

#[test]
fn test_shard_of() {
    assert_eq!(shard_of(0, 1000), 0);
    assert_eq!(shard_of(999, 1000), 0);
    assert_eq!(shard_of(1000, 1000), 1);
    assert_eq!(shard_of(2500, 1000), 2);
}

#[test]
fn test_unpacked_rev_path() {
    let layout = Layout::new("/tmp/repo", 1000);
    assert_eq!(
        layout.unpacked_rev(42),
        std::path::PathBuf::from("/tmp/repo/db/revs/0/42")
    );
    assert_eq!(
        layout.unpacked_rev(1042),
        std::path::PathBuf::from("/tmp/repo/db/revs/1/1042")
    );
}

#[test]
fn test_pack_file_path() {
    let layout = Layout::new("/tmp/repo", 1000);
    assert_eq!(
        layout.pack_file(3),
        std::path::PathBuf::from("/tmp/repo/db/revs/3.pack/pack")
    );
}

#[test]
fn test_revprops_pack_file_naming() {
    let layout = Layout::new("/tmp/repo", 1000);
    let p = layout.revprops_pack_file(0, 0, 1);
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/repo/db/revprops/0.pack/0.1")
    );
}
