//! Crate-level smoke test: exercises the public API end to end, the way a
//! caller outside this crate would — open a fresh repository, write and
//! read revprops through it, then pack a shard and confirm the installed
//! pack file is internally consistent.

use super::*;

mod tempdir {
    use std::path::PathBuf;

    pub struct TempDir(pub PathBuf);

    impl TempDir {
        pub fn new(tag: &str) -> TempDir {
            let dir = std::env::temp_dir().join(format!(
                "fsfs-lib-test-{}-{}-{}",
                tag,
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos()
            ));
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

fn changes_item(revision: Revision) -> crate::pack::PlannedItem {
    crate::pack::PlannedItem {
        item_number: 1,
        item_type: item::ItemKind::ChangedPaths,
        bytes: format!("path: /file-{}\nkind: add\nnode: {} 2\ntext-mod: true\nprops-mod: false\n\n", revision, revision)
            .into_bytes(),
    }
}

fn root_noderev_item(revision: Revision) -> crate::pack::PlannedItem {
    let text = format!(
        "kind: dir\npredecessor-count: 0\ncreated-revision: {}\ncreated-path: /\nmd5: d41d8cd98f00b204e9800998ecf8427e\nsha1: da39a3ee5e6b4b0d3255bfef95601890afd80709\n\n",
        revision
    );
    crate::pack::PlannedItem {
        item_number: 2,
        item_type: item::ItemKind::NodeRev,
        bytes: text.into_bytes(),
    }
}

#[test]
fn test_create_commit_write_revprops_and_pack_a_shard() {
    let tmp = tempdir::TempDir::new("end-to-end");
    // max_files_per_dir=1000 puts revisions 0 and 1 in the same shard as
    // the much later revisions this test doesn't commit; pack the shard
    // containing only what was actually committed.
    let repo = Repository::create(tmp.0.clone(), 1000).unwrap();

    let mut props = item::PropertyList::new();
    props.set("svn:author", b"jrandom".to_vec());
    props.set("svn:log", b"initial import".to_vec());
    repo.write_revprops(0, &props).unwrap();
    assert_eq!(repo.read_revprops(0).unwrap().get("svn:author"), Some(b"jrandom".as_slice()));

    let revision = repo.commit(vec![changes_item(1), root_noderev_item(1)]).unwrap();
    assert_eq!(revision, 1);
    assert_eq!(repo.current_revision().unwrap(), 1);

    let shard_items = vec![
        pack::read_revision_items(repo.layout(), 0).unwrap(),
        pack::read_revision_items(repo.layout(), 1).unwrap(),
    ];
    let packer = pack::Packer::new(4096, 4096, 64);
    repo.pack_shard(0, shard_items, &packer).unwrap();

    assert_eq!(repo.min_unpacked_rev().unwrap(), 1000);
    assert!(!repo.layout().unpacked_rev(0).exists());
    assert!(!repo.layout().unpacked_rev(1).exists());

    let path = repo.layout().pack_file(0);
    let mut file = std::fs::File::open(&path).unwrap();
    let file_len = file.metadata().unwrap().len();
    let reader = revfile::Reader::open(&mut file, file_len, repo.format()).unwrap();
    let (offset, size) = reader.locate(1, 2).unwrap();
    let bytes = revfile::read_item_bytes(&mut file, offset, size).unwrap();
    assert_eq!(bytes, root_noderev_item(1).bytes);
}
