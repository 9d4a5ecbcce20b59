use super::*;
use crate::{item::ItemKind, p2l::P2lEntry, util::fnv};

fn build_consistent_pair() -> (L2pIndex, P2lIndex, Vec<u8>) {
    let items: &[&[u8]] = &[b"changed-paths\n", b"root-node-rev\n"];
    let mut body = vec![];
    let mut p2l = P2lIndex::new(5, 1024);
    let mut offsets = vec![0u64; items.len() + 1];
    for (i, item) in items.iter().enumerate() {
        let item_number = (i + 1) as u64;
        let offset = body.len() as u64;
        body.extend_from_slice(item);
        offsets[item_number as usize] = offset;
        p2l.push(P2lEntry {
            offset,
            size: item.len() as u64,
            item_type: ItemKind::NodeRev,
            revision: 5,
            item_number,
            fnv1a: fnv::fnv1a32(item),
        });
    }
    let mut l2p = L2pIndex::new(5, 16);
    l2p.push_revision(offsets);
    (l2p, p2l, body)
}

#[test]
fn test_cross_reference_clean_on_consistent_pair() {
    let (l2p, p2l, _body) = build_consistent_pair();
    let report = verify_cross_reference(&l2p, &p2l, &|| false);
    assert!(report.is_clean());
    assert_eq!(report.items_checked, 2);
}

#[test]
fn test_cross_reference_detects_l2p_target_mismatch() {
    let (original, p2l, _body) = build_consistent_pair();
    // Corrupt: point item 1 at item 2's offset.
    let item2_offset = original.lookup(5, 2).unwrap();
    let mut l2p = L2pIndex::new(5, 16);
    l2p.push_revision(vec![0, item2_offset, item2_offset]);

    let report = verify_cross_reference(&l2p, &p2l, &|| false);
    assert!(!report.is_clean());
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f, Finding::L2pTargetMismatch { item_number: 1, .. })));
}

#[test]
fn test_cross_reference_detects_p2l_backreference_mismatch() {
    let (l2p, mut p2l, _body) = build_consistent_pair();
    let mut corrupted = P2lIndex::new(5, 1024);
    for block_idx in 0..p2l.block_count() {
        for entry in p2l.entries_in_block(block_idx).to_vec() {
            let mut e = entry;
            if e.item_number == 2 {
                e.item_number = 1;
            }
            corrupted.push(e);
        }
    }
    p2l = corrupted;

    let report = verify_cross_reference(&l2p, &p2l, &|| false);
    assert!(!report.is_clean());
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f, Finding::P2lBackreferenceMismatch { .. })));
}

#[test]
fn test_verify_checksums_clean_on_correct_bytes() {
    let (_l2p, p2l, body) = build_consistent_pair();
    let report = verify_checksums(
        &p2l,
        &mut |offset, size| Ok(body[offset as usize..(offset + size) as usize].to_vec()),
        &|| false,
    )
    .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.items_checked, 2);
}

#[test]
fn test_verify_checksums_detects_corrupted_bytes() {
    let (_l2p, p2l, mut body) = build_consistent_pair();
    body[0] ^= 0xff;
    let report = verify_checksums(
        &p2l,
        &mut |offset, size| Ok(body[offset as usize..(offset + size) as usize].to_vec()),
        &|| false,
    )
    .unwrap();
    assert!(!report.is_clean());
    assert!(matches!(report.findings[0], Finding::ChecksumMismatch { .. }));
}

#[test]
fn test_cancel_stops_cross_reference_early() {
    let (l2p, p2l, _body) = build_consistent_pair();
    let report = verify_cross_reference(&l2p, &p2l, &|| true);
    assert_eq!(report.items_checked, 0);
}

#[test]
fn test_dump_index_then_load_index_round_trips() {
    let (l2p, p2l, _body) = build_consistent_pair();
    let text = dump_index(&l2p, &p2l, 4096);

    let loaded = load_index(&text).unwrap();
    assert_eq!(loaded.l2p, l2p);
    assert_eq!(loaded.p2l, p2l);
    assert_eq!(loaded.page_size, 4096);
}

#[test]
fn test_dump_index_round_trip_survives_re_encode() {
    let (l2p, p2l, _body) = build_consistent_pair();
    let text = dump_index(&l2p, &p2l, 4096);
    let loaded = load_index(&text).unwrap();

    assert_eq!(loaded.l2p.encode(4096), l2p.encode(4096));
    assert_eq!(loaded.p2l.encode(), p2l.encode());
}

#[test]
fn test_dump_index_preserves_unused_regions() {
    let (l2p, mut p2l, _body) = build_consistent_pair();
    p2l.push(P2lEntry {
        offset: 4096,
        size: 64,
        item_type: ItemKind::Unused,
        revision: 5,
        item_number: 0,
        fnv1a: 0,
    });

    let text = dump_index(&l2p, &p2l, 4096);
    let loaded = load_index(&text).unwrap();
    assert_eq!(loaded.p2l, p2l);
}

#[test]
fn test_load_index_rejects_missing_header() {
    assert!(load_index("").is_err());
    assert!(load_index("not a header\n").is_err());
}
