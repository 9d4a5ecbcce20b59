use super::*;

#[test]
fn test_item_kind_round_trip() {
    let kinds = [
        ItemKind::Unused,
        ItemKind::FileRep,
        ItemKind::DirRep,
        ItemKind::FileProps,
        ItemKind::DirProps,
        ItemKind::NodeRev,
        ItemKind::ChangedPaths,
        ItemKind::GenericRep,
    ];
    for kind in kinds.iter() {
        let got = ItemKind::from_u8(kind.to_u8()).unwrap();
        assert_eq!(got, *kind);
    }
}

#[test]
fn test_item_kind_from_u8_rejects_unknown() {
    assert!(ItemKind::from_u8(8).is_err());
    assert!(ItemKind::from_u8(255).is_err());
}

#[test]
fn test_item_ref_display() {
    let item_ref = ItemRef::new(42, CHANGED_PATHS_ITEM);
    assert_eq!(format!("{}", item_ref), "(42, 1)");
}

#[test]
fn test_reserved_item_numbers() {
    assert_eq!(CHANGED_PATHS_ITEM, 1);
    assert_eq!(ROOT_NODE_ITEM, 2);
}

#[test]
fn test_item_ref_ordering() {
    let a = ItemRef::new(1, 5);
    let b = ItemRef::new(1, 6);
    let c = ItemRef::new(2, 0);
    assert!(a < b);
    assert!(b < c);
}
