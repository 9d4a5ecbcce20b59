//! Classify and order steps of the pack engine (spec.md §4.7 steps 2-3).

use std::collections::{HashMap, HashSet};

use crate::{
    item::{DirEntries, ItemCodec, ItemKind, ItemRef, NodeRevision, Representation, ROOT_NODE_ITEM},
    layout::Revision,
    Result,
};

use super::PlannedItem;

/// All items of a shard, addressable by their original (revision,
/// item-number) identity. Item identity never changes across a pack — only
/// the byte offset it is emitted at — so this map is the engine's only
/// view of "where is item X's content".
pub struct ItemMap<'a> {
    items: HashMap<ItemRef, &'a PlannedItem>,
}

impl<'a> ItemMap<'a> {
    pub fn build(shard: &'a [super::RevisionItems]) -> ItemMap<'a> {
        let mut items = HashMap::new();
        for rev in shard.iter() {
            for item in rev.items.iter() {
                items.insert(ItemRef::new(rev.revision, item.item_number), item);
            }
        }
        ItemMap { items }
    }

    pub fn get(&self, item_ref: ItemRef) -> Option<&'a PlannedItem> {
        self.items.get(&item_ref).copied()
    }
}

#[derive(Default)]
pub struct Classified {
    pub changes: Vec<ItemRef>,
    pub file_props: Vec<ItemRef>,
    pub dir_props: Vec<ItemRef>,
    pub reps_and_noderevs: Vec<ItemRef>,
}

/// Step 2: bucket every item by its P2L type (spec.md §4.7 "Classify").
pub fn classify(shard: &[super::RevisionItems]) -> Classified {
    let mut classified = Classified::default();
    for rev in shard.iter() {
        for item in rev.items.iter() {
            let item_ref = ItemRef::new(rev.revision, item.item_number);
            match item.item_type {
                ItemKind::ChangedPaths => classified.changes.push(item_ref),
                ItemKind::FileProps => classified.file_props.push(item_ref),
                ItemKind::DirProps => classified.dir_props.push(item_ref),
                ItemKind::FileRep | ItemKind::DirRep | ItemKind::GenericRep | ItemKind::NodeRev => {
                    classified.reps_and_noderevs.push(item_ref)
                }
                ItemKind::Unused => {}
            }
        }
    }
    classified
}

/// Step 3 (changes/file-props/dir-props): sort by decreasing revision,
/// then increasing item-number.
pub fn order_flat(mut refs: Vec<ItemRef>) -> Vec<ItemRef> {
    refs.sort_by(|a, b| b.revision.cmp(&a.revision).then(a.item_number.cmp(&b.item_number)));
    refs
}

fn decode_noderev(item: &PlannedItem) -> Result<NodeRevision> {
    NodeRevision::read_from(&item.bytes)
}

fn decode_rep(item: &PlannedItem) -> Result<Representation> {
    Representation::read_from(&item.bytes)
}

/// Emit `item_ref` and everything reachable through its data-rep,
/// prop-rep, and predecessor chains, skipping anything already emitted or
/// outside the shard being packed (an external reference means the base
/// lives in an earlier, already-packed shard; the pass-3 sweep picks up
/// whatever this walk could not reach).
fn emit_noderev_chain(item_ref: ItemRef, map: &ItemMap, emitted: &mut HashSet<ItemRef>, order: &mut Vec<ItemRef>) {
    if !emitted.insert(item_ref) {
        return;
    }
    let item = match map.get(item_ref) {
        Some(item) => item,
        None => return,
    };
    order.push(item_ref);

    let noderev = match decode_noderev(item) {
        Ok(nr) => nr,
        Err(_) => return,
    };
    if let Some(data_rep) = noderev.data_rep {
        emit_rep_chain(data_rep, map, emitted, order);
    }
    if let Some(prop_rep) = noderev.prop_rep {
        emit_rep_chain(prop_rep, map, emitted, order);
    }
    if let Some(predecessor) = noderev.predecessor {
        emit_noderev_chain(predecessor, map, emitted, order);
    }
}

fn emit_rep_chain(item_ref: ItemRef, map: &ItemMap, emitted: &mut HashSet<ItemRef>, order: &mut Vec<ItemRef>) {
    if !emitted.insert(item_ref) {
        return;
    }
    let item = match map.get(item_ref) {
        Some(item) => item,
        None => return,
    };
    order.push(item_ref);

    if let Ok(rep) = decode_rep(item) {
        if let Some(base) = rep.base {
            emit_rep_chain(base, map, emitted, order);
        }
    }
}

/// Reconstruct a directory rep's bytes, resolving delta bases only within
/// this shard (an out-of-shard base means the directory's history reaches
/// into an already-packed predecessor; that base is left untouched and its
/// descendants fall through to the pass-3 sweep).
fn reconstruct_dir_entries(rep_ref: ItemRef, map: &ItemMap) -> Option<DirEntries> {
    let rep = decode_rep(map.get(rep_ref)?).ok()?;
    let mut resolve = |item_ref: ItemRef| -> Result<Representation> {
        let item = map
            .get(item_ref)
            .ok_or_else(|| crate::Error::CorruptRevFile("pack order: delta base outside shard".into()))?;
        decode_rep(item)
    };
    let bytes = crate::item::reconstruct(&rep, &mut resolve).ok()?;
    DirEntries::read_from(&bytes).ok()
}

/// Step 3 (reps/node-revs): two-pass topological placement, then a sweep
/// for anything left over (spec.md §4.7 "Order").
pub fn order_reps_and_noderevs(shard: &[super::RevisionItems], map: &ItemMap, candidates: &[ItemRef]) -> Vec<ItemRef> {
    let candidate_set: HashSet<ItemRef> = candidates.iter().copied().collect();
    let mut emitted = HashSet::new();
    let mut order = vec![];

    // Pass 1: roots and their ancestor delta chains, latest revision first.
    let mut revisions: Vec<Revision> = shard.iter().map(|r| r.revision).collect();
    revisions.sort_unstable_by(|a, b| b.cmp(a));
    let mut roots = vec![];
    for revision in revisions.iter() {
        let root_ref = ItemRef::new(*revision, ROOT_NODE_ITEM);
        if map.get(root_ref).is_some() {
            roots.push(root_ref);
            emit_noderev_chain(root_ref, map, &mut emitted, &mut order);
        }
    }

    // Pass 2: walk each emitted directory's entries, recursively emitting
    // referenced node-revisions and their rep chains.
    let mut worklist = roots;
    while let Some(dir_ref) = worklist.pop() {
        let noderev = match map.get(dir_ref).and_then(|item| decode_noderev(item).ok()) {
            Some(nr) => nr,
            None => continue,
        };
        let data_rep = match noderev.data_rep {
            Some(r) => r,
            None => continue,
        };
        let entries = match reconstruct_dir_entries(data_rep, map) {
            Some(entries) => entries,
            None => continue,
        };
        for entry in entries.0.iter() {
            if candidate_set.contains(&entry.node) && !emitted.contains(&entry.node) {
                emit_noderev_chain(entry.node, map, &mut emitted, &mut order);
                worklist.push(entry.node);
            }
        }
    }

    // Pass 3: sweep anything not yet emitted, in the flat decreasing-revision
    // order used for the other classes.
    let mut remaining: Vec<ItemRef> = candidates.iter().copied().filter(|r| !emitted.contains(r)).collect();
    remaining.sort_by(|a, b| b.revision.cmp(&a.revision).then(a.item_number.cmp(&b.item_number)));
    order.extend(remaining);

    order
}

#[cfg(test)]
#[path = "order_test.rs"]
mod order_test;
