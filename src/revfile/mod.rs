//! Revision File: the container for one unpacked revision or one packed
//! shard (spec.md §4.2).
//!
//! ```text
//! [item 0][item 1]...[item N-1][L2P index][P2L index][footer]
//! ```
//!
//! Both addressing modes share this module: [footer] handles the common
//! trailing line, [Reader] dispatches to logical (index-based) or
//! physical (offset-based) addressing depending on the repository's
//! format number.

mod footer;
mod reader;

pub use footer::{Footer, MAX_FOOTER_LEN};
pub use reader::{read_item_bytes, PhysicalTrailer, Reader};
