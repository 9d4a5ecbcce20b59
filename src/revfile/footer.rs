//! Revision file footer: `<L2P-offset> <P2L-offset> <fnv1a-hex>\n`
//! (spec.md §4.2, §6 "Revision file footer format").
//!
//! Offsets are variable-width decimal, so the footer's total length isn't
//! known up front. A reader locates it by reading a bounded tail window off
//! the end of the file and trying every start position within it, relying
//! on the embedded checksum to reject any position that isn't the true
//! boundary with the preceding binary L2P/P2L bytes.

use std::{
    fs,
    io::{Read, Seek, SeekFrom},
};

use crate::{util::fnv, Result};

/// Upper bound on footer length: two `u64` decimal offsets (at most 20
/// digits each), two separating spaces, an 8-hex-digit checksum, and the
/// trailing newline. Used only to size the tail-read window; the encoded
/// footer itself is as short as its offsets allow.
pub const MAX_FOOTER_LEN: usize = 20 + 1 + 20 + 1 + 8 + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footer {
    pub l2p_offset: u64,
    pub p2l_offset: u64,
}

impl Footer {
    pub fn new(l2p_offset: u64, p2l_offset: u64) -> Footer {
        Footer {
            l2p_offset,
            p2l_offset,
        }
    }

    fn prefix(&self) -> String {
        format!("{} {} ", self.l2p_offset, self.p2l_offset)
    }

    pub fn encode(&self) -> Vec<u8> {
        let prefix = self.prefix();
        let checksum = fnv::fnv1a32(prefix.as_bytes());
        format!("{}{}\n", prefix, fnv::to_hex(checksum)).into_bytes()
    }

    /// Parse the footer out of the trailing bytes of a revision file.
    /// `tail` must be exactly the footer line, without surrounding bytes.
    pub fn decode(tail: &[u8]) -> Result<Footer> {
        if tail.last() != Some(&b'\n') {
            return err_at!(MalformedIndex, msg: "revision file footer: not newline-terminated");
        }
        let line = std::str::from_utf8(&tail[..tail.len() - 1])
            .map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut fields = line.rsplitn(2, ' ');
        let checksum_hex = fields
            .next()
            .ok_or_else(|| crate::Error::MalformedIndex("revision file footer: missing checksum".into()))?;
        let prefix_no_space = fields
            .next()
            .ok_or_else(|| crate::Error::MalformedIndex("revision file footer: missing offsets".into()))?;
        let prefix = format!("{} ", prefix_no_space);

        let checksum = fnv::from_hex(checksum_hex)?;
        let expect = fnv::fnv1a32(prefix.as_bytes());
        if checksum != expect {
            return err_at!(
                MalformedIndex,
                msg: "revision file footer: checksum mismatch: got {:08x} want {:08x}",
                checksum,
                expect
            );
        }

        let mut offsets = prefix_no_space.splitn(2, ' ');
        let l2p_offset = err_at!(
            MalformedIndex,
            offsets.next().unwrap_or("").parse::<u64>(),
            "revision file footer: l2p-offset"
        )?;
        let p2l_offset = err_at!(
            MalformedIndex,
            offsets.next().unwrap_or("").parse::<u64>(),
            "revision file footer: p2l-offset"
        )?;

        Ok(Footer {
            l2p_offset,
            p2l_offset,
        })
    }

    /// Locate and parse the footer at the tail of an already-open revision
    /// file. Returns the decoded footer and the byte offset at which it
    /// begins.
    ///
    /// A plain scan for the previous `\n` is not reliable: the L2P/P2L
    /// index bytes immediately preceding the footer are binary and may
    /// themselves contain `\n`. Instead this reads the last [MAX_FOOTER_LEN]
    /// bytes and tries every possible start position within that window,
    /// accepting the one whose bytes both parse as a footer and re-encode
    /// back to exactly that suffix. The embedded FNV-1a-32 checksum makes a
    /// false match astronomically unlikely, so this is effectively
    /// self-synchronizing on the true boundary.
    pub fn locate_and_decode(file: &mut fs::File, file_len: u64) -> Result<(Footer, u64)> {
        let window = MAX_FOOTER_LEN.min(file_len as usize);
        let window_offset = file_len - window as u64;
        let mut tail = vec![0u8; window];
        file.seek(SeekFrom::Start(window_offset))?;
        file.read_exact(&mut tail)?;

        for start in 0..tail.len() {
            let candidate = &tail[start..];
            if let Ok(footer) = Footer::decode(candidate) {
                if footer.encode() == candidate {
                    return Ok((footer, window_offset + start as u64));
                }
            }
        }
        err_at!(MalformedIndex, msg: "revision file: no valid footer found in trailing {} bytes", window)
    }
}

#[cfg(test)]
#[path = "footer_test.rs"]
mod footer_test;
