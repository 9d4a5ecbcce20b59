//! Property-list codec: an ordered sequence of (name, byte-string) pairs.
//!
//! Shared by revision properties, node/directory property representations,
//! and directory entries (spec.md §4.1: "directory entries are ... a
//! property list"). Uses the classic length-prefixed `K`/`V` record shape
//! so values can hold arbitrary bytes, terminated by `END\n`:
//!
//! ```text
//! K <len>\n<name>\nV <len>\n<value>\nK <len>\n...END\n
//! ```

use crate::Result;

/// An ordered list of (name, value) pairs. Order is preserved on decode so
/// callers that need deterministic iteration (dump-index, tests) see a
/// stable result; callers needing name-based access can build a map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyList(pub Vec<(String, Vec<u8>)>);

impl PropertyList {
    pub fn new() -> PropertyList {
        PropertyList(vec![])
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_slice())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == &name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let idx = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        for (name, value) in self.0.iter() {
            buf.extend_from_slice(format!("K {}\n", name.len()).as_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.push(b'\n');
            buf.extend_from_slice(format!("V {}\n", value.len()).as_bytes());
            buf.extend_from_slice(value);
            buf.push(b'\n');
        }
        buf.extend_from_slice(b"END\n");
    }

    pub fn decode(buf: &[u8]) -> Result<PropertyList> {
        let mut pos = 0usize;
        let mut list = vec![];
        loop {
            let line_end = find_newline(buf, pos)?;
            let line = std::str::from_utf8(&buf[pos..line_end])
                .map_err(|e| crate::Error::FailConvert(e.to_string()))?;
            if line == "END" {
                pos = line_end + 1;
                break;
            }
            let klen = parse_tagged_len(line, 'K')?;
            pos = line_end + 1;
            let name = std::str::from_utf8(&buf[pos..pos + klen])
                .map_err(|e| crate::Error::FailConvert(e.to_string()))?
                .to_string();
            pos += klen;
            check_byte(buf, pos, b'\n')?;
            pos += 1;

            let line_end = find_newline(buf, pos)?;
            let line = std::str::from_utf8(&buf[pos..line_end])
                .map_err(|e| crate::Error::FailConvert(e.to_string()))?;
            let vlen = parse_tagged_len(line, 'V')?;
            pos = line_end + 1;
            let value = buf[pos..pos + vlen].to_vec();
            pos += vlen;
            check_byte(buf, pos, b'\n')?;
            pos += 1;

            list.push((name, value));
        }
        let _ = pos;
        Ok(PropertyList(list))
    }
}

fn find_newline(buf: &[u8], from: usize) -> Result<usize> {
    match buf[from..].iter().position(|&b| b == b'\n') {
        Some(i) => Ok(from + i),
        None => err_at!(CorruptRevFile, msg: "property list: unterminated line"),
    }
}

fn check_byte(buf: &[u8], pos: usize, want: u8) -> Result<()> {
    if buf.get(pos) != Some(&want) {
        return err_at!(CorruptRevFile, msg: "property list: expected byte {} at {}", want, pos);
    }
    Ok(())
}

fn parse_tagged_len(line: &str, tag: char) -> Result<usize> {
    let mut parts = line.splitn(2, ' ');
    let got_tag = parts.next().unwrap_or("");
    if got_tag.len() != 1 || got_tag.chars().next() != Some(tag) {
        return err_at!(CorruptRevFile, msg: "property list: expected {} record, got {:?}", tag, line);
    }
    let len_str = parts.next().unwrap_or("");
    err_at!(CorruptRevFile, len_str.parse::<usize>(), "property list length {:?}", len_str)
}

#[cfg(test)]
#[path = "props_test.rs"]
mod props_test;
