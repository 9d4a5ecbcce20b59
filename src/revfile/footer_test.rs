use super::*;

#[test]
fn test_encode_decode_round_trip() {
    let footer = Footer::new(1024, 65536);
    let encoded = footer.encode();
    assert!(encoded.ends_with(b"\n"));
    let got = Footer::decode(&encoded).unwrap();
    assert_eq!(got, footer);
}

#[test]
fn test_decode_rejects_non_newline_terminated() {
    let mut encoded = Footer::new(1, 2).encode();
    encoded.pop();
    assert!(Footer::decode(&encoded).is_err());
}

#[test]
fn test_decode_rejects_tampered_checksum() {
    let mut encoded = Footer::new(1, 2).encode();
    let last_hex_byte = encoded.len() - 2;
    encoded[last_hex_byte] = if encoded[last_hex_byte] == b'0' { b'1' } else { b'0' };
    assert!(Footer::decode(&encoded).is_err());
}

#[test]
fn test_decode_rejects_non_decimal_offset() {
    let buf = b"abc 2 00000000\n";
    assert!(Footer::decode(buf).is_err());
}

#[test]
fn test_encode_is_variable_width() {
    let small = Footer::new(1, 2).encode();
    let large = Footer::new(u64::MAX, u64::MAX).encode();
    assert!(small.len() < large.len());
    assert!(large.len() <= MAX_FOOTER_LEN);
}

#[test]
fn test_locate_and_decode_finds_a_short_footer_past_binary_index_bytes() {
    let footer = Footer::new(7, 19);
    let encoded = footer.encode();

    // simulate a preceding P2L index containing a stray newline byte,
    // which a naive backward-scan-for-newline could mistake for the
    // footer's start; the checksum must reject it instead.
    let mut body = vec![1u8, 2, b'\n', 3, 4, 5];
    body.extend_from_slice(&encoded);

    let dir = std::env::temp_dir().join(format!(
        "fsfs-footer-test-{}-{}",
        std::process::id(),
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
    ));
    let path = dir.with_extension("revfile");
    std::fs::write(&path, &body).unwrap();

    let mut file = std::fs::File::open(&path).unwrap();
    let file_len = file.metadata().unwrap().len();
    let (got, offset) = Footer::locate_and_decode(&mut file, file_len).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(got, footer);
    assert_eq!(offset, (body.len() - encoded.len()) as u64);
}
