use super::*;

#[test]
fn test_u64_round_trip() {
    for val in [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
        let mut buf = vec![];
        let n = encode_u64(val, &mut buf);
        assert_eq!(n, buf.len());
        let (decoded, m) = decode_u64(&buf).unwrap();
        assert_eq!(decoded, val);
        assert_eq!(m, n);
    }
}

#[test]
fn test_u64_small_values_fit_one_byte() {
    let mut buf = vec![];
    encode_u64(42, &mut buf);
    assert_eq!(buf.len(), 1);
}

#[test]
fn test_i64_round_trip_including_negative() {
    for val in [0i64, 1, -1, 127, -127, i32::MIN as i64, i32::MAX as i64] {
        let mut buf = vec![];
        encode_i64(val, &mut buf);
        let (decoded, _) = decode_i64(&buf).unwrap();
        assert_eq!(decoded, val);
    }
}

#[test]
fn test_zigzag_mapping() {
    assert_eq!(zigzag_encode(0), 0);
    assert_eq!(zigzag_encode(-1), 1);
    assert_eq!(zigzag_encode(1), 2);
    assert_eq!(zigzag_encode(-2), 3);
}

#[test]
fn test_decode_truncated_stream_errors() {
    // a byte with continuation bit set but nothing following
    let buf = vec![0x80];
    assert!(decode_u64(&buf).is_err());
}

#[test]
fn test_multiple_values_concatenated() {
    let mut buf = vec![];
    encode_u64(300, &mut buf);
    encode_u64(5, &mut buf);
    let (first, n) = decode_u64(&buf).unwrap();
    assert_eq!(first, 300);
    let (second, _) = decode_u64(&buf[n..]).unwrap();
    assert_eq!(second, 5);
}
