//! Typed length-prefixed encoding for the few fields persisted as opaque blobs in the swap
//! store's history/marker tables (`coord`, `removed`, `markings`, `anchors`).
//!
//! Each value is `<len:u32><kind:u8><payload>`, repeated back to back, where `len` covers
//! `kind` plus `payload` so a reader can skip an entry without understanding its `kind`.

use crate::row::{EndSlot, RowEnd};

const KIND_INT: u8 = 0;
const KIND_STRING_END: u8 = 1;
const END_NOT_REMOVED: u8 = 0xff;

/// One value in an encoded sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// A bare signed integer (a coordinate, a cursor position).
    Int(i64),
    /// A removed-run pair: text plus the row-end slot it carried.
    StringEnd(String, EndSlot),
}

/// Malformed wire bytes; always indicates store corruption, never a programming error on
/// the write side (this module's own `encode` always produces well-formed bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireDecodeError;

fn end_code(end: EndSlot) -> u8 {
    match end {
        EndSlot::NotRemoved => END_NOT_REMOVED,
        EndSlot::Removed(row_end) => row_end.code(),
    }
}

fn end_from_code(code: u8) -> EndSlot {
    if code == END_NOT_REMOVED {
        EndSlot::NotRemoved
    } else {
        EndSlot::Removed(RowEnd::from_code(code))
    }
}

/// Encode a sequence of values into the wire format.
pub fn encode(values: &[WireValue]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        let mut payload = Vec::new();
        match value {
            WireValue::Int(n) => {
                payload.push(KIND_INT);
                payload.extend_from_slice(&n.to_le_bytes());
            }
            WireValue::StringEnd(s, end) => {
                payload.push(KIND_STRING_END);
                payload.push(end_code(*end));
                payload.extend_from_slice(&(s.len() as u32).to_le_bytes());
                payload.extend_from_slice(s.as_bytes());
            }
        }
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
    }
    out
}

/// Decode a byte blob produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Vec<WireValue>, WireDecodeError> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    while cursor < bytes.len() {
        let len_bytes = bytes.get(cursor..cursor + 4).ok_or(WireDecodeError)?;
        let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        cursor += 4;
        let payload = bytes.get(cursor..cursor + len).ok_or(WireDecodeError)?;
        cursor += len;
        let kind = *payload.first().ok_or(WireDecodeError)?;
        match kind {
            KIND_INT => {
                let n_bytes: [u8; 8] = payload.get(1..9).ok_or(WireDecodeError)?.try_into().unwrap();
                out.push(WireValue::Int(i64::from_le_bytes(n_bytes)));
            }
            KIND_STRING_END => {
                let end = *payload.get(1).ok_or(WireDecodeError)?;
                let str_len_bytes: [u8; 4] = payload.get(2..6).ok_or(WireDecodeError)?.try_into().unwrap();
                let str_len = u32::from_le_bytes(str_len_bytes) as usize;
                let str_bytes = payload.get(6..6 + str_len).ok_or(WireDecodeError)?;
                let s = std::str::from_utf8(str_bytes).map_err(|_| WireDecodeError)?.to_string();
                out.push(WireValue::StringEnd(s, end_from_code(end)));
            }
            _ => return Err(WireDecodeError),
        }
    }
    Ok(out)
}

/// Encode a flat list of absolute coordinates (used for `coord`/`markings`/`anchors`
/// columns holding integer sequences).
pub fn encode_ints(values: &[i64]) -> Vec<u8> {
    encode(&values.iter().map(|&n| WireValue::Int(n)).collect::<Vec<_>>())
}

/// Decode a blob produced by [`encode_ints`].
pub fn decode_ints(bytes: &[u8]) -> Result<Vec<i64>, WireDecodeError> {
    decode(bytes)?
        .into_iter()
        .map(|v| match v {
            WireValue::Int(n) => Ok(n),
            _ => Err(WireDecodeError),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ints() {
        let ints = vec![-3, 0, 42, i64::MAX];
        let encoded = encode_ints(&ints);
        assert_eq!(decode_ints(&encoded).unwrap(), ints);
    }

    #[test]
    fn round_trips_mixed_values() {
        let values = vec![
            WireValue::Int(7),
            WireValue::StringEnd("hello".to_string(), EndSlot::Removed(RowEnd::Hard)),
            WireValue::StringEnd(String::new(), EndSlot::NotRemoved),
        ];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded).unwrap(), values);
    }

    #[test]
    fn truncated_bytes_fail_cleanly() {
        let encoded = encode_ints(&[1, 2, 3]);
        assert!(decode(&encoded[..encoded.len() - 1]).is_err());
    }
}
