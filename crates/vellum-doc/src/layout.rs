//! Byte layouts of arena-resident payloads.
//!
//! All integers are little-endian. Every payload starts on an 8-byte
//! boundary; the arena guarantees that for every block it hands out.
//!
//! | Payload | Bytes |
//! |---------|-------|
//! | tagged slot | `tag u8`, 7 pad, `payload u64` |
//! | text (string, symbol, binary, decimal, names) | `len u32`, 4 pad, bytes |
//! | datetime | `seconds i64`, `offset_seconds i32`, `nanos u32` |
//! | range | `start i64`, `end i64` |
//! | type | `kind u8`, `nullable u8`, 6 pad, `shape u64` |
//! | sequence header | `kind u8`, `flags u8`, pad, `len u32 @4`, `cap u32 @8`, pad, `items u64 @16` |
//! | map header | `kind`, `flags`, `len u32 @4`, `cap u32 @8`, `shape u64 @16`, `data u64 @24` |
//! | element header | `kind`, `flags`, `attr_len @4`, `attr_cap @8`, `child_len @12`, `child_cap @16`, `tag @24`, `shape @32`, `attrs @40`, `children @48` |
//! | shape | `count u32`, 4 pad, then entries of `name u64`, `kind u8`, 3 pad, `offset u32` |
//!
//! Sequence lengths count items; record lengths (`len`/`cap` of maps and
//! element attributes) count bytes.

use vellum_core::{AccessError, FieldKind, Ptr, Value, ValueKind};

pub(crate) const SLOT_SIZE: usize = 16;
pub(crate) const TEXT_PREFIX: usize = 8;
pub(crate) const SEQ_HEADER: usize = 24;
pub(crate) const MAP_HEADER: usize = 32;
pub(crate) const ELEMENT_HEADER: usize = 56;
pub(crate) const SHAPE_PREFIX: usize = 8;
pub(crate) const SHAPE_ENTRY: usize = 16;

/// Smallest item capacity a growing sequence jumps to.
pub(crate) const MIN_SEQ_CAP: u32 = 4;
/// Smallest byte capacity a growing record jumps to.
pub(crate) const MIN_RECORD_CAP: u32 = 32;

/// Where a growable item list lives inside a header.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SeqOffsets {
    pub(crate) header_size: usize,
    pub(crate) len: usize,
    pub(crate) cap: usize,
    pub(crate) items: usize,
}

/// Items of an array or list.
pub(crate) const SEQ_ITEMS: SeqOffsets = SeqOffsets {
    header_size: SEQ_HEADER,
    len: 4,
    cap: 8,
    items: 16,
};

/// Children of an element.
pub(crate) const ELEMENT_CHILDREN: SeqOffsets = SeqOffsets {
    header_size: ELEMENT_HEADER,
    len: 12,
    cap: 16,
    items: 48,
};

/// Where a record (shape plus data) lives inside a header.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RecordOffsets {
    pub(crate) header_size: usize,
    pub(crate) len: usize,
    pub(crate) cap: usize,
    pub(crate) shape: usize,
    pub(crate) data: usize,
}

/// Fields of a map.
pub(crate) const MAP_RECORD: RecordOffsets = RecordOffsets {
    header_size: MAP_HEADER,
    len: 4,
    cap: 8,
    shape: 16,
    data: 24,
};

/// Attributes of an element.
pub(crate) const ELEMENT_ATTRS: RecordOffsets = RecordOffsets {
    header_size: ELEMENT_HEADER,
    len: 4,
    cap: 8,
    shape: 32,
    data: 40,
};

pub(crate) const ELEMENT_TAG: usize = 24;

/// Decoded sequence bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SeqHeader {
    pub(crate) len: u32,
    pub(crate) cap: u32,
    pub(crate) items: Ptr,
}

impl SeqHeader {
    pub(crate) fn read(header: &[u8], at: SeqOffsets) -> Self {
        Self {
            len: read_u32(header, at.len),
            cap: read_u32(header, at.cap),
            items: Ptr::from_addr(read_u64(header, at.items)),
        }
    }

    pub(crate) fn write(&self, header: &mut [u8], at: SeqOffsets) {
        write_u32(header, at.len, self.len);
        write_u32(header, at.cap, self.cap);
        write_u64(header, at.items, self.items.addr());
    }
}

/// Decoded record bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RecordHeader {
    pub(crate) len: u32,
    pub(crate) cap: u32,
    pub(crate) shape: Ptr,
    pub(crate) data: Ptr,
}

impl RecordHeader {
    pub(crate) fn read(header: &[u8], at: RecordOffsets) -> Self {
        Self {
            len: read_u32(header, at.len),
            cap: read_u32(header, at.cap),
            shape: Ptr::from_addr(read_u64(header, at.shape)),
            data: Ptr::from_addr(read_u64(header, at.data)),
        }
    }

    pub(crate) fn write(&self, header: &mut [u8], at: RecordOffsets) {
        write_u32(header, at.len, self.len);
        write_u32(header, at.cap, self.cap);
        write_u64(header, at.shape, self.shape.addr());
        write_u64(header, at.data, self.data.addr());
    }
}

/// A fresh header of `size` bytes stamped with `kind`.
pub(crate) fn new_header(kind: ValueKind, size: usize) -> Vec<u8> {
    let mut header = vec![0u8; size];
    header[0] = kind.tag();
    header
}

/// Verify the kind byte at the start of a header.
pub(crate) fn check_header_kind(header: &[u8], kind: ValueKind) -> Result<(), AccessError> {
    match header.first() {
        Some(&tag) if tag == kind.tag() => Ok(()),
        Some(&tag) => Err(AccessError::Malformed {
            reason: format!("{kind} header carries tag {tag:#04x}"),
        }),
        None => Err(AccessError::Malformed {
            reason: format!("empty {kind} header"),
        }),
    }
}

/// Encode a value as a 16-byte tagged slot.
pub(crate) fn encode_slot(value: &Value) -> [u8; SLOT_SIZE] {
    let mut slot = [0u8; SLOT_SIZE];
    slot[0] = value.kind().tag();
    slot[8..].copy_from_slice(&value.payload().to_le_bytes());
    slot
}

/// Decode a 16-byte tagged slot. Unknown tags are reported, not guessed.
pub(crate) fn decode_slot(slot: &[u8]) -> Result<Value, AccessError> {
    let kind = ValueKind::from_tag(slot[0]).ok_or(AccessError::UnknownTag { tag: slot[0] })?;
    Ok(Value::from_parts(kind, read_u64(slot, 8)))
}

/// Encode a field value according to its declared kind. The result is
/// `kind.width()` bytes long.
pub(crate) fn encode_field(kind: FieldKind, value: &Value) -> Vec<u8> {
    match kind {
        FieldKind::Any => encode_slot(value).to_vec(),
        FieldKind::Of(ValueKind::Null) => Vec::new(),
        FieldKind::Of(_) => value.payload().to_le_bytes().to_vec(),
    }
}

/// Encode a text payload (`len u32`, pad, bytes). `None` if the length
/// does not fit the prefix.
pub(crate) fn encode_text(bytes: &[u8]) -> Option<Vec<u8>> {
    let len = u32::try_from(bytes.len()).ok()?;
    let mut buf = vec![0u8; TEXT_PREFIX + bytes.len()];
    write_u32(&mut buf, 0, len);
    buf[TEXT_PREFIX..].copy_from_slice(bytes);
    Some(buf)
}

pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

pub(crate) fn read_i64(bytes: &[u8], at: usize) -> i64 {
    read_u64(bytes, at) as i64
}

pub(crate) fn write_u32(bytes: &mut [u8], at: usize, v: u32) {
    bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn write_u64(bytes: &mut [u8], at: usize, v: u64) {
    bytes[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keeps_tag_and_payload_apart() {
        let v = Value::Map(Ptr::from_addr(0x1_0000));
        let slot = encode_slot(&v);
        assert_eq!(slot[0], ValueKind::Map.tag());
        assert!(slot[1..8].iter().all(|&b| b == 0));
        assert_eq!(decode_slot(&slot).unwrap(), v);
    }

    #[test]
    fn unknown_slot_tag_is_reported() {
        let mut slot = encode_slot(&Value::Int(3));
        slot[0] = 0x40;
        assert_eq!(decode_slot(&slot), Err(AccessError::UnknownTag { tag: 0x40 }));
    }

    #[test]
    fn field_widths_match_kinds() {
        let s = Value::String(Ptr::from_addr(0x2000));
        assert_eq!(encode_field(FieldKind::Any, &s).len(), 16);
        assert_eq!(encode_field(FieldKind::Of(ValueKind::String), &s).len(), 8);
        assert!(encode_field(FieldKind::Of(ValueKind::Null), &Value::Null).is_empty());
    }

    #[test]
    fn headers_round_trip_through_offsets() {
        let mut header = new_header(ValueKind::Element, ELEMENT_HEADER);
        let attrs = RecordHeader {
            len: 24,
            cap: 32,
            shape: Ptr::from_addr(0x3000),
            data: Ptr::from_addr(0x3100),
        };
        let children = SeqHeader {
            len: 2,
            cap: 4,
            items: Ptr::from_addr(0x3200),
        };
        attrs.write(&mut header, ELEMENT_ATTRS);
        children.write(&mut header, ELEMENT_CHILDREN);
        assert_eq!(RecordHeader::read(&header, ELEMENT_ATTRS), attrs);
        assert_eq!(SeqHeader::read(&header, ELEMENT_CHILDREN), children);
        assert!(check_header_kind(&header, ValueKind::Element).is_ok());
        assert!(check_header_kind(&header, ValueKind::Map).is_err());
    }

    #[test]
    fn text_prefix_holds_length() {
        let buf = encode_text(b"abc").unwrap();
        assert_eq!(buf.len(), 11);
        assert_eq!(read_u32(&buf, 0), 3);
        assert_eq!(&buf[8..], b"abc");
    }
}
