//! The canonical typed accessor.
//!
//! [`Reader`] is the only code that turns arena bytes back into values. It
//! works over any [`Heap`], so the same decoding serves a context reading its
//! own tree, deep copy reading a foreign one, and tests reading either.
//!
//! Record fields are decoded through their [`Shape`]: a field declared with a
//! concrete kind stores no tag, and its kind is taken from the shape, never
//! guessed from the stored bytes.

use std::ops::RangeInclusive;

use chrono::{DateTime, FixedOffset};
use vellum_core::{AccessError, FieldKind, Heap, Ptr, Value, ValueKind};

use crate::desc::TypeDesc;
use crate::layout::{
    self, check_header_kind, read_i64, read_u32, read_u64, RecordHeader, RecordOffsets,
    SeqHeader, SeqOffsets, ELEMENT_ATTRS, ELEMENT_CHILDREN, ELEMENT_HEADER, ELEMENT_TAG,
    MAP_RECORD, SEQ_ITEMS, SHAPE_ENTRY, SHAPE_PREFIX, SLOT_SIZE, TEXT_PREFIX,
};
use crate::shape::Shape;

/// A record (map fields or element attributes) located through its header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    shape: Shape,
    data: Ptr,
    cap: u32,
}

impl Record {
    /// The record's field layout.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Address of the record data ([`Ptr::NULL`] when nothing is stored).
    pub fn data(&self) -> Ptr {
        self.data
    }

    /// Bytes reserved for the data.
    pub fn capacity(&self) -> usize {
        self.cap as usize
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }
}

/// One decoded record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Interned name pointer.
    pub name: Ptr,
    /// Declared kind.
    pub kind: FieldKind,
    /// The stored value.
    pub value: Value,
}

/// Decodes value payloads out of a [`Heap`].
#[derive(Clone, Copy)]
pub struct Reader<'h> {
    heap: &'h dyn Heap,
}

impl<'h> Reader<'h> {
    /// A reader over `heap`.
    pub fn new(heap: &'h dyn Heap) -> Self {
        Self { heap }
    }

    /// The heap being read.
    pub fn heap(&self) -> &'h dyn Heap {
        self.heap
    }

    pub(crate) fn raw(&self, ptr: Ptr, len: usize) -> Result<&'h [u8], AccessError> {
        let heap = self.heap;
        heap.resolve(ptr, len).ok_or(AccessError::Unresolved { ptr })
    }

    /// Bytes of the text payload at `ptr` (names, strings, binaries, decimals).
    pub fn text(&self, ptr: Ptr) -> Result<&'h [u8], AccessError> {
        let len = read_u32(self.raw(ptr, TEXT_PREFIX)?, 0) as usize;
        let all = self.raw(ptr, TEXT_PREFIX + len)?;
        Ok(&all[TEXT_PREFIX..])
    }

    /// Text of the interned name at `ptr`.
    pub fn name(&self, ptr: Ptr) -> Result<&'h str, AccessError> {
        utf8(self.text(ptr)?)
    }

    /// Raw bytes of a string, symbol, binary or decimal.
    pub fn bytes(&self, value: Value) -> Result<&'h [u8], AccessError> {
        match value {
            Value::String(p) | Value::Symbol(p) | Value::Binary(p) | Value::Decimal(p) => {
                self.text(p)
            }
            other => Err(mismatch(ValueKind::Binary, other)),
        }
    }

    /// Text of a string, symbol or decimal.
    pub fn str(&self, value: Value) -> Result<&'h str, AccessError> {
        match value {
            Value::String(p) | Value::Symbol(p) | Value::Decimal(p) => utf8(self.text(p)?),
            other => Err(mismatch(ValueKind::String, other)),
        }
    }

    /// An `Int` or `Int64` as `i64`.
    pub fn int(&self, value: Value) -> Result<i64, AccessError> {
        match value {
            Value::Int(i) => Ok(i64::from(i)),
            Value::Int64(p) => Ok(read_i64(self.raw(p, 8)?, 0)),
            other => Err(mismatch(ValueKind::Int64, other)),
        }
    }

    /// A boxed float.
    pub fn float(&self, value: Value) -> Result<f64, AccessError> {
        match value {
            Value::Float(p) => Ok(f64::from_bits(read_u64(self.raw(p, 8)?, 0))),
            other => Err(mismatch(ValueKind::Float, other)),
        }
    }

    /// Normalised decimal text.
    pub fn decimal(&self, value: Value) -> Result<&'h str, AccessError> {
        match value {
            Value::Decimal(p) => utf8(self.text(p)?),
            other => Err(mismatch(ValueKind::Decimal, other)),
        }
    }

    /// A timestamp with its original offset.
    pub fn datetime(&self, value: Value) -> Result<DateTime<FixedOffset>, AccessError> {
        let p = expect(value, ValueKind::DateTime)?;
        let raw = self.raw(p, 16)?;
        let secs = read_i64(raw, 0);
        let offset_secs = read_u32(raw, 8) as i32;
        let nanos = read_u32(raw, 12);
        let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| AccessError::Malformed {
            reason: format!("utc offset {offset_secs}s out of range"),
        })?;
        let utc = DateTime::from_timestamp(secs, nanos).ok_or_else(|| AccessError::Malformed {
            reason: format!("timestamp {secs}s {nanos}ns out of range"),
        })?;
        Ok(utc.with_timezone(&offset))
    }

    /// An inclusive range.
    pub fn range(&self, value: Value) -> Result<RangeInclusive<i64>, AccessError> {
        let p = expect(value, ValueKind::Range)?;
        let raw = self.raw(p, 16)?;
        Ok(read_i64(raw, 0)..=read_i64(raw, 8))
    }

    /// A type descriptor.
    pub fn type_desc(&self, value: Value) -> Result<TypeDesc, AccessError> {
        let p = expect(value, ValueKind::Type)?;
        let raw = self.raw(p, 16)?;
        let kind = ValueKind::from_tag(raw[0]).ok_or(AccessError::UnknownTag { tag: raw[0] })?;
        let shape = Ptr::from_addr(read_u64(raw, 8));
        Ok(TypeDesc {
            kind,
            nullable: raw[1] != 0,
            shape: (!shape.is_null()).then_some(shape),
        })
    }

    /// The evaluator's id for a function handle.
    pub fn function_id(&self, value: Value) -> Result<u64, AccessError> {
        let p = expect(value, ValueKind::Function)?;
        Ok(read_u64(self.raw(p, 8)?, 0))
    }

    /// Item count of a sequence, field count of a map, child count of an
    /// element, or byte length of a text payload.
    pub fn len(&self, value: Value) -> Result<usize, AccessError> {
        match value {
            Value::Array(p) | Value::ArrayInt(p) | Value::ArrayFloat(p) | Value::List(p) => {
                Ok(self.seq(p, value.kind(), SEQ_ITEMS)?.len as usize)
            }
            Value::Map(_) => Ok(self.map_record(value)?.len()),
            Value::Element(p) => {
                Ok(self.seq(p, ValueKind::Element, ELEMENT_CHILDREN)?.len as usize)
            }
            Value::String(_) | Value::Symbol(_) | Value::Binary(_) | Value::Decimal(_) => {
                Ok(self.bytes(value)?.len())
            }
            other => Err(mismatch(ValueKind::List, other)),
        }
    }

    /// Sequence bookkeeping of the header at `ptr`.
    pub(crate) fn seq(
        &self,
        ptr: Ptr,
        kind: ValueKind,
        at: SeqOffsets,
    ) -> Result<SeqHeader, AccessError> {
        let header = self.raw(ptr, at.header_size)?;
        check_header_kind(header, kind)?;
        let seq = SeqHeader::read(header, at);
        if seq.len > seq.cap {
            return Err(AccessError::Malformed {
                reason: format!("{kind} length {} exceeds capacity {}", seq.len, seq.cap),
            });
        }
        Ok(seq)
    }

    /// The `len` items of `width` bytes each.
    pub(crate) fn item_bytes(&self, seq: SeqHeader, width: usize) -> Result<&'h [u8], AccessError> {
        if seq.len == 0 {
            return Ok(&[]);
        }
        self.raw(seq.items, seq.len as usize * width)
    }

    fn slots(&self, seq: SeqHeader) -> Result<Vec<Value>, AccessError> {
        self.item_bytes(seq, SLOT_SIZE)?
            .chunks_exact(SLOT_SIZE)
            .map(layout::decode_slot)
            .collect()
    }

    /// Items of a generic array or list.
    pub fn items(&self, value: Value) -> Result<Vec<Value>, AccessError> {
        match value {
            Value::Array(p) | Value::List(p) => self.slots(self.seq(p, value.kind(), SEQ_ITEMS)?),
            other => Err(mismatch(ValueKind::Array, other)),
        }
    }

    /// One item of a generic array or list.
    pub fn item(&self, value: Value, index: usize) -> Result<Value, AccessError> {
        let (Value::Array(p) | Value::List(p)) = value else {
            return Err(mismatch(ValueKind::Array, value));
        };
        let seq = self.seq(p, value.kind(), SEQ_ITEMS)?;
        if index >= seq.len as usize {
            return Err(AccessError::OutOfBounds {
                index,
                len: seq.len as usize,
            });
        }
        let at = seq
            .items
            .offset((index * SLOT_SIZE) as u64)
            .ok_or(AccessError::Unresolved { ptr: seq.items })?;
        layout::decode_slot(self.raw(at, SLOT_SIZE)?)
    }

    /// Items of an `i64` array.
    pub fn int_items(&self, value: Value) -> Result<Vec<i64>, AccessError> {
        let p = expect(value, ValueKind::ArrayInt)?;
        let seq = self.seq(p, ValueKind::ArrayInt, SEQ_ITEMS)?;
        Ok(self
            .item_bytes(seq, 8)?
            .chunks_exact(8)
            .map(|b| read_i64(b, 0))
            .collect())
    }

    /// Items of an `f64` array.
    pub fn float_items(&self, value: Value) -> Result<Vec<f64>, AccessError> {
        let p = expect(value, ValueKind::ArrayFloat)?;
        let seq = self.seq(p, ValueKind::ArrayFloat, SEQ_ITEMS)?;
        Ok(self
            .item_bytes(seq, 8)?
            .chunks_exact(8)
            .map(|b| f64::from_bits(read_u64(b, 0)))
            .collect())
    }

    /// Decode the shape descriptor at `ptr`. A null pointer is the empty shape.
    pub fn shape(&self, ptr: Ptr) -> Result<Shape, AccessError> {
        if ptr.is_null() {
            return Ok(Shape::empty());
        }
        let count = read_u32(self.raw(ptr, SHAPE_PREFIX)?, 0) as usize;
        let raw = self.raw(ptr, SHAPE_PREFIX + count * SHAPE_ENTRY)?;
        let mut fields = Vec::with_capacity(count);
        let mut offsets = Vec::with_capacity(count);
        for entry in raw[SHAPE_PREFIX..].chunks_exact(SHAPE_ENTRY) {
            let kind = FieldKind::from_tag(entry[8]).ok_or(AccessError::UnknownTag { tag: entry[8] })?;
            fields.push((Ptr::from_addr(read_u64(entry, 0)), kind));
            offsets.push(read_u32(entry, 12));
        }
        let shape = Shape::layout(ptr, &fields);
        if shape.slots().iter().map(|s| s.offset).ne(offsets) {
            return Err(AccessError::Malformed {
                reason: format!("shape {ptr} has inconsistent field offsets"),
            });
        }
        Ok(shape)
    }

    pub(crate) fn record(
        &self,
        ptr: Ptr,
        kind: ValueKind,
        at: RecordOffsets,
    ) -> Result<Record, AccessError> {
        let header = self.raw(ptr, at.header_size)?;
        check_header_kind(header, kind)?;
        let head = RecordHeader::read(header, at);
        let shape = self.shape(head.shape)?;
        if head.len < shape.record_size() || head.len > head.cap {
            return Err(AccessError::Malformed {
                reason: format!(
                    "{kind} record of {} bytes (capacity {}) cannot hold its {}-byte shape",
                    head.len,
                    head.cap,
                    shape.record_size()
                ),
            });
        }
        Ok(Record {
            shape,
            data: head.data,
            cap: head.cap,
        })
    }

    /// The field record of a map.
    pub fn map_record(&self, map: Value) -> Result<Record, AccessError> {
        let p = expect(map, ValueKind::Map)?;
        self.record(p, ValueKind::Map, MAP_RECORD)
    }

    /// The attribute record of an element.
    pub fn element_record(&self, element: Value) -> Result<Record, AccessError> {
        let p = expect(element, ValueKind::Element)?;
        self.record(p, ValueKind::Element, ELEMENT_ATTRS)
    }

    /// Read field `index` of `record`, decoding by its declared kind.
    ///
    /// This is the single path by which record bytes become values.
    pub fn field(&self, record: &Record, index: usize) -> Result<Value, AccessError> {
        let slot = record
            .shape
            .slots()
            .get(index)
            .ok_or(AccessError::OutOfBounds {
                index,
                len: record.len(),
            })?;
        let width = slot.kind.width() as usize;
        if width == 0 {
            return Ok(Value::Null);
        }
        let at = record
            .data
            .offset(u64::from(slot.offset))
            .ok_or(AccessError::Unresolved { ptr: record.data })?;
        let raw = self.raw(at, width)?;
        match slot.kind {
            FieldKind::Any => layout::decode_slot(raw),
            FieldKind::Of(kind) => Ok(Value::from_parts(kind, read_u64(raw, 0))),
        }
    }

    /// Every field of `record`, in declaration order.
    pub fn fields(&self, record: &Record) -> Result<Vec<Field>, AccessError> {
        record
            .shape
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                Ok(Field {
                    name: slot.name,
                    kind: slot.kind,
                    value: self.field(record, i)?,
                })
            })
            .collect()
    }

    /// Index of the field whose name text is `name`.
    fn position(&self, record: &Record, name: &str) -> Result<Option<usize>, AccessError> {
        for (i, slot) in record.shape.slots().iter().enumerate() {
            if self.text(slot.name)? == name.as_bytes() {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Fields of a map.
    pub fn map_fields(&self, map: Value) -> Result<Vec<Field>, AccessError> {
        self.fields(&self.map_record(map)?)
    }

    /// The map field called `name`.
    pub fn map_get(&self, map: Value, name: &str) -> Result<Option<Value>, AccessError> {
        let record = self.map_record(map)?;
        match self.position(&record, name)? {
            Some(i) => self.field(&record, i).map(Some),
            None => Ok(None),
        }
    }

    /// Interned tag pointer of an element.
    pub fn element_tag_ptr(&self, element: Value) -> Result<Ptr, AccessError> {
        let p = expect(element, ValueKind::Element)?;
        let header = self.raw(p, ELEMENT_HEADER)?;
        check_header_kind(header, ValueKind::Element)?;
        Ok(Ptr::from_addr(read_u64(header, ELEMENT_TAG)))
    }

    /// Tag name of an element.
    pub fn element_tag(&self, element: Value) -> Result<&'h str, AccessError> {
        self.name(self.element_tag_ptr(element)?)
    }

    /// Attributes of an element.
    pub fn element_attrs(&self, element: Value) -> Result<Vec<Field>, AccessError> {
        self.fields(&self.element_record(element)?)
    }

    /// The attribute called `name`.
    pub fn element_attr(&self, element: Value, name: &str) -> Result<Option<Value>, AccessError> {
        let record = self.element_record(element)?;
        match self.position(&record, name)? {
            Some(i) => self.field(&record, i).map(Some),
            None => Ok(None),
        }
    }

    /// Children of an element.
    pub fn element_children(&self, element: Value) -> Result<Vec<Value>, AccessError> {
        let p = expect(element, ValueKind::Element)?;
        self.slots(self.seq(p, ValueKind::Element, ELEMENT_CHILDREN)?)
    }
}

fn expect(value: Value, kind: ValueKind) -> Result<Ptr, AccessError> {
    match value.ptr() {
        Some(p) if value.kind() == kind => Ok(p),
        _ => Err(mismatch(kind, value)),
    }
}

fn mismatch(expected: ValueKind, found: Value) -> AccessError {
    AccessError::KindMismatch {
        expected,
        found: found.kind(),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, AccessError> {
    std::str::from_utf8(bytes).map_err(|e| AccessError::Malformed {
        reason: format!("invalid utf-8: {e}"),
    })
}
