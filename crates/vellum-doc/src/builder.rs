//! Value builders and in-place mutation primitives.
//!
//! Everything here allocates from the invoking context's own arena. Headers
//! start zeroed; payload buffers grow only through [`Arena::realloc`]
//! (sequences double from 4 items, records double from 32 bytes).
//!
//! Builders refuse values the context does not own: a foreign value has to
//! go through [`Context::deep_copy`] (or one of the `attach_*` helpers)
//! first.
//!
//! [`Arena::realloc`]: vellum_arena::Arena::realloc

use chrono::{DateTime, FixedOffset};
use smallvec::SmallVec;
use vellum_arena::ArenaError;
use vellum_core::{FieldKind, Heap, Ptr, Value, ValueKind};

use crate::access::Field;
use crate::context::Context;
use crate::decimal;
use crate::desc::TypeDesc;
use crate::error::BuildError;
use crate::layout::{
    self, RecordHeader, RecordOffsets, SeqHeader, SeqOffsets, ELEMENT_ATTRS, ELEMENT_CHILDREN,
    ELEMENT_HEADER, ELEMENT_TAG, MAP_HEADER, MAP_RECORD, MIN_RECORD_CAP, MIN_SEQ_CAP,
    SEQ_HEADER, SEQ_ITEMS,
};
use crate::shape::ShapeKey;

fn count(n: usize) -> Result<u32, BuildError> {
    u32::try_from(n).map_err(|_| {
        BuildError::Alloc(ArenaError::OutOfMemory {
            requested: n,
            limit: Some(u32::MAX as usize),
        })
    })
}

fn upsert(fields: &mut SmallVec<[Field; 8]>, field: Field) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

fn check_declared(kind: FieldKind, value: &Value) -> Result<(), BuildError> {
    match kind {
        FieldKind::Of(expected) if !kind.accepts(value) => Err(BuildError::WrongKind {
            expected,
            found: value.kind(),
        }),
        _ => Ok(()),
    }
}

// Scalars.
impl Context {
    /// An integer: inline when it fits `i32`, boxed otherwise.
    pub fn int(&mut self, v: i64) -> Result<Value, BuildError> {
        match i32::try_from(v) {
            Ok(small) => Ok(Value::Int(small)),
            Err(_) => Ok(Value::Int64(self.alloc_bytes(&v.to_le_bytes())?)),
        }
    }

    /// A boxed float.
    pub fn float(&mut self, v: f64) -> Result<Value, BuildError> {
        Ok(Value::Float(self.alloc_bytes(&v.to_bits().to_le_bytes())?))
    }

    /// An arbitrary-precision decimal, validated and normalised.
    pub fn decimal(&mut self, text: &str) -> Result<Value, BuildError> {
        let normal = decimal::normalize(text).ok_or_else(|| BuildError::InvalidDecimal {
            text: text.to_string(),
        })?;
        Ok(Value::Decimal(self.alloc_text(normal.as_bytes())?))
    }

    /// A timestamp, keeping its UTC offset and full nanosecond precision.
    pub fn datetime(&mut self, dt: DateTime<FixedOffset>) -> Result<Value, BuildError> {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&dt.timestamp().to_le_bytes());
        buf[8..12].copy_from_slice(&dt.offset().local_minus_utc().to_le_bytes());
        buf[12..].copy_from_slice(&dt.timestamp_subsec_nanos().to_le_bytes());
        Ok(Value::DateTime(self.alloc_bytes(&buf)?))
    }

    /// A content string. Never interned.
    pub fn string(&mut self, s: &str) -> Result<Value, BuildError> {
        Ok(Value::String(self.alloc_text(s.as_bytes())?))
    }

    /// An interned symbol.
    pub fn symbol(&mut self, s: &str) -> Result<Value, BuildError> {
        Ok(Value::Symbol(self.intern_name(s)?))
    }

    /// Raw bytes.
    pub fn binary(&mut self, bytes: &[u8]) -> Result<Value, BuildError> {
        Ok(Value::Binary(self.alloc_text(bytes)?))
    }

    /// The inclusive range `start..=end`.
    pub fn range(&mut self, start: i64, end: i64) -> Result<Value, BuildError> {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&start.to_le_bytes());
        buf[8..].copy_from_slice(&end.to_le_bytes());
        Ok(Value::Range(self.alloc_bytes(&buf)?))
    }

    /// A type descriptor. Its shape, if any, must be owned by the chain.
    pub fn type_desc(&mut self, desc: TypeDesc) -> Result<Value, BuildError> {
        let shape = desc.shape.unwrap_or(Ptr::NULL);
        if !shape.is_null() && !self.owns(shape) {
            return Err(BuildError::NotOwned {
                kind: ValueKind::Type,
            });
        }
        let mut buf = [0u8; 16];
        buf[0] = desc.kind.tag();
        buf[1] = u8::from(desc.nullable);
        buf[8..].copy_from_slice(&shape.addr().to_le_bytes());
        Ok(Value::Type(self.alloc_bytes(&buf)?))
    }

    /// A handle to an evaluator-owned function.
    pub fn function_ref(&mut self, id: u64) -> Result<Value, BuildError> {
        Ok(Value::Function(self.alloc_bytes(&id.to_le_bytes())?))
    }
}

// Raw construction, shared by the fluent builders and deep copy. Callers
// guarantee every value passed in is owned.
impl Context {
    pub(crate) fn new_seq(&mut self, kind: ValueKind, items: &[u8], len: usize) -> Result<Value, BuildError> {
        let len = count(len)?;
        let items = if items.is_empty() {
            Ptr::NULL
        } else {
            self.alloc_bytes(items)?
        };
        let mut header = layout::new_header(kind, SEQ_HEADER);
        SeqHeader { len, cap: len, items }.write(&mut header, SEQ_ITEMS);
        let ptr = self.alloc_bytes(&header)?;
        Ok(Value::from_parts(kind, ptr.addr()))
    }

    pub(crate) fn new_slots(&mut self, kind: ValueKind, items: &[Value]) -> Result<Value, BuildError> {
        let bytes: Vec<u8> = items.iter().flat_map(layout::encode_slot).collect();
        self.new_seq(kind, &bytes, items.len())
    }

    /// Intern the shape of `fields` and write their data.
    pub(crate) fn new_record(&mut self, fields: &[Field]) -> Result<RecordHeader, BuildError> {
        let key: ShapeKey = fields.iter().map(|f| (f.name, f.kind)).collect();
        let shape = self.intern_shape(&key)?;
        let size = shape.record_size();
        let mut data = vec![0u8; size as usize];
        for (slot, field) in shape.slots().iter().zip(fields) {
            let bytes = layout::encode_field(slot.kind, &field.value);
            let at = slot.offset as usize;
            data[at..at + bytes.len()].copy_from_slice(&bytes);
        }
        let data = if data.is_empty() {
            Ptr::NULL
        } else {
            self.alloc_bytes(&data)?
        };
        Ok(RecordHeader {
            len: size,
            cap: size,
            shape: shape.ptr(),
            data,
        })
    }

    pub(crate) fn new_map(&mut self, fields: &[Field]) -> Result<Value, BuildError> {
        let record = self.new_record(fields)?;
        let mut header = layout::new_header(ValueKind::Map, MAP_HEADER);
        record.write(&mut header, MAP_RECORD);
        Ok(Value::Map(self.alloc_bytes(&header)?))
    }

    pub(crate) fn new_element(
        &mut self,
        tag: Ptr,
        attrs: &[Field],
        children: &[Value],
    ) -> Result<Value, BuildError> {
        let record = self.new_record(attrs)?;
        let child_bytes: Vec<u8> = children.iter().flat_map(layout::encode_slot).collect();
        let child_len = count(children.len())?;
        let children = if child_bytes.is_empty() {
            Ptr::NULL
        } else {
            self.alloc_bytes(&child_bytes)?
        };
        let mut header = layout::new_header(ValueKind::Element, ELEMENT_HEADER);
        layout::write_u64(&mut header, ELEMENT_TAG, tag.addr());
        record.write(&mut header, ELEMENT_ATTRS);
        SeqHeader {
            len: child_len,
            cap: child_len,
            items: children,
        }
        .write(&mut header, ELEMENT_CHILDREN);
        Ok(Value::Element(self.alloc_bytes(&header)?))
    }

    fn check_owned(&self, value: Value) -> Result<(), BuildError> {
        if self.is_owned(value) {
            Ok(())
        } else {
            Err(BuildError::NotOwned { kind: value.kind() })
        }
    }

    /// Header of a container this context may edit: right kind, own arena.
    fn local_header(&self, container: Value, expected: ValueKind) -> Result<Ptr, BuildError> {
        match container.ptr() {
            Some(ptr) if container.kind() == expected => {
                if self.owns_locally(ptr) {
                    Ok(ptr)
                } else {
                    Err(BuildError::NotOwned { kind: expected })
                }
            }
            _ => Err(BuildError::WrongKind {
                expected,
                found: container.kind(),
            }),
        }
    }

    fn header_mut(&mut self, ptr: Ptr, len: usize, kind: ValueKind) -> Result<&mut [u8], BuildError> {
        self.arena
            .bytes_mut(ptr, len)
            .ok_or(BuildError::NotOwned { kind })
    }

    /// Append one encoded item to the sequence described by `at`.
    fn seq_append(
        &mut self,
        header: Ptr,
        kind: ValueKind,
        at: SeqOffsets,
        item: &[u8],
    ) -> Result<(), BuildError> {
        let width = item.len();
        let mut seq = self.reader().seq(header, kind, at)?;
        if seq.len == seq.cap {
            let cap = seq.cap.saturating_mul(2).max(MIN_SEQ_CAP);
            seq.items = self.arena.realloc(
                seq.items,
                seq.cap as usize * width,
                cap as usize * width,
            )?;
            seq.cap = cap;
        }
        let slot = seq
            .items
            .offset(u64::from(seq.len) * width as u64)
            .ok_or(BuildError::NotOwned { kind })?;
        self.arena.write(slot, item)?;
        seq.len += 1;
        seq.write(self.header_mut(header, at.header_size, kind)?, at);
        Ok(())
    }

    /// Set field `name` of the record described by `at`.
    ///
    /// Overwrites in place when the declared kind accepts `value`, appends a
    /// new field otherwise, and re-lays the record out with the field
    /// declared `Any` when an existing field changes kind.
    fn record_put(
        &mut self,
        header: Ptr,
        kind: ValueKind,
        at: RecordOffsets,
        name: &str,
        value: Value,
    ) -> Result<(), BuildError> {
        let name = self.intern_name(name)?;
        let record = self.reader().record(header, kind, at)?;
        let mut head = RecordHeader::read(self.reader().raw(header, at.header_size)?, at);
        let shape = record.shape();

        match shape.position(name) {
            Some(i) if shape.slots()[i].kind.accepts(&value) => {
                let slot = shape.slots()[i];
                let bytes = layout::encode_field(slot.kind, &value);
                if !bytes.is_empty() {
                    let dst = head
                        .data
                        .offset(u64::from(slot.offset))
                        .ok_or(BuildError::NotOwned { kind })?;
                    self.arena.write(dst, &bytes)?;
                }
                return Ok(());
            }
            Some(i) => {
                let mut fields = self.reader().fields(&record)?;
                fields[i] = Field {
                    name,
                    kind: FieldKind::Any,
                    value,
                };
                let fresh = self.new_record(&fields)?;
                if !head.data.is_null() {
                    self.arena.free(head.data, head.cap as usize);
                }
                tracing::trace!(field = %name, slots = fields.len(), "record re-laid out");
                head = fresh;
            }
            None => {
                let mut key = shape.key();
                key.push((name, FieldKind::of(&value)));
                let grown = self.intern_shape(&key)?;
                let len = grown.record_size();
                if len > head.cap {
                    let cap = len.max(head.cap.saturating_mul(2)).max(MIN_RECORD_CAP);
                    head.data = self
                        .arena
                        .realloc(head.data, head.cap as usize, cap as usize)?;
                    head.cap = cap;
                }
                if let Some(slot) = grown.slots().last() {
                    let bytes = layout::encode_field(slot.kind, &value);
                    if !bytes.is_empty() {
                        let dst = head
                            .data
                            .offset(u64::from(slot.offset))
                            .ok_or(BuildError::NotOwned { kind })?;
                        self.arena.write(dst, &bytes)?;
                    }
                }
                head.len = len;
                head.shape = grown.ptr();
            }
        }
        head.write(self.header_mut(header, at.header_size, kind)?, at);
        Ok(())
    }
}

// Mutation primitives.
impl Context {
    /// Append `item` to a generic array.
    pub fn array_push(&mut self, array: Value, item: Value) -> Result<(), BuildError> {
        let header = self.local_header(array, ValueKind::Array)?;
        self.check_owned(item)?;
        self.seq_append(header, ValueKind::Array, SEQ_ITEMS, &layout::encode_slot(&item))
    }

    /// Append `v` to an `i64` array.
    pub fn array_int_push(&mut self, array: Value, v: i64) -> Result<(), BuildError> {
        let header = self.local_header(array, ValueKind::ArrayInt)?;
        self.seq_append(header, ValueKind::ArrayInt, SEQ_ITEMS, &v.to_le_bytes())
    }

    /// Append `v` to an `f64` array.
    pub fn array_float_push(&mut self, array: Value, v: f64) -> Result<(), BuildError> {
        let header = self.local_header(array, ValueKind::ArrayFloat)?;
        self.seq_append(header, ValueKind::ArrayFloat, SEQ_ITEMS, &v.to_bits().to_le_bytes())
    }

    /// Append `item` to a list.
    pub fn list_push(&mut self, list: Value, item: Value) -> Result<(), BuildError> {
        let header = self.local_header(list, ValueKind::List)?;
        self.check_owned(item)?;
        self.seq_append(header, ValueKind::List, SEQ_ITEMS, &layout::encode_slot(&item))
    }

    /// Set map field `name` to `value`.
    pub fn map_put(&mut self, map: Value, name: &str, value: Value) -> Result<(), BuildError> {
        let header = self.local_header(map, ValueKind::Map)?;
        self.check_owned(value)?;
        self.record_put(header, ValueKind::Map, MAP_RECORD, name, value)
    }

    /// Set attribute `name` of an element.
    pub fn element_set_attr(&mut self, element: Value, name: &str, value: Value) -> Result<(), BuildError> {
        let header = self.local_header(element, ValueKind::Element)?;
        self.check_owned(value)?;
        self.record_put(header, ValueKind::Element, ELEMENT_ATTRS, name, value)
    }

    /// Append a child to an element.
    pub fn element_push_child(&mut self, element: Value, child: Value) -> Result<(), BuildError> {
        let header = self.local_header(element, ValueKind::Element)?;
        self.check_owned(child)?;
        self.seq_append(
            header,
            ValueKind::Element,
            ELEMENT_CHILDREN,
            &layout::encode_slot(&child),
        )
    }
}

// Fluent builders.
impl Context {
    /// Start a generic array.
    pub fn array(&mut self) -> SeqBuilder<'_> {
        SeqBuilder::new(self, ValueKind::Array)
    }

    /// Start a list.
    pub fn list(&mut self) -> SeqBuilder<'_> {
        SeqBuilder::new(self, ValueKind::List)
    }

    /// Start an `i64` array.
    pub fn array_int(&mut self) -> ArrayIntBuilder<'_> {
        ArrayIntBuilder {
            ctx: self,
            items: Vec::new(),
        }
    }

    /// Start an `f64` array.
    pub fn array_float(&mut self) -> ArrayFloatBuilder<'_> {
        ArrayFloatBuilder {
            ctx: self,
            items: Vec::new(),
        }
    }

    /// Start a map.
    pub fn map(&mut self) -> MapBuilder<'_> {
        MapBuilder {
            ctx: self,
            fields: SmallVec::new(),
        }
    }

    /// Start an element with the given tag name.
    pub fn element(&mut self, tag: &str) -> Result<ElementBuilder<'_>, BuildError> {
        let tag = self.intern_name(tag)?;
        Ok(ElementBuilder {
            ctx: self,
            tag,
            attrs: SmallVec::new(),
            children: SmallVec::new(),
        })
    }
}

/// Builds a generic array or a list.
///
/// ```
/// use vellum_doc::{Context, ContextConfig};
///
/// let mut ctx = Context::new(ContextConfig::default()).unwrap();
/// let s = ctx.string("x").unwrap();
/// let one = ctx.int(1).unwrap();
/// let list = ctx.list().push(s).unwrap().push(one).unwrap().finish().unwrap();
/// assert_eq!(ctx.reader().len(list).unwrap(), 2);
/// ```
pub struct SeqBuilder<'c> {
    ctx: &'c mut Context,
    kind: ValueKind,
    items: SmallVec<[Value; 8]>,
}

impl<'c> SeqBuilder<'c> {
    fn new(ctx: &'c mut Context, kind: ValueKind) -> Self {
        Self {
            ctx,
            kind,
            items: SmallVec::new(),
        }
    }

    /// Append an owned value.
    pub fn push(mut self, item: Value) -> Result<Self, BuildError> {
        self.ctx.check_owned(item)?;
        self.items.push(item);
        Ok(self)
    }

    /// Items pushed so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocate the sequence.
    pub fn finish(self) -> Result<Value, BuildError> {
        self.ctx.new_slots(self.kind, &self.items)
    }
}

/// Builds an `i64` array.
pub struct ArrayIntBuilder<'c> {
    ctx: &'c mut Context,
    items: Vec<i64>,
}

impl ArrayIntBuilder<'_> {
    /// Append one item.
    pub fn push(mut self, v: i64) -> Self {
        self.items.push(v);
        self
    }

    /// Append many items.
    pub fn extend(mut self, vs: impl IntoIterator<Item = i64>) -> Self {
        self.items.extend(vs);
        self
    }

    /// Allocate the array.
    pub fn finish(self) -> Result<Value, BuildError> {
        let bytes: Vec<u8> = self.items.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.ctx.new_seq(ValueKind::ArrayInt, &bytes, self.items.len())
    }
}

/// Builds an `f64` array.
pub struct ArrayFloatBuilder<'c> {
    ctx: &'c mut Context,
    items: Vec<f64>,
}

impl ArrayFloatBuilder<'_> {
    /// Append one item.
    pub fn push(mut self, v: f64) -> Self {
        self.items.push(v);
        self
    }

    /// Append many items.
    pub fn extend(mut self, vs: impl IntoIterator<Item = f64>) -> Self {
        self.items.extend(vs);
        self
    }

    /// Allocate the array.
    pub fn finish(self) -> Result<Value, BuildError> {
        let bytes: Vec<u8> = self
            .items
            .iter()
            .flat_map(|v| v.to_bits().to_le_bytes())
            .collect();
        self.ctx.new_seq(ValueKind::ArrayFloat, &bytes, self.items.len())
    }
}

/// Builds a map. The record is written once, on [`MapBuilder::finish`].
///
/// Setting the same name twice keeps the last value.
pub struct MapBuilder<'c> {
    ctx: &'c mut Context,
    fields: SmallVec<[Field; 8]>,
}

impl MapBuilder<'_> {
    /// Add a field declared with the value's own kind.
    pub fn field(self, name: &str, value: Value) -> Result<Self, BuildError> {
        let kind = FieldKind::of(&value);
        self.field_as(name, kind, value)
    }

    /// Add a field with an explicit declaration.
    pub fn field_as(mut self, name: &str, kind: FieldKind, value: Value) -> Result<Self, BuildError> {
        check_declared(kind, &value)?;
        self.ctx.check_owned(value)?;
        let name = self.ctx.intern_name(name)?;
        upsert(&mut self.fields, Field { name, kind, value });
        Ok(self)
    }

    /// Allocate the map.
    pub fn finish(self) -> Result<Value, BuildError> {
        self.ctx.new_map(&self.fields)
    }
}

/// Builds an element: tag, attributes and children.
pub struct ElementBuilder<'c> {
    ctx: &'c mut Context,
    tag: Ptr,
    attrs: SmallVec<[Field; 8]>,
    children: SmallVec<[Value; 8]>,
}

impl ElementBuilder<'_> {
    /// Add an attribute declared with the value's own kind.
    pub fn attr(self, name: &str, value: Value) -> Result<Self, BuildError> {
        let kind = FieldKind::of(&value);
        self.attr_as(name, kind, value)
    }

    /// Add an attribute with an explicit declaration.
    pub fn attr_as(mut self, name: &str, kind: FieldKind, value: Value) -> Result<Self, BuildError> {
        check_declared(kind, &value)?;
        self.ctx.check_owned(value)?;
        let name = self.ctx.intern_name(name)?;
        upsert(&mut self.attrs, Field { name, kind, value });
        Ok(self)
    }

    /// Append a child.
    pub fn child(mut self, value: Value) -> Result<Self, BuildError> {
        self.ctx.check_owned(value)?;
        self.children.push(value);
        Ok(self)
    }

    /// Allocate the element.
    pub fn finish(self) -> Result<Value, BuildError> {
        self.ctx.new_element(self.tag, &self.attrs, &self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use chrono::TimeZone;

    fn ctx() -> Context {
        Context::new(ContextConfig::default()).unwrap()
    }

    #[test]
    fn small_ints_stay_inline() {
        let mut c = ctx();
        assert_eq!(c.int(-5).unwrap(), Value::Int(-5));
        assert_eq!(c.arena().stats().alloc_count, 0);
        let big = c.int(i64::from(i32::MAX) + 1).unwrap();
        assert_eq!(big.kind(), ValueKind::Int64);
        assert_eq!(c.reader().int(big).unwrap(), i64::from(i32::MAX) + 1);
    }

    #[test]
    fn scalars_read_back() {
        let mut c = ctx();
        let f = c.float(2.5).unwrap();
        let s = c.string("hello").unwrap();
        let b = c.binary(&[0, 159, 146, 150]).unwrap();
        let r = c.range(-3, 9).unwrap();
        let func = c.function_ref(77).unwrap();
        let d = c.decimal("+0012.3400").unwrap();
        let rd = c.reader();
        assert_eq!(rd.float(f).unwrap(), 2.5);
        assert_eq!(rd.str(s).unwrap(), "hello");
        assert_eq!(rd.bytes(b).unwrap(), &[0, 159, 146, 150]);
        assert_eq!(rd.range(r).unwrap(), -3..=9);
        assert_eq!(rd.function_id(func).unwrap(), 77);
        assert_eq!(rd.decimal(d).unwrap(), "12.34");
    }

    #[test]
    fn bad_decimal_is_rejected() {
        let mut c = ctx();
        let err = c.decimal("12abc").unwrap_err();
        assert_eq!(err, BuildError::InvalidDecimal { text: "12abc".into() });
    }

    #[test]
    fn datetime_keeps_offset() {
        let mut c = ctx();
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let dt = tz.with_ymd_and_hms(2024, 2, 29, 12, 30, 45).unwrap();
        let v = c.datetime(dt).unwrap();
        let back = c.reader().datetime(v).unwrap();
        assert_eq!(back, dt);
        assert_eq!(back.offset().local_minus_utc(), 5 * 3600 + 1800);
    }

    #[test]
    fn datetime_keeps_sub_millisecond_precision() {
        let mut c = ctx();
        let tz = FixedOffset::west_opt(3600).unwrap();
        let nanos = chrono::TimeDelta::nanoseconds(1_234_567);
        for base in [
            tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            tz.with_ymd_and_hms(1960, 6, 1, 0, 0, 0).unwrap(),
        ] {
            let dt = base + nanos;
            let v = c.datetime(dt).unwrap();
            let back = c.reader().datetime(v).unwrap();
            assert_eq!(back, dt);
            assert_eq!(back.timestamp_subsec_nanos(), 1_234_567);
        }
    }

    #[test]
    fn symbols_are_interned_strings_are_not() {
        let mut c = ctx();
        assert_eq!(c.symbol("id").unwrap(), c.symbol("id").unwrap());
        assert_ne!(c.string("id").unwrap(), c.string("id").unwrap());
    }

    #[test]
    fn type_desc_round_trip() {
        let mut c = ctx();
        let name = c.intern_name("x").unwrap();
        let shape = c.intern_shape(&[(name, FieldKind::Of(ValueKind::Int))]).unwrap();
        let desc = TypeDesc::of(ValueKind::Map).nullable().with_shape(shape.ptr());
        let v = c.type_desc(desc).unwrap();
        assert_eq!(c.reader().type_desc(v).unwrap(), desc);
    }

    #[test]
    fn type_desc_rejects_foreign_shape() {
        let mut other = ctx();
        let name = other.intern_name("x").unwrap();
        let shape = other.intern_shape(&[(name, FieldKind::Any)]).unwrap();
        let mut c = ctx();
        let desc = TypeDesc::of(ValueKind::Map).with_shape(shape.ptr());
        assert!(matches!(c.type_desc(desc), Err(BuildError::NotOwned { .. })));
    }

    #[test]
    fn list_builder_and_push_growth() {
        let mut c = ctx();
        let list = c.list().finish().unwrap();
        assert_eq!(c.reader().len(list).unwrap(), 0);
        for i in 0..10 {
            c.list_push(list, Value::Int(i)).unwrap();
        }
        let items = c.reader().items(list).unwrap();
        assert_eq!(items, (0..10).map(Value::Int).collect::<Vec<_>>());
        assert_eq!(c.reader().item(list, 9).unwrap(), Value::Int(9));
        assert!(c.reader().item(list, 10).is_err());
    }

    #[test]
    fn typed_arrays() {
        let mut c = ctx();
        let ints = c.array_int().extend([1, 2, 3]).finish().unwrap();
        c.array_int_push(ints, i64::MIN).unwrap();
        assert_eq!(c.reader().int_items(ints).unwrap(), [1, 2, 3, i64::MIN]);

        let floats = c.array_float().push(0.5).finish().unwrap();
        c.array_float_push(floats, -1.25).unwrap();
        assert_eq!(c.reader().float_items(floats).unwrap(), [0.5, -1.25]);
    }

    #[test]
    fn push_to_wrong_kind_fails() {
        let mut c = ctx();
        let list = c.list().finish().unwrap();
        let err = c.array_push(list, Value::Null).unwrap_err();
        assert_eq!(
            err,
            BuildError::WrongKind {
                expected: ValueKind::Array,
                found: ValueKind::List
            }
        );
    }

    #[test]
    fn builders_refuse_foreign_values() {
        let mut other = ctx();
        let foreign = other.string("far away").unwrap();
        let mut c = ctx();
        assert!(matches!(c.list().push(foreign), Err(BuildError::NotOwned { kind: ValueKind::String })));
        let list = c.list().finish().unwrap();
        assert!(c.list_push(list, foreign).is_err());
        assert!(c.map().field("k", foreign).is_err());
    }

    #[test]
    fn cannot_edit_foreign_container() {
        let mut other = ctx();
        let list = other.list().finish().unwrap();
        let mut c = ctx();
        assert_eq!(
            c.list_push(list, Value::Int(1)),
            Err(BuildError::NotOwned { kind: ValueKind::List })
        );
    }

    #[test]
    fn map_fields_use_compact_encoding() {
        let mut c = ctx();
        let name = c.string("Bob").unwrap();
        let map = c
            .map()
            .field("name", name)
            .unwrap()
            .field("age", Value::Int(41))
            .unwrap()
            .field("nick", Value::Null)
            .unwrap()
            .finish()
            .unwrap();
        let r = c.reader();
        let record = r.map_record(map).unwrap();
        // 8 (string) + 8 (int) + 0 (null)
        assert_eq!(record.shape().record_size(), 16);
        assert_eq!(r.map_get(map, "name").unwrap(), Some(name));
        assert_eq!(r.map_get(map, "age").unwrap(), Some(Value::Int(41)));
        assert_eq!(r.map_get(map, "nick").unwrap(), Some(Value::Null));
        assert_eq!(r.map_get(map, "missing").unwrap(), None);
    }

    #[test]
    fn map_builder_last_write_wins() {
        let mut c = ctx();
        let map = c
            .map()
            .field("a", Value::Int(1))
            .unwrap()
            .field("a", Value::Int(2))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(c.reader().len(map).unwrap(), 1);
        assert_eq!(c.reader().map_get(map, "a").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn declared_kind_is_enforced() {
        let mut c = ctx();
        let err = c
            .map()
            .field_as("n", FieldKind::Of(ValueKind::Int), Value::Bool(true))
            .err();
        assert_eq!(
            err,
            Some(BuildError::WrongKind {
                expected: ValueKind::Int,
                found: ValueKind::Bool
            })
        );
    }

    #[test]
    fn map_put_overwrites_in_place() {
        let mut c = ctx();
        let map = c.map().field("n", Value::Int(1)).unwrap().finish().unwrap();
        let before = c.reader().map_record(map).unwrap();
        c.map_put(map, "n", Value::Int(2)).unwrap();
        let after = c.reader().map_record(map).unwrap();
        assert_eq!(before, after);
        assert_eq!(c.reader().map_get(map, "n").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn map_put_appends_without_moving_fields() {
        let mut c = ctx();
        let map = c.map().finish().unwrap();
        let s = c.string("v").unwrap();
        c.map_put(map, "a", Value::Int(1)).unwrap();
        c.map_put(map, "b", s).unwrap();
        c.map_put(map, "c", Value::Bool(true)).unwrap();
        let fields = c.reader().map_fields(map).unwrap();
        let values: Vec<Value> = fields.iter().map(|f| f.value).collect();
        assert_eq!(values, [Value::Int(1), s, Value::Bool(true)]);
        let offsets: Vec<u32> = c
            .reader()
            .map_record(map)
            .unwrap()
            .shape()
            .slots()
            .iter()
            .map(|s| s.offset)
            .collect();
        assert_eq!(offsets, [0, 8, 16]);
    }

    #[test]
    fn kind_change_relayouts_as_any() {
        let mut c = ctx();
        let map = c
            .map()
            .field("x", Value::Int(1))
            .unwrap()
            .field("y", Value::Int(2))
            .unwrap()
            .finish()
            .unwrap();
        let s = c.string("now a string").unwrap();
        c.map_put(map, "x", s).unwrap();

        let r = c.reader();
        let record = r.map_record(map).unwrap();
        assert_eq!(record.shape().slots()[0].kind, FieldKind::Any);
        assert_eq!(record.shape().record_size(), 24);
        assert_eq!(r.map_get(map, "x").unwrap(), Some(s));
        assert_eq!(r.map_get(map, "y").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn null_field_widens_on_first_real_value() {
        let mut c = ctx();
        let map = c.map().field("v", Value::Null).unwrap().finish().unwrap();
        c.map_put(map, "v", Value::Int(3)).unwrap();
        assert_eq!(c.reader().map_get(map, "v").unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn string_field_accepts_null() {
        let mut c = ctx();
        let s = c.string("x").unwrap();
        let map = c.map().field("v", s).unwrap().finish().unwrap();
        c.map_put(map, "v", Value::Null).unwrap();
        let record = c.reader().map_record(map).unwrap();
        assert_eq!(record.shape().slots()[0].kind, FieldKind::Of(ValueKind::String));
        assert_eq!(c.reader().map_get(map, "v").unwrap(), Some(Value::Null));
    }

    #[test]
    fn element_attrs_and_children() {
        let mut c = ctx();
        let text = c.string("hello").unwrap();
        let href = c.string("/home").unwrap();
        let el = c
            .element("a")
            .unwrap()
            .attr("href", href)
            .unwrap()
            .child(text)
            .unwrap()
            .finish()
            .unwrap();
        c.element_set_attr(el, "rel", Value::Bool(false)).unwrap();
        let inner = c.element("b").unwrap().finish().unwrap();
        c.element_push_child(el, inner).unwrap();

        let r = c.reader();
        assert_eq!(r.element_tag(el).unwrap(), "a");
        assert_eq!(r.element_attr(el, "href").unwrap(), Some(href));
        assert_eq!(r.element_attr(el, "rel").unwrap(), Some(Value::Bool(false)));
        assert_eq!(r.element_children(el).unwrap(), [text, inner]);
        assert_eq!(r.len(el).unwrap(), 2);
    }

    #[test]
    fn identical_layouts_share_a_shape() {
        let mut c = ctx();
        let a = c.map().field("k", Value::Int(1)).unwrap().finish().unwrap();
        let b = c.map().field("k", Value::Int(2)).unwrap().finish().unwrap();
        let r = c.reader();
        assert_eq!(
            r.map_record(a).unwrap().shape().ptr(),
            r.map_record(b).unwrap().shape().ptr()
        );
        assert_eq!(c.shapes().len(), 1);
    }

    #[test]
    fn fresh_headers_are_zeroed() {
        let mut c = ctx();
        // Dirty a block, free it, and make sure the next header reuses it clean.
        let scratch = c.arena_mut().alloc(24).unwrap();
        c.arena_mut().write(scratch, &[0xFF; 24]).unwrap();
        c.arena_mut().free(scratch, 24);
        let list = c.list().finish().unwrap();
        assert_eq!(list.ptr(), Some(scratch));
        assert_eq!(c.reader().len(list).unwrap(), 0);
        c.list_push(list, Value::Int(7)).unwrap();
        assert_eq!(c.reader().items(list).unwrap(), [Value::Int(7)]);
    }
}
