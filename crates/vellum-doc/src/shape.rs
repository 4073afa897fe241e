//! Record shapes: typed-field descriptors for maps and element attributes.
//!
//! A shape lists each field's interned name, declared [`FieldKind`] and byte
//! offset inside the record data. Offsets are assigned in declaration order,
//! so appending a field never moves the existing ones. Shapes are interned
//! per context chain exactly like names.

use indexmap::IndexMap;
use smallvec::SmallVec;
use vellum_core::{FieldKind, Ptr};

use crate::layout::{write_u32, write_u64, SHAPE_ENTRY, SHAPE_PREFIX};

/// Interning key of a shape: names and declared kinds, in order.
pub type ShapeKey = SmallVec<[(Ptr, FieldKind); 8]>;

/// One field of a [`Shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSlot {
    /// Interned field name.
    pub name: Ptr,
    /// Declared kind; decides how the field's bytes are decoded.
    pub kind: FieldKind,
    /// Byte offset inside the record data.
    pub offset: u32,
}

/// A decoded shape descriptor.
///
/// The empty shape has a null pointer and is never allocated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape {
    ptr: Ptr,
    slots: SmallVec<[FieldSlot; 8]>,
}

impl Shape {
    /// The shape with no fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Lay out `fields` in order.
    pub(crate) fn layout(ptr: Ptr, fields: &[(Ptr, FieldKind)]) -> Self {
        let mut offset = 0u32;
        let slots = fields
            .iter()
            .map(|&(name, kind)| {
                let slot = FieldSlot { name, kind, offset };
                offset += kind.width();
                slot
            })
            .collect();
        Self { ptr, slots }
    }

    /// Address of the interned descriptor ([`Ptr::NULL`] when empty).
    pub fn ptr(&self) -> Ptr {
        self.ptr
    }

    /// Fields in declaration order.
    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the shape has no fields.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bytes of record data this shape describes.
    pub fn record_size(&self) -> u32 {
        self.slots
            .last()
            .map_or(0, |s| s.offset + s.kind.width())
    }

    /// Index of the field named by `name`.
    pub fn position(&self, name: Ptr) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// The interning key.
    pub fn key(&self) -> ShapeKey {
        self.slots.iter().map(|s| (s.name, s.kind)).collect()
    }

    /// Serialised descriptor bytes.
    pub(crate) fn encode(fields: &[(Ptr, FieldKind)]) -> Vec<u8> {
        let layout = Self::layout(Ptr::NULL, fields);
        let mut buf = vec![0u8; SHAPE_PREFIX + SHAPE_ENTRY * fields.len()];
        // Callers bound the field count by the u32 record length.
        write_u32(&mut buf, 0, fields.len() as u32);
        for (i, slot) in layout.slots.iter().enumerate() {
            let at = SHAPE_PREFIX + i * SHAPE_ENTRY;
            write_u64(&mut buf, at, slot.name.addr());
            buf[at + 8] = slot.kind.to_tag();
            write_u32(&mut buf, at + 12, slot.offset);
        }
        buf
    }
}

/// Content cache for interned shapes.
#[derive(Debug, Default)]
pub struct ShapePool {
    entries: IndexMap<ShapeKey, Ptr>,
}

impl ShapePool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer of the descriptor for `fields`, if interned here.
    pub fn get(&self, fields: &[(Ptr, FieldKind)]) -> Option<Ptr> {
        self.entries.get(fields).copied()
    }

    pub(crate) fn insert(&mut self, fields: &[(Ptr, FieldKind)], ptr: Ptr) {
        self.entries.insert(fields.iter().copied().collect(), ptr);
    }

    /// Number of interned shapes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[(Ptr, FieldKind)], Ptr)> {
        self.entries.iter().map(|(k, &p)| (k.as_slice(), p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::read_u32;
    use vellum_core::ValueKind;

    fn name(n: u64) -> Ptr {
        Ptr::from_addr(0x1000 + n * 16)
    }

    #[test]
    fn offsets_follow_widths() {
        let shape = Shape::layout(
            Ptr::NULL,
            &[
                (name(0), FieldKind::Of(ValueKind::String)),
                (name(1), FieldKind::Of(ValueKind::Null)),
                (name(2), FieldKind::Any),
                (name(3), FieldKind::Of(ValueKind::Int)),
            ],
        );
        let offsets: Vec<u32> = shape.slots().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, [0, 8, 8, 24]);
        assert_eq!(shape.record_size(), 32);
        assert_eq!(shape.position(name(2)), Some(2));
        assert_eq!(shape.position(name(9)), None);
    }

    #[test]
    fn appending_keeps_offsets() {
        let a = [(name(0), FieldKind::Of(ValueKind::Map))];
        let b = [a[0], (name(1), FieldKind::Any)];
        let short = Shape::layout(Ptr::NULL, &a);
        let long = Shape::layout(Ptr::NULL, &b);
        assert_eq!(short.slots()[0], long.slots()[0]);
        assert_eq!(long.slots()[1].offset, short.record_size());
    }

    #[test]
    fn empty_shape_has_no_data() {
        let shape = Shape::empty();
        assert!(shape.is_empty());
        assert_eq!(shape.record_size(), 0);
        assert!(shape.ptr().is_null());
    }

    #[test]
    fn encoding_writes_entries() {
        let fields = [(name(0), FieldKind::Any), (name(1), FieldKind::Of(ValueKind::Float))];
        let buf = Shape::encode(&fields);
        assert_eq!(buf.len(), 8 + 32);
        assert_eq!(read_u32(&buf, 0), 2);
        assert_eq!(buf[8 + 8], FieldKind::ANY_TAG);
        assert_eq!(read_u32(&buf, 8 + 16 + 12), 16);
    }

    #[test]
    fn pool_is_keyed_by_names_and_kinds() {
        let mut pool = ShapePool::new();
        let a = [(name(0), FieldKind::Of(ValueKind::String))];
        let b = [(name(0), FieldKind::Any)];
        pool.insert(&a, Ptr::from_addr(0x9000));
        assert_eq!(pool.get(&a), Some(Ptr::from_addr(0x9000)));
        assert_eq!(pool.get(&b), None);
        assert_eq!(pool.len(), 1);
    }
}
