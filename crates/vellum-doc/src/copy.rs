//! Deep copy between contexts.
//!
//! Copying runs in two passes. The first reads the source tree through a
//! [`Layered`] view (source first, then the target chain) into an owned
//! [`Node`] tree; the second rebuilds that tree in the target with the
//! ordinary construction primitives. Subtrees the target already owns are
//! kept as they are.

use vellum_core::{AccessError, FieldKind, Heap, Layered, Ptr, Value, ValueKind};

use crate::access::{Field, Reader, Record};
use crate::context::Context;
use crate::desc::TypeDesc;
use crate::error::{BuildError, CopyError};
use crate::layout::{self, SeqHeader, ELEMENT_CHILDREN, SEQ_ITEMS, SLOT_SIZE};

/// Decoded, arena-independent form of a value.
#[derive(Debug)]
enum Node {
    Keep(Value),
    Fixed(ValueKind, Vec<u8>),
    Text(ValueKind, Vec<u8>),
    Symbol(String),
    Type {
        kind: ValueKind,
        nullable: bool,
        shape: Option<Vec<(String, FieldKind)>>,
    },
    Seq(ValueKind, Vec<Node>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Map(Vec<FieldNode>),
    Element {
        tag: String,
        attrs: Vec<FieldNode>,
        children: Vec<Node>,
    },
}

#[derive(Debug)]
struct FieldNode {
    name: String,
    kind: FieldKind,
    value: Node,
}

enum Skip {
    Depth,
    Unreadable(AccessError),
}

impl From<AccessError> for Skip {
    fn from(e: AccessError) -> Self {
        Self::Unreadable(e)
    }
}

struct Decoder<'h> {
    target: &'h Context,
    reader: Reader<'h>,
    limit: usize,
}

impl Decoder<'_> {
    fn node(&self, value: Value, depth: usize) -> Result<Node, Skip> {
        if depth > self.limit {
            return Err(Skip::Depth);
        }
        if self.target.is_owned(value) {
            return Ok(Node::Keep(value));
        }
        match self.decode(value, depth) {
            Err(Skip::Unreadable(err)) => {
                tracing::warn!(ctx = %self.target.id(), kind = %value.kind(), %err, "unreadable value copied as null");
                Ok(Node::Keep(Value::Null))
            }
            other => other,
        }
    }

    fn undecodable(&self, err: &AccessError) -> Node {
        tracing::warn!(ctx = %self.target.id(), %err, "undecodable slot copied as null");
        Node::Keep(Value::Null)
    }

    fn decode(&self, value: Value, depth: usize) -> Result<Node, Skip> {
        let r = self.reader;
        let kind = value.kind();
        let node = match value {
            Value::Null | Value::Bool(_) | Value::Int(_) => Node::Keep(value),
            Value::Int64(p) | Value::Float(p) => Node::Fixed(kind, r.raw(p, 8)?.to_vec()),
            Value::DateTime(p) | Value::Range(p) => Node::Fixed(kind, r.raw(p, 16)?.to_vec()),
            Value::String(p) | Value::Binary(p) | Value::Decimal(p) => {
                Node::Text(kind, r.text(p)?.to_vec())
            }
            Value::Symbol(p) => Node::Symbol(r.name(p)?.to_string()),
            Value::Type(_) => {
                let desc = r.type_desc(value)?;
                let shape = match desc.shape {
                    Some(ptr) => Some(self.shape(ptr)?),
                    None => None,
                };
                Node::Type {
                    kind: desc.kind,
                    nullable: desc.nullable,
                    shape,
                }
            }
            Value::Array(p) | Value::List(p) => {
                Node::Seq(kind, self.slots(r.seq(p, kind, SEQ_ITEMS)?, depth)?)
            }
            Value::ArrayInt(_) => Node::Ints(r.int_items(value)?),
            Value::ArrayFloat(_) => Node::Floats(r.float_items(value)?),
            Value::Map(_) => Node::Map(self.fields(&r.map_record(value)?, depth)?),
            Value::Element(p) => Node::Element {
                tag: r.element_tag(value)?.to_string(),
                attrs: self.fields(&r.element_record(value)?, depth)?,
                children: self.slots(r.seq(p, kind, ELEMENT_CHILDREN)?, depth)?,
            },
            Value::Function(p) => {
                tracing::warn!(ctx = %self.target.id(), %p, "foreign function handle copied as null");
                Node::Keep(Value::Null)
            }
        };
        Ok(node)
    }

    /// Items of a sequence. A slot that cannot be decoded becomes null on
    /// its own; its siblings are kept.
    fn slots(&self, seq: SeqHeader, depth: usize) -> Result<Vec<Node>, Skip> {
        let raw = self.reader.item_bytes(seq, SLOT_SIZE)?;
        let mut out = Vec::with_capacity(seq.len as usize);
        for slot in raw.chunks_exact(SLOT_SIZE) {
            let node = match layout::decode_slot(slot) {
                Ok(v) => self.node(v, depth + 1)?,
                Err(err) => self.undecodable(&err),
            };
            out.push(node);
        }
        Ok(out)
    }

    fn fields(&self, record: &Record, depth: usize) -> Result<Vec<FieldNode>, Skip> {
        let mut out = Vec::with_capacity(record.len());
        for (i, slot) in record.shape().slots().iter().enumerate() {
            let value = match self.reader.field(record, i) {
                Ok(v) => self.node(v, depth + 1)?,
                Err(err) => self.undecodable(&err),
            };
            out.push(FieldNode {
                name: self.reader.name(slot.name)?.to_string(),
                kind: slot.kind,
                value,
            });
        }
        Ok(out)
    }

    fn shape(&self, ptr: Ptr) -> Result<Vec<(String, FieldKind)>, Skip> {
        let shape = self.reader.shape(ptr)?;
        let mut out = Vec::with_capacity(shape.len());
        for slot in shape.slots() {
            out.push((self.reader.name(slot.name)?.to_string(), slot.kind));
        }
        Ok(out)
    }
}

impl Context {
    /// Copy `value`, read from `source`, into this context.
    ///
    /// Values this context already owns come back unchanged without
    /// allocating. Otherwise the tree is rebuilt here: names and shapes are
    /// re-interned, strings and other payloads are copied, and record field
    /// declarations are preserved. Unreadable parts and foreign function
    /// handles become null.
    ///
    /// ```
    /// use vellum_doc::{Context, ContextConfig};
    ///
    /// let mut a = Context::new(ContextConfig::default()).unwrap();
    /// let s = a.string("hi").unwrap();
    /// let list = a.list().push(s).unwrap().finish().unwrap();
    ///
    /// let mut b = Context::new(ContextConfig::default()).unwrap();
    /// let copy = b.deep_copy(list, &a).unwrap();
    /// assert!(b.is_owned(copy));
    /// assert!(vellum_doc::deep_eq(list, &a, copy, &b));
    /// ```
    pub fn deep_copy(&mut self, value: Value, source: &dyn Heap) -> Result<Value, CopyError> {
        if self.is_owned(value) {
            tracing::trace!(ctx = %self.id(), kind = %value.kind(), "value already owned, copy skipped");
            return Ok(value);
        }
        let limit = self.config().max_depth;
        let node = {
            let target: &Context = self;
            let layered = Layered::new(source, target);
            let decoder = Decoder {
                target,
                reader: Reader::new(&layered),
                limit,
            };
            decoder.node(value, 0)
        };
        let node = match node {
            Ok(node) => node,
            Err(Skip::Depth) => {
                tracing::warn!(ctx = %self.id(), limit, "deep copy exceeded nesting limit");
                return Err(CopyError::DepthExceeded { limit });
            }
            Err(Skip::Unreadable(err)) => {
                tracing::warn!(ctx = %self.id(), %err, "unreadable value copied as null");
                return Ok(Value::Null);
            }
        };
        let before = self.arena().stats().alloc_count;
        let copied = self.rebuild(node)?;
        tracing::debug!(
            ctx = %self.id(),
            kind = %value.kind(),
            allocs = self.arena().stats().alloc_count - before,
            "value copied"
        );
        Ok(copied)
    }

    fn rebuild(&mut self, node: Node) -> Result<Value, BuildError> {
        match node {
            Node::Keep(v) => Ok(v),
            Node::Fixed(kind, bytes) => {
                let ptr = self.alloc_bytes(&bytes)?;
                Ok(Value::from_parts(kind, ptr.addr()))
            }
            Node::Text(kind, bytes) => {
                let ptr = self.alloc_text(&bytes)?;
                Ok(Value::from_parts(kind, ptr.addr()))
            }
            Node::Symbol(text) if self.config().intern_names => self.symbol(&text),
            Node::Symbol(text) => Ok(Value::Symbol(self.alloc_text(text.as_bytes())?)),
            Node::Type {
                kind,
                nullable,
                shape,
            } => {
                let shape = match shape {
                    Some(fields) => {
                        let mut key = Vec::with_capacity(fields.len());
                        for (name, kind) in &fields {
                            key.push((self.intern_name(name)?, *kind));
                        }
                        Some(self.intern_shape(&key)?.ptr())
                    }
                    None => None,
                };
                self.type_desc(TypeDesc {
                    kind,
                    nullable,
                    shape,
                })
            }
            Node::Seq(kind, items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.rebuild(item)?);
                }
                self.new_slots(kind, &values)
            }
            Node::Ints(items) => self.array_int().extend(items).finish(),
            Node::Floats(items) => self.array_float().extend(items).finish(),
            Node::Map(fields) => {
                let fields = self.rebuild_fields(fields)?;
                self.new_map(&fields)
            }
            Node::Element {
                tag,
                attrs,
                children,
            } => {
                let tag = self.intern_name(&tag)?;
                let attrs = self.rebuild_fields(attrs)?;
                let mut values = Vec::with_capacity(children.len());
                for child in children {
                    values.push(self.rebuild(child)?);
                }
                self.new_element(tag, &attrs, &values)
            }
        }
    }

    fn rebuild_fields(&mut self, fields: Vec<FieldNode>) -> Result<Vec<Field>, BuildError> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.push(Field {
                name: self.intern_name(&field.name)?,
                kind: field.kind,
                value: self.rebuild(field.value)?,
            });
        }
        Ok(out)
    }

    /// Return `value` as a value this context owns, copying if needed.
    pub fn ensure_local(&mut self, value: Value, source: &dyn Heap) -> Result<Value, CopyError> {
        self.deep_copy(value, source)
    }

    /// Append `child` (read from `source`) to `element`, copying it in first
    /// if necessary. Returns the value actually attached.
    pub fn attach_child(
        &mut self,
        element: Value,
        child: Value,
        source: &dyn Heap,
    ) -> Result<Value, CopyError> {
        let child = self.ensure_local(child, source)?;
        self.element_push_child(element, child)?;
        Ok(child)
    }

    /// Set attribute `name` of `element` to `value`, copying it in first if
    /// necessary.
    pub fn attach_attr(
        &mut self,
        element: Value,
        name: &str,
        value: Value,
        source: &dyn Heap,
    ) -> Result<Value, CopyError> {
        let value = self.ensure_local(value, source)?;
        self.element_set_attr(element, name, value)?;
        Ok(value)
    }

    /// Set map field `name` to `value`, copying it in first if necessary.
    pub fn attach_field(
        &mut self,
        map: Value,
        name: &str,
        value: Value,
        source: &dyn Heap,
    ) -> Result<Value, CopyError> {
        let value = self.ensure_local(value, source)?;
        self.map_put(map, name, value)?;
        Ok(value)
    }

    /// Make `value` the document root, copying it in first if necessary.
    pub fn adopt_root(&mut self, value: Value, source: &dyn Heap) -> Result<Value, CopyError> {
        let value = self.ensure_local(value, source)?;
        self.set_root(value)?;
        Ok(value)
    }
}
