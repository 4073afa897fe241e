//! Structural equality across heaps.

use vellum_core::{AccessError, Heap, Ptr, Value};

use crate::access::{Field, Reader};
use crate::config::ContextConfig;

/// Whether `a` (read from `heap_a`) and `b` (read from `heap_b`) hold the
/// same tree, regardless of where either lives.
///
/// Kinds must match exactly; floats compare by bit pattern, names and
/// element tags by text, and map fields and attributes in declaration order.
/// Unreadable data, or nesting past
/// [`ContextConfig::DEFAULT_MAX_DEPTH`], compares unequal.
pub fn deep_eq(a: Value, heap_a: &dyn Heap, b: Value, heap_b: &dyn Heap) -> bool {
    let cmp = Compare {
        left: Reader::new(heap_a),
        right: Reader::new(heap_b),
    };
    cmp.values(a, b, 0).unwrap_or(false)
}

struct Compare<'a, 'b> {
    left: Reader<'a>,
    right: Reader<'b>,
}

impl Compare<'_, '_> {
    fn values(&self, a: Value, b: Value, depth: usize) -> Result<bool, AccessError> {
        if depth > ContextConfig::DEFAULT_MAX_DEPTH || a.kind() != b.kind() {
            return Ok(false);
        }
        let (l, r) = (self.left, self.right);
        let eq = match a {
            Value::Null | Value::Bool(_) | Value::Int(_) => a == b,
            Value::Int64(_) => l.int(a)? == r.int(b)?,
            Value::Float(_) => l.float(a)?.to_bits() == r.float(b)?.to_bits(),
            Value::Decimal(_) | Value::String(_) | Value::Symbol(_) | Value::Binary(_) => {
                l.bytes(a)? == r.bytes(b)?
            }
            Value::DateTime(_) => {
                let (x, y) = (l.datetime(a)?, r.datetime(b)?);
                x == y && x.offset() == y.offset()
            }
            Value::Range(_) => l.range(a)? == r.range(b)?,
            Value::Function(_) => l.function_id(a)? == r.function_id(b)?,
            Value::Type(_) => {
                let (x, y) = (l.type_desc(a)?, r.type_desc(b)?);
                x.kind == y.kind
                    && x.nullable == y.nullable
                    && match (x.shape, y.shape) {
                        (None, None) => true,
                        (Some(p), Some(q)) => self.shapes(p, q)?,
                        _ => false,
                    }
            }
            Value::ArrayInt(_) => l.int_items(a)? == r.int_items(b)?,
            Value::ArrayFloat(_) => {
                let (x, y) = (l.float_items(a)?, r.float_items(b)?);
                x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| p.to_bits() == q.to_bits())
            }
            Value::Array(_) | Value::List(_) => self.seqs(&l.items(a)?, &r.items(b)?, depth)?,
            Value::Map(_) => self.fields(&l.map_fields(a)?, &r.map_fields(b)?, depth)?,
            Value::Element(_) => {
                l.element_tag(a)? == r.element_tag(b)?
                    && self.fields(&l.element_attrs(a)?, &r.element_attrs(b)?, depth)?
                    && self.seqs(&l.element_children(a)?, &r.element_children(b)?, depth)?
            }
        };
        Ok(eq)
    }

    fn seqs(&self, xs: &[Value], ys: &[Value], depth: usize) -> Result<bool, AccessError> {
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (&x, &y) in xs.iter().zip(ys) {
            if !self.values(x, y, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn fields(&self, xs: &[Field], ys: &[Field], depth: usize) -> Result<bool, AccessError> {
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (x, y) in xs.iter().zip(ys) {
            if self.left.name(x.name)? != self.right.name(y.name)?
                || !self.values(x.value, y.value, depth + 1)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn shapes(&self, p: Ptr, q: Ptr) -> Result<bool, AccessError> {
        let (x, y) = (self.left.shape(p)?, self.right.shape(q)?);
        if x.len() != y.len() {
            return Ok(false);
        }
        for (s, t) in x.slots().iter().zip(y.slots()) {
            if s.kind != t.kind || self.left.name(s.name)? != self.right.name(t.name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
