//! The ownership oracle.
//!
//! A value is owned by a context when every byte reachable from it (headers,
//! payload buffers, shapes, shape names, tags, nested values) resolves in
//! the context's chain. Builders and [`Context::set_root`] use this to
//! refuse foreign values; deep copy uses it to skip work.

use vellum_core::{AccessError, Heap, Ptr, Value, ValueKind};

use crate::access::{Reader, Record};
use crate::context::Context;
use crate::layout::{
    self, SeqHeader, ELEMENT_ATTRS, ELEMENT_CHILDREN, MAP_RECORD, SEQ_ITEMS, SLOT_SIZE,
};

impl Context {
    /// Whether `value` and everything it references lives in this chain.
    ///
    /// Inline values are always owned. Unreadable data, and nesting deeper
    /// than [`ContextConfig::max_depth`](crate::ContextConfig::max_depth),
    /// count as not owned.
    pub fn is_owned(&self, value: Value) -> bool {
        let walk = Walk {
            ctx: self,
            reader: self.reader(),
            limit: self.config().max_depth,
        };
        walk.value(value, 0).unwrap_or_else(|err| {
            tracing::trace!(ctx = %self.id(), kind = %value.kind(), %err, "ownership check hit unreadable data");
            false
        })
    }
}

struct Walk<'c> {
    ctx: &'c Context,
    reader: Reader<'c>,
    limit: usize,
}

impl Walk<'_> {
    fn value(&self, value: Value, depth: usize) -> Result<bool, AccessError> {
        if depth > self.limit {
            return Ok(false);
        }
        let Some(p) = value.ptr() else {
            return Ok(true);
        };
        if !self.ctx.owns(p) {
            return Ok(false);
        }
        match value {
            Value::Null | Value::Bool(_) | Value::Int(_) => Ok(true),
            Value::Symbol(_) if self.ctx.is_interned(p) => Ok(true),
            Value::String(_) | Value::Symbol(_) | Value::Binary(_) | Value::Decimal(_) => {
                self.reader.text(p).map(|_| true)
            }
            Value::Int64(_) | Value::Float(_) | Value::Function(_) => self.buffer(p, 8),
            Value::DateTime(_) | Value::Range(_) => self.buffer(p, 16),
            Value::Type(_) => match self.reader.type_desc(value)?.shape {
                Some(shape) => self.shape(shape),
                None => Ok(true),
            },
            Value::Array(_) | Value::List(_) => {
                let seq = self.reader.seq(p, value.kind(), SEQ_ITEMS)?;
                self.slots(seq, depth)
            }
            Value::ArrayInt(_) | Value::ArrayFloat(_) => {
                let seq = self.reader.seq(p, value.kind(), SEQ_ITEMS)?;
                self.buffer(seq.items, seq.cap as usize * 8)
            }
            Value::Map(_) => {
                let record = self.reader.record(p, ValueKind::Map, MAP_RECORD)?;
                self.record(&record, depth)
            }
            Value::Element(_) => {
                let tag = self.reader.element_tag_ptr(value)?;
                if !self.name(tag)? {
                    return Ok(false);
                }
                let attrs = self.reader.record(p, ValueKind::Element, ELEMENT_ATTRS)?;
                if !self.record(&attrs, depth)? {
                    return Ok(false);
                }
                let children = self.reader.seq(p, ValueKind::Element, ELEMENT_CHILDREN)?;
                self.slots(children, depth)
            }
        }
    }

    /// `len` bytes at `ptr`; an empty buffer is trivially owned.
    fn buffer(&self, ptr: Ptr, len: usize) -> Result<bool, AccessError> {
        if len == 0 {
            return Ok(true);
        }
        self.reader.raw(ptr, len).map(|_| true)
    }

    fn name(&self, ptr: Ptr) -> Result<bool, AccessError> {
        Ok(self.ctx.owns(ptr) && self.reader.text(ptr).is_ok())
    }

    fn shape(&self, ptr: Ptr) -> Result<bool, AccessError> {
        if ptr.is_null() {
            return Ok(true);
        }
        if !self.ctx.owns(ptr) {
            return Ok(false);
        }
        let shape = self.reader.shape(ptr)?;
        for slot in shape.slots() {
            if !self.name(slot.name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn slots(&self, seq: SeqHeader, depth: usize) -> Result<bool, AccessError> {
        if !self.buffer(seq.items, seq.cap as usize * SLOT_SIZE)? {
            return Ok(false);
        }
        if seq.len == 0 {
            return Ok(true);
        }
        let raw = self.reader.raw(seq.items, seq.len as usize * SLOT_SIZE)?;
        for slot in raw.chunks_exact(SLOT_SIZE) {
            if !self.value(layout::decode_slot(slot)?, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn record(&self, record: &Record, depth: usize) -> Result<bool, AccessError> {
        if !self.shape(record.shape().ptr())? || !self.buffer(record.data(), record.capacity())? {
            return Ok(false);
        }
        for field in self.reader.fields(record)? {
            if !self.value(field.value, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
