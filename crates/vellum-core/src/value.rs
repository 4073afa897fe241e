//! The [`Value`] sum type, its kind discriminants, and record field kinds.

use std::fmt;

use crate::id::Ptr;

/// Discriminant of a [`Value`].
///
/// The numeric tag is what tagged slots store in memory. Tags outside this
/// table are rejected by [`ValueKind::from_tag`] rather than guessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    /// The null value.
    Null = 0,
    /// Boolean, stored inline.
    Bool = 1,
    /// Small integer (`i32`), stored inline.
    Int = 2,
    /// 64-bit integer, boxed in an arena.
    Int64 = 3,
    /// 64-bit float, boxed in an arena.
    Float = 4,
    /// Arbitrary-precision decimal.
    Decimal = 5,
    /// Timestamp with a fixed UTC offset.
    DateTime = 6,
    /// Content string (never interned).
    String = 7,
    /// Interned name.
    Symbol = 8,
    /// Raw bytes.
    Binary = 9,
    /// Inclusive integer range.
    Range = 10,
    /// Type descriptor.
    Type = 11,
    /// Generic array of tagged values.
    Array = 12,
    /// Array of `i64`.
    ArrayInt = 13,
    /// Array of `f64`.
    ArrayFloat = 14,
    /// List of tagged values.
    List = 15,
    /// Map with an interned field layout.
    Map = 16,
    /// Element: tag name, attributes, children.
    Element = 17,
    /// Evaluator-owned function handle.
    Function = 18,
}

impl ValueKind {
    /// Every kind, in tag order.
    pub const ALL: [ValueKind; 19] = [
        Self::Null,
        Self::Bool,
        Self::Int,
        Self::Int64,
        Self::Float,
        Self::Decimal,
        Self::DateTime,
        Self::String,
        Self::Symbol,
        Self::Binary,
        Self::Range,
        Self::Type,
        Self::Array,
        Self::ArrayInt,
        Self::ArrayFloat,
        Self::List,
        Self::Map,
        Self::Element,
        Self::Function,
    ];

    /// Decode a stored tag. Returns `None` for tags this build does not know.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// The stored tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether values of this kind carry their payload inline.
    pub fn is_inline(self) -> bool {
        matches!(self, Self::Null | Self::Bool | Self::Int)
    }

    /// Whether values of this kind reference other values.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Array | Self::ArrayInt | Self::ArrayFloat | Self::List | Self::Map | Self::Element
        )
    }

    /// Lower-case name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Binary => "binary",
            Self::Range => "range",
            Self::Type => "type",
            Self::Array => "array",
            Self::ArrayInt => "array<int>",
            Self::ArrayFloat => "array<float>",
            Self::List => "list",
            Self::Map => "map",
            Self::Element => "element",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime datum.
///
/// Inline kinds carry their payload directly; every other kind carries the
/// [`Ptr`] of an arena-resident payload. The pointer says nothing about
/// *which* arena owns it; that is what the ownership oracle decides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Value {
    /// Null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Small integer.
    Int(i32),
    /// Boxed `i64`.
    Int64(Ptr),
    /// Boxed `f64`.
    Float(Ptr),
    /// Decimal text payload.
    Decimal(Ptr),
    /// Timestamp payload.
    DateTime(Ptr),
    /// Content string payload.
    String(Ptr),
    /// Interned name payload.
    Symbol(Ptr),
    /// Byte payload.
    Binary(Ptr),
    /// Range payload.
    Range(Ptr),
    /// Type descriptor payload.
    Type(Ptr),
    /// Generic array header.
    Array(Ptr),
    /// `i64` array header.
    ArrayInt(Ptr),
    /// `f64` array header.
    ArrayFloat(Ptr),
    /// List header.
    List(Ptr),
    /// Map header.
    Map(Ptr),
    /// Element header.
    Element(Ptr),
    /// Function handle payload.
    Function(Ptr),
}

impl Value {
    /// The kind discriminant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float(_) => ValueKind::Float,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::String(_) => ValueKind::String,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::Binary(_) => ValueKind::Binary,
            Self::Range(_) => ValueKind::Range,
            Self::Type(_) => ValueKind::Type,
            Self::Array(_) => ValueKind::Array,
            Self::ArrayInt(_) => ValueKind::ArrayInt,
            Self::ArrayFloat(_) => ValueKind::ArrayFloat,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Element(_) => ValueKind::Element,
            Self::Function(_) => ValueKind::Function,
        }
    }

    /// The payload pointer, or `None` for inline kinds.
    pub fn ptr(&self) -> Option<Ptr> {
        match *self {
            Self::Null | Self::Bool(_) | Self::Int(_) => None,
            Self::Int64(p)
            | Self::Float(p)
            | Self::Decimal(p)
            | Self::DateTime(p)
            | Self::String(p)
            | Self::Symbol(p)
            | Self::Binary(p)
            | Self::Range(p)
            | Self::Type(p)
            | Self::Array(p)
            | Self::ArrayInt(p)
            | Self::ArrayFloat(p)
            | Self::List(p)
            | Self::Map(p)
            | Self::Element(p)
            | Self::Function(p) => Some(p),
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The 8-byte payload stored alongside (or instead of) a tag.
    pub fn payload(&self) -> u64 {
        match *self {
            Self::Null => 0,
            Self::Bool(b) => u64::from(b),
            Self::Int(i) => i64::from(i) as u64,
            _ => self.ptr().map_or(0, Ptr::addr),
        }
    }

    /// Re-attach a kind to a raw payload.
    ///
    /// This is the only place a tag and a payload are joined. A pointer kind
    /// with a zero payload decodes as [`Value::Null`], which is how zeroed
    /// record slots read back.
    pub fn from_parts(kind: ValueKind, payload: u64) -> Value {
        let p = Ptr::from_addr(payload);
        if !kind.is_inline() && p.is_null() {
            return Value::Null;
        }
        match kind {
            ValueKind::Null => Value::Null,
            ValueKind::Bool => Value::Bool(payload != 0),
            #[allow(clippy::cast_possible_truncation)]
            ValueKind::Int => Value::Int(payload as i64 as i32),
            ValueKind::Int64 => Value::Int64(p),
            ValueKind::Float => Value::Float(p),
            ValueKind::Decimal => Value::Decimal(p),
            ValueKind::DateTime => Value::DateTime(p),
            ValueKind::String => Value::String(p),
            ValueKind::Symbol => Value::Symbol(p),
            ValueKind::Binary => Value::Binary(p),
            ValueKind::Range => Value::Range(p),
            ValueKind::Type => Value::Type(p),
            ValueKind::Array => Value::Array(p),
            ValueKind::ArrayInt => Value::ArrayInt(p),
            ValueKind::ArrayFloat => Value::ArrayFloat(p),
            ValueKind::List => Value::List(p),
            ValueKind::Map => Value::Map(p),
            ValueKind::Element => Value::Element(p),
            ValueKind::Function => Value::Function(p),
        }
    }
}

/// Declared kind of a record field (map field or element attribute).
///
/// A field declared with a concrete kind stores only its payload, without a
/// tag; the kind lives in the shape. `Any` fields store a full tagged slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Tagged slot; accepts any value.
    Any,
    /// Untagged payload of a fixed kind.
    Of(ValueKind),
}

impl FieldKind {
    /// Stored byte used in shape entries for `Any`.
    pub const ANY_TAG: u8 = 0xFF;

    /// The narrowest declaration that holds `value`.
    pub fn of(value: &Value) -> Self {
        Self::Of(value.kind())
    }

    /// Bytes a field of this kind occupies in a record.
    pub fn width(self) -> u32 {
        match self {
            Self::Any => 16,
            Self::Of(ValueKind::Null) => 0,
            Self::Of(_) => 8,
        }
    }

    /// Whether `value` can be written into a field of this kind.
    ///
    /// Null is accepted by every pointer kind (it is the zero payload).
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Of(kind) => {
                kind == value.kind() || (value.is_null() && !kind.is_inline())
            }
        }
    }

    /// Encode for storage in a shape entry.
    pub fn to_tag(self) -> u8 {
        match self {
            Self::Any => Self::ANY_TAG,
            Self::Of(kind) => kind.tag(),
        }
    }

    /// Decode a shape entry byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        if tag == Self::ANY_TAG {
            Some(Self::Any)
        } else {
            ValueKind::from_tag(tag).map(Self::Of)
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Of(kind) => write!(f, "{kind}"),
        }
    }
}
