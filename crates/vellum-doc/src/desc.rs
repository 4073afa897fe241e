//! Type descriptor values.

use vellum_core::{Ptr, ValueKind};

/// Contents of a [`Value::Type`](vellum_core::Value::Type) payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDesc {
    /// The described kind.
    pub kind: ValueKind,
    /// Whether null is also admitted.
    pub nullable: bool,
    /// Interned record shape, for map and element types.
    pub shape: Option<Ptr>,
}

impl TypeDesc {
    /// A non-nullable descriptor of `kind` with no shape.
    pub fn of(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
            shape: None,
        }
    }

    /// Admit null as well.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach a record shape.
    pub fn with_shape(mut self, shape: Ptr) -> Self {
        self.shape = (!shape.is_null()).then_some(shape);
        self
    }
}
