//! Proptest strategies for value trees.
//!
//! A [`ValueSpec`] is an arena-independent description of a tree; build it
//! into any context with [`ValueSpec::build`].

use chrono::{DateTime, FixedOffset};
use proptest::collection::vec;
use proptest::prelude::*;
use vellum_core::Value;
use vellum_doc::{BuildError, Context};

#[derive(Clone, Debug)]
pub enum ValueSpec {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    DateTime { millis: i64, offset: i32 },
    String(String),
    Symbol(String),
    Binary(Vec<u8>),
    Range(i64, i64),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Array(Vec<ValueSpec>),
    List(Vec<ValueSpec>),
    Map(Vec<(String, ValueSpec)>),
    Element {
        tag: String,
        attrs: Vec<(String, ValueSpec)>,
        children: Vec<ValueSpec>,
    },
}

impl ValueSpec {
    /// Build this tree in `ctx`, children first.
    pub fn build(&self, ctx: &mut Context) -> Result<Value, BuildError> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => ctx.int(*i)?,
            Self::Float(f) => ctx.float(*f)?,
            Self::Decimal(d) => ctx.decimal(d)?,
            Self::DateTime { millis, offset } => {
                let tz = FixedOffset::east_opt(*offset).expect("strategy keeps offsets in range");
                let utc = DateTime::from_timestamp_millis(*millis)
                    .expect("strategy keeps timestamps in range");
                ctx.datetime(utc.with_timezone(&tz))?
            }
            Self::String(s) => ctx.string(s)?,
            Self::Symbol(s) => ctx.symbol(s)?,
            Self::Binary(b) => ctx.binary(b)?,
            Self::Range(a, b) => ctx.range(*a, *b)?,
            Self::Ints(xs) => ctx.array_int().extend(xs.iter().copied()).finish()?,
            Self::Floats(xs) => ctx.array_float().extend(xs.iter().copied()).finish()?,
            Self::Array(items) => {
                let values = build_all(items, ctx)?;
                let mut b = ctx.array();
                for v in values {
                    b = b.push(v)?;
                }
                b.finish()?
            }
            Self::List(items) => {
                let values = build_all(items, ctx)?;
                let mut b = ctx.list();
                for v in values {
                    b = b.push(v)?;
                }
                b.finish()?
            }
            Self::Map(fields) => {
                let values = build_fields(fields, ctx)?;
                let mut b = ctx.map();
                for (name, v) in &values {
                    b = b.field(name, *v)?;
                }
                b.finish()?
            }
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                let attrs = build_fields(attrs, ctx)?;
                let children = build_all(children, ctx)?;
                let mut b = ctx.element(tag)?;
                for (name, v) in &attrs {
                    b = b.attr(name, *v)?;
                }
                for v in children {
                    b = b.child(v)?;
                }
                b.finish()?
            }
        })
    }

    /// Nesting depth; scalars are 0.
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) | Self::List(items) => deepest(items.iter()),
            Self::Map(fields) => deepest(fields.iter().map(|(_, v)| v)),
            Self::Element {
                attrs, children, ..
            } => deepest(attrs.iter().map(|(_, v)| v).chain(children)),
            _ => 0,
        }
    }
}

fn deepest<'a>(specs: impl Iterator<Item = &'a ValueSpec>) -> usize {
    specs.map(ValueSpec::depth).max().map_or(1, |d| d + 1)
}

fn build_all(items: &[ValueSpec], ctx: &mut Context) -> Result<Vec<Value>, BuildError> {
    items.iter().map(|s| s.build(ctx)).collect()
}

fn build_fields(
    fields: &[(String, ValueSpec)],
    ctx: &mut Context,
) -> Result<Vec<(String, Value)>, BuildError> {
    fields
        .iter()
        .map(|(name, s)| Ok((name.clone(), s.build(ctx)?)))
        .collect()
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn scalar() -> impl Strategy<Value = ValueSpec> {
    prop_oneof![
        Just(ValueSpec::Null),
        any::<bool>().prop_map(ValueSpec::Bool),
        any::<i64>().prop_map(ValueSpec::Int),
        any::<f64>().prop_map(ValueSpec::Float),
        (any::<i32>(), 0u32..10_000).prop_map(|(i, f)| ValueSpec::Decimal(format!("{i}.{f:04}"))),
        (-8_000_000_000_000i64..8_000_000_000_000, -86_399i32..=86_399)
            .prop_map(|(millis, offset)| ValueSpec::DateTime { millis, offset }),
        ".{0,24}".prop_map(ValueSpec::String),
        name().prop_map(ValueSpec::Symbol),
        vec(any::<u8>(), 0..24).prop_map(ValueSpec::Binary),
        (any::<i64>(), any::<i64>()).prop_map(|(a, b)| ValueSpec::Range(a, b)),
        vec(any::<i64>(), 0..8).prop_map(ValueSpec::Ints),
        vec(any::<f64>(), 0..8).prop_map(ValueSpec::Floats),
    ]
}

/// Arbitrary trees up to four levels deep.
pub fn value_spec() -> impl Strategy<Value = ValueSpec> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..6).prop_map(ValueSpec::Array),
            vec(inner.clone(), 0..6).prop_map(ValueSpec::List),
            vec((name(), inner.clone()), 0..6).prop_map(ValueSpec::Map),
            (name(), vec((name(), inner.clone()), 0..4), vec(inner, 0..4)).prop_map(
                |(tag, attrs, children)| ValueSpec::Element {
                    tag,
                    attrs,
                    children
                }
            ),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_doc::ContextConfig;

    proptest! {
        #[test]
        fn specs_always_build(spec in value_spec()) {
            let mut ctx = Context::new(ContextConfig::default()).unwrap();
            let v = spec.build(&mut ctx).unwrap();
            prop_assert!(ctx.is_owned(v));
        }
    }

    #[test]
    fn depth_counts_container_levels() {
        let spec = ValueSpec::List(vec![ValueSpec::Map(vec![("a".into(), ValueSpec::Null)])]);
        assert_eq!(spec.depth(), 2);
        assert_eq!(ValueSpec::Int(1).depth(), 0);
    }
}
