//! Reusable value trees.
//!
//! - [`every_kind`]: one value of each of the 19 kinds.
//! - [`article`]: an element tree mixing records, sequences and text.
//! - [`person`]: the small map used throughout the scenario tests.
//! - [`nested_lists`]: a list nested `depth` levels deep.

use chrono::{FixedOffset, TimeZone};
use vellum_core::{FieldKind, Value, ValueKind};
use vellum_doc::{BuildError, Context, TypeDesc};

/// One value per kind, in tag order.
pub fn every_kind(ctx: &mut Context) -> Result<Vec<Value>, BuildError> {
    let tz = FixedOffset::east_opt(2 * 3600).expect("offset in range");
    let when = tz
        .with_ymd_and_hms(2023, 6, 1, 8, 0, 0)
        .single()
        .expect("unambiguous timestamp");
    let id = ctx.intern_name("id")?;
    let shape = ctx.intern_shape(&[(id, FieldKind::Of(ValueKind::Int))])?;

    let s = ctx.string("text")?;
    let map = ctx.map().field("id", Value::Int(1))?.field("s", s)?.finish()?;
    let element = ctx.element("node")?.attr("id", Value::Int(2))?.child(s)?.finish()?;
    let array = ctx.array().push(Value::Bool(false))?.push(s)?.finish()?;
    let list = ctx.list().push(map)?.finish()?;

    Ok(vec![
        Value::Null,
        Value::Bool(true),
        Value::Int(-7),
        ctx.int(i64::MAX)?,
        ctx.float(std::f64::consts::PI)?,
        ctx.decimal("-12.500")?,
        ctx.datetime(when)?,
        s,
        ctx.symbol("sym")?,
        ctx.binary(&[0xde, 0xad, 0xbe, 0xef])?,
        ctx.range(-1, 1)?,
        ctx.type_desc(TypeDesc::of(ValueKind::Map).nullable().with_shape(shape.ptr()))?,
        array,
        ctx.array_int().extend([1, -2, 3]).finish()?,
        ctx.array_float().extend([0.5, f64::INFINITY]).finish()?,
        list,
        map,
        element,
        ctx.function_ref(99)?,
    ])
}

/// `{name, age, tags: ["x", "y"]}`.
pub fn person(ctx: &mut Context, name: &str, age: i32) -> Result<Value, BuildError> {
    let name = ctx.string(name)?;
    let x = ctx.string("x")?;
    let y = ctx.string("y")?;
    let tags = ctx.list().push(x)?.push(y)?.finish()?;
    ctx.map()
        .field("name", name)?
        .field("age", Value::Int(age))?
        .field("tags", tags)?
        .finish()
}

/// `<article lang="en"><h1>Title</h1><p class=…>…</p>…</article>`.
pub fn article(ctx: &mut Context, paragraphs: usize) -> Result<Value, BuildError> {
    let en = ctx.symbol("en")?;
    let title_text = ctx.string("Title")?;
    let title = ctx.element("h1")?.child(title_text)?.finish()?;
    let article = ctx.element("article")?.attr("lang", en)?.child(title)?.finish()?;
    for i in 0..paragraphs {
        let text = ctx.string(&format!("paragraph {i}"))?;
        let class = ctx.symbol(if i % 2 == 0 { "even" } else { "odd" })?;
        let p = ctx
            .element("p")?
            .attr("class", class)?
            .attr("index", Value::Int(i as i32))?
            .child(text)?
            .finish()?;
        ctx.element_push_child(article, p)?;
    }
    Ok(article)
}

/// `[[[…[]…]]]`, `depth` lists deep.
pub fn nested_lists(ctx: &mut Context, depth: usize) -> Result<Value, BuildError> {
    let mut v = ctx.list().finish()?;
    for _ in 1..depth {
        v = ctx.list().push(v)?.finish()?;
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_doc::ContextConfig;

    #[test]
    fn every_kind_covers_all_tags() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        let values = every_kind(&mut ctx).unwrap();
        let kinds: Vec<ValueKind> = values.iter().map(Value::kind).collect();
        assert_eq!(kinds, ValueKind::ALL);
        assert!(values.iter().all(|&v| ctx.is_owned(v)));
    }

    #[test]
    fn article_has_title_plus_paragraphs() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        let a = article(&mut ctx, 3).unwrap();
        assert_eq!(ctx.reader().len(a).unwrap(), 4);
    }
}
