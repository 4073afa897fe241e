//! Benchmark profiles for the Vellum document runtime.
//!
//! - [`report_profile`]: a wide element tree (sections of paragraphs with
//!   attributes), the shape a typical rendered document takes.
//! - [`record_table`]: a list of same-shaped maps, exercising shape reuse.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use vellum_core::Value;
use vellum_doc::{BuildError, Context};

/// `<report>` with `sections` sections of `paragraphs` paragraphs each.
pub fn report_profile(
    ctx: &mut Context,
    sections: usize,
    paragraphs: usize,
) -> Result<Value, BuildError> {
    let title = ctx.string("Quarterly report")?;
    let report = ctx.element("report")?.attr("title", title)?.finish()?;
    for s in 0..sections {
        let heading = ctx.string(&format!("Section {s}"))?;
        let section = ctx
            .element("section")?
            .attr("id", Value::Int(s as i32))?
            .attr("heading", heading)?
            .finish()?;
        for p in 0..paragraphs {
            let text = ctx.string(&format!("Paragraph {p} of section {s}."))?;
            let style = ctx.symbol(if p % 3 == 0 { "lead" } else { "body" })?;
            let para = ctx.element("p")?.attr("style", style)?.child(text)?.finish()?;
            ctx.element_push_child(section, para)?;
        }
        ctx.element_push_child(report, section)?;
    }
    Ok(report)
}

/// A list of `rows` maps `{id, name, score, tags}`.
pub fn record_table(ctx: &mut Context, rows: usize) -> Result<Value, BuildError> {
    let table = ctx.list().finish()?;
    for i in 0..rows {
        let name = ctx.string(&format!("row-{i}"))?;
        let score = ctx.float(i as f64 * 0.5)?;
        let tags = ctx.array_int().extend([i as i64, (i * 2) as i64]).finish()?;
        let row = ctx
            .map()
            .field("id", Value::Int(i as i32))?
            .field("name", name)?
            .field("score", score)?
            .field("tags", tags)?
            .finish()?;
        ctx.list_push(table, row)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_doc::ContextConfig;

    #[test]
    fn report_profile_shape() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        let report = report_profile(&mut ctx, 3, 4).unwrap();
        let r = ctx.reader();
        let sections = r.element_children(report).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(r.len(sections[0]).unwrap(), 4);
        assert!(ctx.is_owned(report));
    }

    #[test]
    fn record_table_reuses_one_shape() {
        let mut ctx = Context::new(ContextConfig::default()).unwrap();
        let table = record_table(&mut ctx, 10).unwrap();
        assert_eq!(ctx.reader().len(table).unwrap(), 10);
        assert_eq!(ctx.shapes().len(), 1);
    }
}
