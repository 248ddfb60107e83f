//! Plain-text report of a stream

use anyhow::Result;

use exhibit_core::IndexStream;
use exhibit_views::ExhibitViewer;

pub fn print_stream(viewer: &ExhibitViewer, stream: &IndexStream) -> Result<()> {
    let store = viewer.store();
    println!("Stream: {} records", stream.len());
    for (template, indices) in stream.iter_templates() {
        let Some(def) = store.template(template) else {
            continue;
        };
        println!("  {} ({} of {})", def.id, indices.len(), def.count);
        for &index in indices {
            let record = store.record_at(index)?;
            println!("    [{:>4}] {:<8} {}", index, record.id, record.label);
        }
    }
    Ok(())
}

/// Group the stream by `attribute`, printing member counts and shares
pub fn print_categories(viewer: &ExhibitViewer, attribute: &str, stream: &IndexStream) -> Result<()> {
    let mut categories = match viewer.computed_range_categories(attribute, true, true)? {
        Some(categories) => categories,
        None => viewer.legend_categories(attribute, None, true)?,
    };
    let placed = viewer.fill(&mut categories, attribute, stream, None, None)?;

    println!("Categories of '{}': {} records placed", attribute, placed);
    for category in categories.iter().filter(|c| c.member_count() > 0) {
        let share = if placed == 0 {
            0
        } else {
            (category.member_count() * 100 + placed / 2) / placed
        };
        println!(
            "  {:<24} {:<8} {:>4} {:>3}%",
            category.label,
            category.color,
            category.member_count(),
            share
        );
    }
    Ok(())
}

/// Each template that declares `attribute`, ordered by it
pub fn print_order(viewer: &ExhibitViewer, attribute: &str, stream: &IndexStream) -> Result<()> {
    let templates: Vec<usize> = {
        let store = viewer.store();
        (0..stream.template_count())
            .filter(|&t| store.template_has_attribute(t, attribute))
            .collect()
    };

    for template in templates {
        let order = viewer.sorted_order(attribute, stream, template)?;
        let store = viewer.store();
        let template_id = store.template(template).map_or("?", |t| t.id.as_str());
        println!("Order of {} by '{}'", template_id, attribute);
        for entry in order {
            let label = &store.record_at(entry.index)?.label;
            let value = store.value_text(entry.index, attribute).unwrap_or_default();
            println!("    {:<24} {}", label, value);
        }
    }
    Ok(())
}
