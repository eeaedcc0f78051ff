//! Show layout information.

use std::path::PathBuf;

use framebooth_compose_core::{assign_sources, detect_unit_system};
use framebooth_layout_model::Element;

pub fn run(layout_path: PathBuf, sources: usize) -> anyhow::Result<()> {
    let layout = super::render::load_layout(&layout_path)?;

    println!("Layout: {}", layout_path.display());
    println!(
        "  Canvas: {}x{} (background {})",
        layout.canvas_width,
        layout.canvas_height,
        layout.background.to_hex()
    );
    println!("  Units: {:?}", detect_unit_system(&layout.elements));

    let mut counts = std::collections::BTreeMap::new();
    for element in &layout.elements {
        let kind = match element {
            Element::PhotoSlot { .. } => "photo-slot",
            Element::OverlayUpload { .. } => "overlay-upload",
            Element::Text { .. } => "text",
            Element::Shape { .. } => "shape",
            Element::BackgroundPhoto { .. } => "background-photo",
        };
        *counts.entry(kind).or_insert(0usize) += 1;
    }
    println!("  Elements: {}", layout.elements.len());
    for (kind, count) in counts {
        println!("    {kind}: {count}");
    }

    if let Err(err) = layout.validate() {
        println!("  [WARN] validation: {err}");
    }

    if sources > 0 {
        let assignments = assign_sources(&layout.declared_slot_sources(), sources);
        println!("  Slot assignment for {sources} source(s):");
        for (slot, assignment) in assignments.iter().enumerate() {
            match assignment {
                Some(index) => println!("    slot {slot} -> source {index}"),
                None => println!("    slot {slot} -> placeholder"),
            }
        }
    }

    Ok(())
}
