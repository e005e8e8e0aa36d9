//! Preset listing

use colored::*;

use crate::presets::PRESETS;

/// Print every built-in axis with its values
pub fn list_presets() {
    println!("{}", format!("{} built-in axes:", PRESETS.len()).bold());
    println!();
    for preset in PRESETS {
        println!("  {} {}", "▸".cyan(), preset.axis.bold());
        println!("    {}", preset.description.dimmed());
        println!("    Values: {}", preset.values.join(", "));
        println!();
    }
}
