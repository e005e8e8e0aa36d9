//! Built-in selection axes
//!
//! The values a user can pick for the common variant axes. A render command
//! with no explicit `--values` uses every value of its axis.

/// A selection axis and its catalog of values
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub axis: &'static str,
    pub description: &'static str,
    pub values: &'static [&'static str],
}

pub const PRESETS: &[Preset] = &[
    Preset {
        axis: "camera_angle",
        description: "Model shots from different camera positions",
        values: &["front", "back", "left", "right", "three-quarter", "top-down"],
    },
    Preset {
        axis: "pack_shot",
        description: "Product-only shots for listings",
        values: &["flat-lay", "folded", "hanging", "ghost-mannequin", "detail"],
    },
];

/// Looks up a preset by axis name
pub fn find(axis: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.axis == axis)
}
