// Colour schemes: categorical Tableau10 and the sequential plasma ramp

use plotters::style::RGBColor;
use std::collections::HashMap;

/// d3 `schemeTableau10`
pub const TABLEAU10: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

/// Colour stops of the plasma ramp at t = 0, 1/8, ..., 1
const PLASMA_STOPS: [&str; 9] = [
    "#0d0887", "#4c02a1", "#7e03a8", "#a92395", "#cc4778", "#e56b5d", "#f89441", "#fdc328",
    "#f0f921",
];

/// Parse `#rrggbb`, `#rgb` or one of the named colours the charts use
pub fn parse_color(s: &str) -> Option<RGBColor> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let named = match s.to_ascii_lowercase().as_str() {
        "black" => "#000000",
        "white" => "#ffffff",
        "red" => "#ff0000",
        "green" => "#008000",
        "blue" => "#0000ff",
        "steelblue" => "#4682b4",
        "orangered" => "#ff4500",
        "gray" | "grey" => "#808080",
        _ => return None,
    };
    parse_hex(&named[1..])
}

fn parse_hex(hex: &str) -> Option<RGBColor> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(RGBColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(RGBColor(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// Fixed colour given as a literal; falls back to black if the literal is malformed
pub fn color(s: &str) -> RGBColor {
    parse_color(s).unwrap_or(RGBColor(0, 0, 0))
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

pub fn mix(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    RGBColor(
        lerp_channel(a.0, b.0, t),
        lerp_channel(a.1, b.1, t),
        lerp_channel(a.2, b.2, t),
    )
}

/// Plasma colour at `t` in [0, 1]; `t` is clamped
pub fn plasma(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let segments = (PLASMA_STOPS.len() - 1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(PLASMA_STOPS.len() - 2);
    let local = pos - i as f64;
    mix(color(PLASMA_STOPS[i]), color(PLASMA_STOPS[i + 1]), local)
}

/// Categorical colours assigned by position in a sorted key list, so a key
/// keeps its colour across frames and selections.
#[derive(Debug, Clone, Default)]
pub struct CategoricalPalette {
    assigned: HashMap<String, RGBColor>,
}

impl CategoricalPalette {
    pub fn tableau10<S: AsRef<str>>(keys: &[S]) -> Self {
        let assigned = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_ref().to_string(), color(TABLEAU10[i % TABLEAU10.len()])))
            .collect();
        Self { assigned }
    }

    pub fn get(&self, key: &str) -> RGBColor {
        self.assigned
            .get(key)
            .copied()
            .unwrap_or_else(|| color(TABLEAU10[0]))
    }
}
