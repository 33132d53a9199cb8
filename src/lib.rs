// Library exports for energyviz

pub mod aggregate;
pub mod axis;
pub mod charts;
pub mod config;
pub mod controller;
pub mod curve;
pub mod data;
pub mod error;
pub mod geo;
pub mod palette;
pub mod parser;
pub mod reconcile;
pub mod render;
pub mod runtime;
pub mod scale;
pub mod scene;
pub mod stack;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "svg")]
    #[default]
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RenderOptions {
    /// Output width in pixels; the chart's natural width when unset
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub format: OutputFormat,
}
