use crate::RenderOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// World country outlines used by the map
pub const DEFAULT_BOUNDARIES: &str =
    "https://raw.githubusercontent.com/holtzy/D3-graph-gallery/master/DATA/world.geojson";

/// A labelled list of countries summed into one stacked-area panel
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceGroup {
    pub label: String,
    pub countries: Vec<String>,
}

impl ResourceGroup {
    fn new(label: &str, countries: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Settings shared by every chart. All fields are optional in the JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub data: PathBuf,
    pub boundaries: String,
    pub render: RenderOptions,
    pub animation_interval_ms: u64,
    pub default_country: String,
    pub default_year: i32,
    pub default_series: usize,
    pub max_series: usize,
    pub resource_groups: Vec<ResourceGroup>,
    /// Geometry name to dataset name
    pub name_fixes: BTreeMap<String, String>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/cleaned_sustainable_energy_data.csv"),
            boundaries: DEFAULT_BOUNDARIES.to_string(),
            render: RenderOptions::default(),
            animation_interval_ms: 1500,
            default_country: "Pakistan".to_string(),
            default_year: 2015,
            default_series: 3,
            max_series: 10,
            resource_groups: vec![
                ResourceGroup::new(
                    "Resource-Rich",
                    &["United States", "Russia", "China", "Saudi Arabia"],
                ),
                ResourceGroup::new("Resource-Poor", &["Pakistan", "Bangladesh", "Nepal", "Kenya"]),
            ],
            name_fixes: default_name_fixes(),
        }
    }
}

fn default_name_fixes() -> BTreeMap<String, String> {
    [
        ("United States of America", "United States"),
        ("Democratic Republic of the Congo", "Congo, Dem. Rep."),
        ("Republic of the Congo", "Congo"),
        ("Myanmar", "Burma"),
        ("Czechia", "Czech Republic"),
        ("North Macedonia", "Macedonia"),
        ("Eswatini", "Swaziland"),
        ("Russian Federation", "Russia"),
        ("Korea, South", "South Korea"),
        ("Korea, North", "North Korea"),
        ("Viet Nam", "Vietnam"),
        ("Iran (Islamic Republic of)", "Iran"),
        ("Venezuela (Bolivarian Republic of)", "Venezuela"),
        ("Lao People's Democratic Republic", "Laos"),
        ("Syrian Arab Republic", "Syria"),
        ("Bolivia (Plurinational State of)", "Bolivia"),
        ("United Republic of Tanzania", "Tanzania"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl VizConfig {
    /// Read a JSON config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config '{}'", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse config JSON")
    }
}
