use super::{frame, Chart, ChartKind};
use crate::aggregate::{retain_finite, Aggregation, DerivedRecord, GroupBy, Reduction};
use crate::axis::{self, Orient};
use crate::controller::{Control, CountryPicker, Selection};
use crate::curve::{monotone_x, DEFAULT_SAMPLES};
use crate::data::{Dataset, Field};
use crate::palette;
use crate::reconcile::Timing;
use crate::scale::{extent, zero_to_max, ContinuousScale, TickFormat};
use crate::scene::{Frame, Paint, Scene, Shape, VisualElement};
use anyhow::Result;
use tracing::debug;

const YEAR: &str = "year";
const INTENSITY: &str = "intensity";
const GROWTH: &str = "growth";

/// Scales of one country's view
#[derive(Debug, Clone, PartialEq)]
pub struct DualScales {
    pub x: ContinuousScale,
    pub left: ContinuousScale,
    pub right: ContinuousScale,
}

/// Energy intensity and GDP growth of one country over time, each against
/// its own vertical axis
pub struct DualAxis {
    dataset: Dataset,
    default_country: String,
    frame: Frame,
}

impl DualAxis {
    pub fn new(dataset: Dataset, default_country: &str) -> Self {
        Self {
            dataset,
            default_country: default_country.to_string(),
            frame: frame(800.0, 400.0, 60.0, 70.0, 50.0, 70.0),
        }
    }

    /// Year-ordered records of `country` with a positive intensity and a
    /// plausible growth rate
    pub fn derive(&self, country: &str) -> Vec<DerivedRecord> {
        let records = Aggregation::by(GroupBy::EntityYear)
            .filter(move |row| {
                let growth = row.get(Field::GdpGrowth);
                row.entity == country
                    && row.get(Field::EnergyIntensity) > 0.0
                    && growth > -100.0
                    && growth < 100.0
            })
            .measure(YEAR, Field::Year, Reduction::First)
            .measure(INTENSITY, Field::EnergyIntensity, Reduction::Mean)
            .measure(GROWTH, Field::GdpGrowth, Reduction::Mean)
            .run(&self.dataset);
        retain_finite(records, &[YEAR, INTENSITY, GROWTH])
    }

    /// `None` when there is nothing to scale
    pub fn scales(&self, records: &[DerivedRecord]) -> Option<DualScales> {
        let frame = &self.frame;
        Some(DualScales {
            x: ContinuousScale::linear(extent(records, YEAR)?, frame.x_range()),
            left: ContinuousScale::linear(zero_to_max(records, INTENSITY)?, frame.y_range()).nice(),
            right: ContinuousScale::linear(extent(records, GROWTH)?, frame.y_range()),
        })
    }
}

impl Chart for DualAxis {
    fn kind(&self) -> ChartKind {
        ChartKind::DualAxis
    }

    fn control(&self) -> Control {
        Control::Country(CountryPicker::new(self.dataset.entities(), &self.default_country))
    }

    fn timing(&self) -> Timing {
        Timing::uniform(800)
    }

    fn render(&self, selection: &Selection) -> Result<Scene> {
        let frame = &self.frame;
        let mut scene = Scene::new(frame.outer_width as u32, frame.outer_height as u32);
        let (x0, x1) = frame.x_range();
        let (y0, y1) = frame.y_range();
        let steelblue = palette::color("steelblue");
        let orangered = palette::color("orangered");

        scene.push(axis::heading(
            "title",
            (x0 + x1) / 2.0,
            y1 - 25.0,
            "Energy Intensity vs GDP Growth",
            16.0,
        ));
        scene.push(axis::title("x-title", (x0 + x1) / 2.0, y0 + 40.0, "Year", 12.0, false, palette::color("black")));
        scene.push(axis::title(
            "y-left-title",
            x0 - 50.0,
            (y0 + y1) / 2.0,
            "Energy Intensity (energy per economic output)",
            12.0,
            true,
            steelblue,
        ));
        scene.push(axis::title(
            "y-right-title",
            x1 + 50.0,
            (y0 + y1) / 2.0,
            "GDP Growth (%)",
            12.0,
            true,
            orangered,
        ));

        let Some(country) = selection.countries.first() else {
            return Ok(scene);
        };
        let records = self.derive(country);
        let Some(scales) = self.scales(&records) else {
            debug!(country = %country, "no usable rows");
            return Ok(scene);
        };

        scene.extend(axis::axis("x-axis", Orient::Bottom, &scales.x, y0, 6, TickFormat::Integer));
        scene.extend(axis::axis("y-left", Orient::Left, &scales.left, x0, 10, TickFormat::Auto));
        scene.extend(axis::axis("y-right", Orient::Right, &scales.right, x1, 10, TickFormat::Auto));

        if records.len() < 2 {
            debug!(country = %country, "single point, lines skipped");
            return Ok(scene);
        }
        let line = |scale: &ContinuousScale, field: &str| {
            let points: Vec<(f64, f64)> = records
                .iter()
                .map(|r| (scales.x.map(r.get(YEAR)), scale.map(r.get(field))))
                .collect();
            Shape::Polyline {
                points: monotone_x(&points, DEFAULT_SAMPLES),
            }
        };
        scene.push(VisualElement::new(
            "line-intensity",
            line(&scales.left, INTENSITY),
            Paint::stroke(steelblue, 2.0),
        ));
        scene.push(VisualElement::new(
            "line-growth",
            line(&scales.right, GROWTH),
            Paint::stroke(orangered, 2.0),
        ));

        Ok(scene)
    }
}
