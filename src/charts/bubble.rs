use super::{frame, Chart, ChartKind};
use crate::aggregate::{retain_finite, Aggregation, DerivedRecord, GroupBy, Reduction};
use crate::axis::{self, Orient};
use crate::controller::{Animation, Control, Selection};
use crate::data::{Dataset, Field};
use crate::palette::{self, CategoricalPalette};
use crate::reconcile::Timing;
use crate::scale::{format_fixed, ContinuousScale, TickFormat};
use crate::scene::{Anchor, Frame, Paint, Scene, Shape, Tooltip, VisualElement};
use anyhow::Result;
use tracing::debug;

const ACCESS: &str = "access";
const EMISSIONS: &str = "emissions";

/// Electricity access against CO₂ emissions, one frame per year
pub struct Bubble {
    dataset: Dataset,
    years: Vec<i32>,
    palette: CategoricalPalette,
    frame: Frame,
}

impl Bubble {
    pub fn new(dataset: Dataset) -> Self {
        let entities = dataset.entities();
        Self {
            years: dataset.years(),
            palette: CategoricalPalette::tableau10(&entities),
            frame: frame(900.0, 500.0, 50.0, 30.0, 60.0, 80.0),
            dataset,
        }
    }

    /// One record per country with both values positive in `year`
    pub fn frame_records(&self, year: i32) -> Vec<DerivedRecord> {
        let records = Aggregation::by(GroupBy::Entity)
            .filter(move |row| {
                row.year() == Some(year)
                    && row.get(Field::ElectricityAccess) > 0.0
                    && row.get(Field::Co2Emissions) > 0.0
            })
            .measure(ACCESS, Field::ElectricityAccess, Reduction::Mean)
            .measure(EMISSIONS, Field::Co2Emissions, Reduction::Mean)
            .run(&self.dataset);
        retain_finite(records, &[ACCESS, EMISSIONS])
    }
}

fn tooltip(country: &str, year: i32, record: &DerivedRecord) -> Tooltip {
    Tooltip::new(country)
        .line("Year", year.to_string())
        .line("Access", format!("{:.1}%", record.get(ACCESS)))
        .line("CO₂", format!("{} kt", format_fixed(record.get(EMISSIONS), 0)))
}

impl Chart for Bubble {
    fn kind(&self) -> ChartKind {
        ChartKind::Bubble
    }

    fn control(&self) -> Control {
        Control::Animation(Animation::new(self.years.clone()))
    }

    fn timing(&self) -> Timing {
        Timing {
            enter_ms: 600,
            update_ms: 600,
            exit_ms: 300,
        }
    }

    fn render(&self, selection: &Selection) -> Result<Scene> {
        let frame = &self.frame;
        let mut scene = Scene::new(frame.outer_width as u32, frame.outer_height as u32);
        let (x0, x1) = frame.x_range();
        let (y0, y1) = frame.y_range();
        let label_color = palette::color("#444");

        let records = match selection.year {
            Some(year) => self.frame_records(year),
            None => Vec::new(),
        };
        let max = records
            .iter()
            .map(|r| r.get(EMISSIONS))
            .fold(0.0, f64::max);

        // y and radius domains follow the frame; x is a fixed percentage
        let x = ContinuousScale::linear((0.0, 100.0), frame.x_range());
        let y = ContinuousScale::linear((0.0, max * 1.1), frame.y_range());
        let radius = ContinuousScale::sqrt((0.0, max), (3.0, 15.0))?;

        scene.extend(axis::axis("x-axis", Orient::Bottom, &x, y0, 10, TickFormat::Auto));
        if max > 0.0 {
            scene.extend(axis::axis("y-axis", Orient::Left, &y, x0, 10, TickFormat::Auto));
        }
        scene.push(axis::title(
            "x-title",
            (x0 + x1) / 2.0,
            y0 + 45.0,
            "Access to Electricity (% of Population)",
            14.0,
            false,
            label_color,
        ));
        scene.push(axis::title(
            "y-title",
            x0 - 60.0,
            (y0 + y1) / 2.0,
            "CO₂ Emissions (kt)",
            14.0,
            true,
            label_color,
        ));

        if let Some(year) = selection.year {
            scene.push(VisualElement::new(
                "year-label",
                Shape::Text {
                    x: x1 - 100.0,
                    y: y0 - 10.0,
                    content: year.to_string(),
                    size: 32.0,
                    anchor: Anchor::Start,
                    vertical: false,
                    bold: true,
                },
                Paint::fill(palette::color("#ccc")),
            ));
        }
        debug!(year = ?selection.year, bubbles = records.len(), "bubble frame");

        for record in &records {
            let Some(country) = record.key.entity() else {
                continue;
            };
            let emissions = record.get(EMISSIONS);
            scene.push(
                VisualElement::new(
                    format!("bubble:{}", country),
                    Shape::Circle {
                        cx: x.map(record.get(ACCESS)),
                        cy: y.map(emissions),
                        r: radius.map(emissions),
                    },
                    Paint::fill(self.palette.get(country)).with_opacity(0.8),
                )
                .with_tooltip(tooltip(country, selection.year.unwrap_or_default(), record)),
            );
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::dataset;

    fn sample() -> Dataset {
        let r = |year: f64, access: f64, co2: f64| {
            vec![(Field::Year, year), (Field::ElectricityAccess, access), (Field::Co2Emissions, co2)]
        };
        let india = [r(2000.0, 60.0, 1000.0), r(2001.0, 62.0, 1100.0)];
        let kenya = [r(2000.0, 20.0, 10.0), r(2001.0, 0.0, 12.0)];
        let nepal = [r(2001.0, 50.0, 100.0)];
        let mut rows: Vec<(&str, &[(Field, f64)])> = Vec::new();
        rows.extend(india.iter().map(|v| ("India", v.as_slice())));
        rows.extend(kenya.iter().map(|v| ("Kenya", v.as_slice())));
        rows.extend(nepal.iter().map(|v| ("Nepal", v.as_slice())));
        dataset(&rows)
    }

    fn bubble_ids(scene: &Scene) -> Vec<&str> {
        scene.ids().filter(|id| id.starts_with("bubble:")).collect()
    }

    #[test]
    fn test_frame_filters_non_positive_rows() {
        let chart = Bubble::new(sample());
        let scene = chart.render(&Selection::year(2001)).unwrap();
        assert_eq!(bubble_ids(&scene), vec!["bubble:India", "bubble:Nepal"]);
        let scene = chart.render(&Selection::year(2000)).unwrap();
        assert_eq!(bubble_ids(&scene), vec!["bubble:India", "bubble:Kenya"]);
    }

    #[test]
    fn test_largest_emitter_gets_largest_radius() {
        let chart = Bubble::new(sample());
        let scene = chart.render(&Selection::year(2000)).unwrap();
        match scene.get("bubble:India").map(|e| &e.shape) {
            Some(Shape::Circle { r, cx, .. }) => {
                assert!((r - 15.0).abs() < 1e-9);
                // 60% of the 790px wide plot, offset by the left margin
                assert!((cx - (80.0 + 0.6 * 790.0)).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tooltip_and_year_label() {
        let chart = Bubble::new(sample());
        let scene = chart.render(&Selection::year(2001)).unwrap();
        let tip = scene.get("bubble:India").unwrap().tooltip.as_ref().unwrap();
        assert_eq!(tip.to_text(), "India\nYear: 2001\nAccess: 62.0%\nCO₂: 1,100 kt");
        match &scene.get("year-label").unwrap().shape {
            Shape::Text { content, .. } => assert_eq!(content, "2001"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_control_starts_playing_on_first_year() {
        let chart = Bubble::new(sample());
        assert_eq!(chart.control().selection(), Selection::year(2000));
    }
}
