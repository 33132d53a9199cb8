use super::{frame, Chart, ChartKind};
use crate::aggregate::{join, retain_finite, Aggregation, DerivedRecord, GroupBy, Reduction};
use crate::axis::{self, Orient};
use crate::controller::{Control, Selection};
use crate::data::{Dataset, Field};
use crate::palette::{self, CategoricalPalette};
use crate::scale::{extent, format_fixed, positive_extent, ContinuousScale, TickFormat};
use crate::scene::{Frame, Paint, Scene, Shape, Tooltip, VisualElement};
use anyhow::Result;
use tracing::debug;

const INFLOWS: &str = "inflows";
const ACCESS_START: &str = "access_start";
const ACCESS_END: &str = "access_end";
const ACCESS_CHANGE: &str = "access_change";

/// Smallest lower bound of the inflow axis
const INFLOW_FLOOR: f64 = 1e5;

/// Total financial inflows per country against the change in electricity
/// access over the covered years
pub struct FlowsAccess {
    dataset: Dataset,
    palette: CategoricalPalette,
    frame: Frame,
}

impl FlowsAccess {
    pub fn new(dataset: Dataset) -> Self {
        let entities = dataset.entities();
        Self {
            palette: CategoricalPalette::tableau10(&entities),
            dataset,
            frame: frame(900.0, 500.0, 50.0, 40.0, 60.0, 80.0),
        }
    }

    /// One record per country that received any positive inflow, with a
    /// finite access change
    pub fn derive(&self) -> Vec<DerivedRecord> {
        let inflows = Aggregation::by(GroupBy::Entity)
            .filter(|row| row.get(Field::FinancialFlows) > 0.0)
            .measure(INFLOWS, Field::FinancialFlows, Reduction::Sum)
            .run(&self.dataset);
        let access = Aggregation::by(GroupBy::Entity)
            .measure(ACCESS_START, Field::ElectricityAccess, Reduction::First)
            .measure(ACCESS_END, Field::ElectricityAccess, Reduction::Last)
            .run(&self.dataset);

        let joined = join(inflows, &access)
            .into_iter()
            .map(|r| {
                let change = r.get(ACCESS_END) - r.get(ACCESS_START);
                r.with(ACCESS_CHANGE, change)
            })
            .collect();
        retain_finite(joined, &[INFLOWS, ACCESS_CHANGE])
    }
}

fn tooltip(country: &str, record: &DerivedRecord) -> Tooltip {
    Tooltip::new(country)
        .line("Inflows", format!("${}", format_fixed(record.get(INFLOWS).round(), 0)))
        .line("Access Change", format!("{:.1}%", record.get(ACCESS_CHANGE)))
}

impl Chart for FlowsAccess {
    fn kind(&self) -> ChartKind {
        ChartKind::FlowsAccess
    }

    fn control(&self) -> Control {
        Control::Fixed
    }

    fn render(&self, _selection: &Selection) -> Result<Scene> {
        let frame = &self.frame;
        let mut scene = Scene::new(frame.outer_width as u32, frame.outer_height as u32);
        let (x0, x1) = frame.x_range();
        let (y0, y1) = frame.y_range();
        let black = palette::color("black");

        scene.push(axis::heading(
            "title",
            (x0 + x1) / 2.0,
            y1 - 20.0,
            "Do More Financial Flows Lead to Greater Electricity Access?",
            18.0,
        ));
        scene.push(axis::title(
            "x-title",
            (x0 + x1) / 2.0,
            y0 + 45.0,
            "Total Financial Flows Received (US $)",
            14.0,
            false,
            black,
        ));
        scene.push(axis::title(
            "y-title",
            x0 - 60.0,
            (y0 + y1) / 2.0,
            "Electricity Access Increase (%)",
            14.0,
            true,
            black,
        ));

        let records = self.derive();
        let (Some(x_domain), Some((lo, hi))) = (
            positive_extent(&records, INFLOWS, Some(INFLOW_FLOOR)),
            extent(&records, ACCESS_CHANGE),
        ) else {
            debug!("no country with positive inflows");
            return Ok(scene);
        };
        let x = ContinuousScale::log(x_domain, frame.x_range())?;
        let y = ContinuousScale::linear((lo - 5.0, hi + 5.0), frame.y_range());

        scene.extend(axis::axis("x-axis", Orient::Bottom, &x, y0, 10, TickFormat::Si));
        scene.extend(axis::axis("y-axis", Orient::Left, &y, x0, 10, TickFormat::Auto));

        for record in &records {
            let Some(country) = record.key.entity() else {
                continue;
            };
            scene.push(
                VisualElement::new(
                    format!("dot:{}", country),
                    Shape::Circle {
                        cx: x.map(record.get(INFLOWS)),
                        cy: y.map(record.get(ACCESS_CHANGE)),
                        r: 6.0,
                    },
                    Paint::fill(self.palette.get(country)).with_opacity(0.8),
                )
                .with_tooltip(tooltip(country, record)),
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
        let r = |year: f64, flows: f64, access: f64| {
            vec![(Field::Year, year), (Field::FinancialFlows, flows), (Field::ElectricityAccess, access)]
        };
        let rows = [
            // listed out of year order on purpose
            ("Kenya", r(2010.0, 2.0e6, 30.0)),
            ("Kenya", r(2000.0, 1.0e6, 10.0)),
            ("Kenya", r(2005.0, f64::NAN, 20.0)),
            ("Chile", r(2000.0, 0.0, 90.0)),
            ("Chile", r(2010.0, -5.0, 99.0)),
            ("Nepal", r(2000.0, 5.0e4, 40.0)),
            ("Nepal", r(2010.0, 5.0e4, 35.5)),
        ];
        let rows: Vec<(&str, &[(Field, f64)])> =
            rows.iter().map(|(e, v)| (*e, v.as_slice())).collect();
        dataset(&rows)
    }

    #[test]
    fn test_countries_without_inflows_are_excluded() {
        let chart = FlowsAccess::new(sample());
        let records = chart.derive();
        let names: Vec<&str> = records.iter().filter_map(|r| r.key.entity()).collect();
        assert_eq!(names, vec!["Kenya", "Nepal"]);
    }

    #[test]
    fn test_access_change_uses_earliest_and_latest_year() {
        let chart = FlowsAccess::new(sample());
        let records = chart.derive();
        assert_eq!(records[0].get(INFLOWS), 3.0e6);
        assert_eq!(records[0].get(ACCESS_CHANGE), 20.0);
        assert_eq!(records[1].get(ACCESS_CHANGE), -4.5);
    }

    #[test]
    fn test_log_domain_floor_and_tooltip() {
        let chart = FlowsAccess::new(sample());
        let scene = chart.render(&Selection::default()).unwrap();
        // Nepal's 1e5 total sits exactly on the floor, at the left edge
        match scene.get("dot:Nepal").map(|e| &e.shape) {
            Some(Shape::Circle { cx, .. }) => assert!((cx - 80.0).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        let tip = scene.get("dot:Kenya").unwrap().tooltip.as_ref().unwrap();
        assert_eq!(tip.to_text(), "Kenya\nInflows: $3,000,000\nAccess Change: 20.0%");
        assert!(scene.get("x-axis:label:1M").is_some());
        assert!(scene.get("dot:Chile").is_none());
    }
}
