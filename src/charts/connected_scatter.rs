use super::{frame, Chart, ChartKind};
use crate::aggregate::{Aggregation, DerivedRecord, GroupBy, Key, Reduction};
use crate::axis::{self, Orient};
use crate::config::VizConfig;
use crate::controller::{Control, Selection, SeriesPicker};
use crate::curve::{monotone_x, DEFAULT_SAMPLES};
use crate::data::{Dataset, Field};
use crate::palette::CategoricalPalette;
use crate::scale::{format_fixed, zero_to_max, ContinuousScale, TickFormat};
use crate::scene::{Frame, Paint, Scene, Shape, Tooltip, VisualElement};
use anyhow::{Context, Result};
use plotters::style::RGBColor;
use tracing::debug;

const GDP: &str = "gdp_per_capita";
const RENEW: &str = "renew_share";
const MIN_POINTS: usize = 3;

/// GDP per capita against renewable share, one connected path per country
pub struct ConnectedScatter {
    records: Vec<DerivedRecord>,
    entities: Vec<String>,
    palette: CategoricalPalette,
    frame: Frame,
    x: ContinuousScale,
    y: ContinuousScale,
    default_series: usize,
    max_series: usize,
}

impl ConnectedScatter {
    pub fn new(dataset: &Dataset, config: &VizConfig) -> Result<Self> {
        let records = Aggregation::by(GroupBy::EntityYear)
            .measure(GDP, Field::GdpPerCapita, Reduction::Mean)
            .measure(RENEW, Field::RenewableShare, Reduction::Mean)
            .run(dataset);
        let frame = frame(900.0, 500.0, 50.0, 40.0, 60.0, 80.0);

        // Scales span the whole dataset so paths stay comparable across selections
        let x_domain = zero_to_max(&records, GDP).context("No GDP per capita values")?;
        let y_domain = zero_to_max(&records, RENEW).context("No renewable share values")?;
        let x = ContinuousScale::linear(x_domain, frame.x_range()).nice();
        let y = ContinuousScale::linear(y_domain, frame.y_range()).nice();

        let entities = dataset.entities();
        Ok(Self {
            palette: CategoricalPalette::tableau10(&entities),
            records,
            entities,
            frame,
            x,
            y,
            default_series: config.default_series,
            max_series: config.max_series,
        })
    }

    /// Year-ordered points of one country with both values positive
    fn series(&self, country: &str) -> Vec<&DerivedRecord> {
        self.records
            .iter()
            .filter(|r| r.key.entity() == Some(country))
            .filter(|r| r.get(GDP) > 0.0 && r.get(RENEW) > 0.0)
            .collect()
    }
}

fn tooltip(country: &str, record: &DerivedRecord) -> Tooltip {
    let year = record.key.year().map(|y| y.to_string()).unwrap_or_default();
    Tooltip::new(country)
        .line("Year", year)
        .line("GDP/capita", format!("${}", format_fixed(record.get(GDP), 0)))
        .line("Renewable share", format!("{:.1}%", record.get(RENEW)))
}

impl Chart for ConnectedScatter {
    fn kind(&self) -> ChartKind {
        ChartKind::ConnectedScatter
    }

    fn control(&self) -> Control {
        Control::Series(SeriesPicker::new(
            self.entities.clone(),
            self.default_series,
            self.max_series,
        ))
    }

    fn render(&self, selection: &Selection) -> Result<Scene> {
        let frame = &self.frame;
        let mut scene = Scene::new(frame.outer_width as u32, frame.outer_height as u32);
        let (x0, x1) = frame.x_range();
        let (y0, y1) = frame.y_range();

        scene.extend(axis::axis("x-axis", Orient::Bottom, &self.x, y0, 10, TickFormat::Auto));
        scene.extend(axis::axis("y-axis", Orient::Left, &self.y, x0, 10, TickFormat::Auto));
        scene.push(axis::title(
            "x-title",
            (x0 + x1) / 2.0,
            y0 + 45.0,
            "GDP per Capita (US$)",
            14.0,
            false,
            RGBColor(0, 0, 0),
        ));
        scene.push(axis::title(
            "y-title",
            x0 - 60.0,
            (y0 + y1) / 2.0,
            "Renewable Energy Share (%)",
            14.0,
            true,
            RGBColor(0, 0, 0),
        ));

        for country in &selection.countries {
            let values = self.series(country);
            if values.len() < MIN_POINTS {
                debug!(country = %country, points = values.len(), "too few points, skipping");
                continue;
            }
            let color = self.palette.get(country);
            let points: Vec<(f64, f64)> = values
                .iter()
                .map(|r| (self.x.map(r.get(GDP)), self.y.map(r.get(RENEW))))
                .collect();

            scene.push(VisualElement::new(
                format!("line:{}", country),
                Shape::Polyline {
                    points: monotone_x(&points, DEFAULT_SAMPLES),
                },
                Paint::stroke(color, 2.0).with_opacity(0.7),
            ));
            for (record, &(cx, cy)) in values.iter().zip(&points) {
                let Key::EntityYear(_, year) = &record.key else {
                    continue;
                };
                scene.push(
                    VisualElement::new(
                        format!("dot:{}:{}", country, year),
                        Shape::Circle { cx, cy, r: 4.0 },
                        Paint::fill(color).with_opacity(0.9),
                    )
                    .with_tooltip(tooltip(country, record)),
                );
            }
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::dataset;

    fn sample() -> Dataset {
        let row = |year: f64, gdp: f64, renew: f64| {
            vec![(Field::Year, year), (Field::GdpPerCapita, gdp), (Field::RenewableShare, renew)]
        };
        let kenya: Vec<_> = (0..4)
            .map(|i| row(2000.0 + i as f64, 500.0 + 50.0 * i as f64, 70.0 + i as f64))
            .collect();
        let chad = [row(2000.0, 300.0, 90.0), row(2001.0, 320.0, 91.0)];
        let zero = [row(2000.0, 0.0, 10.0), row(2001.0, 900.0, 12.0), row(2002.0, 950.0, 13.0)];
        let mut rows: Vec<(&str, &[(Field, f64)])> = Vec::new();
        for r in &kenya {
            rows.push(("Kenya", r.as_slice()));
        }
        for r in &chad {
            rows.push(("Chad", r.as_slice()));
        }
        for r in &zero {
            rows.push(("Peru", r.as_slice()));
        }
        dataset(&rows)
    }

    fn chart() -> ConnectedScatter {
        ConnectedScatter::new(&sample(), &VizConfig::default()).unwrap()
    }

    #[test]
    fn test_scales_span_whole_dataset() {
        let c = chart();
        assert_eq!(c.x.domain, (0.0, 1000.0));
        assert_eq!(c.y.domain, (0.0, 100.0));
    }

    #[test]
    fn test_renders_line_and_dots_with_tooltips() {
        let c = chart();
        let scene = c.render(&Selection::countries(vec!["Kenya".into()])).unwrap();
        assert!(scene.get("line:Kenya").is_some());
        let dot = scene.get("dot:Kenya:2002").unwrap();
        let tip = dot.tooltip.as_ref().unwrap();
        assert_eq!(
            tip.to_text(),
            "Kenya\nYear: 2002\nGDP/capita: $600\nRenewable share: 72.0%"
        );
        assert_eq!(scene.ids().filter(|id| id.starts_with("dot:")).count(), 4);
    }

    #[test]
    fn test_short_series_are_skipped() {
        let c = chart();
        let scene = c
            .render(&Selection::countries(vec!["Chad".into(), "Peru".into()]))
            .unwrap();
        // Chad has two points; Peru has two after dropping the zero GDP row
        assert!(scene.ids().all(|id| !id.starts_with("line:") && !id.starts_with("dot:")));
    }

    #[test]
    fn test_initial_control_picks_distinct_countries() {
        let c = chart();
        assert_eq!(
            c.control().selection().countries,
            vec!["Chad".to_string(), "Kenya".to_string(), "Peru".to_string()]
        );
    }
}
