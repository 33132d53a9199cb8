use super::{frame, Chart, ChartKind};
use crate::aggregate::{Aggregation, GroupBy, Key, Reduction};
use crate::axis::{self, Orient};
use crate::config::ResourceGroup;
use crate::controller::{Control, Selection};
use crate::curve::{monotone_x, DEFAULT_SAMPLES};
use crate::data::{Dataset, Field};
use crate::palette;
use crate::scale::{ContinuousScale, TickFormat};
use crate::scene::{Anchor, Frame, Paint, Scene, Shape, VisualElement};
use crate::stack::{stack, stack_max, StackSeries};
use anyhow::Result;
use tracing::debug;

/// Stack order, bottom to top, with band colours and legend labels
const LAYERS: [(&str, Field, &str, &str); 3] = [
    ("fossil", Field::FossilElectricity, "#8e5c42", "Fossil"),
    ("nuclear", Field::NuclearElectricity, "#8e44ad", "Nuclear"),
    ("renew", Field::RenewableElectricity, "#27ae60", "Renew"),
];

const PANEL_WIDTH: f64 = 350.0;
const PANEL_HEIGHT: f64 = 250.0;

/// Side-by-side stacked areas of electricity generation by source, one
/// panel per resource group
pub struct EnergyMix {
    dataset: Dataset,
    groups: Vec<ResourceGroup>,
    panel: Frame,
}

impl EnergyMix {
    pub fn new(dataset: Dataset, groups: Vec<ResourceGroup>) -> Self {
        Self {
            dataset,
            groups,
            panel: frame(PANEL_WIDTH, PANEL_HEIGHT, 40.0, 20.0, 50.0, 60.0),
        }
    }

    /// Yearly sums of each source over the group's countries
    fn layers(&self, group: &ResourceGroup) -> Vec<StackSeries> {
        let members = &group.countries;
        let mut aggregation = Aggregation::by(GroupBy::Year)
            .filter(move |row| members.iter().any(|c| *c == row.entity));
        for (name, field, _, _) in LAYERS {
            aggregation = aggregation.measure(name, field, Reduction::Sum);
        }
        let records = aggregation.run(&self.dataset);
        let keys: Vec<&'static str> = LAYERS.iter().map(|l| l.0).collect();
        stack(&records, &keys, |r| match r.key {
            Key::Year(y) => Some(y as f64),
            _ => None,
        })
    }

    fn panel(&self, index: usize, group: &ResourceGroup) -> Result<Vec<VisualElement>> {
        let panel = self.panel.offset(index as f64 * PANEL_WIDTH);
        let id = |part: &str| format!("{}:{}", group.label, part);
        let (x0, x1) = panel.x_range();
        let (y0, y1) = panel.y_range();
        let mut out = Vec::new();

        out.push(axis::heading(
            &id("title"),
            (x0 + x1) / 2.0,
            y1 - 15.0,
            &format!("{} Countries", group.label),
            14.0,
        ));

        let series = self.layers(group);
        let years: Vec<f64> = series
            .first()
            .map(|s| s.points.iter().map(|p| p.x).collect())
            .unwrap_or_default();
        let (Some(first), Some(last), Some(top)) =
            (years.first(), years.last(), stack_max(&series))
        else {
            debug!(group = %group.label, "no generation data, panel left empty");
            return Ok(out);
        };

        let x = ContinuousScale::linear((*first, *last), panel.x_range());
        let y = ContinuousScale::linear((0.0, top), panel.y_range());

        for layer in &series {
            let Some(&(key, _, hex, _)) = LAYERS.iter().find(|l| l.0 == layer.key) else {
                continue;
            };
            if layer.points.len() < 2 {
                continue;
            }
            let upper: Vec<(f64, f64)> =
                layer.points.iter().map(|p| (x.map(p.x), y.map(p.y1))).collect();
            let lower: Vec<(f64, f64)> =
                layer.points.iter().map(|p| (x.map(p.x), y.map(p.y0))).collect();
            let mut ring = monotone_x(&upper, DEFAULT_SAMPLES);
            ring.extend(monotone_x(&lower, DEFAULT_SAMPLES).into_iter().rev());
            out.push(VisualElement::new(
                id(&format!("area:{}", key)),
                Shape::Polygons { rings: vec![ring] },
                Paint::fill(palette::color(hex)).with_opacity(0.85),
            ));
        }

        let axis_id = id("x-axis");
        out.extend(axis::axis(&axis_id, Orient::Bottom, &x, y0, 5, TickFormat::Integer));
        let axis_id = id("y-axis");
        out.extend(axis::axis(&axis_id, Orient::Left, &y, x0, 5, TickFormat::Auto));

        let label_color = palette::color("#333");
        out.push(axis::title(&id("x-title"), (x0 + x1) / 2.0, y0 + 40.0, "Year", 12.0, false, label_color));
        out.push(axis::title(
            &id("y-title"),
            x0 - 45.0,
            (y0 + y1) / 2.0,
            "Electricity Production (TWh)",
            12.0,
            true,
            label_color,
        ));

        for (i, (key, _, hex, label)) in LAYERS.iter().enumerate() {
            let lx = x1 - 100.0;
            let ly = y1 + i as f64 * 18.0;
            out.push(VisualElement::new(
                id(&format!("legend:{}", key)),
                Shape::Rect { x: lx, y: ly, w: 12.0, h: 12.0 },
                Paint::fill(palette::color(hex)),
            ));
            out.push(VisualElement::new(
                id(&format!("legend-label:{}", key)),
                Shape::text(lx + 18.0, ly + 10.0, *label, 12.0, Anchor::Start),
                Paint::fill(palette::color("#000")),
            ));
        }

        Ok(out)
    }
}

impl Chart for EnergyMix {
    fn kind(&self) -> ChartKind {
        ChartKind::EnergyMix
    }

    fn control(&self) -> Control {
        Control::Fixed
    }

    fn render(&self, _selection: &Selection) -> Result<Scene> {
        let panels = self.groups.len().max(1);
        let mut scene = Scene::new((PANEL_WIDTH * panels as f64) as u32, PANEL_HEIGHT as u32);
        for (i, group) in self.groups.iter().enumerate() {
            scene.extend(self.panel(i, group)?);
        }
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::dataset;

    fn group(label: &str, countries: &[&str]) -> ResourceGroup {
        ResourceGroup {
            label: label.to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn sample() -> Dataset {
        let r = |year: f64, fossil: f64, nuclear: f64, renew: f64| {
            vec![
                (Field::Year, year),
                (Field::FossilElectricity, fossil),
                (Field::NuclearElectricity, nuclear),
                (Field::RenewableElectricity, renew),
            ]
        };
        let a = [r(2000.0, 10.0, 1.0, 2.0), r(2001.0, 12.0, f64::NAN, 3.0)];
        let b = [r(2000.0, 5.0, 0.0, 1.0), r(2001.0, 6.0, 0.0, 1.0)];
        let c = [r(2000.0, 100.0, 100.0, 100.0)];
        let mut rows: Vec<(&str, &[(Field, f64)])> = Vec::new();
        rows.extend(a.iter().map(|v| ("A", v.as_slice())));
        rows.extend(b.iter().map(|v| ("B", v.as_slice())));
        rows.extend(c.iter().map(|v| ("C", v.as_slice())));
        dataset(&rows)
    }

    #[test]
    fn test_layers_sum_group_members_per_year() {
        let chart = EnergyMix::new(sample(), vec![group("Rich", &["A", "B"])]);
        let series = chart.layers(&chart.groups[0]);
        assert_eq!(series.len(), 3);
        let renew = &series[2];
        assert_eq!(renew.key, "renew");
        // 2001: fossil 18, nuclear 0 (NaN ignored), renew 4
        assert_eq!(renew.points[1].x, 2001.0);
        assert_eq!(renew.points[1].y0, 18.0);
        assert_eq!(renew.points[1].y1, 22.0);
        assert_eq!(stack_max(&series), Some(22.0));
    }

    #[test]
    fn test_panels_share_one_surface() {
        let chart = EnergyMix::new(
            sample(),
            vec![group("Rich", &["A"]), group("Poor", &["B"])],
        );
        let scene = chart.render(&Selection::default()).unwrap();
        assert_eq!((scene.width, scene.height), (700, 250));
        assert!(scene.get("Rich:area:fossil").is_some());
        assert!(scene.get("Poor:area:renew").is_some());
        match &scene.get("Poor:title").unwrap().shape {
            Shape::Text { content, x, .. } => {
                assert_eq!(content, "Poor Countries");
                assert!(*x > PANEL_WIDTH);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(scene.get("Rich:legend:nuclear").is_some());
    }

    #[test]
    fn test_group_without_rows_renders_title_only() {
        let chart = EnergyMix::new(sample(), vec![group("Empty", &["Nowhere"])]);
        let scene = chart.render(&Selection::default()).unwrap();
        assert_eq!(scene.ids().collect::<Vec<_>>(), vec!["Empty:title"]);
    }
}
