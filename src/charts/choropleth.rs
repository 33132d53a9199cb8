use super::{Chart, ChartKind};
use crate::aggregate::{Aggregation, GroupBy, Reduction};
use crate::axis;
use crate::controller::{Control, Selection, YearPicker};
use crate::data::{Dataset, Field};
use crate::geo::{BoundarySet, NameFixes, NaturalEarth};
use crate::palette;
use crate::scale::SequentialScale;
use crate::scene::{Anchor, Paint, Scene, Shape, Tooltip, VisualElement};
use anyhow::Result;
use plotters::style::RGBColor;
use std::collections::HashMap;
use tracing::debug;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const RENEWABLES: &str = "renewables";
const RAMP_STEPS: usize = 20;

/// Fill of countries without a value, kept apart from the ramp so that a
/// genuine 0 % stays distinguishable
pub const NO_DATA: RGBColor = RGBColor(0x22, 0x22, 0x22);

/// World map coloured by the renewable share of primary energy
pub struct Choropleth {
    dataset: Dataset,
    boundaries: BoundarySet,
    fixes: NameFixes,
    projection: NaturalEarth,
    color: SequentialScale,
    default_year: i32,
}

impl Choropleth {
    pub fn new(
        dataset: Dataset,
        boundaries: BoundarySet,
        fixes: NameFixes,
        default_year: i32,
    ) -> Self {
        Self {
            dataset,
            boundaries,
            fixes,
            projection: NaturalEarth::new(160.0, (WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0)),
            color: SequentialScale::new((0.0, 100.0)),
            default_year,
        }
    }

    /// Mean share per dataset entity in `year`; entities without any finite
    /// value are absent
    pub fn shares(&self, year: i32) -> HashMap<String, f64> {
        Aggregation::by(GroupBy::Entity)
            .filter(move |row| row.year() == Some(year))
            .measure(RENEWABLES, Field::RenewablesPrimary, Reduction::Mean)
            .run(&self.dataset)
            .into_iter()
            .filter_map(|r| {
                let value = r.get(RENEWABLES);
                let name = r.key.entity()?.to_string();
                value.is_finite().then_some((name, value))
            })
            .collect()
    }

    fn legend(&self) -> Vec<VisualElement> {
        let (x, y, w, h) = (40.0, HEIGHT as f64 - 50.0, 200.0, 10.0);
        let step = w / RAMP_STEPS as f64;
        let mut out: Vec<VisualElement> = (0..RAMP_STEPS)
            .map(|i| {
                let t = (i as f64 + 0.5) / RAMP_STEPS as f64;
                VisualElement::new(
                    format!("legend:ramp:{}", i),
                    Shape::Rect { x: x + i as f64 * step, y, w: step, h },
                    Paint::fill(self.color.map(t * 100.0)),
                )
            })
            .collect();
        let black = palette::color("black");
        for (value, anchor) in [(0.0, Anchor::Start), (100.0, Anchor::End)] {
            out.push(VisualElement::new(
                format!("legend:label:{}", value),
                Shape::text(x + w * value / 100.0, y + h + 14.0, format!("{}%", value), 11.0, anchor),
                Paint::fill(black),
            ));
        }
        out.push(VisualElement::new(
            "legend:no-data",
            Shape::Rect { x: x + w + 20.0, y, w: h, h },
            Paint::fill(NO_DATA),
        ));
        out.push(VisualElement::new(
            "legend:no-data-label",
            Shape::text(x + w + 20.0 + h + 5.0, y + h, "No data", 11.0, Anchor::Start),
            Paint::fill(black),
        ));
        out
    }
}

impl Chart for Choropleth {
    fn kind(&self) -> ChartKind {
        ChartKind::Choropleth
    }

    fn control(&self) -> Control {
        Control::Year(YearPicker::new(self.dataset.years(), self.default_year))
    }

    fn render(&self, selection: &Selection) -> Result<Scene> {
        let mut scene = Scene::new(WIDTH, HEIGHT);
        let shares = selection.year.map(|y| self.shares(y)).unwrap_or_default();
        let year = selection.year.map(|y| y.to_string()).unwrap_or_default();
        let outline = palette::color("#333");

        for (i, feature) in self.boundaries.features.iter().enumerate() {
            let rings = self.projection.project_boundary(feature);
            if rings.is_empty() {
                continue;
            }
            let value = shares.get(self.fixes.resolve(&feature.name)).copied();
            let fill = match value {
                Some(v) => self.color.map(v),
                None => NO_DATA,
            };
            let share = match value {
                Some(v) => format!("{:.1}%", v),
                None => "No data".to_string(),
            };
            let id = if feature.name.is_empty() {
                format!("country:#{}", i)
            } else {
                format!("country:{}", feature.name)
            };
            scene.push(
                VisualElement::new(
                    id,
                    Shape::Polygons { rings },
                    Paint::fill(fill).with_stroke(outline, 0.5),
                )
                .with_tooltip(
                    Tooltip::new(feature.name.clone())
                        .line("Renewable Share", share)
                        .line("Year", year.clone()),
                ),
            );
        }
        debug!(year = %year, matched = shares.len(), "map coloured");

        scene.push(axis::heading(
            "title",
            WIDTH as f64 / 2.0,
            30.0,
            "Global Renewable Energy Share (% of Primary Energy)",
            18.0,
        ));
        scene.extend(self.legend());
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::dataset;
    use std::collections::BTreeMap;

    const WORLD: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"name": "Russian Federation"},
         "geometry": {"type": "Polygon", "coordinates": [[[40,50],[60,50],[60,60],[40,60],[40,50]]]}},
        {"type": "Feature", "properties": {"name": "Kenya"},
         "geometry": {"type": "Polygon", "coordinates": [[[35,-3],[40,-3],[40,3],[35,3],[35,-3]]]}},
        {"type": "Feature", "properties": {"name": "Chad"},
         "geometry": {"type": "Polygon", "coordinates": [[[15,10],[22,10],[22,20],[15,20],[15,10]]]}}
      ]
    }"#;

    fn chart() -> Choropleth {
        let r = |year: f64, share: f64| vec![(Field::Year, year), (Field::RenewablesPrimary, share)];
        let rows = [
            ("Russia", r(2015.0, 6.0)),
            ("Russia", r(2015.0, 8.0)),
            (" Kenya ", r(2015.0, 0.0)),
            ("Chad", r(2015.0, f64::NAN)),
            ("Chad", r(2016.0, 50.0)),
        ];
        let rows: Vec<(&str, &[(Field, f64)])> =
            rows.iter().map(|(e, v)| (*e, v.as_slice())).collect();
        let mut table = BTreeMap::new();
        table.insert("Russian Federation".to_string(), "Russia".to_string());
        Choropleth::new(
            dataset(&rows),
            BoundarySet::parse(WORLD).unwrap(),
            NameFixes::new(table),
            2015,
        )
    }

    fn fill(scene: &Scene, id: &str) -> RGBColor {
        scene.get(id).and_then(|e| e.paint.fill).unwrap()
    }

    #[test]
    fn test_name_fixes_join_geometry_to_dataset() {
        let c = chart();
        let scene = c.render(&Selection::year(2015)).unwrap();
        assert_eq!(fill(&scene, "country:Russian Federation"), c.color.map(7.0));
        let tip = scene.get("country:Russian Federation").unwrap().tooltip.as_ref().unwrap();
        assert_eq!(tip.to_text(), "Russian Federation\nRenewable Share: 7.0%\nYear: 2015");
    }

    #[test]
    fn test_zero_share_differs_from_no_data() {
        let c = chart();
        let scene = c.render(&Selection::year(2015)).unwrap();
        assert_eq!(fill(&scene, "country:Kenya"), palette::plasma(0.0));
        assert_ne!(fill(&scene, "country:Kenya"), NO_DATA);
        assert_eq!(fill(&scene, "country:Chad"), NO_DATA);
        let tip = scene.get("country:Chad").unwrap().tooltip.as_ref().unwrap();
        assert_eq!(tip.lines[0].1, "No data");
    }

    #[test]
    fn test_year_change_recolours_in_place() {
        let c = chart();
        let before = c.render(&Selection::year(2015)).unwrap();
        let after = c.render(&Selection::year(2016)).unwrap();
        assert_eq!(before.ids().collect::<Vec<_>>(), after.ids().collect::<Vec<_>>());
        assert_eq!(fill(&after, "country:Chad"), c.color.map(50.0));
    }

    #[test]
    fn test_default_year_control() {
        assert_eq!(chart().control().selection(), Selection::year(2015));
    }
}
