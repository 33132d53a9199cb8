//! Keyed enter/update/exit reconciliation of rendered elements.
//!
//! A [`Stage`] holds the elements currently on screen. Applying a new element
//! list joins it against the stage by id: new ids enter from a degenerate
//! state, surviving ids transition in place, missing ids transition out and
//! are removed once settled.

use crate::scene::{Scene, Shape, Tooltip, VisualElement};
use std::collections::{HashMap, HashSet};

/// The three disjoint partitions of a keyed join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    pub enter: Vec<String>,
    pub update: Vec<String>,
    pub exit: Vec<String>,
}

/// Diff the previous identity set against the next one. `enter` and
/// `update` follow `next` order; `exit` follows `previous` order.
pub fn join<'a>(
    previous: impl IntoIterator<Item = &'a str>,
    next: impl IntoIterator<Item = &'a str>,
) -> JoinPlan {
    let previous: Vec<&str> = previous.into_iter().collect();
    let known: HashSet<&str> = previous.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut plan = JoinPlan::default();

    for id in next {
        if !seen.insert(id) {
            continue;
        }
        if known.contains(id) {
            plan.update.push(id.to_string());
        } else {
            plan.enter.push(id.to_string());
        }
    }
    for id in previous {
        if !seen.contains(id) {
            plan.exit.push(id.to_string());
        }
    }
    plan
}

/// Transition durations, in milliseconds, per join partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub enter_ms: u64,
    pub update_ms: u64,
    pub exit_ms: u64,
}

impl Timing {
    /// Everything snaps to its target
    pub const INSTANT: Timing = Timing {
        enter_ms: 0,
        update_ms: 0,
        exit_ms: 0,
    };

    pub fn uniform(ms: u64) -> Self {
        Self {
            enter_ms: ms,
            update_ms: ms,
            exit_ms: ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Transition {
    from: Shape,
    from_opacity: f64,
    duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct LiveElement {
    /// Target state
    element: VisualElement,
    transition: Option<Transition>,
    exiting: bool,
}

/// The element set currently on screen
#[derive(Debug, Clone, Default)]
pub struct Stage {
    live: Vec<LiveElement>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.iter().filter(|l| !l.exiting).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the elements that are present (not exiting), in paint order
    pub fn ids(&self) -> Vec<&str> {
        self.live
            .iter()
            .filter(|l| !l.exiting)
            .map(|l| l.element.id.as_str())
            .collect()
    }

    /// Reconcile the stage against the next element list.
    ///
    /// Elements still exiting from a previous apply are dropped first, so a
    /// stale element can never be matched again. A new transition replaces any
    /// unfinished one, starting from the previous target.
    pub fn apply(&mut self, next: Vec<VisualElement>, timing: Timing) -> JoinPlan {
        self.live.retain(|l| !l.exiting);

        let plan = join(
            self.live.iter().map(|l| l.element.id.as_str()),
            next.iter().map(|e| e.id.as_str()),
        );

        let mut previous: HashMap<String, LiveElement> = self
            .live
            .drain(..)
            .map(|l| (l.element.id.clone(), l))
            .collect();

        let mut staged = Vec::with_capacity(next.len() + plan.exit.len());
        let mut placed = HashSet::new();
        for element in next {
            if !placed.insert(element.id.clone()) {
                continue;
            }
            let live = match previous.remove(&element.id) {
                Some(old) => LiveElement {
                    transition: transition(
                        old.element.shape,
                        old.element.paint.opacity,
                        &element,
                        timing.update_ms,
                    ),
                    element,
                    exiting: false,
                },
                None => {
                    let (from, from_opacity) = degenerate(&element.shape, element.paint.opacity);
                    LiveElement {
                        transition: transition(from, from_opacity, &element, timing.enter_ms),
                        element,
                        exiting: false,
                    }
                }
            };
            staged.push(live);
        }

        for id in &plan.exit {
            if let Some(mut old) = previous.remove(id) {
                let from = old.element.shape.clone();
                let from_opacity = old.element.paint.opacity;
                let (to, to_opacity) = degenerate(&from, from_opacity);
                old.element.shape = to;
                old.element.paint.opacity = to_opacity;
                old.transition = (timing.exit_ms > 0).then_some(Transition {
                    from,
                    from_opacity,
                    duration_ms: timing.exit_ms,
                });
                old.exiting = true;
                staged.push(old);
            }
        }

        self.live = staged;
        plan
    }

    /// Finish every transition and drop exited elements
    pub fn settle(&mut self) {
        self.live.retain(|l| !l.exiting);
        for l in &mut self.live {
            l.transition = None;
        }
    }

    /// Interpolated picture `elapsed_ms` after the last apply
    pub fn frame(&self, width: u32, height: u32, elapsed_ms: u64) -> Scene {
        let mut scene = Scene::new(width, height);
        for l in &self.live {
            let Some(t) = &l.transition else {
                if !l.exiting {
                    scene.push(l.element.clone());
                }
                continue;
            };
            let progress = if t.duration_ms == 0 {
                1.0
            } else {
                (elapsed_ms as f64 / t.duration_ms as f64).min(1.0)
            };
            if l.exiting && progress >= 1.0 {
                continue;
            }
            let mut element = l.element.clone();
            element.shape = interpolate(&t.from, &l.element.shape, progress);
            element.paint.opacity =
                t.from_opacity + (l.element.paint.opacity - t.from_opacity) * progress;
            scene.push(element);
        }
        scene
    }

    /// Settled picture: every element at its target, exited ones gone
    pub fn snapshot(&self, width: u32, height: u32) -> Scene {
        let mut scene = Scene::new(width, height);
        scene.extend(self.live.iter().filter(|l| !l.exiting).map(|l| l.element.clone()));
        scene
    }

    /// Hover content of a present element. Read-only.
    pub fn hover(&self, id: &str) -> Option<&Tooltip> {
        self.live
            .iter()
            .find(|l| !l.exiting && l.element.id == id)
            .and_then(|l| l.element.tooltip.as_ref())
    }
}

fn transition(
    from: Shape,
    from_opacity: f64,
    to: &VisualElement,
    duration_ms: u64,
) -> Option<Transition> {
    if duration_ms == 0 || (from == to.shape && from_opacity == to.paint.opacity) {
        return None;
    }
    Some(Transition {
        from,
        from_opacity,
        duration_ms,
    })
}

/// Starting point of an entering element and end point of an exiting one:
/// circles collapse to radius zero, everything else fades out.
fn degenerate(shape: &Shape, opacity: f64) -> (Shape, f64) {
    match shape {
        Shape::Circle { cx, cy, .. } => (
            Shape::Circle {
                cx: *cx,
                cy: *cy,
                r: 0.0,
            },
            opacity,
        ),
        other => (other.clone(), 0.0),
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_points(a: &[(f64, f64)], b: &[(f64, f64)], t: f64) -> Option<Vec<(f64, f64)>> {
    (a.len() == b.len()).then(|| {
        a.iter()
            .zip(b)
            .map(|(p, q)| (lerp(p.0, q.0, t), lerp(p.1, q.1, t)))
            .collect()
    })
}

fn interpolate(from: &Shape, to: &Shape, t: f64) -> Shape {
    if t >= 1.0 {
        return to.clone();
    }
    match (from, to) {
        (
            Shape::Circle { cx: x0, cy: y0, r: r0 },
            Shape::Circle { cx: x1, cy: y1, r: r1 },
        ) => Shape::Circle {
            cx: lerp(*x0, *x1, t),
            cy: lerp(*y0, *y1, t),
            r: lerp(*r0, *r1, t),
        },
        (Shape::Polyline { points: a }, Shape::Polyline { points: b }) => match lerp_points(a, b, t) {
            Some(points) => Shape::Polyline { points },
            None => to.clone(),
        },
        (Shape::Line { from: a0, to: a1 }, Shape::Line { from: b0, to: b1 }) => Shape::Line {
            from: (lerp(a0.0, b0.0, t), lerp(a0.1, b0.1, t)),
            to: (lerp(a1.0, b1.0, t), lerp(a1.1, b1.1, t)),
        },
        (
            Shape::Text { x: x0, y: y0, .. },
            Shape::Text { x: x1, y: y1, content, size, anchor, vertical, bold },
        ) => Shape::Text {
            x: lerp(*x0, *x1, t),
            y: lerp(*y0, *y1, t),
            content: content.clone(),
            size: *size,
            anchor: *anchor,
            vertical: *vertical,
            bold: *bold,
        },
        _ => to.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Paint;
    use plotters::style::RGBColor;

    fn dot(id: &str, cx: f64) -> VisualElement {
        VisualElement::new(
            id,
            Shape::Circle { cx, cy: 10.0, r: 8.0 },
            Paint::fill(RGBColor(1, 2, 3)),
        )
        .with_tooltip(crate::scene::Tooltip::new(id))
    }

    fn radius(scene: &Scene, id: &str) -> f64 {
        match scene.get(id).map(|e| &e.shape) {
            Some(Shape::Circle { r, .. }) => *r,
            other => panic!("no circle {}: {:?}", id, other),
        }
    }

    #[test]
    fn test_join_partitions() {
        let plan = join(["A", "B", "C"], ["B", "C", "D"]);
        assert_eq!(plan.enter, vec!["D"]);
        assert_eq!(plan.update, vec!["B", "C"]);
        assert_eq!(plan.exit, vec!["A"]);
    }

    #[test]
    fn test_join_ignores_duplicate_next_ids() {
        let plan = join(["A"], ["A", "A", "B", "B"]);
        assert_eq!(plan.update, vec!["A"]);
        assert_eq!(plan.enter, vec!["B"]);
    }

    #[test]
    fn test_stage_reconciles_in_place() {
        let mut stage = Stage::new();
        let first = stage.apply(vec![dot("A", 1.0), dot("B", 2.0), dot("C", 3.0)], Timing::INSTANT);
        assert_eq!(first.enter.len(), 3);

        let plan = stage.apply(vec![dot("B", 20.0), dot("C", 30.0), dot("D", 40.0)], Timing::INSTANT);
        assert_eq!(plan.enter, vec!["D"]);
        assert_eq!(plan.exit, vec!["A"]);
        assert_eq!(plan.update, vec!["B", "C"]);
        stage.settle();
        assert_eq!(stage.ids(), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_enter_grows_from_zero_radius() {
        let mut stage = Stage::new();
        stage.apply(vec![dot("A", 1.0)], Timing::uniform(600));
        assert_eq!(radius(&stage.frame(100, 100, 0), "A"), 0.0);
        assert_eq!(radius(&stage.frame(100, 100, 300), "A"), 4.0);
        assert_eq!(radius(&stage.frame(100, 100, 600), "A"), 8.0);
    }

    #[test]
    fn test_exit_shrinks_then_disappears() {
        let mut stage = Stage::new();
        stage.apply(vec![dot("A", 1.0)], Timing::INSTANT);
        stage.apply(vec![], Timing { enter_ms: 600, update_ms: 600, exit_ms: 300 });
        assert!(stage.is_empty());
        assert_eq!(radius(&stage.frame(100, 100, 150), "A"), 4.0);
        assert!(stage.frame(100, 100, 300).get("A").is_none());
        assert!(stage.hover("A").is_none());
    }

    #[test]
    fn test_exiting_element_is_not_matched_again() {
        let mut stage = Stage::new();
        stage.apply(vec![dot("A", 1.0)], Timing::INSTANT);
        stage.apply(vec![], Timing::uniform(300));
        let plan = stage.apply(vec![dot("A", 5.0)], Timing::uniform(300));
        assert_eq!(plan.enter, vec!["A"]);
        assert!(plan.exit.is_empty());
    }

    #[test]
    fn test_latest_transition_wins() {
        let mut stage = Stage::new();
        stage.apply(vec![dot("A", 0.0)], Timing::INSTANT);
        stage.apply(vec![dot("A", 100.0)], Timing::uniform(600));
        stage.apply(vec![dot("A", 50.0)], Timing::uniform(600));
        let end = stage.frame(100, 100, 600);
        assert_eq!(end.get("A").unwrap().shape, Shape::Circle { cx: 50.0, cy: 10.0, r: 8.0 });
        let start = stage.frame(100, 100, 0);
        assert_eq!(start.get("A").unwrap().shape, Shape::Circle { cx: 100.0, cy: 10.0, r: 8.0 });
    }

    #[test]
    fn test_hover_does_not_mutate() {
        let mut stage = Stage::new();
        stage.apply(vec![dot("A", 1.0)], Timing::INSTANT);
        let before = stage.snapshot(10, 10);
        assert_eq!(stage.hover("A").map(|t| t.title.as_str()), Some("A"));
        assert!(stage.hover("Z").is_none());
        assert_eq!(stage.snapshot(10, 10), before);
    }
}
