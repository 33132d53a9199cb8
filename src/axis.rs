use crate::scale::{ContinuousScale, TickFormat};
use crate::scene::{Anchor, Paint, Shape, VisualElement};
use plotters::style::RGBColor;

const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
const TICK_FONT: f64 = 10.0;
const AXIS_COLOR: RGBColor = RGBColor(0, 0, 0);

/// Side of the plot the axis is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orient {
    Bottom,
    Left,
    Right,
}

/// Build an axis: the domain line, one tick mark and one label per tick.
///
/// `position` is the y coordinate of a bottom axis or the x coordinate of a
/// left/right axis. Ticks are keyed by their label so the reconciler keeps a
/// tick in place when it survives a domain change.
pub fn axis(
    id: &str,
    orient: Orient,
    scale: &ContinuousScale,
    position: f64,
    ticks: usize,
    format: TickFormat,
) -> Vec<VisualElement> {
    let line = Paint::stroke(AXIS_COLOR, 1.0);
    let (r0, r1) = scale.range;
    let mut out = Vec::new();

    let domain = match orient {
        Orient::Bottom => Shape::Line {
            from: (r0, position),
            to: (r1, position),
        },
        Orient::Left | Orient::Right => Shape::Line {
            from: (position, r0),
            to: (position, r1),
        },
    };
    out.push(VisualElement::new(format!("{}:domain", id), domain, line));

    for (value, label) in scale.tick_labels(ticks, format) {
        let v = scale.map(value);
        if !v.is_finite() {
            continue;
        }
        let (mark, text) = match orient {
            Orient::Bottom => (
                Shape::Line {
                    from: (v, position),
                    to: (v, position + TICK_SIZE),
                },
                Shape::text(
                    v,
                    position + TICK_SIZE + TICK_PADDING + TICK_FONT,
                    label.clone(),
                    TICK_FONT,
                    Anchor::Middle,
                ),
            ),
            Orient::Left => (
                Shape::Line {
                    from: (position - TICK_SIZE, v),
                    to: (position, v),
                },
                Shape::text(
                    position - TICK_SIZE - TICK_PADDING,
                    v + TICK_FONT * 0.32,
                    label.clone(),
                    TICK_FONT,
                    Anchor::End,
                ),
            ),
            Orient::Right => (
                Shape::Line {
                    from: (position, v),
                    to: (position + TICK_SIZE, v),
                },
                Shape::text(
                    position + TICK_SIZE + TICK_PADDING,
                    v + TICK_FONT * 0.32,
                    label.clone(),
                    TICK_FONT,
                    Anchor::Start,
                ),
            ),
        };
        out.push(VisualElement::new(format!("{}:tick:{}", id, label), mark, line));
        out.push(VisualElement::new(
            format!("{}:label:{}", id, label),
            text,
            Paint::fill(AXIS_COLOR),
        ));
    }

    out
}

/// A chart or axis title
pub fn title(
    id: &str,
    x: f64,
    y: f64,
    text: &str,
    size: f64,
    vertical: bool,
    color: RGBColor,
) -> VisualElement {
    VisualElement::new(
        id,
        Shape::Text {
            x,
            y,
            content: text.to_string(),
            size,
            anchor: Anchor::Middle,
            vertical,
            bold: false,
        },
        Paint::fill(color),
    )
}

/// Bold variant of [`title`]
pub fn heading(id: &str, x: f64, y: f64, text: &str, size: f64) -> VisualElement {
    let mut element = title(id, x, y, text, size, false, AXIS_COLOR);
    if let Shape::Text { bold, .. } = &mut element.shape {
        *bold = true;
    }
    element
}
