use plotters::style::RGBColor;

// =============================================================================
// Scene Graph
// =============================================================================

/// Horizontal text alignment relative to the anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// Geometry of one visual element, in canvas coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Polyline {
        points: Vec<(f64, f64)>,
    },
    /// One or more filled rings (a map region, a stacked band)
    Polygons {
        rings: Vec<Vec<(f64, f64)>>,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        anchor: Anchor,
        /// Rotated a quarter turn counter-clockwise (vertical axis titles)
        vertical: bool,
        bold: bool,
    },
}

impl Shape {
    pub fn text(x: f64, y: f64, content: impl Into<String>, size: f64, anchor: Anchor) -> Self {
        Shape::Text {
            x,
            y,
            content: content.into(),
            size,
            anchor,
            vertical: false,
            bold: false,
        }
    }
}

/// Fill and stroke of an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub fill: Option<RGBColor>,
    pub stroke: Option<RGBColor>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Paint {
    pub fn fill(color: RGBColor) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }

    pub fn stroke(color: RGBColor, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            stroke_width: width,
            opacity: 1.0,
        }
    }

    pub fn with_stroke(mut self, color: RGBColor, width: f64) -> Self {
        self.stroke = Some(color);
        self.stroke_width = width;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Hover content: a bold title and label/value lines
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

impl Tooltip {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.lines.push((label.into(), value.into()));
        self
    }

    /// Plain-text form, one line per entry
    pub fn to_text(&self) -> String {
        let mut out = self.title.clone();
        for (label, value) in &self.lines {
            out.push('\n');
            out.push_str(label);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }
}

/// One rendered shape with a stable identity
#[derive(Debug, Clone, PartialEq)]
pub struct VisualElement {
    pub id: String,
    pub shape: Shape,
    pub paint: Paint,
    pub tooltip: Option<Tooltip>,
}

impl VisualElement {
    pub fn new(id: impl Into<String>, shape: Shape, paint: Paint) -> Self {
        Self {
            id: id.into(),
            shape,
            paint,
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: Tooltip) -> Self {
        self.tooltip = Some(tooltip);
        self
    }
}

/// The full drawing surface of one chart, painted in element order
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub elements: Vec<VisualElement>,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: RGBColor(255, 255, 255),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: VisualElement) {
        self.elements.push(element);
    }

    pub fn extend(&mut self, elements: impl IntoIterator<Item = VisualElement>) {
        self.elements.extend(elements);
    }

    pub fn get(&self, id: &str) -> Option<&VisualElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.id.as_str())
    }

    /// Uniformly rescaled copy whose width is `width`
    pub fn scaled_to(&self, width: u32) -> Scene {
        let k = width as f64 / self.width.max(1) as f64;
        let p = |(x, y): (f64, f64)| (x * k, y * k);
        let elements = self
            .elements
            .iter()
            .map(|e| {
                let shape = match &e.shape {
                    Shape::Circle { cx, cy, r } => Shape::Circle {
                        cx: cx * k,
                        cy: cy * k,
                        r: r * k,
                    },
                    Shape::Polyline { points } => Shape::Polyline {
                        points: points.iter().copied().map(p).collect(),
                    },
                    Shape::Polygons { rings } => Shape::Polygons {
                        rings: rings
                            .iter()
                            .map(|ring| ring.iter().copied().map(p).collect())
                            .collect(),
                    },
                    Shape::Rect { x, y, w, h } => Shape::Rect {
                        x: x * k,
                        y: y * k,
                        w: w * k,
                        h: h * k,
                    },
                    Shape::Line { from, to } => Shape::Line {
                        from: p(*from),
                        to: p(*to),
                    },
                    Shape::Text { x, y, content, size, anchor, vertical, bold } => Shape::Text {
                        x: x * k,
                        y: y * k,
                        content: content.clone(),
                        size: size * k,
                        anchor: *anchor,
                        vertical: *vertical,
                        bold: *bold,
                    },
                };
                VisualElement { shape, ..e.clone() }
            })
            .collect();
        Scene {
            width,
            height: (self.height as f64 * k).round() as u32,
            background: self.background,
            elements,
        }
    }
}

/// Plot area inside a canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// A canvas size with its margins; the inner plot area spans
/// `[left, left + width]` by `[top, top + height]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub outer_width: f64,
    pub outer_height: f64,
    pub margin: Margin,
}

impl Frame {
    pub fn new(outer_width: f64, outer_height: f64, margin: Margin) -> Self {
        Self {
            outer_width,
            outer_height,
            margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.outer_width - self.margin.left - self.margin.right
    }

    pub fn height(&self) -> f64 {
        self.outer_height - self.margin.top - self.margin.bottom
    }

    /// Horizontal pixel range of the plot area
    pub fn x_range(&self) -> (f64, f64) {
        (self.margin.left, self.margin.left + self.width())
    }

    /// Vertical pixel range, bottom to top
    pub fn y_range(&self) -> (f64, f64) {
        (self.margin.top + self.height(), self.margin.top)
    }

    /// Frame shifted right by `dx` (side-by-side panels)
    pub fn offset(&self, dx: f64) -> OffsetFrame {
        OffsetFrame { frame: *self, dx }
    }
}

/// A frame placed at a horizontal offset within a wider canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetFrame {
    pub frame: Frame,
    pub dx: f64,
}

impl OffsetFrame {
    pub fn x_range(&self) -> (f64, f64) {
        let (a, b) = self.frame.x_range();
        (a + self.dx, b + self.dx)
    }

    pub fn y_range(&self) -> (f64, f64) {
        self.frame.y_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ranges() {
        let frame = Frame::new(
            900.0,
            500.0,
            Margin { top: 50.0, right: 40.0, bottom: 60.0, left: 80.0 },
        );
        assert_eq!(frame.width(), 780.0);
        assert_eq!(frame.height(), 390.0);
        assert_eq!(frame.x_range(), (80.0, 860.0));
        assert_eq!(frame.y_range(), (440.0, 50.0));
        assert_eq!(frame.offset(100.0).x_range(), (180.0, 960.0));
    }

    #[test]
    fn test_tooltip_text() {
        let t = Tooltip::new("Kenya").line("Year", "2015").line("Access", "41.6%");
        assert_eq!(t.to_text(), "Kenya\nYear: 2015\nAccess: 41.6%");
    }

    #[test]
    fn test_scene_lookup() {
        let mut scene = Scene::new(10, 10);
        scene.push(VisualElement::new(
            "dot:a",
            Shape::Circle { cx: 1.0, cy: 1.0, r: 2.0 },
            Paint::fill(RGBColor(0, 0, 0)),
        ));
        assert!(scene.get("dot:a").is_some());
        assert_eq!(scene.ids().collect::<Vec<_>>(), vec!["dot:a"]);
    }

    #[test]
    fn test_scaled_to_width() {
        let mut scene = Scene::new(200, 100);
        scene.push(VisualElement::new(
            "dot",
            Shape::Circle { cx: 100.0, cy: 50.0, r: 4.0 },
            Paint::fill(RGBColor(0, 0, 0)),
        ));
        let half = scene.scaled_to(100);
        assert_eq!((half.width, half.height), (100, 50));
        assert_eq!(half.get("dot").unwrap().shape, Shape::Circle { cx: 50.0, cy: 25.0, r: 2.0 });
    }
}
