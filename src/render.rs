use crate::scene::{Anchor, Paint, Scene, Shape};
use crate::{OutputFormat, RenderOptions};
use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform, RGBAColor};
use std::path::Path;

/// Largest accepted output side, in pixels
pub const MAX_DIMENSION: u32 = 16_384;

/// Encode a scene in the requested format, rescaled to the requested width
pub fn encode_scene(scene: &Scene, opts: &RenderOptions) -> Result<Vec<u8>> {
    if let Some(width) = opts.width {
        if width == 0 || width > MAX_DIMENSION {
            bail!("Output width {} outside 1..={}", width, MAX_DIMENSION);
        }
    }
    let scaled;
    let scene = match opts.width {
        Some(width) if width != scene.width => {
            scaled = scene.scaled_to(width);
            &scaled
        }
        _ => scene,
    };
    match opts.format {
        OutputFormat::Svg => to_svg(scene).map(String::into_bytes),
        OutputFormat::Png => to_png(scene),
    }
}

/// Encode a scene and write it to `path`
pub fn write_scene(scene: &Scene, path: &Path, opts: &RenderOptions) -> Result<()> {
    let bytes = encode_scene(scene, opts)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))
}

/// Render a scene to an SVG document
pub fn to_svg(scene: &Scene) -> Result<String> {
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, (scene.width, scene.height)).into_drawing_area();
        paint_scene(&root, scene)?;
        root.present().context("Failed to present SVG drawing")?;
    }
    Ok(out)
}

/// Rasterize a scene and encode it as PNG
pub fn to_png(scene: &Scene) -> Result<Vec<u8>> {
    let (width, height) = (scene.width, scene.height);
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        bail!("Canvas {}x{} exceeds {} pixels per side", width, height, MAX_DIMENSION);
    }
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        paint_scene(&root, scene)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

fn pixel(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

fn fill_style(paint: &Paint) -> Option<ShapeStyle> {
    paint.fill.map(|c| ShapeStyle {
        color: c.mix(paint.opacity),
        filled: true,
        stroke_width: 0,
    })
}

fn stroke_style(paint: &Paint) -> Option<ShapeStyle> {
    match paint.stroke {
        Some(c) if paint.stroke_width > 0.0 => Some(ShapeStyle {
            color: c.mix(paint.opacity),
            filled: false,
            stroke_width: paint.stroke_width.round().max(1.0) as u32,
        }),
        _ => None,
    }
}

fn text_style<'a>(
    size: f64,
    bold: bool,
    color: &'a RGBAColor,
    anchor: Anchor,
    vertical: bool,
) -> TextStyle<'a> {
    let weight = if bold { FontStyle::Bold } else { FontStyle::Normal };
    let h = match anchor {
        Anchor::Start => HPos::Left,
        Anchor::Middle => HPos::Center,
        Anchor::End => HPos::Right,
    };
    let style = TextStyle::from(FontDesc::new(FontFamily::SansSerif, size, weight))
        .color(color)
        .pos(Pos::new(h, VPos::Bottom));
    if vertical {
        style.transform(FontTransform::Rotate270)
    } else {
        style
    }
}

/// Paint every element of the scene, in order, onto a drawing area
fn paint_scene<DB>(root: &DrawingArea<DB, Shift>, scene: &Scene) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&scene.background).context("Failed to fill background")?;

    for element in &scene.elements {
        let paint = &element.paint;
        if paint.opacity <= 0.0 {
            continue;
        }
        match &element.shape {
            Shape::Circle { cx, cy, r } => {
                if *r <= 0.0 {
                    continue;
                }
                let center = pixel((*cx, *cy));
                let radius = r.round().max(1.0) as u32;
                if let Some(style) = fill_style(paint) {
                    root.draw(&Circle::new(center, radius, style))
                        .with_context(|| format!("Failed to draw circle {}", element.id))?;
                }
                if let Some(style) = stroke_style(paint) {
                    root.draw(&Circle::new(center, radius, style))
                        .with_context(|| format!("Failed to draw circle {}", element.id))?;
                }
            }
            Shape::Polyline { points } => {
                let Some(style) = stroke_style(paint) else {
                    continue;
                };
                let path: Vec<(i32, i32)> = points.iter().copied().map(pixel).collect();
                root.draw(&PathElement::new(path, style))
                    .with_context(|| format!("Failed to draw line {}", element.id))?;
            }
            Shape::Polygons { rings } => {
                for ring in rings {
                    let path: Vec<(i32, i32)> = ring.iter().copied().map(pixel).collect();
                    if path.len() < 3 {
                        continue;
                    }
                    if let Some(style) = fill_style(paint) {
                        root.draw(&Polygon::new(path.clone(), style))
                            .with_context(|| format!("Failed to fill {}", element.id))?;
                    }
                    if let Some(style) = stroke_style(paint) {
                        let mut closed = path;
                        closed.push(closed[0]);
                        root.draw(&PathElement::new(closed, style))
                            .with_context(|| format!("Failed to outline {}", element.id))?;
                    }
                }
            }
            Shape::Rect { x, y, w, h } => {
                let corners = [pixel((*x, *y)), pixel((x + w, y + h))];
                if let Some(style) = fill_style(paint) {
                    root.draw(&Rectangle::new(corners, style))
                        .with_context(|| format!("Failed to draw rect {}", element.id))?;
                }
                if let Some(style) = stroke_style(paint) {
                    root.draw(&Rectangle::new(corners, style))
                        .with_context(|| format!("Failed to draw rect {}", element.id))?;
                }
            }
            Shape::Line { from, to } => {
                let Some(style) = stroke_style(paint) else {
                    continue;
                };
                root.draw(&PathElement::new(vec![pixel(*from), pixel(*to)], style))
                    .with_context(|| format!("Failed to draw line {}", element.id))?;
            }
            Shape::Text {
                x,
                y,
                content,
                size,
                anchor,
                vertical,
                bold,
            } => {
                let color = paint.fill.unwrap_or(BLACK).mix(paint.opacity);
                let style = text_style(*size, *bold, &color, *anchor, *vertical);
                root.draw_text(content, &style, pixel((*x, *y)))
                    .with_context(|| format!("Failed to draw text {}", element.id))?;
            }
        }
    }
    Ok(())
}
