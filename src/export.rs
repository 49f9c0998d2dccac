//! Raster export of a [`Scene`].
//!
//! Geometry (links, strength marks, node discs) is rasterized with tiny-skia.
//! Runs of text primitives are written as a small SVG layer and composited
//! with resvg in draw order. Glyphs come from egui's bundled proportional
//! fonts, so export does not depend on system fonts.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use eframe::egui::{self, Color32, Pos2};
use resvg::usvg::{self, fontdb};
use thiserror::Error;
use tiny_skia::{
    FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform,
};

use crate::render::{DrawPrimitive, Scene, TextAnchor};

/// Largest edge accepted for an export surface.
pub const MAX_EXPORT_EDGE: u32 = 16_384;
const DASH_PATTERN: [f32; 2] = [8.0, 6.0];
const TOOLTIP_FONT_SIZE: f32 = 13.0;
const TOOLTIP_LINE_HEIGHT: f32 = 17.0;
const TOOLTIP_PADDING: f32 = 6.0;
const TOOLTIP_TEXT: Color32 = Color32::from_gray(240);
const TOOLTIP_FILL: Color32 = Color32::from_rgba_unmultiplied_const(12, 14, 18, 230);
const FALLBACK_FAMILY: &str = "sans-serif";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot export a {width}x{height} image")]
    InvalidSize { width: f32, height: f32 },
    #[error("failed to allocate {width}x{height} surface for PNG export")]
    Allocation { width: u32, height: u32 },
    #[error("failed to lay out export text: {0}")]
    Text(String),
    #[error("failed to encode PNG output: {0}")]
    Encode(String),
}

struct ExportFonts {
    database: Arc<fontdb::Database>,
    family: String,
}

fn export_fonts() -> &'static ExportFonts {
    static FONTS: OnceLock<ExportFonts> = OnceLock::new();
    FONTS.get_or_init(|| {
        let definitions = egui::FontDefinitions::default();
        let mut database = fontdb::Database::new();
        let mut family = None;
        let names = definitions
            .families
            .get(&egui::FontFamily::Proportional)
            .cloned()
            .unwrap_or_default();
        for name in &names {
            let Some(data) = definitions.font_data.get(name) else {
                continue;
            };
            let source = fontdb::Source::Binary(Arc::new(data.font.to_vec()));
            let ids = database.load_font_source(source);
            if family.is_none() {
                family = ids
                    .first()
                    .and_then(|id| database.face(*id))
                    .and_then(|face| face.families.first())
                    .map(|(name, _)| name.clone());
            }
        }
        let family = family.unwrap_or_else(|| FALLBACK_FAMILY.to_owned());
        tracing::debug!(faces = database.len(), %family, "loaded export fonts");
        ExportFonts {
            database: Arc::new(database),
            family,
        }
    })
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn svg_fill(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    format!(
        "fill=\"rgb({r},{g},{b})\" fill-opacity=\"{:.3}\"",
        f32::from(a) / 255.0
    )
}

/// Accumulates consecutive text primitives as SVG elements until the next
/// geometry primitive forces a flush.
#[derive(Default)]
struct TextLayer {
    body: String,
}

impl TextLayer {
    fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    fn text(
        &mut self,
        x: f32,
        baseline: f32,
        size: f32,
        anchor: &str,
        color: Color32,
        text: &str,
    ) {
        let _ = write!(
            self.body,
            "<text x=\"{x:.2}\" y=\"{baseline:.2}\" font-size=\"{size:.2}\" text-anchor=\"{anchor}\" {}>{}</text>",
            svg_fill(color),
            escape_xml(text)
        );
    }

    fn push(&mut self, primitive: &DrawPrimitive) {
        match primitive {
            DrawPrimitive::LinkLabel {
                position,
                text,
                size,
                color,
                ..
            } => {
                let baseline = position.y - size * 0.2;
                self.text(position.x, baseline, *size, "middle", *color, text);
            }
            DrawPrimitive::NodeLabel {
                position,
                text,
                size,
                color,
                anchor,
                ..
            } => {
                let (x_anchor, baseline) = match anchor {
                    TextAnchor::Center => ("middle", position.y + size * 0.35),
                    TextAnchor::TopCenter => ("middle", position.y + size * 0.8),
                    TextAnchor::LeftTop => ("start", position.y + size * 0.8),
                };
                self.text(position.x, baseline, *size, x_anchor, *color, text);
            }
            DrawPrimitive::Tooltip {
                position, lines, ..
            } => {
                let widest = lines
                    .iter()
                    .map(|line| line.chars().count())
                    .max()
                    .unwrap_or(0);
                let width = widest as f32 * TOOLTIP_FONT_SIZE * 0.55 + TOOLTIP_PADDING * 2.0;
                let height = lines.len() as f32 * TOOLTIP_LINE_HEIGHT + TOOLTIP_PADDING * 2.0;
                let _ = write!(
                    self.body,
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"4\" {}/>",
                    position.x - TOOLTIP_PADDING,
                    position.y - TOOLTIP_PADDING,
                    svg_fill(TOOLTIP_FILL)
                );
                for (row, line) in lines.iter().enumerate() {
                    let baseline =
                        position.y + row as f32 * TOOLTIP_LINE_HEIGHT + TOOLTIP_FONT_SIZE * 0.8;
                    self.text(
                        position.x,
                        baseline,
                        TOOLTIP_FONT_SIZE,
                        "start",
                        TOOLTIP_TEXT,
                        line,
                    );
                }
            }
            DrawPrimitive::Link { .. }
            | DrawPrimitive::StrengthMark { .. }
            | DrawPrimitive::Node { .. } => {}
        }
    }

    /// Renders the pending text onto `pixmap` and clears the layer.
    fn flush(&mut self, pixmap: &mut Pixmap) -> Result<(), ExportError> {
        if self.is_empty() {
            return Ok(());
        }
        let (width, height) = (pixmap.width(), pixmap.height());
        let document = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">{}</svg>",
            self.body
        );
        self.body.clear();

        let fonts = export_fonts();
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&fonts.database);
        options.font_family = fonts.family.clone();
        let tree = usvg::Tree::from_str(&document, &options)
            .map_err(|err| ExportError::Text(err.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        Ok(())
    }
}

fn surface_size(scene: &Scene) -> Result<(u32, u32), ExportError> {
    let (width, height) = (scene.size.x, scene.size.y);
    let invalid = || ExportError::InvalidSize { width, height };
    if !width.is_finite() || !height.is_finite() || width < 1.0 || height < 1.0 {
        return Err(invalid());
    }
    if width > MAX_EXPORT_EDGE as f32 || height > MAX_EXPORT_EDGE as f32 {
        return Err(invalid());
    }
    Ok((width.round() as u32, height.round() as u32))
}

fn paint_for(color: Color32) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn fill_circle(pixmap: &mut Pixmap, center: Pos2, radius: f32, color: Color32) {
    if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius.max(0.5)) {
        pixmap.fill_path(
            &path,
            &paint_for(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

fn stroke_circle(pixmap: &mut Pixmap, center: Pos2, radius: f32, color: Color32, width: f32) {
    if width <= 0.0 {
        return;
    }
    if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius.max(0.5)) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
    }
}

fn stroke_line(pixmap: &mut Pixmap, from: Pos2, to: Pos2, color: Color32, width: f32, dashed: bool) {
    let mut builder = PathBuilder::new();
    builder.move_to(from.x, from.y);
    builder.line_to(to.x, to.y);
    let Some(path) = builder.finish() else {
        return;
    };

    let dash = if dashed {
        StrokeDash::new(DASH_PATTERN.to_vec(), 0.0)
    } else {
        None
    };
    let stroke = Stroke {
        width,
        line_cap: if dashed { LineCap::Butt } else { LineCap::Round },
        dash,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
}

fn rasterize(scene: &Scene) -> Result<Pixmap, ExportError> {
    let (width, height) = surface_size(scene)?;
    let mut pixmap =
        Pixmap::new(width, height).ok_or(ExportError::Allocation { width, height })?;

    let [r, g, b, a] = scene.background.to_srgba_unmultiplied();
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

    let mut text = TextLayer::default();
    for primitive in &scene.primitives {
        match primitive {
            DrawPrimitive::Link {
                from,
                to,
                color,
                width,
                dashed,
                ..
            } => {
                text.flush(&mut pixmap)?;
                stroke_line(&mut pixmap, *from, *to, *color, *width, *dashed);
            }
            DrawPrimitive::StrengthMark {
                center,
                radius,
                color,
                ..
            } => {
                text.flush(&mut pixmap)?;
                fill_circle(&mut pixmap, *center, *radius, *color);
            }
            DrawPrimitive::Node {
                center,
                radius,
                fill,
                stroke,
                ..
            } => {
                text.flush(&mut pixmap)?;
                fill_circle(&mut pixmap, *center, *radius, *fill);
                stroke_circle(&mut pixmap, *center, *radius, stroke.color, stroke.width);
            }
            DrawPrimitive::LinkLabel { .. }
            | DrawPrimitive::NodeLabel { .. }
            | DrawPrimitive::Tooltip { .. } => text.push(primitive),
        }
    }
    text.flush(&mut pixmap)?;
    Ok(pixmap)
}

/// Rasterizes `scene` in draw order, labels and tooltip included, and
/// encodes it as PNG bytes.
pub fn export_png(scene: &Scene) -> Result<Vec<u8>, ExportError> {
    let pixmap = rasterize(scene)?;
    let bytes = pixmap
        .encode_png()
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    tracing::debug!(
        width = pixmap.width(),
        height = pixmap.height(),
        bytes = bytes.len(),
        "encoded graph snapshot"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Stroke as EguiStroke, vec2};

    use super::*;
    use crate::render::BACKGROUND;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn scene(width: f32, height: f32) -> Scene {
        Scene {
            size: vec2(width, height),
            background: BACKGROUND,
            primitives: vec![
                DrawPrimitive::Link {
                    id: "ab".to_owned(),
                    from: Pos2::new(10.0, 10.0),
                    to: Pos2::new(90.0, 60.0),
                    color: Color32::RED,
                    width: 3.0,
                    dashed: true,
                },
                DrawPrimitive::Node {
                    id: "a".to_owned(),
                    center: Pos2::new(10.0, 10.0),
                    radius: 8.0,
                    fill: Color32::LIGHT_BLUE,
                    stroke: EguiStroke::new(1.5, Color32::WHITE),
                },
                DrawPrimitive::NodeLabel {
                    node_id: "a".to_owned(),
                    position: Pos2::new(10.0, 22.0),
                    text: "Alice".to_owned(),
                    size: 12.0,
                    color: Color32::WHITE,
                    anchor: crate::render::TextAnchor::TopCenter,
                },
            ],
        }
    }

    #[test]
    fn test_export_produces_png() {
        let bytes = export_png(&scene(120.0, 80.0)).unwrap();
        assert!(bytes.len() > PNG_SIGNATURE.len());
        assert_eq!(bytes[..8], PNG_SIGNATURE);
    }

    #[test]
    fn test_export_rejects_degenerate_size() {
        let err = export_png(&scene(0.0, 80.0)).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSize { .. }));
        assert!(err.to_string().contains("0x80"));

        let err = export_png(&scene(f32::NAN, 80.0)).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSize { .. }));

        let err = export_png(&scene(MAX_EXPORT_EDGE as f32 * 2.0, 10.0)).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSize { .. }));
    }

    #[test]
    fn test_labels_are_rasterized() {
        let labelled = scene(120.0, 80.0);
        let mut bare = labelled.clone();
        bare.primitives
            .retain(|primitive| !matches!(primitive, DrawPrimitive::NodeLabel { .. }));

        let with_text = rasterize(&labelled).unwrap();
        let without_text = rasterize(&bare).unwrap();
        assert_ne!(with_text.data(), without_text.data());
        assert_ne!(export_png(&labelled).unwrap(), export_png(&bare).unwrap());
    }

    #[test]
    fn test_tooltip_and_link_label_are_rasterized() {
        let base = scene(160.0, 100.0);
        let mut annotated = base.clone();
        annotated.primitives.push(DrawPrimitive::LinkLabel {
            link_id: "ab".to_owned(),
            position: Pos2::new(50.0, 35.0),
            text: "rival & <sworn>".to_owned(),
            size: 10.0,
            color: Color32::WHITE,
        });
        annotated.primitives.push(DrawPrimitive::Tooltip {
            node_id: "a".to_owned(),
            position: Pos2::new(30.0, 40.0),
            lines: vec!["Alice".to_owned(), "3 relationships".to_owned()],
        });

        let plain = rasterize(&base).unwrap();
        let rich = rasterize(&annotated).unwrap();
        assert_ne!(plain.data(), rich.data());
    }

    #[test]
    fn test_export_fonts_come_from_bundled_faces() {
        let fonts = export_fonts();
        assert!(fonts.database.len() >= 3);
        assert_ne!(fonts.family, FALLBACK_FAMILY);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Tom & \"Jerry\" <3"), "Tom &amp; &quot;Jerry&quot; &lt;3");
    }

    #[test]
    fn test_empty_scene_still_exports_background() {
        let empty = Scene {
            size: vec2(16.0, 16.0),
            background: BACKGROUND,
            primitives: Vec::new(),
        };
        let bytes = export_png(&empty).unwrap();
        assert_eq!(bytes[..8], PNG_SIGNATURE);
    }
}
