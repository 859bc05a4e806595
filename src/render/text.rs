use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::{
    assets::FontBook,
    foundation::core::Color,
    layout::{EstimateMeasurer, FaceSpec, FontWeight, TextMeasurer},
};

#[derive(Clone)]
struct LoadedFace {
    /// Family name as registered with the parley collection.
    family: String,
    weight: u16,
    font: vello_cpu::peniko::FontData,
}

/// One shaped single-line run, ready to paint.
pub(crate) struct ShapedLine {
    layout: parley::Layout<()>,
    font: vello_cpu::peniko::FontData,
    size_px: f32,
    pub(crate) width: f32,
}

/// Per-surface shaping engine. Measurement and painting go through the same
/// layout so fitted widths match what ends up on the surface.
pub(crate) struct TextEngine {
    fonts: Arc<FontBook>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    faces: HashMap<(String, FontWeight), Option<LoadedFace>>,
    registered: HashMap<(String, u16, u32), String>,
    warned_missing: bool,
}

impl TextEngine {
    pub(crate) fn new(fonts: Arc<FontBook>) -> Self {
        Self {
            fonts,
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            faces: HashMap::new(),
            registered: HashMap::new(),
            warned_missing: false,
        }
    }

    pub(crate) fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    fn face(&mut self, spec: FaceSpec<'_>) -> Option<LoadedFace> {
        let key = (spec.family.to_owned(), spec.weight);
        if let Some(cached) = self.faces.get(&key) {
            return cached.clone();
        }

        let loaded = match self.fonts.resolve(spec.family, spec.weight) {
            Some(resolved) => self.register(resolved),
            None => {
                if !self.warned_missing {
                    tracing::warn!(
                        family = spec.family,
                        "no font faces available; text is measured by estimate and not painted"
                    );
                    self.warned_missing = true;
                }
                None
            }
        };
        if let Some(face) = &loaded {
            tracing::debug!(
                requested = spec.family,
                family = %face.family,
                weight = face.weight,
                "resolved font face"
            );
        }
        self.faces.insert(key, loaded.clone());
        loaded
    }

    fn register(&mut self, resolved: crate::assets::ResolvedFace) -> Option<LoadedFace> {
        let reg_key = (resolved.family.clone(), resolved.weight, resolved.index);
        let family = match self.registered.get(&reg_key) {
            Some(name) => name.clone(),
            None => {
                let families = self.font_ctx.collection.register_fonts(
                    parley::fontique::Blob::from(resolved.data.as_ref().clone()),
                    None,
                );
                let name = families
                    .first()
                    .and_then(|(id, _)| self.font_ctx.collection.family_name(*id))
                    .map(str::to_owned);
                let Some(name) = name else {
                    tracing::warn!(family = %resolved.family, "font data registered no family");
                    return None;
                };
                self.registered.insert(reg_key, name.clone());
                name
            }
        };

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(resolved.data.as_ref().clone()),
            resolved.index,
        );
        Some(LoadedFace {
            family,
            weight: resolved.weight,
            font,
        })
    }

    /// Shape `text` as one unbroken line. `None` when no face is available.
    pub(crate) fn shape(
        &mut self,
        text: &str,
        spec: FaceSpec<'_>,
        size_px: f32,
    ) -> Option<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return None;
        }
        let face = self.face(spec)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(format!("\"{}\"", face.family))),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(face.weight)),
        ));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        let width = layout.width();

        Some(ShapedLine {
            layout,
            font: face.font,
            size_px,
            width,
        })
    }

    /// Paint a shaped line with its top-left corner at `origin`.
    pub(crate) fn paint(
        ctx: &mut vello_cpu::RenderContext,
        line: &ShapedLine,
        origin: (f64, f64),
        color: Color,
    ) {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate(origin));
        ctx.set_paint(color.to_cpu());

        for l in line.layout.lines() {
            for item in l.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&line.font)
                    .font_size(line.size_px)
                    .fill_glyphs(glyphs);
            }
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    }
}

impl TextMeasurer for TextEngine {
    fn measure_width(&mut self, text: &str, face: FaceSpec<'_>, size_px: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        match self.shape(text, face, size_px) {
            Some(line) => line.width,
            None => EstimateMeasurer.measure_width(text, face, size_px),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_falls_back_to_estimate() {
        let mut engine = TextEngine::new(Arc::new(FontBook::empty()));
        assert!(!engine.has_fonts());
        let face = FaceSpec::new("arial", FontWeight::Bold);
        assert!(engine.shape("Hello", face, 20.0).is_none());
        assert_eq!(engine.measure_width("Hello", face, 20.0), 5.0 * 20.0 * 0.6);
        assert_eq!(engine.measure_width("", face, 20.0), 0.0);
    }

    #[test]
    fn shaped_width_grows_with_text_and_size() {
        let fonts = FontBook::shared();
        if fonts.is_empty() {
            eprintln!("skipping: no system fonts available");
            return;
        }
        let mut engine = TextEngine::new(fonts);
        let face = FaceSpec::new("arial", FontWeight::Normal);
        let short = engine.measure_width("Ship", face, 40.0);
        let long = engine.measure_width("Ship small releases", face, 40.0);
        let bigger = engine.measure_width("Ship", face, 80.0);
        assert!(short > 0.0);
        assert!(long > short);
        assert!((bigger - 2.0 * short).abs() < 2.0, "{bigger} vs {short}");
    }
}
