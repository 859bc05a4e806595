use std::sync::Arc;

use kurbo::Shape as _;

use crate::{
    assets::{FontBook, ImageSource, PreparedImage},
    foundation::{
        core::{Canvas, Color},
        error::{CarouselError, CarouselResult},
    },
    layout::{FaceSpec, FontWeight, SizeRange, TextMeasurer, fit_font_size, wrap_text},
    model::TextAlign,
    render::{
        blur::blur_shadow_in_place,
        composite::{fill_premul, over_in_place, unpremultiply_rgba8},
        encode::{EncodedImage, ImageEncoding, encode_rgba8},
        text::{ShapedLine, TextEngine},
    },
};

/// Largest accepted surface edge, in pixels.
pub const MAX_DIMENSION: u32 = 16384;

const PATH_TOLERANCE: f64 = 0.1;

/// Parameters for [`CanvasSurface::draw_text`].
#[derive(Clone, Copy, Debug)]
pub struct TextSpec<'a> {
    pub text: &'a str,
    pub x: f64,
    /// Top of the first line.
    pub y: f64,
    pub font_size: f32,
    pub font_family: &'a str,
    pub color: Color,
    pub weight: FontWeight,
    pub align: TextAlign,
    pub max_width: Option<f32>,
    /// Defaults to `font_size * 1.2`.
    pub line_height: Option<f32>,
}

impl<'a> TextSpec<'a> {
    pub fn new(
        text: &'a str,
        x: f64,
        y: f64,
        font_size: f32,
        font_family: &'a str,
        color: Color,
    ) -> Self {
        Self {
            text,
            x,
            y,
            font_size,
            font_family,
            color,
            weight: FontWeight::Normal,
            align: TextAlign::Left,
            max_width: None,
            line_height: None,
        }
    }

    pub fn weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn max_width(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn line_height(mut self, line_height: f32) -> Self {
        self.line_height = Some(line_height);
        self
    }

    pub fn effective_line_height(&self) -> f32 {
        self.line_height.unwrap_or(self.font_size * 1.2)
    }
}

/// Lines actually laid out by one `draw_text` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub line_height: f32,
}

impl TextBlock {
    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * f64::from(self.line_height)
    }
}

/// Record of one text draw, kept for transcripts and inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub lines: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub font_size: f32,
    pub color: Color,
    pub weight: FontWeight,
    pub align: TextAlign,
}

impl TextRun {
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
    },
    /// Horizontal segment from (x, y) to (x + length, y), `thickness` tall and
    /// centered on `y`.
    Line {
        x: f64,
        y: f64,
        length: f64,
        thickness: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapePaint {
    pub fill: Option<Color>,
    pub stroke: Option<StrokeStyle>,
}

impl ShapePaint {
    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke = Some(StrokeStyle { color, width });
        self
    }
}

/// Drop shadow applied to subsequent draws while active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

enum Mark {
    Path {
        path: vello_cpu::kurbo::BezPath,
        color: Color,
    },
    Glyphs {
        line: ShapedLine,
        origin: (f64, f64),
        color: Color,
    },
    Image {
        paint: vello_cpu::Image,
        size: (f64, f64),
        rect: kurbo::Rect,
    },
}

struct SurfaceInner {
    /// Committed pixels, premultiplied RGBA8.
    base: Vec<u8>,
    scratch: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
    pending: bool,
    opacity: f32,
    shadow: Option<Shadow>,
    text: TextEngine,
    runs: Vec<TextRun>,
}

/// One fixed-size raster surface a slide is drawn into.
pub struct CanvasSurface {
    canvas: Canvas,
    background: Color,
    inner: Option<SurfaceInner>,
}

impl std::fmt::Debug for CanvasSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasSurface")
            .field("canvas", &self.canvas)
            .field("background", &self.background)
            .field("destroyed", &self.inner.is_none())
            .finish()
    }
}

impl CanvasSurface {
    /// Allocate a surface and fill it with `background`.
    pub fn new(
        width: u32,
        height: u32,
        background: Color,
        fonts: Arc<FontBook>,
    ) -> CarouselResult<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CarouselError::allocation(format!(
                "surface {width}x{height} outside 1..={MAX_DIMENSION}"
            )));
        }
        let len = (width as usize) * (height as usize) * 4;
        let mut base = Vec::new();
        base.try_reserve_exact(len).map_err(|e| {
            CarouselError::allocation(format!("surface {width}x{height}: {e}"))
        })?;
        base.resize(len, 0);
        fill_premul(&mut base, background.to_premul());

        let (w16, h16) = (width as u16, height as u16);
        tracing::debug!(width, height, %background, "surface created");

        Ok(Self {
            canvas: Canvas::new(width, height),
            background,
            inner: Some(SurfaceInner {
                base,
                scratch: vello_cpu::Pixmap::new(w16, h16),
                ctx: vello_cpu::RenderContext::new(w16, h16),
                pending: false,
                opacity: 1.0,
                shadow: None,
                text: TextEngine::new(fonts),
                runs: Vec::new(),
            }),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }

    /// Release all backing buffers. Later calls fail with `UseAfterDestroy`.
    pub fn destroy(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("surface destroyed");
        }
    }

    fn inner_mut(&mut self) -> CarouselResult<&mut SurfaceInner> {
        self.inner.as_mut().ok_or(CarouselError::UseAfterDestroy)
    }

    /// Reset to the background fill and forget recorded text.
    pub fn clear(&mut self) -> CarouselResult<()> {
        let bg = self.background.to_premul();
        let inner = self.inner_mut()?;
        inner.ctx.reset();
        inner.pending = false;
        inner.runs.clear();
        fill_premul(&mut inner.base, bg);
        Ok(())
    }

    pub fn has_fonts(&self) -> CarouselResult<bool> {
        let inner = self.inner.as_ref().ok_or(CarouselError::UseAfterDestroy)?;
        Ok(inner.text.has_fonts())
    }

    pub fn measure_text(
        &mut self,
        text: &str,
        font_family: &str,
        weight: FontWeight,
        font_size: f32,
    ) -> CarouselResult<f32> {
        let inner = self.inner_mut()?;
        Ok(inner
            .text
            .measure_width(text, FaceSpec::new(font_family, weight), font_size))
    }

    pub fn fit_font_size(
        &mut self,
        text: &str,
        max_width: f32,
        range: SizeRange,
        font_family: &str,
        weight: FontWeight,
    ) -> CarouselResult<f32> {
        let inner = self.inner_mut()?;
        Ok(fit_font_size(
            &mut inner.text,
            text,
            max_width,
            range,
            FaceSpec::new(font_family, weight),
        ))
    }

    pub fn wrap_text(
        &mut self,
        text: &str,
        max_width: f32,
        font_family: &str,
        weight: FontWeight,
        font_size: f32,
    ) -> CarouselResult<Vec<String>> {
        let inner = self.inner_mut()?;
        Ok(wrap_text(
            &mut inner.text,
            text,
            max_width,
            FaceSpec::new(font_family, weight),
            font_size,
        ))
    }

    /// Draw text anchored at the top of its first line. Empty text draws nothing.
    pub fn draw_text(&mut self, spec: &TextSpec<'_>) -> CarouselResult<TextBlock> {
        let inner = self.inner_mut()?;
        let line_height = spec.effective_line_height();
        if spec.text.trim().is_empty() {
            return Ok(TextBlock {
                lines: Vec::new(),
                line_height,
            });
        }

        let face = FaceSpec::new(spec.font_family, spec.weight);
        let lines = match spec.max_width {
            Some(max_width) => {
                wrap_text(&mut inner.text, spec.text, max_width, face, spec.font_size)
            }
            None => vec![spec.text.to_owned()],
        };

        let mut marks = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let Some(shaped) = inner.text.shape(line, face, spec.font_size) else {
                continue;
            };
            let top = spec.y + i as f64 * f64::from(line_height);
            let left = spec.align.left_edge(spec.x, f64::from(shaped.width));
            marks.push(Mark::Glyphs {
                line: shaped,
                origin: (left, top),
                color: spec.color,
            });
        }

        inner.runs.push(TextRun {
            lines: lines.clone(),
            x: spec.x,
            y: spec.y,
            font_size: spec.font_size,
            color: spec.color,
            weight: spec.weight,
            align: spec.align,
        });
        inner.emit(marks)?;

        Ok(TextBlock { lines, line_height })
    }

    pub fn draw_shape(&mut self, shape: Shape, paint: ShapePaint) -> CarouselResult<()> {
        let inner = self.inner_mut()?;
        let outline = match shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => path_from(
                kurbo::Rect::new(x, y, x + width, y + height).path_elements(PATH_TOLERANCE),
            ),
            Shape::Circle { cx, cy, radius } => {
                path_from(kurbo::Circle::new((cx, cy), radius).path_elements(PATH_TOLERANCE))
            }
            Shape::Line {
                x,
                y,
                length,
                thickness,
            } => {
                // A line is a filled bar; stroke color wins if no fill was given.
                let color = paint.fill.or(paint.stroke.map(|s| s.color));
                let Some(color) = color else {
                    return Ok(());
                };
                let half = thickness / 2.0;
                let bar = path_from(
                    kurbo::Rect::new(x, y - half, x + length, y + half)
                        .path_elements(PATH_TOLERANCE),
                );
                return inner.emit(vec![Mark::Path { path: bar, color }]);
            }
        };

        let mut marks = Vec::with_capacity(2);
        if let Some(fill) = paint.fill {
            marks.push(Mark::Path {
                path: outline.clone(),
                color: fill,
            });
        }
        if let Some(stroke) = paint.stroke {
            marks.push(Mark::Path {
                path: stroke_outline(&outline, stroke.width),
                color: stroke.color,
            });
        }
        inner.emit(marks)
    }

    /// Filled rounded rectangle built from lines and quadratic corners.
    pub fn draw_rounded_rect(
        &mut self,
        rect: kurbo::Rect,
        radius: f64,
        color: Color,
    ) -> CarouselResult<()> {
        let inner = self.inner_mut()?;
        inner.emit(vec![Mark::Path {
            path: rounded_rect_path(rect, radius),
            color,
        }])
    }

    /// Stroke the outline of a rounded rectangle, centered on its edge.
    pub fn stroke_rounded_rect(
        &mut self,
        rect: kurbo::Rect,
        radius: f64,
        stroke: StrokeStyle,
    ) -> CarouselResult<()> {
        let inner = self.inner_mut()?;
        let outline = rounded_rect_path(rect, radius);
        inner.emit(vec![Mark::Path {
            path: stroke_outline(&outline, stroke.width),
            color: stroke.color,
        }])
    }

    /// Decode `source` and draw it scaled into `rect`.
    ///
    /// Fails with `ImageLoad` when the source cannot be read or decoded; the
    /// surface is left untouched in that case.
    pub fn draw_image(&mut self, source: &ImageSource, rect: kurbo::Rect) -> CarouselResult<()> {
        self.inner_mut()?;
        let target = (
            rect.width().round().max(1.0) as u32,
            rect.height().round().max(1.0) as u32,
        );
        let prepared = source.load(Some(target))?;
        self.draw_prepared_image(&prepared, rect)
    }

    pub fn draw_prepared_image(
        &mut self,
        image: &PreparedImage,
        rect: kurbo::Rect,
    ) -> CarouselResult<()> {
        let inner = self.inner_mut()?;
        let pixmap = pixmap_from_premul(image.rgba8_premul.as_slice(), image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        inner.emit(vec![Mark::Image {
            paint,
            size: (f64::from(image.width), f64::from(image.height)),
            rect,
        }])
    }

    /// Fill `rect` with a linear gradient running from `from` to `to`.
    pub fn fill_linear_gradient(
        &mut self,
        rect: kurbo::Rect,
        from: kurbo::Point,
        to: kurbo::Point,
        stops: &[GradientStop],
    ) -> CarouselResult<()> {
        self.inner_mut()?;
        if stops.is_empty() {
            return Err(CarouselError::validation("gradient needs at least one stop"));
        }
        let rect = rect.abs();
        let w = rect.width().ceil().max(1.0) as u32;
        let h = rect.height().ceil().max(1.0) as u32;

        let mut sorted = stops.to_vec();
        sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let d = to - from;
        let len2 = d.hypot2();
        let mut px = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h {
            for x in 0..w {
                let p = kurbo::Point::new(
                    rect.x0 + f64::from(x) + 0.5,
                    rect.y0 + f64::from(y) + 0.5,
                );
                let t = if len2 > 0.0 {
                    ((p - from).dot(d) / len2).clamp(0.0, 1.0) as f32
                } else {
                    0.0
                };
                px.extend_from_slice(&gradient_at(&sorted, t).to_premul());
            }
        }

        let image = PreparedImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(px),
        };
        let draw_rect = kurbo::Rect::new(
            rect.x0,
            rect.y0,
            rect.x0 + f64::from(w),
            rect.y0 + f64::from(h),
        );
        self.draw_prepared_image(&image, draw_rect)
    }

    pub fn add_shadow(&mut self, shadow: Shadow) -> CarouselResult<()> {
        self.inner_mut()?.shadow = Some(shadow);
        Ok(())
    }

    pub fn remove_shadow(&mut self) -> CarouselResult<()> {
        self.inner_mut()?.shadow = None;
        Ok(())
    }

    /// Run `f` with `shadow` active; the shadow is cleared on every exit path.
    pub fn with_shadow<R>(
        &mut self,
        shadow: Shadow,
        f: impl FnOnce(&mut Self) -> CarouselResult<R>,
    ) -> CarouselResult<R> {
        self.add_shadow(shadow)?;
        let out = f(self);
        if let Some(inner) = self.inner.as_mut() {
            inner.shadow = None;
        }
        out
    }

    /// Run `f` so that everything it draws lands on the surface at `alpha`.
    pub fn with_opacity<R>(
        &mut self,
        alpha: f32,
        f: impl FnOnce(&mut Self) -> CarouselResult<R>,
    ) -> CarouselResult<R> {
        let prev = {
            let inner = self.inner_mut()?;
            inner.commit()?;
            let prev = inner.opacity;
            inner.opacity = prev * alpha.clamp(0.0, 1.0);
            prev
        };

        let out = f(self);

        let Some(inner) = self.inner.as_mut() else {
            return out;
        };
        let committed = inner.commit();
        inner.opacity = prev;
        let value = out?;
        committed?;
        Ok(value)
    }

    pub fn text_runs(&self) -> CarouselResult<&[TextRun]> {
        let inner = self.inner.as_ref().ok_or(CarouselError::UseAfterDestroy)?;
        Ok(&inner.runs)
    }

    /// Straight-alpha RGBA8 copy of the current contents.
    pub fn to_rgba8(&mut self) -> CarouselResult<Vec<u8>> {
        let inner = self.inner_mut()?;
        inner.commit()?;
        Ok(unpremultiply_rgba8(&inner.base))
    }

    /// Encode the current contents; the drawing itself is unaffected.
    pub fn serialize(
        &mut self,
        encoding: ImageEncoding,
        quality: f32,
    ) -> CarouselResult<Vec<u8>> {
        let (w, h) = (self.width(), self.height());
        let rgba = self.to_rgba8()?;
        encode_rgba8(w, h, rgba, encoding, quality)
    }

    pub fn encode(
        &mut self,
        encoding: ImageEncoding,
        quality: f32,
    ) -> CarouselResult<EncodedImage> {
        Ok(EncodedImage::new(encoding, self.serialize(encoding, quality)?))
    }

    pub fn to_data_uri(
        &mut self,
        encoding: ImageEncoding,
        quality: f32,
    ) -> CarouselResult<String> {
        Ok(self.encode(encoding, quality)?.to_data_uri())
    }
}

impl SurfaceInner {
    fn emit(&mut self, marks: Vec<Mark>) -> CarouselResult<()> {
        if marks.is_empty() {
            return Ok(());
        }
        if let Some(shadow) = self.shadow
            && shadow.color.a > 0
        {
            self.commit()?;
            for mark in &marks {
                emit_mark(
                    &mut self.ctx,
                    mark,
                    (shadow.offset_x, shadow.offset_y),
                    Some(shadow.color),
                );
            }
            self.composite_shadow(shadow)?;
        }

        for mark in &marks {
            emit_mark(&mut self.ctx, mark, (0.0, 0.0), None);
        }
        self.pending = true;
        Ok(())
    }

    fn render_scratch(&mut self) {
        self.ctx.flush();
        self.scratch.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.scratch);
        self.ctx.reset();
    }

    /// Rasterize pending marks and composite them onto `base` at the current opacity.
    fn commit(&mut self) -> CarouselResult<()> {
        if !self.pending {
            return Ok(());
        }
        self.render_scratch();
        self.pending = false;
        over_in_place(&mut self.base, self.scratch.data_as_u8_slice(), self.opacity)
    }

    /// Blur the silhouette now in the scratch layer and composite it onto `base`.
    fn composite_shadow(&mut self, shadow: Shadow) -> CarouselResult<()> {
        self.render_scratch();
        let (w, h) = (
            u32::from(self.scratch.width()),
            u32::from(self.scratch.height()),
        );
        let region =
            blur_shadow_in_place(self.scratch.data_as_u8_slice_mut(), w, h, shadow.blur)?;
        if region.is_none() {
            return Ok(());
        }
        over_in_place(&mut self.base, self.scratch.data_as_u8_slice(), self.opacity)
    }
}

fn emit_mark(
    ctx: &mut vello_cpu::RenderContext,
    mark: &Mark,
    offset: (f64, f64),
    silhouette: Option<Color>,
) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    let shift = vello_cpu::kurbo::Affine::translate(offset);
    match mark {
        Mark::Path { path, color } => {
            ctx.set_transform(shift);
            ctx.set_paint(silhouette.unwrap_or(*color).to_cpu());
            ctx.fill_path(path);
        }
        Mark::Glyphs {
            line,
            origin,
            color,
        } => {
            let at = (origin.0 + offset.0, origin.1 + offset.1);
            TextEngine::paint(ctx, line, at, silhouette.unwrap_or(*color));
        }
        Mark::Image { paint, size, rect } => {
            if let Some(color) = silhouette {
                ctx.set_transform(shift);
                ctx.set_paint(color.to_cpu());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(rect.x0, rect.y0, rect.x1, rect.y1));
            } else {
                let sx = rect.width() / size.0;
                let sy = rect.height() / size.1;
                ctx.set_transform(
                    vello_cpu::kurbo::Affine::translate((rect.x0, rect.y0))
                        * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy),
                );
                ctx.set_paint(paint.clone());
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, size.0, size.1));
            }
        }
    }
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn path_from(els: impl IntoIterator<Item = kurbo::PathEl>) -> vello_cpu::kurbo::BezPath {
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in els {
        p.push(el);
    }
    p
}

fn stroke_outline(path: &vello_cpu::kurbo::BezPath, width: f64) -> vello_cpu::kurbo::BezPath {
    let stroked = kurbo::stroke(
        path.elements().iter().copied(),
        &kurbo::Stroke::new(width),
        &kurbo::StrokeOpts::default(),
        PATH_TOLERANCE,
    );
    path_from(stroked.elements().iter().copied())
}

fn rounded_rect_path(rect: kurbo::Rect, radius: f64) -> vello_cpu::kurbo::BezPath {
    let rect = rect.abs();
    let r = radius
        .max(0.0)
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0);
    let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);

    let mut p = vello_cpu::kurbo::BezPath::new();
    p.move_to((x0 + r, y0));
    p.line_to((x1 - r, y0));
    p.quad_to((x1, y0), (x1, y0 + r));
    p.line_to((x1, y1 - r));
    p.quad_to((x1, y1), (x1 - r, y1));
    p.line_to((x0 + r, y1));
    p.quad_to((x0, y1), (x0, y1 - r));
    p.line_to((x0, y0 + r));
    p.quad_to((x0, y0), (x0 + r, y0));
    p.close_path();
    p
}

fn gradient_at(stops: &[GradientStop], t: f32) -> Color {
    let first = stops[0];
    if t <= first.offset || stops.len() == 1 {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            let lerp = |x: u8, y: u8| -> u8 {
                (f32::from(x) + (f32::from(y) - f32::from(x)) * k).round() as u8
            };
            return Color::rgba(
                lerp(a.color.r, b.color.r),
                lerp(a.color.g, b.color.g),
                lerp(a.color.b, b.color.b),
                lerp(a.color.a, b.color.a),
            );
        }
    }
    stops[stops.len() - 1].color
}

fn pixmap_from_premul(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> CarouselResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CarouselError::image_load("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CarouselError::image_load("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(CarouselError::image_load("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(w: u32, h: u32, bg: Color) -> CanvasSurface {
        CanvasSurface::new(w, h, bg, Arc::new(FontBook::empty())).unwrap()
    }

    fn px(rgba: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * w + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn new_fills_background() {
        let mut s = surface(4, 3, Color::rgb(1, 2, 3));
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(rgba.len(), 4 * 3 * 4);
        assert!(rgba.chunks_exact(4).all(|p| p == [1, 2, 3, 255]));
    }

    #[test]
    fn zero_or_huge_dimensions_are_allocation_errors() {
        let fonts = Arc::new(FontBook::empty());
        for (w, h) in [(0, 10), (10, 0), (MAX_DIMENSION + 1, 10)] {
            let err = CanvasSurface::new(w, h, Color::WHITE, fonts.clone()).unwrap_err();
            assert!(matches!(err, CarouselError::Allocation(_)), "{w}x{h}");
        }
    }

    #[test]
    fn filled_rect_covers_its_pixels_only() {
        let mut s = surface(20, 20, Color::WHITE);
        s.draw_shape(
            Shape::Rect {
                x: 5.0,
                y: 5.0,
                width: 10.0,
                height: 10.0,
            },
            ShapePaint::fill(Color::rgb(255, 0, 0)),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 20, 10, 10), [255, 0, 0, 255]);
        assert_eq!(px(&rgba, 20, 1, 1), [255, 255, 255, 255]);
        assert_eq!(px(&rgba, 20, 18, 18), [255, 255, 255, 255]);
    }

    #[test]
    fn line_is_a_bar_centered_on_y() {
        let mut s = surface(40, 20, Color::WHITE);
        s.draw_shape(
            Shape::Line {
                x: 4.0,
                y: 8.0,
                length: 30.0,
                thickness: 2.0,
            },
            ShapePaint::fill(Color::BLACK),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        // Spans y = 7..9.
        assert_eq!(px(&rgba, 40, 20, 7), [0, 0, 0, 255]);
        assert_eq!(px(&rgba, 40, 20, 8), [0, 0, 0, 255]);
        assert_eq!(px(&rgba, 40, 20, 5), [255, 255, 255, 255]);
        assert_eq!(px(&rgba, 40, 20, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn opacity_scope_blends_with_background() {
        let mut s = surface(10, 10, Color::WHITE);
        s.with_opacity(0.3, |s| {
            s.draw_shape(
                Shape::Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 10.0,
                    height: 10.0,
                },
                ShapePaint::fill(Color::BLACK),
            )
        })
        .unwrap();
        let p = px(&s.to_rgba8().unwrap(), 10, 5, 5);
        assert!(p[0] > 170 && p[0] < 185, "{p:?}");
        assert_eq!(p[3], 255);
    }

    #[test]
    fn shadow_scope_always_clears() {
        let mut s = surface(10, 10, Color::WHITE);
        let shadow = Shadow {
            color: Color::rgba(0, 0, 0, 26),
            blur: 4.0,
            offset_x: 2.0,
            offset_y: 2.0,
        };
        let res: CarouselResult<()> =
            s.with_shadow(shadow, |_| Err(CarouselError::validation("boom")));
        assert!(res.is_err());
        assert!(s.inner.as_ref().unwrap().shadow.is_none());
    }

    #[test]
    fn shadow_darkens_pixels_outside_the_shape() {
        let mut s = surface(30, 30, Color::WHITE);
        let shadow = Shadow {
            color: Color::rgba(0, 0, 0, 128),
            blur: 2.0,
            offset_x: 4.0,
            offset_y: 4.0,
        };
        s.with_shadow(shadow, |s| {
            s.draw_rounded_rect(
                kurbo::Rect::new(5.0, 5.0, 15.0, 15.0),
                2.0,
                Color::rgb(0, 0, 255),
            )
        })
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 30, 10, 10), [0, 0, 255, 255]);
        let shadowed = px(&rgba, 30, 17, 17);
        assert!(shadowed[0] < 255, "{shadowed:?}");
        assert_eq!(px(&rgba, 30, 28, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn prepared_image_is_scaled_into_rect() {
        let mut s = surface(20, 20, Color::WHITE);
        let img = PreparedImage {
            width: 1,
            height: 1,
            rgba8_premul: Arc::new(vec![0, 255, 0, 255]),
        };
        s.draw_prepared_image(&img, kurbo::Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 20, 5, 5), [0, 255, 0, 255]);
        assert_eq!(px(&rgba, 20, 15, 15), [255, 255, 255, 255]);
    }

    #[test]
    fn bad_image_source_is_recoverable_and_leaves_surface_intact() {
        let mut s = surface(8, 8, Color::WHITE);
        let before = s.to_rgba8().unwrap();
        let err = s
            .draw_image(
                &ImageSource::from_reference("data:image/png;base64,bm90IGFuIGltYWdl"),
                kurbo::Rect::new(0.0, 0.0, 8.0, 8.0),
            )
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(s.to_rgba8().unwrap(), before);
    }

    #[test]
    fn gradient_interpolates_between_stops() {
        let mut s = surface(101, 1, Color::WHITE);
        s.fill_linear_gradient(
            kurbo::Rect::new(0.0, 0.0, 101.0, 1.0),
            kurbo::Point::new(0.0, 0.0),
            kurbo::Point::new(101.0, 0.0),
            &[
                GradientStop {
                    offset: 0.0,
                    color: Color::BLACK,
                },
                GradientStop {
                    offset: 1.0,
                    color: Color::WHITE,
                },
            ],
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        let left = px(&rgba, 101, 0, 0)[0];
        let mid = px(&rgba, 101, 50, 0)[0];
        let right = px(&rgba, 101, 100, 0)[0];
        assert!(left < 10 && right > 245, "{left} {right}");
        assert!((120..=135).contains(&mid), "{mid}");
        let no_stops = s.fill_linear_gradient(
            kurbo::Rect::ZERO,
            kurbo::Point::ZERO,
            kurbo::Point::ZERO,
            &[],
        );
        assert!(no_stops.is_err());
    }

    #[test]
    fn draw_text_records_runs_and_wraps() {
        let mut s = surface(200, 200, Color::WHITE);
        let block = s
            .draw_text(
                &TextSpec::new(
                    "alpha beta gamma delta",
                    100.0,
                    10.0,
                    20.0,
                    "Arial",
                    Color::BLACK,
                )
                .align(TextAlign::Center)
                .max_width(90.0),
            )
            .unwrap();
        assert!(block.lines.len() > 1);
        assert_eq!(block.line_height, 24.0);
        let runs = s.text_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text(), "alpha beta gamma delta");

        let empty = s
            .draw_text(&TextSpec::new("", 0.0, 0.0, 20.0, "Arial", Color::BLACK))
            .unwrap();
        assert!(empty.lines.is_empty());
        assert_eq!(s.text_runs().unwrap().len(), 1);
    }

    #[test]
    fn every_primitive_fails_after_destroy() {
        let mut s = surface(4, 4, Color::WHITE);
        s.destroy();
        assert!(s.is_destroyed());
        let rect = Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        assert!(matches!(
            s.draw_shape(rect, ShapePaint::fill(Color::BLACK)),
            Err(CarouselError::UseAfterDestroy)
        ));
        assert!(matches!(
            s.draw_text(&TextSpec::new("x", 0.0, 0.0, 10.0, "Arial", Color::BLACK)),
            Err(CarouselError::UseAfterDestroy)
        ));
        assert!(matches!(
            s.serialize(ImageEncoding::Png, 1.0),
            Err(CarouselError::UseAfterDestroy)
        ));
        assert!(matches!(
            s.add_shadow(Shadow {
                color: Color::BLACK,
                blur: 1.0,
                offset_x: 0.0,
                offset_y: 0.0
            }),
            Err(CarouselError::UseAfterDestroy)
        ));
        assert!(s.text_runs().is_err());
        assert!(s.clear().is_err());
    }

    #[test]
    fn serialize_does_not_change_contents() {
        let mut s = surface(6, 6, Color::rgb(9, 9, 9));
        let a = s.serialize(ImageEncoding::Png, 1.0).unwrap();
        let b = s.serialize(ImageEncoding::Png, 1.0).unwrap();
        assert_eq!(a, b);
        let uri = s.to_data_uri(ImageEncoding::Png, 1.0).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn stroked_rect_paints_edge_over_fill() {
        let mut s = surface(40, 40, Color::WHITE);
        s.draw_shape(
            Shape::Rect {
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 20.0,
            },
            ShapePaint::fill(Color::rgb(255, 0, 0)).with_stroke(Color::rgb(0, 0, 255), 4.0),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        // The stroke straddles the edge: x = 8..12.
        assert_eq!(px(&rgba, 40, 9, 20), [0, 0, 255, 255]);
        assert_eq!(px(&rgba, 40, 11, 20), [0, 0, 255, 255]);
        assert_eq!(px(&rgba, 40, 20, 20), [255, 0, 0, 255]);
        assert_eq!(px(&rgba, 40, 4, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn stroked_circle_paints_ring_over_fill() {
        let mut s = surface(40, 40, Color::WHITE);
        s.draw_shape(
            Shape::Circle {
                cx: 20.0,
                cy: 20.0,
                radius: 10.0,
            },
            ShapePaint::fill(Color::rgb(255, 0, 0)).with_stroke(Color::rgb(0, 0, 255), 4.0),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 40, 20, 9), [0, 0, 255, 255]);
        assert_eq!(px(&rgba, 40, 30, 20), [0, 0, 255, 255]);
        assert_eq!(px(&rgba, 40, 20, 20), [255, 0, 0, 255]);
        assert_eq!(px(&rgba, 40, 2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn stroke_only_shape_leaves_interior() {
        let mut s = surface(40, 40, Color::WHITE);
        let paint = ShapePaint {
            fill: None,
            stroke: Some(StrokeStyle {
                color: Color::BLACK,
                width: 2.0,
            }),
        };
        s.draw_shape(
            Shape::Rect {
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 20.0,
            },
            paint,
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 40, 10, 20), [0, 0, 0, 255]);
        assert_eq!(px(&rgba, 40, 20, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn custom_line_height_spaces_wrapped_lines() {
        let mut s = surface(200, 400, Color::WHITE);
        let spec = TextSpec::new("alpha beta gamma delta", 0.0, 10.0, 20.0, "Arial", Color::BLACK)
            .max_width(90.0);
        let default = s.draw_text(&spec).unwrap();
        let spaced = s.draw_text(&spec.line_height(50.0)).unwrap();

        assert_eq!(default.line_height, 24.0);
        assert_eq!(spaced.line_height, 50.0);
        assert_eq!(spaced.lines, default.lines);
        assert!(spaced.lines.len() > 1);
        assert_eq!(spaced.height(), spaced.lines.len() as f64 * 50.0);
        assert!(spaced.height() > default.height());
    }

    #[test]
    fn block_height_keeps_f64_precision() {
        let block = TextBlock {
            lines: vec![String::new(); 7],
            line_height: 43.2,
        };
        assert_eq!(block.height(), 7.0 * f64::from(43.2f32));
        assert!(block.height() >= 302.4);
    }

    #[test]
    fn removed_shadow_is_not_drawn() {
        let mut s = surface(30, 30, Color::WHITE);
        s.add_shadow(Shadow {
            color: Color::rgba(0, 0, 0, 200),
            blur: 2.0,
            offset_x: 6.0,
            offset_y: 6.0,
        })
        .unwrap();
        s.remove_shadow().unwrap();
        s.draw_shape(
            Shape::Rect {
                x: 5.0,
                y: 5.0,
                width: 10.0,
                height: 10.0,
            },
            ShapePaint::fill(Color::rgb(0, 0, 255)),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(px(&rgba, 30, 10, 10), [0, 0, 255, 255]);
        assert_eq!(px(&rgba, 30, 18, 18), [255, 255, 255, 255]);
    }

    #[test]
    fn active_shadow_is_drawn_until_removed() {
        let mut s = surface(30, 30, Color::WHITE);
        s.add_shadow(Shadow {
            color: Color::rgba(0, 0, 0, 200),
            blur: 0.0,
            offset_x: 6.0,
            offset_y: 6.0,
        })
        .unwrap();
        let rect = Shape::Rect {
            x: 2.0,
            y: 2.0,
            width: 6.0,
            height: 6.0,
        };
        s.draw_shape(rect, ShapePaint::fill(Color::rgb(0, 0, 255))).unwrap();
        s.remove_shadow().unwrap();
        s.draw_shape(
            Shape::Rect {
                x: 16.0,
                y: 16.0,
                width: 6.0,
                height: 6.0,
            },
            ShapePaint::fill(Color::rgb(0, 0, 255)),
        )
        .unwrap();
        let rgba = s.to_rgba8().unwrap();
        // First rect's shadow lands at 8..14, second rect casts none at 22..28.
        assert!(px(&rgba, 30, 11, 11)[0] < 255);
        assert_eq!(px(&rgba, 30, 25, 25), [255, 255, 255, 255]);
    }
}
