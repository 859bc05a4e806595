use crate::{
    content::{self, SlideContent},
    foundation::{
        core::Color,
        error::{CarouselError, CarouselResult},
    },
    layout::{FontWeight, SizeRange},
    model::RenderRequest,
    render::surface::{CanvasSurface, Shadow, TextSpec},
};

/// Margin used by the slide counter and most header/footer chrome.
pub const EDGE_MARGIN: f64 = 32.0;
pub const COUNTER_FONT_SIZE: f32 = 14.0;
pub const COUNTER_COLOR: Color = Color::rgb(0x6b, 0x72, 0x80);

/// Per-style constants for the heading/details block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContentLayout {
    pub margin: f64,
    /// Heading base size on surfaces wider than 1200px.
    pub base_wide: f32,
    pub base_narrow: f32,
    pub min_size: f32,
    pub heading_weight: FontWeight,
    /// Upward shift of the heading when details are present.
    pub heading_offset: f64,
    /// Details top, measured down from the vertical center.
    pub details_offset: f64,
    pub details_ratio: f32,
    pub details_cap: f32,
    pub details_weight: FontWeight,
    pub details_color: Color,
    pub heading_shadow: Option<Shadow>,
}

/// What the content phase ended up drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentMetrics {
    pub content: SlideContent,
    pub heading_size: f32,
    pub heading_lines: usize,
    pub details_size: Option<f32>,
    pub details_y: Option<f64>,
}

pub fn slide_counter_label(slide_index: u32, total_slides: u32) -> String {
    format!("{} / {}", slide_index + 1, total_slides)
}

fn skip_recoverable(phase: &'static str, res: CarouselResult<()>) -> CarouselResult<()> {
    match res {
        Err(e) if e.is_recoverable() => {
            tracing::warn!(phase, error = %e, "skipping visual element");
            Ok(())
        }
        other => other,
    }
}

/// Stretch the background image over the whole surface at the request's opacity.
pub fn draw_background_image(
    request: &RenderRequest,
    surface: &mut CanvasSurface,
) -> CarouselResult<()> {
    let Some(source) = &request.background_image else {
        return Ok(());
    };
    let canvas = surface.canvas();
    let prepared = match source.load(Some((canvas.width, canvas.height))) {
        Ok(p) => p,
        Err(e) => return skip_recoverable("background image", Err(e)),
    };

    let opacity = request.background_image_opacity();
    let full = kurbo::Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height));
    tracing::debug!(opacity, "drawing background image");
    surface.with_opacity(opacity, |s| s.draw_prepared_image(&prepared, full))
}

/// Draw the logo as a `size`×`size` square with its top-left at `origin`.
pub fn draw_logo(
    request: &RenderRequest,
    surface: &mut CanvasSurface,
    origin: (f64, f64),
    size: f64,
) -> CarouselResult<()> {
    let Some(logo) = &request.logo_image else {
        return Ok(());
    };
    let rect = kurbo::Rect::from_origin_size(origin, (size, size));
    skip_recoverable("logo", surface.draw_image(logo, rect))
}

/// Heading centered vertically, details below, both fitted to the content column.
pub fn draw_content(
    request: &RenderRequest,
    surface: &mut CanvasSurface,
    layout: &ContentLayout,
) -> CarouselResult<ContentMetrics> {
    let parsed = content::parse(&request.text);
    let canvas = surface.canvas();
    let width = f64::from(canvas.width);
    let family = request.font_family();
    let align = request.text_align();

    let max_width = (width - layout.margin * 2.0) as f32;
    if max_width <= 0.0 {
        return Err(CarouselError::validation(
            "content margin leaves no room for text",
        ));
    }
    let x = align.anchor_x(width, layout.margin);
    let (_, center_y) = canvas.center();

    let base = if canvas.is_wide() {
        layout.base_wide
    } else {
        layout.base_narrow
    };
    let heading_size = surface.fit_font_size(
        &parsed.heading,
        max_width,
        SizeRange::new(base, layout.min_size),
        family,
        layout.heading_weight,
    )?;

    let heading_y = if parsed.has_details() {
        center_y - layout.heading_offset
    } else {
        center_y
    };
    let heading = TextSpec::new(
        &parsed.heading,
        x,
        heading_y,
        heading_size,
        family,
        request.primary_color,
    )
    .weight(layout.heading_weight)
    .align(align)
    .max_width(max_width);

    let block = match layout.heading_shadow {
        Some(shadow) => surface.with_shadow(shadow, |s| s.draw_text(&heading))?,
        None => surface.draw_text(&heading)?,
    };

    let mut details_size = None;
    let mut details_y = None;
    if parsed.has_details() {
        let size = (heading_size * layout.details_ratio).min(layout.details_cap);
        let fixed = center_y + layout.details_offset;
        let y = if block.lines.len() > 1 {
            fixed.max(heading_y + block.height())
        } else {
            fixed
        };
        let details = TextSpec::new(
            &parsed.details,
            x,
            y,
            size,
            family,
            request.text_color.unwrap_or(layout.details_color),
        )
        .weight(layout.details_weight)
        .align(align)
        .max_width(max_width);
        surface.draw_text(&details)?;
        details_size = Some(size);
        details_y = Some(y);
    }

    tracing::debug!(
        heading_size,
        heading_lines = block.lines.len(),
        details_size,
        "content drawn"
    );

    Ok(ContentMetrics {
        heading_lines: block.lines.len(),
        content: parsed,
        heading_size,
        details_size,
        details_y,
    })
}

/// `"N / total"` in muted gray with its top-left at `origin`.
pub fn draw_slide_counter(
    request: &RenderRequest,
    surface: &mut CanvasSurface,
    origin: (f64, f64),
) -> CarouselResult<()> {
    let label = slide_counter_label(request.slide_index, request.total_slides);
    let spec = TextSpec::new(
        &label,
        origin.0,
        origin.1,
        COUNTER_FONT_SIZE,
        request.font_family(),
        COUNTER_COLOR,
    );
    surface.draw_text(&spec)?;
    Ok(())
}
