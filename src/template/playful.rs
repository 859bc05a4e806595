use crate::{
    foundation::{core::Color, error::CarouselResult},
    layout::FontWeight,
    model::RenderRequest,
    render::surface::{CanvasSurface, Shadow, Shape, ShapePaint, StrokeStyle},
    template::{
        SlideTemplate,
        base::{self, ContentLayout},
    },
};

const FRAME_INSET: f64 = 16.0;
const FRAME_RADIUS: f64 = 24.0;
const FRAME_BORDER: f64 = 3.0;
const MARGIN: f64 = 48.0;
const LOGO_SIZE: f64 = 48.0;
const DOT_SIZE: f64 = 12.0;
const DOT_SPACING: f64 = 8.0;
const INACTIVE_DOT_ALPHA: f32 = 0.4;
const FOOTER_LINE_LENGTH: f64 = 64.0;
const FOOTER_LINE_THICKNESS: f64 = 4.0;

const CONTENT: ContentLayout = ContentLayout {
    margin: 60.0,
    base_wide: 76.0,
    base_narrow: 56.0,
    min_size: 36.0,
    heading_weight: FontWeight::Bold,
    heading_offset: 35.0,
    details_offset: 25.0,
    details_ratio: 0.75,
    details_cap: 40.0,
    details_weight: FontWeight::Normal,
    details_color: Color::rgb(0x4b, 0x55, 0x63),
    heading_shadow: Some(Shadow {
        color: Color::rgba(0, 0, 0, 26),
        blur: 4.0,
        offset_x: 2.0,
        offset_y: 2.0,
    }),
};

/// Rounded bordered frame, progress dots, soft heading shadow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Playful;

/// Centers of the progress dots, left to right, on a surface `width` wide.
pub fn dot_centers(width: f64, total_slides: u32) -> Vec<(f64, f64)> {
    let n = f64::from(total_slides);
    let total_width = n * DOT_SIZE + (n - 1.0).max(0.0) * DOT_SPACING;
    let start_x = width - MARGIN - total_width;
    let y = MARGIN + DOT_SIZE / 2.0;
    (0..total_slides)
        .map(|i| {
            let x = start_x + f64::from(i) * (DOT_SIZE + DOT_SPACING) + DOT_SIZE / 2.0;
            (x, y)
        })
        .collect()
}

impl Playful {
    fn draw_frame(request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        let (w, h) = (f64::from(surface.width()), f64::from(surface.height()));
        let frame = kurbo::Rect::new(FRAME_INSET, FRAME_INSET, w - FRAME_INSET, h - FRAME_INSET);
        surface.draw_rounded_rect(frame, FRAME_RADIUS, request.background_color)?;
        surface.stroke_rounded_rect(
            frame,
            FRAME_RADIUS,
            StrokeStyle {
                color: request.primary_color,
                width: FRAME_BORDER,
            },
        )
    }

    fn draw_header(request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        base::draw_logo(request, surface, (MARGIN, MARGIN), LOGO_SIZE)?;

        let w = f64::from(surface.width());
        for (i, (cx, cy)) in dot_centers(w, request.total_slides).into_iter().enumerate() {
            let alpha = if i as u32 == request.slide_index {
                1.0
            } else {
                INACTIVE_DOT_ALPHA
            };
            let base_alpha = f32::from(request.primary_color.a) / 255.0;
            surface.draw_shape(
                Shape::Circle {
                    cx,
                    cy,
                    radius: DOT_SIZE / 2.0,
                },
                ShapePaint::fill(request.primary_color.with_alpha(base_alpha * alpha)),
            )?;
        }
        Ok(())
    }

    fn draw_footer(request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        let (w, h) = (f64::from(surface.width()), f64::from(surface.height()));
        base::draw_slide_counter(request, surface, (MARGIN, h - MARGIN - 20.0))?;
        surface.draw_rounded_rect(
            kurbo::Rect::from_origin_size(
                (w - MARGIN - FOOTER_LINE_LENGTH, h - MARGIN - 12.0),
                (FOOTER_LINE_LENGTH, FOOTER_LINE_THICKNESS),
            ),
            FOOTER_LINE_THICKNESS / 2.0,
            request.primary_color,
        )
    }
}

impl SlideTemplate for Playful {
    fn render(&self, request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        Self::draw_frame(request, surface)?;
        base::draw_background_image(request, surface)?;
        Self::draw_header(request, surface)?;
        base::draw_content(request, surface, &CONTENT)?;
        Self::draw_footer(request, surface)
    }
}
