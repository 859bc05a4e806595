use crate::{
    foundation::{core::Color, error::CarouselResult},
    layout::FontWeight,
    model::RenderRequest,
    render::surface::{CanvasSurface, Shape, ShapePaint},
    template::{
        SlideTemplate,
        base::{self, ContentLayout, EDGE_MARGIN},
    },
};

const LOGO_SIZE: f64 = 40.0;
const HEADER_LINE_LENGTH: f64 = 48.0;
const FOOTER_LINE_LENGTH: f64 = 32.0;
const LINE_THICKNESS: f64 = 2.0;

const CONTENT: ContentLayout = ContentLayout {
    margin: 60.0,
    base_wide: 72.0,
    base_narrow: 52.0,
    min_size: 34.0,
    heading_weight: FontWeight::Normal,
    heading_offset: 30.0,
    details_offset: 15.0,
    details_ratio: 0.8,
    details_cap: 38.0,
    details_weight: FontWeight::Normal,
    details_color: Color::BLACK,
    heading_shadow: None,
};

/// Small logo, short trailing accent lines, regular-weight heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Minimalist;

impl Minimalist {
    fn draw_header(request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        base::draw_logo(request, surface, (EDGE_MARGIN, EDGE_MARGIN), LOGO_SIZE)?;
        let w = f64::from(surface.width());
        surface.draw_shape(
            Shape::Line {
                x: w - EDGE_MARGIN - HEADER_LINE_LENGTH,
                y: EDGE_MARGIN + 20.0,
                length: HEADER_LINE_LENGTH,
                thickness: LINE_THICKNESS,
            },
            ShapePaint::fill(request.primary_color),
        )
    }

    fn draw_footer(request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        let (w, h) = (f64::from(surface.width()), f64::from(surface.height()));
        base::draw_slide_counter(
            request,
            surface,
            (EDGE_MARGIN, h - EDGE_MARGIN - f64::from(base::COUNTER_FONT_SIZE)),
        )?;
        surface.draw_shape(
            Shape::Line {
                x: w - EDGE_MARGIN - FOOTER_LINE_LENGTH,
                y: h - EDGE_MARGIN - 8.0,
                length: FOOTER_LINE_LENGTH,
                thickness: LINE_THICKNESS,
            },
            ShapePaint::fill(request.primary_color),
        )
    }
}

impl SlideTemplate for Minimalist {
    fn render(&self, request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        base::draw_background_image(request, surface)?;
        Self::draw_header(request, surface)?;
        base::draw_content(request, surface, &CONTENT)?;
        Self::draw_footer(request, surface)
    }
}
