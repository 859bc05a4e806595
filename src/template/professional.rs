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

const LOGO_SIZE: f64 = 48.0;
const LOGO_GAP: f64 = 16.0;
const HEADER_Y: f64 = EDGE_MARGIN + 24.0;
const HEADER_THICKNESS: f64 = 4.0;
const FOOTER_LINE_LENGTH: f64 = 64.0;

const CONTENT: ContentLayout = ContentLayout {
    margin: 40.0,
    base_wide: 80.0,
    base_narrow: 60.0,
    min_size: 36.0,
    heading_weight: FontWeight::Bold,
    heading_offset: 40.0,
    details_offset: 20.0,
    details_ratio: 0.7,
    details_cap: 40.0,
    details_weight: FontWeight::Normal,
    details_color: Color::BLACK,
    heading_shadow: None,
};

/// Flat background, logo with a full-width accent bar, bold centered heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Professional;

impl Professional {
    fn draw_header_line(
        request: &RenderRequest,
        surface: &mut CanvasSurface,
    ) -> CarouselResult<()> {
        let start_x = if request.logo_image.is_some() {
            EDGE_MARGIN + LOGO_SIZE + LOGO_GAP
        } else {
            EDGE_MARGIN
        };
        let end_x = f64::from(surface.width()) - EDGE_MARGIN;
        surface.draw_shape(
            Shape::Rect {
                x: start_x,
                y: HEADER_Y,
                width: end_x - start_x,
                height: HEADER_THICKNESS,
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
                thickness: 2.0,
            },
            ShapePaint::fill(request.primary_color),
        )
    }
}

impl SlideTemplate for Professional {
    fn render(&self, request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        base::draw_background_image(request, surface)?;
        base::draw_logo(request, surface, (EDGE_MARGIN, EDGE_MARGIN), LOGO_SIZE)?;
        Self::draw_header_line(request, surface)?;
        base::draw_content(request, surface, &CONTENT)?;
        Self::draw_footer(request, surface)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        assets::{FontBook, ImageSource},
        model::{OutputFormat, StyleName},
    };

    fn pixel(rgba: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * w + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    fn render(req: &RenderRequest) -> (CanvasSurface, Vec<u8>) {
        let (w, h) = req.output_format.dimensions();
        let mut s =
            CanvasSurface::new(w, h, req.background_color, Arc::new(FontBook::empty())).unwrap();
        Professional.render(req, &mut s).unwrap();
        let rgba = s.to_rgba8().unwrap();
        (s, rgba)
    }

    fn request() -> RenderRequest {
        RenderRequest::new(
            "Ship small: Smaller releases ship faster and fail safer",
            1,
            4,
            StyleName::Professional,
            Color::rgb(15, 23, 42),
            Color::WHITE,
            OutputFormat::Linkedin,
        )
    }

    #[test]
    fn header_bar_and_footer_line_use_primary_color() {
        let (_, rgba) = render(&request());
        assert_eq!(pixel(&rgba, 1080, 500, 58), [15, 23, 42, 255]);
        assert_eq!(pixel(&rgba, 1080, 40, 58), [15, 23, 42, 255]);
        assert_eq!(pixel(&rgba, 1080, 1080 - 32 - 30, 1080 - 40), [15, 23, 42, 255]);
        assert_eq!(pixel(&rgba, 1080, 500, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn header_bar_leaves_room_for_logo() {
        // A broken logo still shifts the bar; only the image itself is skipped.
        let req = request().with_logo(ImageSource::from_reference("/missing.png"));
        let (_, rgba) = render(&req);
        assert_eq!(pixel(&rgba, 1080, 40, 58), [255, 255, 255, 255]);
        assert_eq!(pixel(&rgba, 1080, 100, 58), [15, 23, 42, 255]);
    }

    #[test]
    fn records_heading_details_and_counter() {
        let (s, _) = render(&request());
        let runs = s.text_runs().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text(), "Ship small");
        assert_eq!(runs[0].weight, FontWeight::Bold);
        assert_eq!(runs[1].text(), "Smaller releases ship faster and fail safer");
        assert_eq!(runs[2].text(), "2 / 4");
        assert_eq!(runs[2].y, 1080.0 - 32.0 - 14.0);
        assert_eq!(runs[2].color, base::COUNTER_COLOR);
    }
}
