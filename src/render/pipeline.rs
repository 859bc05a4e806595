use std::sync::Arc;

use crate::{
    assets::FontBook,
    foundation::error::CarouselResult,
    model::{RenderRequest, StyleName},
    render::{
        encode::{EncodedImage, ImageEncoding, encode_rgba8},
        surface::{CanvasSurface, TextRun},
    },
    template::{SlideTemplate, StyleVariant},
};

/// A finished slide before encoding.
#[derive(Clone, Debug)]
pub struct RenderedSlide {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8.
    pub rgba8: Vec<u8>,
    pub text_runs: Vec<TextRun>,
}

impl RenderedSlide {
    /// All drawn text, one run per line, in paint order.
    pub fn alt_text(&self) -> String {
        self.text_runs
            .iter()
            .map(TextRun::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn encode(&self, encoding: ImageEncoding, quality: f32) -> CarouselResult<EncodedImage> {
        let bytes = encode_rgba8(self.width, self.height, self.rgba8.clone(), encoding, quality)?;
        Ok(EncodedImage::new(encoding, bytes))
    }
}

/// Drives templates over fresh surfaces. Holds no per-render state, so one
/// renderer may be shared across threads.
#[derive(Clone, Debug)]
pub struct SlideRenderer {
    fonts: Arc<FontBook>,
}

impl Default for SlideRenderer {
    fn default() -> Self {
        Self::with_system_fonts()
    }
}

impl SlideRenderer {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self { fonts }
    }

    pub fn with_system_fonts() -> Self {
        Self::new(FontBook::shared())
    }

    pub fn fonts(&self) -> &Arc<FontBook> {
        &self.fonts
    }

    /// Create a surface, run the template, hand it to `finish`, and destroy
    /// the surface on every exit path.
    fn drive<R>(
        &self,
        style: StyleName,
        request: &RenderRequest,
        finish: impl FnOnce(&mut CanvasSurface) -> CarouselResult<R>,
    ) -> CarouselResult<R> {
        request.validate()?;
        let (w, h) = request.output_format.dimensions();
        let mut surface = CanvasSurface::new(w, h, request.background_color, self.fonts.clone())?;

        let template = StyleVariant::for_style(style);
        let out = template
            .render(request, &mut surface)
            .and_then(|()| finish(&mut surface));
        surface.destroy();

        if let Err(e) = &out {
            tracing::warn!(%style, slide = request.slide_index, error = %e, "slide render failed");
        }
        out
    }

    #[tracing::instrument(
        skip(self, request),
        fields(slide = request.slide_index, format = %request.output_format)
    )]
    pub fn render(
        &self,
        style: StyleName,
        request: &RenderRequest,
    ) -> CarouselResult<RenderedSlide> {
        self.drive(style, request, |surface| {
            Ok(RenderedSlide {
                width: surface.width(),
                height: surface.height(),
                rgba8: surface.to_rgba8()?,
                text_runs: surface.text_runs()?.to_vec(),
            })
        })
    }

    #[tracing::instrument(
        skip(self, request),
        fields(slide = request.slide_index, format = %request.output_format)
    )]
    pub fn generate_with(
        &self,
        style: StyleName,
        request: &RenderRequest,
        encoding: ImageEncoding,
        quality: f32,
    ) -> CarouselResult<EncodedImage> {
        self.drive(style, request, |surface| surface.encode(encoding, quality))
    }

    /// Render and encode as PNG.
    pub fn generate(
        &self,
        style: StyleName,
        request: &RenderRequest,
    ) -> CarouselResult<EncodedImage> {
        self.generate_with(style, request, ImageEncoding::Png, 1.0)
    }

    /// Like [`generate`](Self::generate), with the style given by name.
    pub fn generate_named(
        &self,
        style_name: &str,
        request: &RenderRequest,
    ) -> CarouselResult<EncodedImage> {
        let style: StyleName = style_name.parse()?;
        self.generate(style, request)
    }
}

/// Render one slide with the shared system font registry and return it PNG-encoded.
///
/// `style_name` must be `professional`, `minimalist` or `playful`; it takes
/// precedence over `request.style`. Use [`EncodedImage::to_data_uri`] for the
/// embeddable form.
pub fn generate_slide_image(
    style_name: &str,
    request: &RenderRequest,
) -> CarouselResult<EncodedImage> {
    SlideRenderer::with_system_fonts().generate_named(style_name, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::ImageSource,
        foundation::{core::Color, error::CarouselError},
        model::OutputFormat,
    };

    fn renderer() -> SlideRenderer {
        SlideRenderer::new(Arc::new(FontBook::empty()))
    }

    fn request(format: OutputFormat) -> RenderRequest {
        RenderRequest::new(
            "Ship small: Smaller releases ship faster and fail safer",
            0,
            1,
            StyleName::Professional,
            Color::rgb(15, 23, 42),
            Color::WHITE,
            format,
        )
    }

    #[test]
    fn unknown_style_is_rejected_before_rendering() {
        let err = renderer()
            .generate_named("fancy", &request(OutputFormat::Linkedin))
            .unwrap_err();
        assert!(matches!(err, CarouselError::UnknownStyle(_)));
    }

    #[test]
    fn invalid_request_is_validation_error() {
        let mut req = request(OutputFormat::Linkedin);
        req.total_slides = 0;
        assert!(matches!(
            renderer().generate(StyleName::Minimalist, &req),
            Err(CarouselError::Validation(_))
        ));
    }

    #[test]
    fn rendered_slide_matches_format_and_transcribes_text() {
        let slide = renderer()
            .render(StyleName::Playful, &request(OutputFormat::Twitter))
            .unwrap();
        assert_eq!((slide.width, slide.height), (1600, 900));
        assert_eq!(slide.rgba8.len(), 1600 * 900 * 4);
        assert_eq!(
            slide.alt_text(),
            "Ship small\nSmaller releases ship faster and fail safer\n1 / 1"
        );
    }

    #[test]
    fn encoded_png_decodes_to_format_dimensions() {
        let png = renderer()
            .generate(StyleName::Professional, &request(OutputFormat::Instagram))
            .unwrap();
        assert_eq!(png.encoding(), ImageEncoding::Png);
        let (w, h, _) = png.decode_rgba8().unwrap();
        assert_eq!((w, h), (1080, 1080));
    }

    #[test]
    fn broken_logo_still_renders() {
        let req = request(OutputFormat::Linkedin)
            .with_logo(ImageSource::from_reference("data:image/png;base64,Zm9v"));
        assert!(renderer().generate(StyleName::Professional, &req).is_ok());
    }

    #[test]
    fn explicit_style_wins_over_request_style() {
        let r = renderer();
        let req = request(OutputFormat::Linkedin);
        let named = r.generate_named("minimalist", &req).unwrap();
        let direct = r.generate(StyleName::Minimalist, &req).unwrap();
        let professional = r.generate(StyleName::Professional, &req).unwrap();
        assert_eq!(named, direct);
        assert_ne!(named, professional);
    }
}
