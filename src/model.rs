use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    assets::ImageSource,
    foundation::{
        core::{Canvas, Color},
        error::{CarouselError, CarouselResult},
    },
};

/// Target social platform; determines surface size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Linkedin,
    Twitter,
    Instagram,
}

impl OutputFormat {
    pub const ALL: [Self; 3] = [Self::Linkedin, Self::Twitter, Self::Instagram];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Twitter => (1600, 900),
            Self::Linkedin | Self::Instagram => (1080, 1080),
        }
    }

    pub fn canvas(self) -> Canvas {
        let (w, h) = self.dimensions();
        Canvas::new(w, h)
    }

    pub fn platform_name(self) -> &'static str {
        match self {
            Self::Linkedin => "LinkedIn",
            Self::Twitter => "Twitter/X",
            Self::Instagram => "Instagram",
        }
    }

    pub fn aspect_ratio(self) -> &'static str {
        match self {
            Self::Twitter => "16:9",
            Self::Linkedin | Self::Instagram => "1:1",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CarouselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CarouselError::validation(format!("unknown output format \"{s}\"")))
    }
}

/// Horizontal anchor for text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    /// Left edge of a run of `width` anchored at `x`.
    pub fn left_edge(self, x: f64, width: f64) -> f64 {
        match self {
            Self::Left => x,
            Self::Center => x - width / 2.0,
            Self::Right => x - width,
        }
    }

    /// Anchor x for a column spanning `[margin, canvas_width - margin]`.
    pub fn anchor_x(self, canvas_width: f64, margin: f64) -> f64 {
        match self {
            Self::Left => margin,
            Self::Center => canvas_width / 2.0,
            Self::Right => canvas_width - margin,
        }
    }
}

impl FromStr for TextAlign {
    type Err = CarouselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(CarouselError::validation(format!("unknown text align \"{s}\""))),
        }
    }
}

/// Closed set of slide templates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleName {
    #[default]
    Professional,
    Minimalist,
    Playful,
}

impl StyleName {
    pub const ALL: [Self; 3] = [Self::Professional, Self::Minimalist, Self::Playful];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Minimalist => "minimalist",
            Self::Playful => "playful",
        }
    }
}

impl fmt::Display for StyleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleName {
    type Err = CarouselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| CarouselError::unknown_style(s))
    }
}

/// Everything one slide render needs. Immutable for the duration of a render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub text: String,
    pub slide_index: u32,
    pub total_slides: u32,
    #[serde(rename = "styleName", default)]
    pub style: StyleName,
    pub primary_color: Color,
    pub background_color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<ImageSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<ImageSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_opacity: Option<f32>,
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

impl RenderRequest {
    pub const DEFAULT_FONT_FAMILY: &'static str = "Arial";
    pub const DEFAULT_BACKGROUND_OPACITY: f32 = 0.3;

    pub fn new(
        text: impl Into<String>,
        slide_index: u32,
        total_slides: u32,
        style: StyleName,
        primary_color: Color,
        background_color: Color,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            text: text.into(),
            slide_index,
            total_slides,
            style,
            primary_color,
            background_color,
            text_color: None,
            font_family: None,
            logo_image: None,
            background_image: None,
            background_image_opacity: None,
            output_format,
            text_align: None,
        }
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_logo(mut self, logo: ImageSource) -> Self {
        self.logo_image = Some(logo);
        self
    }

    pub fn with_background_image(mut self, image: ImageSource, opacity: Option<f32>) -> Self {
        self.background_image = Some(image);
        self.background_image_opacity = opacity;
        self
    }

    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        self.text_align = Some(align);
        self
    }

    pub fn validate(&self) -> CarouselResult<()> {
        if self.total_slides == 0 {
            return Err(CarouselError::validation("totalSlides must be >= 1"));
        }
        if self.slide_index >= self.total_slides {
            return Err(CarouselError::validation(format!(
                "slideIndex {} out of range for {} slides",
                self.slide_index, self.total_slides
            )));
        }
        if let Some(op) = self.background_image_opacity
            && !op.is_finite()
        {
            return Err(CarouselError::validation(
                "backgroundImageOpacity must be finite",
            ));
        }
        Ok(())
    }

    pub fn font_family(&self) -> &str {
        self.font_family
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(Self::DEFAULT_FONT_FAMILY)
    }

    pub fn text_align(&self) -> TextAlign {
        self.text_align.unwrap_or_default()
    }

    pub fn background_image_opacity(&self) -> f32 {
        self.background_image_opacity
            .unwrap_or(Self::DEFAULT_BACKGROUND_OPACITY)
            .clamp(0.0, 1.0)
    }

    pub fn canvas(&self) -> Canvas {
        self.output_format.canvas()
    }

    /// 1-based slide number shown in the footer.
    pub fn slide_number(&self) -> u32 {
        self.slide_index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> RenderRequest {
        RenderRequest::new(
            "Hello: world",
            0,
            3,
            StyleName::Professional,
            Color::rgb(15, 23, 42),
            Color::WHITE,
            OutputFormat::Linkedin,
        )
    }

    #[test]
    fn format_dimensions_and_labels() {
        assert_eq!(OutputFormat::Twitter.dimensions(), (1600, 900));
        assert_eq!(OutputFormat::Linkedin.dimensions(), (1080, 1080));
        assert_eq!(OutputFormat::Instagram.dimensions(), (1080, 1080));
        assert_eq!(OutputFormat::Twitter.aspect_ratio(), "16:9");
        assert_eq!(OutputFormat::Instagram.platform_name(), "Instagram");
        assert_eq!("TWITTER".parse::<OutputFormat>().unwrap(), OutputFormat::Twitter);
    }

    #[test]
    fn style_names_are_a_closed_set() {
        assert_eq!("playful".parse::<StyleName>().unwrap(), StyleName::Playful);
        let err = "fancy".parse::<StyleName>().unwrap_err();
        assert!(matches!(err, CarouselError::UnknownStyle(ref s) if s == "fancy"));
    }

    #[test]
    fn align_anchor_and_left_edge() {
        assert_eq!(TextAlign::Left.anchor_x(1080.0, 40.0), 40.0);
        assert_eq!(TextAlign::Center.anchor_x(1080.0, 40.0), 540.0);
        assert_eq!(TextAlign::Right.anchor_x(1080.0, 40.0), 1040.0);
        assert_eq!(TextAlign::Center.left_edge(540.0, 100.0), 490.0);
        assert_eq!(TextAlign::Right.left_edge(1040.0, 100.0), 940.0);
    }

    #[test]
    fn defaults_apply_when_optional_fields_missing() {
        let r = req();
        assert_eq!(r.font_family(), "Arial");
        assert_eq!(r.text_align(), TextAlign::Center);
        assert_eq!(r.background_image_opacity(), 0.3);
        assert_eq!(r.slide_number(), 1);
        assert_eq!(r.with_font_family("  ").font_family(), "Arial");
    }

    #[test]
    fn validate_rejects_bad_indices() {
        assert!(req().validate().is_ok());
        let mut r = req();
        r.slide_index = 3;
        assert!(matches!(r.validate(), Err(CarouselError::Validation(_))));
        r.total_slides = 0;
        r.slide_index = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let json = r##"{
            "text": "Ship small: ship often",
            "slideIndex": 2,
            "totalSlides": 5,
            "styleName": "minimalist",
            "primaryColor": "#0f172a",
            "backgroundColor": "#ffffff",
            "outputFormat": "twitter",
            "textAlign": "left",
            "logoImage": "data:image/png;base64,AAAA"
        }"##;
        let r: RenderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(r.style, StyleName::Minimalist);
        assert_eq!(r.canvas(), Canvas::new(1600, 900));
        assert_eq!(r.text_align(), TextAlign::Left);
        assert!(matches!(r.logo_image, Some(ImageSource::DataUri(_))));
        assert!(r.text_color.is_none());
    }
}
