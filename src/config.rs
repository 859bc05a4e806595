use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    assets::ImageSource,
    foundation::{
        core::Color,
        error::{CarouselError, CarouselResult},
    },
    model::{OutputFormat, RenderRequest, StyleName, TextAlign},
};

/// Branding options as persisted by the surrounding app, passed through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandingConfig {
    pub style_name: StyleName,
    pub primary_color: Color,
    pub background_color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,
    pub font_family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<ImageSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<ImageSource>,
    pub background_image_opacity: f32,
    pub output_format: OutputFormat,
    pub text_align: TextAlign,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            style_name: StyleName::Professional,
            primary_color: Color::rgb(0x0f, 0x17, 0x2a),
            background_color: Color::WHITE,
            text_color: None,
            font_family: "arial".to_owned(),
            logo_image: None,
            background_image: None,
            background_image_opacity: RenderRequest::DEFAULT_BACKGROUND_OPACITY,
            output_format: OutputFormat::Linkedin,
            text_align: TextAlign::Center,
        }
    }
}

impl BrandingConfig {
    pub fn from_json_str(s: &str) -> CarouselResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| CarouselError::validation(format!("branding config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CarouselResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read branding config {}", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> CarouselResult<()> {
        let op = self.background_image_opacity;
        if !op.is_finite() || !(0.0..=1.0).contains(&op) {
            return Err(CarouselError::validation(
                "backgroundImageOpacity must be in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Request for slide `slide_index` of `total_slides` showing `text`.
    pub fn request_for(
        &self,
        text: impl Into<String>,
        slide_index: u32,
        total_slides: u32,
    ) -> RenderRequest {
        let mut req = RenderRequest::new(
            text,
            slide_index,
            total_slides,
            self.style_name,
            self.primary_color,
            self.background_color,
            self.output_format,
        );
        req.text_color = self.text_color;
        req.font_family = Some(self.font_family.clone());
        req.logo_image = self.logo_image.clone();
        req.background_image = self.background_image.clone();
        req.background_image_opacity = Some(self.background_image_opacity);
        req.text_align = Some(self.text_align);
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = BrandingConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, BrandingConfig::default());
        assert_eq!(cfg.primary_color.to_string(), "#0f172a");
    }

    #[test]
    fn camel_case_keys_are_recognized() {
        let cfg = BrandingConfig::from_json_str(
            r##"{
                "styleName": "playful",
                "primaryColor": "#ff6600",
                "textColor": "rgb(20, 20, 20)",
                "fontFamily": "poppins",
                "backgroundImage": "/tmp/bg.jpg",
                "backgroundImageOpacity": 0.5,
                "outputFormat": "instagram",
                "textAlign": "right"
            }"##,
        )
        .unwrap();
        assert_eq!(cfg.style_name, StyleName::Playful);
        assert_eq!(cfg.text_color, Some(Color::rgb(20, 20, 20)));
        assert!(matches!(cfg.background_image, Some(ImageSource::Path(_))));
        assert_eq!(cfg.text_align, TextAlign::Right);
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        for bad in [
            r#"{"primaryColor": "not-a-color"}"#,
            r#"{"backgroundImageOpacity": 1.5}"#,
            r#"{"styleName": "fancy"}"#,
        ] {
            let err = BrandingConfig::from_json_str(bad).unwrap_err();
            assert!(matches!(err, CarouselError::Validation(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn request_for_copies_every_option() {
        let cfg = BrandingConfig {
            text_color: Some(Color::BLACK),
            ..BrandingConfig::default()
        };
        let req = cfg.request_for("Hello", 2, 5);
        assert_eq!(req.slide_index, 2);
        assert_eq!(req.total_slides, 5);
        assert_eq!(req.font_family(), "arial");
        assert_eq!(req.text_color, Some(Color::BLACK));
        assert_eq!(req.background_image_opacity(), 0.3);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = BrandingConfig::from_json_file(Path::new("/no/such/brand.json")).unwrap_err();
        assert!(err.to_string().contains("brand.json"));
    }
}
