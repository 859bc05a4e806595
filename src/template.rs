//! Slide templates.
//!
//! Each style is a unit type implementing [`SlideTemplate`]. Shared phases
//! (background image, logo, content block, slide counter) live in [`base`] and
//! are called explicitly by every style.

use crate::{
    foundation::error::CarouselResult,
    model::{RenderRequest, StyleName},
    render::surface::CanvasSurface,
};

pub mod base;
pub mod minimalist;
pub mod playful;
pub mod professional;

pub use minimalist::Minimalist;
pub use playful::Playful;
pub use professional::Professional;

/// Paints one slide onto a freshly created surface.
pub trait SlideTemplate {
    fn render(&self, request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()>;
}

/// Closed set of templates, dispatched by exhaustive match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleVariant {
    Professional(Professional),
    Minimalist(Minimalist),
    Playful(Playful),
}

impl StyleVariant {
    pub fn for_style(style: StyleName) -> Self {
        match style {
            StyleName::Professional => Self::Professional(Professional),
            StyleName::Minimalist => Self::Minimalist(Minimalist),
            StyleName::Playful => Self::Playful(Playful),
        }
    }

    pub fn style(self) -> StyleName {
        match self {
            Self::Professional(_) => StyleName::Professional,
            Self::Minimalist(_) => StyleName::Minimalist,
            Self::Playful(_) => StyleName::Playful,
        }
    }
}

impl SlideTemplate for StyleVariant {
    fn render(&self, request: &RenderRequest, surface: &mut CanvasSurface) -> CarouselResult<()> {
        match self {
            Self::Professional(t) => t.render(request, surface),
            Self::Minimalist(t) => t.render(request, surface),
            Self::Playful(t) => t.render(request, surface),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_back_to_their_style() {
        for style in StyleName::ALL {
            assert_eq!(StyleVariant::for_style(style).style(), style);
        }
    }
}
