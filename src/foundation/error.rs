/// Convenience result type used across the renderer.
pub type CarouselResult<T> = Result<T, CarouselError>;

/// Error taxonomy for slide rendering.
#[derive(thiserror::Error, Debug)]
pub enum CarouselError {
    /// A raster surface could not be allocated for the requested dimensions.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// A logo or background image could not be read or decoded.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A drawing primitive was invoked on a destroyed surface.
    #[error("surface used after destroy")]
    UseAfterDestroy,

    /// Style name outside the closed set of templates.
    #[error("unknown style: {0}")]
    UnknownStyle(String),

    /// Invalid request parameters or configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure while encoding a finished surface.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CarouselError {
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn unknown_style(name: impl Into<String>) -> Self {
        Self::UnknownStyle(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Whether a template phase may swallow this error and keep drawing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ImageLoad(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CarouselError::allocation("x")
                .to_string()
                .contains("allocation error:")
        );
        assert!(
            CarouselError::image_load("x")
                .to_string()
                .contains("image load error:")
        );
        assert!(
            CarouselError::unknown_style("fancy")
                .to_string()
                .contains("unknown style: fancy")
        );
        assert!(
            CarouselError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            CarouselError::encode("x")
                .to_string()
                .contains("encode error:")
        );
        assert_eq!(
            CarouselError::UseAfterDestroy.to_string(),
            "surface used after destroy"
        );
    }

    #[test]
    fn only_image_load_is_recoverable() {
        assert!(CarouselError::image_load("bad png").is_recoverable());
        assert!(!CarouselError::UseAfterDestroy.is_recoverable());
        assert!(!CarouselError::allocation("x").is_recoverable());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CarouselError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
