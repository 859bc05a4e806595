/// Heading and optional details split out of one slide fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideContent {
    pub heading: String,
    pub details: String,
}

impl SlideContent {
    pub const EMPTY_HEADING: &'static str = "No content";

    pub fn has_details(&self) -> bool {
        !self.details.is_empty()
    }
}

/// Split on the first colon. Never fails.
///
/// Only an empty fragment gets the placeholder heading; whitespace-only text
/// yields an empty heading, which draws nothing.
pub fn parse(text: &str) -> SlideContent {
    if text.is_empty() {
        return SlideContent {
            heading: SlideContent::EMPTY_HEADING.to_owned(),
            details: String::new(),
        };
    }
    let text = text.trim();

    match text.split_once(':') {
        Some((heading, details)) => SlideContent {
            heading: heading.trim().to_owned(),
            details: details.trim().to_owned(),
        },
        None => SlideContent {
            heading: text.to_owned(),
            details: String::new(),
        },
    }
}
