use serde::{Deserialize, Serialize};

/// CSS-like font weight keyword.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Lighter,
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn css_weight(self) -> u16 {
        match self {
            Self::Lighter => 300,
            Self::Normal => 400,
            Self::Bold => 700,
        }
    }
}

/// Font family stack and weight used to measure or paint a run of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceSpec<'a> {
    pub family: &'a str,
    pub weight: FontWeight,
}

impl<'a> FaceSpec<'a> {
    pub fn new(family: &'a str, weight: FontWeight) -> Self {
        Self { family, weight }
    }
}

/// Single-line advance width of shaped text, in pixels.
pub trait TextMeasurer {
    fn measure_width(&mut self, text: &str, face: FaceSpec<'_>, size_px: f32) -> f32;
}

/// Fixed per-character advance, used when no font face can be resolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct EstimateMeasurer;

impl EstimateMeasurer {
    pub fn advance_em(weight: FontWeight) -> f32 {
        match weight {
            FontWeight::Bold => 0.6,
            FontWeight::Lighter | FontWeight::Normal => 0.55,
        }
    }
}

impl TextMeasurer for EstimateMeasurer {
    fn measure_width(&mut self, text: &str, face: FaceSpec<'_>, size_px: f32) -> f32 {
        text.chars().count() as f32 * size_px * Self::advance_em(face.weight)
    }
}

/// Greedy whitespace line breaking.
///
/// A word wider than `max_width` on its own stays on its own overflowing line.
pub fn wrap_text<M: TextMeasurer + ?Sized>(
    measurer: &mut M,
    text: &str,
    max_width: f32,
    face: FaceSpec<'_>,
    size_px: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measurer.measure_width(&candidate, face, size_px) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Heading size bounds for one style on one surface size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeRange {
    pub base: f32,
    pub min: f32,
}

impl SizeRange {
    pub const STEP: f32 = 2.0;

    pub fn new(base: f32, min: f32) -> Self {
        Self { base, min }
    }
}

/// Shrink from `range.base` in steps of 2px until `text` fits on one line.
///
/// The result always lies in `[range.min, range.base]`.
pub fn fit_font_size<M: TextMeasurer + ?Sized>(
    measurer: &mut M,
    text: &str,
    max_width: f32,
    range: SizeRange,
    face: FaceSpec<'_>,
) -> f32 {
    let min = range.min.min(range.base);
    let mut size = range.base;
    while size > min && measurer.measure_width(text, face, size) > max_width {
        size -= SizeRange::STEP;
    }
    size.max(min)
}
