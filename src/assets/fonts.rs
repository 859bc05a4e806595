use std::{
    path::Path,
    sync::{Arc, OnceLock},
};

use usvg::fontdb;

use crate::layout::FontWeight;

/// Environment variable listing extra font directories (platform path-list separator).
pub const FONT_DIRS_ENV: &str = "CAROUSEL_FONT_DIRS";

const SANS_FALLBACKS: &[&str] = &[
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "Roboto",
];

/// Font picker slugs and the CSS stacks they stand for.
const FONT_SLUGS: &[(&str, &str)] = &[
    ("arial", "Arial, sans-serif"),
    ("helvetica", "Helvetica, Arial, sans-serif"),
    ("times-new-roman", "'Times New Roman', Times, serif"),
    ("courier-new", "'Courier New', Courier, monospace"),
    ("verdana", "Verdana, Geneva, sans-serif"),
    ("georgia", "Georgia, serif"),
    ("palatino", "'Palatino Linotype', 'Book Antiqua', Palatino, serif"),
    ("garamond", "Garamond, serif"),
    ("bookman", "'Bookman Old Style', serif"),
    ("trebuchet-ms", "'Trebuchet MS', Helvetica, sans-serif"),
    ("impact", "Impact, Charcoal, sans-serif"),
    ("roboto", "'Roboto', sans-serif"),
    ("open-sans", "'Open Sans', sans-serif"),
    ("lato", "'Lato', sans-serif"),
    ("montserrat", "'Montserrat', sans-serif"),
    ("raleway", "'Raleway', sans-serif"),
    ("poppins", "'Poppins', sans-serif"),
    ("oswald", "'Oswald', sans-serif"),
    ("playfair-display", "'Playfair Display', serif"),
    ("merriweather", "'Merriweather', serif"),
    ("nunito", "'Nunito', sans-serif"),
    ("fira-sans", "'Fira Sans', sans-serif"),
    ("mulish", "'Mulish', sans-serif"),
];

/// One entry of a parsed font stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FamilyRef {
    Named(String),
    SansSerif,
    Serif,
    Monospace,
}

impl FamilyRef {
    fn as_fontdb(&self) -> fontdb::Family<'_> {
        match self {
            Self::Named(name) => fontdb::Family::Name(name),
            Self::SansSerif => fontdb::Family::SansSerif,
            Self::Serif => fontdb::Family::Serif,
            Self::Monospace => fontdb::Family::Monospace,
        }
    }
}

/// Expand a slug, family name or CSS-like stack into an ordered family list.
pub fn font_stack(spec: &str) -> Vec<FamilyRef> {
    let spec = spec.trim();
    let expanded = FONT_SLUGS
        .iter()
        .find(|(slug, _)| slug.eq_ignore_ascii_case(spec))
        .map(|(_, stack)| *stack)
        .unwrap_or(spec);

    expanded
        .split(',')
        .map(|part| part.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|part| !part.is_empty())
        .map(|part| match part.to_ascii_lowercase().as_str() {
            "sans-serif" | "system-ui" => FamilyRef::SansSerif,
            "serif" => FamilyRef::Serif,
            "monospace" => FamilyRef::Monospace,
            _ => FamilyRef::Named(part.to_owned()),
        })
        .collect()
}

/// A concrete face picked for a family stack and weight.
#[derive(Clone)]
pub struct ResolvedFace {
    pub family: String,
    pub weight: u16,
    pub index: u32,
    pub data: Arc<Vec<u8>>,
}

impl std::fmt::Debug for ResolvedFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFace")
            .field("family", &self.family)
            .field("weight", &self.weight)
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Registry of font faces available to the text engine.
pub struct FontBook {
    db: fontdb::Database,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.face_count())
            .finish()
    }
}

impl FontBook {
    pub fn empty() -> Self {
        Self {
            db: fontdb::Database::new(),
        }
    }

    /// System fonts plus every directory in `CAROUSEL_FONT_DIRS`.
    pub fn system() -> Self {
        let mut book = Self::empty();
        book.db.load_system_fonts();
        if let Some(dirs) = std::env::var_os(FONT_DIRS_ENV) {
            for dir in std::env::split_paths(&dirs) {
                book.load_dir(&dir);
            }
        }
        tracing::debug!(faces = book.face_count(), "font book loaded");
        book
    }

    /// Process-wide read-only registry, built on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<FontBook>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::system())).clone()
    }

    /// Load `.ttf`/`.otf`/`.ttc` files directly inside `dir`. Returns faces added.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let before = self.db.len();
        let Ok(rd) = std::fs::read_dir(dir) else {
            tracing::warn!(dir = %dir.display(), "font directory is not readable");
            return 0;
        };

        let mut paths: Vec<_> = rd
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            if let Err(e) = self.db.load_font_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable font");
            }
        }
        self.db.len() - before
    }

    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Sorted, de-duplicated family names.
    pub fn family_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .db
            .faces()
            .filter_map(|f| f.families.first().map(|(name, _)| name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Walk the stack, then generic sans, then common sans faces, then any face.
    pub fn resolve(&self, spec: &str, weight: FontWeight) -> Option<ResolvedFace> {
        let mut families = font_stack(spec);
        families.push(FamilyRef::SansSerif);
        families.extend(SANS_FALLBACKS.iter().map(|n| FamilyRef::Named((*n).to_owned())));

        let refs: Vec<fontdb::Family<'_>> = families.iter().map(FamilyRef::as_fontdb).collect();
        let query = fontdb::Query {
            families: &refs,
            weight: fontdb::Weight(weight.css_weight()),
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };

        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|f| f.id))?;
        let face = self.db.face(id)?;
        let family = face
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let face_weight = face.weight.0;

        let (data, index) = self
            .db
            .with_face_data(id, |data, index| (Arc::new(data.to_vec()), index))?;

        Some(ResolvedFace {
            family,
            weight: face_weight,
            index,
            data,
        })
    }
}
