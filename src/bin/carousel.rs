use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use carousel::{
    BrandingConfig, DeckOptions, FontBook, FontWeight, ImageEncoding, OutputFormat, SlideRenderer,
    StyleName, TextAlign, export_file_name,
};

#[derive(Parser, Debug)]
#[command(name = "carousel", version)]
struct Cli {
    /// Log progress and font resolution to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a deck: one slide per non-empty line of the input.
    Render(RenderArgs),
    /// Render a single slide to a file, or print it as a data URI.
    Slide(SlideArgs),
    /// List installed font families, or show which face a family resolves to.
    Fonts(FontsArgs),
}

#[derive(Parser, Debug)]
struct BrandArgs {
    /// Branding JSON (camelCase keys, all optional).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's style.
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Overrides the config's output format.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Overrides the config's text alignment.
    #[arg(long, value_enum)]
    align: Option<AlignArg>,

    /// Encode as JPEG at this quality in [0, 1] instead of PNG.
    #[arg(long)]
    jpeg_quality: Option<f32>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input text file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Worker threads; defaults to rayon's choice.
    #[arg(long)]
    threads: Option<usize>,

    /// Render slides one after another.
    #[arg(long)]
    sequential: bool,

    #[command(flatten)]
    brand: BrandArgs,
}

#[derive(Parser, Debug)]
struct SlideArgs {
    /// Slide text, `Heading: details`.
    #[arg(long)]
    text: String,

    /// 0-based position in the deck.
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Deck size.
    #[arg(long, default_value_t = 1)]
    total: u32,

    /// Output file; prints a data URI to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    brand: BrandArgs,
}

#[derive(Parser, Debug)]
struct FontsArgs {
    /// Family, slug or CSS stack to resolve.
    #[arg(long)]
    family: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleArg {
    Professional,
    Minimalist,
    Playful,
}

impl From<StyleArg> for StyleName {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Professional => Self::Professional,
            StyleArg::Minimalist => Self::Minimalist,
            StyleArg::Playful => Self::Playful,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Linkedin,
    Twitter,
    Instagram,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Linkedin => Self::Linkedin,
            FormatArg::Twitter => Self::Twitter,
            FormatArg::Instagram => Self::Instagram,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for TextAlign {
    fn from(v: AlignArg) -> Self {
        match v {
            AlignArg::Left => Self::Left,
            AlignArg::Center => Self::Center,
            AlignArg::Right => Self::Right,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Slide(args) => cmd_slide(args),
        Command::Fonts(args) => cmd_fonts(args),
    }
}

impl BrandArgs {
    fn branding(&self) -> anyhow::Result<BrandingConfig> {
        let mut cfg = match &self.config {
            Some(path) => BrandingConfig::from_json_file(path)
                .with_context(|| format!("load branding '{}'", path.display()))?,
            None => BrandingConfig::default(),
        };
        if let Some(style) = self.style {
            cfg.style_name = style.into();
        }
        if let Some(format) = self.format {
            cfg.output_format = format.into();
        }
        if let Some(align) = self.align {
            cfg.text_align = align.into();
        }
        Ok(cfg)
    }

    fn encoding(&self) -> (ImageEncoding, f32) {
        match self.jpeg_quality {
            Some(q) => (ImageEncoding::Jpeg, q),
            None => (ImageEncoding::Png, 1.0),
        }
    }
}

/// One fragment per non-empty line, trimmed.
fn split_fragments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;
    let fragments = split_fragments(&text);
    anyhow::ensure!(
        !fragments.is_empty(),
        "input '{}' has no text to render",
        args.in_path.display()
    );

    let cfg = args.brand.branding()?;
    let (encoding, quality) = args.brand.encoding();
    let opts = DeckOptions {
        parallel: !args.sequential,
        threads: args.threads,
        encoding,
        quality,
    };

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let renderer = SlideRenderer::with_system_fonts();
    let slides = renderer.render_deck(cfg.style_name, &cfg, &fragments, &opts)?;

    let mut failed = 0usize;
    for (i, slide) in slides.into_iter().enumerate() {
        match slide {
            Ok(img) => {
                let path = args
                    .out
                    .join(export_file_name(i, cfg.output_format, cfg.style_name, encoding));
                std::fs::write(&path, img.bytes())
                    .with_context(|| format!("write '{}'", path.display()))?;
                eprintln!("wrote {}", path.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("slide {}: {e}", i + 1);
            }
        }
    }
    anyhow::ensure!(failed == 0, "{failed} of {} slides failed", fragments.len());
    Ok(())
}

fn cmd_slide(args: SlideArgs) -> anyhow::Result<()> {
    let cfg = args.brand.branding()?;
    let (encoding, quality) = args.brand.encoding();
    let req = cfg.request_for(args.text.as_str(), args.index, args.total);

    let img = SlideRenderer::with_system_fonts()
        .generate_with(cfg.style_name, &req, encoding, quality)?;

    match args.out {
        Some(out) => {
            ensure_parent(&out)?;
            std::fs::write(&out, img.bytes())
                .with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{}", img.to_data_uri()),
    }
    Ok(())
}

fn cmd_fonts(args: FontsArgs) -> anyhow::Result<()> {
    let book = FontBook::shared();
    match args.family {
        Some(family) => {
            for weight in [FontWeight::Normal, FontWeight::Bold] {
                match book.resolve(&family, weight) {
                    Some(face) => println!(
                        "{weight:?}: {} (weight {}, face {}, {} bytes)",
                        face.family,
                        face.weight,
                        face.index,
                        face.data.len()
                    ),
                    None => println!("{weight:?}: no fonts installed"),
                }
            }
        }
        None => {
            for name in book.family_names() {
                println!("{name}");
            }
            eprintln!("{} faces", book.face_count());
        }
    }
    Ok(())
}
