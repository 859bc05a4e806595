use rayon::prelude::*;

use crate::{
    config::BrandingConfig,
    foundation::error::{CarouselError, CarouselResult},
    model::{OutputFormat, StyleName},
    render::{
        encode::{EncodedImage, ImageEncoding},
        pipeline::SlideRenderer,
    },
};

/// Batch settings for [`render_deck`].
#[derive(Clone, Debug)]
pub struct DeckOptions {
    /// Render slides on a rayon pool instead of sequentially.
    pub parallel: bool,
    /// Pool size; `None` lets rayon pick.
    pub threads: Option<usize>,
    pub encoding: ImageEncoding,
    pub quality: f32,
}

impl Default for DeckOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            encoding: ImageEncoding::Png,
            quality: 1.0,
        }
    }
}

/// Render every fragment as one slide of a deck with the shared font registry.
///
/// The outer error covers option problems; each slide carries its own result
/// so one failure does not discard the rest.
pub fn render_deck(
    style: StyleName,
    config: &BrandingConfig,
    fragments: &[String],
    opts: &DeckOptions,
) -> CarouselResult<Vec<CarouselResult<EncodedImage>>> {
    SlideRenderer::with_system_fonts().render_deck(style, config, fragments, opts)
}

/// File name for a downloaded slide, e.g. `slide-1-linkedin-professional.png`.
pub fn export_file_name(
    slide_index: usize,
    format: OutputFormat,
    style: StyleName,
    encoding: ImageEncoding,
) -> String {
    format!(
        "slide-{}-{}-{}.{}",
        slide_index + 1,
        format,
        style,
        encoding.extension()
    )
}

impl SlideRenderer {
    #[tracing::instrument(
        skip(self, config, fragments, opts),
        fields(slides = fragments.len())
    )]
    pub fn render_deck(
        &self,
        style: StyleName,
        config: &BrandingConfig,
        fragments: &[String],
        opts: &DeckOptions,
    ) -> CarouselResult<Vec<CarouselResult<EncodedImage>>> {
        config.validate()?;
        if opts.threads == Some(0) {
            return Err(CarouselError::validation(
                "deck 'threads' must be >= 1 when set",
            ));
        }
        let total = u32::try_from(fragments.len())
            .map_err(|_| CarouselError::validation("too many slides in one deck"))?;

        let render_one = |(i, text): (usize, &String)| {
            // i < total, which fits in u32.
            let req = config.request_for(text.as_str(), i as u32, total);
            self.generate_with(style, &req, opts.encoding, opts.quality)
        };

        let out: Vec<_> = if opts.parallel && fragments.len() > 1 {
            let pool = build_thread_pool(opts.threads)?;
            pool.install(|| fragments.par_iter().enumerate().map(render_one).collect())
        } else {
            fragments.iter().enumerate().map(render_one).collect()
        };

        let failed = out.iter().filter(|r| r.is_err()).count();
        tracing::debug!(rendered = out.len() - failed, failed, "deck rendered");
        Ok(out)
    }
}

/// `threads` is already validated to be non-zero.
fn build_thread_pool(threads: Option<usize>) -> CarouselResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        CarouselError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
    })
}
