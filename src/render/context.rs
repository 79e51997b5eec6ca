use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    assets::store::{AssetLoader, PreparedImage},
    foundation::error::BoothResult,
    render::backend::FrameRGBA,
    render::compositor::RenderReport,
    template::class::{LoadedTemplate, TemplateSpec},
    template::slots::SlotDetectOpts,
};

/// Shared, monotonically increasing render counter.
///
/// Cloning yields another handle to the same counter, so whoever starts a newer render (or a
/// test standing in for it) can supersede one that is still loading images.
#[derive(Clone, Debug, Default)]
pub struct RenderTokenSource {
    current: Arc<AtomicU64>,
}

impl RenderTokenSource {
    /// Fresh counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render; every previously issued token becomes stale.
    pub fn advance(&self) -> RenderToken {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RenderToken {
            source: self.clone(),
            value,
        }
    }

    /// Value of the most recently issued token.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Token captured by one render at its start.
#[derive(Clone, Debug)]
pub struct RenderToken {
    source: RenderTokenSource,
    value: u64,
}

impl RenderToken {
    /// Counter value this render was started with.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// `true` while no newer render has been started.
    pub fn is_current(&self) -> bool {
        self.source.current() == self.value
    }

    /// Load an image and re-check the token once the load returns.
    ///
    /// This is the single re-entry point of a render: `Ok(None)` means a newer render started
    /// while the image was loading and the caller must abandon all further work. A stale render
    /// swallows its load error as well.
    pub fn load(
        &self,
        loader: &mut dyn AssetLoader,
        locator: &str,
    ) -> BoothResult<Option<PreparedImage>> {
        let loaded = loader.load_image(locator);
        if !self.is_current() {
            tracing::debug!(
                token = self.value,
                current = self.source.current(),
                locator,
                "render superseded while loading"
            );
            return Ok(None);
        }
        loaded.map(Some)
    }
}

/// Counters describing what a [`RenderContext`] has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Slot detections run (template cache misses).
    pub template_detections: u64,
    /// Renders that reused a prepared template.
    pub template_cache_hits: u64,
    /// Photo draw calls issued, across all renders.
    pub photo_draws: u64,
    /// Renders whose frame was committed.
    pub renders_committed: u64,
    /// Renders abandoned because a newer one started.
    pub renders_superseded: u64,
}

/// Last frame a render committed, with the token it was started under.
#[derive(Clone, Debug)]
pub struct CommittedRender {
    /// Token value of the committing render.
    pub token: u64,
    /// Composited pixels.
    pub frame: FrameRGBA,
    /// What the render drew.
    pub report: RenderReport,
}

/// Per-session compositing state: render tokens, the prepared template and the committed frame.
///
/// Each context is independent; two contexts never share tokens or cache entries. Only the most
/// recently prepared template is held; preparing another one replaces it.
#[derive(Debug, Default)]
pub struct RenderContext {
    tokens: RenderTokenSource,
    detect_opts: SlotDetectOpts,
    template: Option<Arc<LoadedTemplate>>,
    committed: Option<CommittedRender>,
    stats: RenderStats,
}

impl RenderContext {
    /// Context detecting slots with `detect_opts`.
    pub fn new(detect_opts: SlotDetectOpts) -> Self {
        Self {
            detect_opts,
            ..Self::default()
        }
    }

    /// Slot detection options used on template cache misses.
    pub fn detect_opts(&self) -> &SlotDetectOpts {
        &self.detect_opts
    }

    /// Handle to this context's token counter.
    pub fn token_source(&self) -> RenderTokenSource {
        self.tokens.clone()
    }

    /// Issue the token for a new render, superseding any in flight.
    pub fn begin_render(&self) -> RenderToken {
        self.tokens.advance()
    }

    /// Prepared template for `spec`, if it is the one cached.
    pub fn cached_template(&self, spec: &TemplateSpec) -> Option<Arc<LoadedTemplate>> {
        self.template.as_ref().filter(|t| &t.spec == spec).cloned()
    }

    /// Number of prepared templates held (zero or one).
    pub fn cached_template_count(&self) -> usize {
        usize::from(self.template.is_some())
    }

    /// Drop the prepared template.
    pub fn clear_template_cache(&mut self) {
        self.template = None;
    }

    /// Last committed render, if any.
    pub fn committed(&self) -> Option<&CommittedRender> {
        self.committed.as_ref()
    }

    /// Pixels of the last committed render, if any.
    pub fn committed_frame(&self) -> Option<&FrameRGBA> {
        self.committed.as_ref().map(|c| &c.frame)
    }

    /// Counters so far.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RenderStats {
        &mut self.stats
    }

    pub(crate) fn insert_template(&mut self, template: Arc<LoadedTemplate>) {
        self.stats.template_detections += 1;
        if let Some(old) = self.template.replace(template) {
            tracing::debug!(locator = %old.spec.locator, "template cache entry replaced");
        }
    }

    /// Commit `frame` unless `token` went stale; returns whether it was committed.
    pub(crate) fn commit(
        &mut self,
        token: &RenderToken,
        frame: FrameRGBA,
        report: RenderReport,
    ) -> bool {
        if !token.is_current() {
            self.stats.renders_superseded += 1;
            return false;
        }
        self.stats.renders_committed += 1;
        self.committed = Some(CommittedRender {
            token: token.value(),
            frame,
            report,
        });
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/context.rs"]
mod tests;
