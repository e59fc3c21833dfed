use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::collab::retry::CancelToken;
use crate::compile::plan::RenderPlan;
use crate::foundation::error::{GrimError, GrimResult};

/// Files backing a plan's handles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderAssets {
    pub narration: PathBuf,
    /// Indexed by image ordinal.
    pub images: Vec<PathBuf>,
    pub music: Option<PathBuf>,
}

impl RenderAssets {
    /// Check that every image the plan shows has a file.
    pub fn check_against(&self, plan: &RenderPlan) -> GrimResult<()> {
        if let Some(seg) = plan
            .image_segments
            .iter()
            .find(|s| s.image >= self.images.len())
        {
            return Err(GrimError::encoding(format!(
                "segment {} shows image {} but only {} image files were supplied",
                seg.index,
                seg.image,
                self.images.len()
            )));
        }
        Ok(())
    }
}

/// Remove what a render into `out` may have left behind: the video and its `.srt` sidecar.
pub fn discard_render_output(out: &Path) {
    for path in [out.to_path_buf(), out.with_extension("srt")] {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial render output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not remove partial render output");
            }
        }
    }
}

/// Consumer contract: realize image segments, crossfades, subtitle overlay and the gain
/// envelope exactly as planned.
pub trait RenderConsumer: Send + Sync {
    fn name(&self) -> &str;

    /// Render `plan` to `out`, returning the path of the produced file.
    ///
    /// Once `cancel` trips the consumer stops, removes anything it wrote for `out` and returns
    /// [`GrimError::Cancelled`].
    fn render(
        &self,
        plan: &RenderPlan,
        assets: &RenderAssets,
        out: &Path,
        cancel: &CancelToken,
    ) -> GrimResult<PathBuf>;
}

/// Consumer that only records what it was asked to render. For tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryConsumer {
    rendered: Mutex<Vec<(RenderPlan, PathBuf)>>,
}

impl InMemoryConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans received so far, in call order.
    pub fn rendered(&self) -> Vec<(RenderPlan, PathBuf)> {
        self.rendered
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl RenderConsumer for InMemoryConsumer {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn render(
        &self,
        plan: &RenderPlan,
        assets: &RenderAssets,
        out: &Path,
        cancel: &CancelToken,
    ) -> GrimResult<PathBuf> {
        cancel.checkpoint("render")?;
        plan.validate()?;
        assets.check_against(plan)?;
        self.rendered
            .lock()
            .map_err(|_| GrimError::encoding("in-memory consumer lock poisoned"))?
            .push((plan.clone(), out.to_path_buf()));
        Ok(out.to_path_buf())
    }
}
