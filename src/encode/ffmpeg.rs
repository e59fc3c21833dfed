use std::fmt::Write as _;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use crate::audio::mix::{GainEnvelope, MusicBed};
use crate::collab::retry::CancelToken;
use crate::compile::plan::RenderPlan;
use crate::encode::sink::{RenderAssets, RenderConsumer, discard_render_output};
use crate::encode::srt::write_srt_file;
use crate::foundation::core::Millis;
use crate::foundation::error::{GrimError, GrimResult};

/// Output options for [`FfmpegRenderer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegRenderOpts {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Burn subtitle cues into the picture.
    pub burn_subtitles: bool,
}

impl Default for FfmpegRenderOpts {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            overwrite: true,
            burn_subtitles: true,
        }
    }
}

impl FfmpegRenderOpts {
    pub fn validate(&self) -> GrimResult<()> {
        if self.fps == 0 {
            return Err(GrimError::config("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(GrimError::config("ffmpeg width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(GrimError::config(
                "ffmpeg width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// Consumer that renders a plan with the system `ffmpeg`.
///
/// Every segment becomes a looped still input; adjacent segments are joined with `xfade` at the
/// segment's planned start (or `concat` when the plan has no crossfades). Cues are written next
/// to the output as `.srt` and burned in. The music bed is looped with `-stream_loop` when the
/// plan says so, trimmed to the narration length, shaped by the gain envelope and mixed under
/// the narration at full scale.
#[derive(Clone, Debug, Default)]
pub struct FfmpegRenderer {
    opts: FfmpegRenderOpts,
}

impl FfmpegRenderer {
    pub fn new(opts: FfmpegRenderOpts) -> Self {
        Self { opts }
    }
}

const POLL: Duration = Duration::from_millis(50);
const STDERR_GRACE: Duration = Duration::from_millis(100);

impl RenderConsumer for FfmpegRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    #[tracing::instrument(skip_all, fields(story_id = %plan.narration_ref.story_id, out = %out.display()))]
    fn render(
        &self,
        plan: &RenderPlan,
        assets: &RenderAssets,
        out: &Path,
        cancel: &CancelToken,
    ) -> GrimResult<PathBuf> {
        plan.validate()?;
        assets.check_against(plan)?;
        self.opts.validate()?;

        ensure_parent_dir(out)?;
        if !self.opts.overwrite && out.exists() {
            return Err(GrimError::encoding(format!(
                "output file '{}' already exists",
                out.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(GrimError::encoding(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        cancel.checkpoint("render")?;

        let subtitles = if self.opts.burn_subtitles && !plan.subtitle_cues.is_empty() {
            let path = out.with_extension("srt");
            write_srt_file(&plan.subtitle_cues, &path)?;
            Some(path)
        } else {
            None
        };

        let encoded = build_ffmpeg_args(plan, assets, subtitles.as_deref(), &self.opts, out)
            .and_then(|args| run_ffmpeg(&args, cancel));
        if let Err(err) = encoded {
            discard_render_output(out);
            return Err(err);
        }
        tracing::info!("video rendered");
        Ok(out.to_path_buf())
    }
}

/// Run `ffmpeg`, polling `cancel` while it works. A cancelled encode is killed and reaped.
fn run_ffmpeg(args: &[String], cancel: &CancelToken) -> GrimResult<()> {
    tracing::debug!(args = args.len(), "spawning ffmpeg");
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            GrimError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    let (stderr_tx, stderr_rx) = mpsc::channel();
    if let Some(mut pipe) = child.stderr.take() {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = stderr_tx.send(buf);
        });
    }

    loop {
        let polled = match child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GrimError::encoding(format!("failed to poll ffmpeg: {e}")));
            }
        };
        if let Some(status) = polled {
            if status.success() {
                return Ok(());
            }
            let stderr = stderr_rx.recv_timeout(STDERR_GRACE).unwrap_or_default();
            return Err(GrimError::encoding(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        if let Err(err) = cancel.checkpoint("render") {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!("ffmpeg stopped before finishing");
            return Err(err);
        }
        std::thread::sleep(POLL);
    }
}

/// Full `ffmpeg` argument list for `plan`.
///
/// Pure: no process is spawned and nothing touches the filesystem.
pub fn build_ffmpeg_args(
    plan: &RenderPlan,
    assets: &RenderAssets,
    subtitles: Option<&Path>,
    opts: &FfmpegRenderOpts,
    out: &Path,
) -> GrimResult<Vec<String>> {
    assets.check_against(plan)?;
    opts.validate()?;

    let mut args: Vec<String> = vec![
        if opts.overwrite { "-y" } else { "-n" }.to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    for seg in &plan.image_segments {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            opts.fps.to_string(),
            "-t".to_string(),
            secs(seg.len()),
            "-i".to_string(),
            path_arg(&assets.images[seg.image]),
        ]);
    }

    let narration_input = plan.image_segments.len();
    args.extend(["-i".to_string(), path_arg(&assets.narration)]);

    let music_input = match (&plan.music, &assets.music) {
        (MusicBed::Silent, _) => None,
        (_, None) => {
            return Err(GrimError::encoding(
                "plan has a music bed but no music file was supplied",
            ));
        }
        (bed, Some(path)) => {
            if matches!(bed, MusicBed::Loop { .. }) {
                args.extend(["-stream_loop".to_string(), "-1".to_string()]);
            }
            args.extend(["-i".to_string(), path_arg(path)]);
            Some(narration_input + 1)
        }
    };

    let graph = filter_graph(plan, subtitles, opts, narration_input, music_input);
    args.extend([
        "-filter_complex".to_string(),
        graph,
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "[a]".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        opts.fps.to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-t".to_string(),
        secs(plan.total_duration),
        "-movflags".to_string(),
        "+faststart".to_string(),
        path_arg(out),
    ]);
    Ok(args)
}

fn filter_graph(
    plan: &RenderPlan,
    subtitles: Option<&Path>,
    opts: &FfmpegRenderOpts,
    narration_input: usize,
    music_input: Option<usize>,
) -> String {
    let (w, h) = (opts.width, opts.height);
    let mut g = String::new();

    for i in 0..plan.image_segments.len() {
        let _ = write!(
            g,
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[s{i}];",
            fps = opts.fps
        );
    }

    let segments = &plan.image_segments;
    let crossfades = segments.iter().skip(1).any(|s| !s.transition_in.is_zero());
    if segments.len() == 1 {
        g.push_str("[s0]null[vbase];");
    } else if crossfades {
        let mut prev = "s0".to_string();
        for (i, seg) in segments.iter().enumerate().skip(1) {
            let next = if i + 1 == segments.len() {
                "vbase".to_string()
            } else {
                format!("x{i}")
            };
            // Offsets are on the joined stream's timeline, which is the plan's timeline.
            let _ = write!(
                g,
                "[{prev}][s{i}]xfade=transition=fade:duration={}:offset={}[{next}];",
                secs(seg.transition_in),
                secs(seg.start)
            );
            prev = next;
        }
    } else {
        for i in 0..segments.len() {
            let _ = write!(g, "[s{i}]");
        }
        let _ = write!(g, "concat=n={}:v=1:a=0[vbase];", segments.len());
    }

    match subtitles {
        Some(path) => {
            let _ = write!(g, "[vbase]subtitles={}[v];", escape_filter_value(path));
        }
        None => g.push_str("[vbase]null[v];"),
    }

    match music_input {
        Some(m) => {
            let _ = write!(
                g,
                "[{m}:a]atrim=0:{},asetpts=PTS-STARTPTS,volume='{}':eval=frame[bed];\
                 [{narration_input}:a][bed]amix=inputs=2:duration=first:normalize=0[a]",
                secs(plan.total_duration),
                volume_expr(&plan.gain_envelope)
            );
        }
        None => {
            let _ = write!(g, "[{narration_input}:a]anull[a]");
        }
    }
    g
}

/// Piecewise-linear `volume` expression over `t` (seconds) matching the envelope.
pub(crate) fn volume_expr(envelope: &GainEnvelope) -> String {
    let Some(last) = envelope.points.last() else {
        return "0".to_string();
    };
    let mut expr = String::new();
    let mut open = 0usize;
    for pair in envelope.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b.time <= a.time {
            continue;
        }
        let _ = write!(
            expr,
            "if(lt(t,{tb}),{ga:.4}+({gd:.4})*(t-{ta})/{span},",
            tb = secs(b.time),
            ta = secs(a.time),
            span = secs(b.time - a.time),
            ga = a.gain,
            gd = b.gain - a.gain,
        );
        open += 1;
    }
    let _ = write!(expr, "{:.4}", last.gain);
    expr.push_str(&")".repeat(open));
    expr
}

fn secs(t: Millis) -> String {
    format!("{}.{:03}", t.0 / 1000, t.0 % 1000)
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Quote a path for use as a filter option value inside `-filter_complex`.
///
/// The value is unescaped twice: once by the option parser (`\`, `'` and `:` need a
/// backslash) and once by the graph parser, where single quotes keep `,`, `;` and brackets
/// literal.
fn escape_filter_value(p: &Path) -> String {
    let raw = p.to_string_lossy();
    let mut value = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            value.push('\\');
        }
        value.push(c);
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> GrimResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
