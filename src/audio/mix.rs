use crate::{
    assets::descriptors::MusicAsset,
    foundation::core::Millis,
    foundation::error::{GrimError, GrimResult},
};

/// Music bed loudness and fades.
#[derive(Clone, Debug, PartialEq)]
pub struct MixRules {
    pub fade_in: Millis,
    pub fade_out: Millis,
    /// Plateau gain of the bed, in `[0, 1]`. Narration stays at full scale.
    pub music_gain: f32,
}

impl Default for MixRules {
    fn default() -> Self {
        Self {
            fade_in: Millis(2_000),
            fade_out: Millis(2_000),
            music_gain: 0.12,
        }
    }
}

/// One control point of a [`GainEnvelope`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GainPoint {
    pub time: Millis,
    pub gain: f32,
}

/// Piecewise-linear volume curve for the music bed.
///
/// Points are ordered by non-decreasing time. Before the first point the curve holds the first
/// gain; after the last point it holds the last gain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct GainEnvelope {
    pub points: Vec<GainPoint>,
}

impl GainEnvelope {
    /// Flat silence: a single point at gain 0.
    pub fn silent() -> Self {
        Self {
            points: vec![GainPoint {
                time: Millis::ZERO,
                gain: 0.0,
            }],
        }
    }

    /// Sample the curve at `t`.
    pub fn gain_at(&self, t: Millis) -> f32 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if t <= first.time {
            return first.gain;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time.0 - a.time.0;
                if span == 0 {
                    return b.gain;
                }
                let frac = ((t.0 - a.time.0) as f64 / span as f64) as f32;
                return a.gain + (b.gain - a.gain) * frac;
            }
        }
        self.points.last().map_or(0.0, |p| p.gain)
    }

    pub fn is_silent(&self) -> bool {
        self.points.iter().all(|p| p.gain == 0.0)
    }
}

/// How the encoder must lay the music source under a narration of length `D`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MusicBed {
    /// No music.
    Silent,
    /// Play the source once and cut it at `at` (equal to `D`).
    Trim { at: Millis },
    /// Repeat the source; playback restarts from the top at every repeat point.
    Loop {
        source_duration: Millis,
        /// Complete passes over the source.
        full_passes: u64,
        /// Length of the trailing partial pass, zero when `D` is a whole multiple.
        final_pass: Millis,
        /// Timeline positions where a new pass starts.
        repeat_points: Vec<Millis>,
    },
}

impl MusicBed {
    /// Total playback length described by the instruction.
    pub fn playback_len(&self) -> Millis {
        match self {
            Self::Silent => Millis::ZERO,
            Self::Trim { at } => *at,
            Self::Loop {
                source_duration,
                full_passes,
                final_pass,
                ..
            } => Millis(source_duration.0 * full_passes + final_pass.0),
        }
    }
}

/// Output of the mix planner.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MusicPlan {
    pub envelope: GainEnvelope,
    pub bed: MusicBed,
}

/// Derive the music gain envelope and loop/trim instruction for a narration of length `total`.
///
/// Without music (or with a zero-length source) the plan is explicit silence. The envelope ramps
/// `0 -> music_gain` over `[0, fade_in]` and back to 0 over `[total - fade_out, total]`; when the
/// fades together exceed `total` they are shortened in proportion and meet at a single peak.
#[tracing::instrument(skip(music), fields(music_ms = music.map(|m| m.duration.0)))]
pub fn plan_music(
    total: Millis,
    music: Option<&MusicAsset>,
    rules: &MixRules,
) -> GrimResult<MusicPlan> {
    let gain = rules.music_gain;
    if !gain.is_finite() || !(0.0..=1.0).contains(&gain) {
        return Err(GrimError::config(format!(
            "music_gain must be within [0, 1], got {gain}"
        )));
    }

    let source = match music {
        Some(m) if !m.duration.is_zero() && !total.is_zero() => m.duration,
        _ => {
            return Ok(MusicPlan {
                envelope: GainEnvelope::silent(),
                bed: MusicBed::Silent,
            });
        }
    };

    let (fade_in, fade_out) = fit_fades(total, rules.fade_in, rules.fade_out);
    let envelope = envelope_for(total, fade_in, fade_out, gain);

    let bed = if source >= total {
        MusicBed::Trim { at: total }
    } else {
        let full_passes = total.0 / source.0;
        let final_pass = Millis(total.0 % source.0);
        let repeat_points = (1..=full_passes)
            .map(|k| Millis(k * source.0))
            .filter(|p| *p < total)
            .collect::<Vec<_>>();
        tracing::debug!(full_passes, final_ms = final_pass.0, "music bed loops");
        MusicBed::Loop {
            source_duration: source,
            full_passes,
            final_pass,
            repeat_points,
        }
    };

    Ok(MusicPlan { envelope, bed })
}

fn fit_fades(total: Millis, fade_in: Millis, fade_out: Millis) -> (Millis, Millis) {
    let sum = fade_in.0 + fade_out.0;
    if sum <= total.0 {
        return (fade_in, fade_out);
    }
    let fade_in = total.scale(fade_in.0, sum);
    (fade_in, total - fade_in)
}

fn envelope_for(total: Millis, fade_in: Millis, fade_out: Millis, gain: f32) -> GainEnvelope {
    let edge = |fade: Millis| if fade.is_zero() { gain } else { 0.0 };
    let mut points = vec![
        GainPoint {
            time: Millis::ZERO,
            gain: edge(fade_in),
        },
        GainPoint {
            time: fade_in,
            gain,
        },
        GainPoint {
            time: total - fade_out,
            gain,
        },
        GainPoint {
            time: total,
            gain: edge(fade_out),
        },
    ];
    // Zero-length fades and a missing plateau collapse onto their neighbours.
    points.dedup();
    GainEnvelope { points }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
