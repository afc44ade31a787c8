/// Sound engine: procedural one-shot effects via rodio.
///
/// Every `SoundCue` is synthesized into an in-memory WAV buffer at init.
/// `play` is fire-and-forget: each call gets its own detached Sink, so
/// overlapping effects mix instead of queueing.
///
/// Compile without the "sound" feature to disable audio entirely (the stub
/// SoundEngine does nothing).

use std::f32::consts::TAU;

use crate::domain::content::SoundCue;

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const SAMPLE_RATE: u32 = 22050;

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{make_wav, synthesize, ALL_CUES};
    use crate::domain::content::{SoundCue, SoundEffect};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<SoundCue, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("sound: no output device: {e}");
                    return None;
                }
            };

            let buffers = ALL_CUES.iter()
                .map(|&cue| (cue, Arc::new(make_wav(&synthesize(cue)))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        /// Play `effect` once at `volume` (1.0 = as synthesized).
        pub fn play(&self, effect: &SoundEffect, volume: f32) {
            let Some(buf) = self.buffers.get(&effect.cue()) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.set_volume(volume);
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _effect: &crate::domain::content::SoundEffect, _volume: f32) {}
}

// ════════════════════════════════════════════════════════════
//  Waveform generators: all produce Vec<f32> mono samples
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const ALL_CUES: [SoundCue; 5] = [
    SoundCue::CoinPickup,
    SoundCue::Jump,
    SoundCue::PlayerKilled,
    SoundCue::ExitReached,
    SoundCue::GhostHit,
];

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn synthesize(cue: SoundCue) -> Vec<f32> {
    match cue {
        // Quick two-note chime, B5 → E6
        SoundCue::CoinPickup => notes(&[(988.0, 0.05), (1319.0, 0.12)], 0.35),
        SoundCue::Jump => sweep(220.0, 660.0, 0.14, 0.3),
        // Descending A4 → F#4 → Eb4 → C4
        SoundCue::PlayerKilled => notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.3)], 0.3),
        // C5 → E5 → G5 → C6, last note held
        SoundCue::ExitReached => notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)], 0.3),
        SoundCue::GhostHit => noise_burst(0.18, 0.35),
    }
}

/// Sequence of tones, each fading out over its own duration.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
    let mut samples = Vec::new();
    for &(freq, dur) in seq {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32).powf(0.5);
            // Sine + 3rd harmonic for a retro edge
            let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
            samples.push(wave * env * volume);
        }
    }
    samples
}

/// Linear pitch sweep.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut phase = 0.0_f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            phase += (from + (to - from) * t) / SAMPLE_RATE as f32;
            (phase * TAU).sin() * (1.0 - t) * volume
        })
        .collect()
}

/// Noise over a falling tone.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn noise_burst(duration: f32, volume: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut lcg: u32 = 2021;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let ti = i as f32 / SAMPLE_RATE as f32;
            let tone = (ti * (300.0 - t * 200.0) * TAU).sin();
            lcg = lcg.wrapping_mul(1103515245).wrapping_add(12345);
            let noise = (lcg >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            (tone * 0.4 + noise * 0.6) * (1.0 - t).powf(0.8) * volume
        })
        .collect()
}

// ════════════════════════════════════════════════════════════
//  WAV encoder: wraps f32 samples into a 16-bit PCM WAV buffer
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn make_wav(samples: &[f32]) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = samples.len() as u32 * 2;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());

    for &s in samples {
        let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&val.to_le_bytes());
    }

    buf
}
