//! Alert tone asset
//!
//! A short sine beep encoded as an 8-bit mono PCM WAV, small enough to embed
//! as a `data:` URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const TONE_FREQUENCY_HZ: u32 = 880;
pub const TONE_SAMPLE_RATE: u32 = 8_000;
pub const TONE_DURATION_MS: u32 = 200;
pub const DEFAULT_VOLUME: f32 = 0.3;

/// Linear fade at both ends, avoids clicks
const FADE_MS: u32 = 5;

const WAV_HEADER_LEN: usize = 44;

/// Alert tone
///
/// Volume is baked into the samples; sinks play the bytes as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTone {
    wav: Vec<u8>,
    volume: f32,
}

impl AlertTone {
    /// Generate the tone at `volume` (clamped to 0.0..=1.0)
    pub fn new(volume: f32) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };
        Self {
            wav: synthesize(TONE_FREQUENCY_HZ, TONE_DURATION_MS, TONE_SAMPLE_RATE, volume),
            volume,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Complete WAV file
    pub fn wav(&self) -> &[u8] {
        &self.wav
    }

    /// PCM samples without the WAV header
    pub fn samples(&self) -> &[u8] {
        &self.wav[WAV_HEADER_LEN..]
    }

    /// `data:audio/wav;base64,...` URL for web audio sinks
    pub fn data_url(&self) -> String {
        format!("data:audio/wav;base64,{}", STANDARD.encode(&self.wav))
    }
}

impl Default for AlertTone {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

fn synthesize(frequency: u32, duration_ms: u32, sample_rate: u32, volume: f32) -> Vec<u8> {
    let sample_count = (sample_rate * duration_ms / 1000) as usize;
    let fade = (sample_rate * FADE_MS / 1000) as usize;
    let amplitude = 127.0 * f64::from(volume);

    let mut wav = wav_header(sample_rate, sample_count as u32);
    wav.reserve(sample_count);

    for n in 0..sample_count {
        let t = n as f64 / f64::from(sample_rate);
        let envelope = if fade == 0 {
            1.0
        } else {
            let edge = n.min(sample_count - 1 - n);
            (edge as f64 / fade as f64).min(1.0)
        };
        let value = (2.0 * std::f64::consts::PI * f64::from(frequency) * t).sin();
        // 8-bit PCM is unsigned, silence at 128
        let sample = 128.0 + amplitude * envelope * value;
        wav.push(sample.round().clamp(0.0, 255.0) as u8);
    }

    wav
}

fn wav_header(sample_rate: u32, data_len: u32) -> Vec<u8> {
    let mut h = Vec::with_capacity(WAV_HEADER_LEN);
    h.extend_from_slice(b"RIFF");
    h.extend_from_slice(&(36 + data_len).to_le_bytes());
    h.extend_from_slice(b"WAVE");

    h.extend_from_slice(b"fmt ");
    h.extend_from_slice(&16u32.to_le_bytes());
    h.extend_from_slice(&1u16.to_le_bytes()); // PCM
    h.extend_from_slice(&1u16.to_le_bytes()); // mono
    h.extend_from_slice(&sample_rate.to_le_bytes());
    h.extend_from_slice(&sample_rate.to_le_bytes()); // byte rate
    h.extend_from_slice(&1u16.to_le_bytes()); // block align
    h.extend_from_slice(&8u16.to_le_bytes()); // bits per sample

    h.extend_from_slice(b"data");
    h.extend_from_slice(&data_len.to_le_bytes());
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_wav_header() {
        let tone = AlertTone::default();
        let wav = tone.wav();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(wav, 24), TONE_SAMPLE_RATE);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(wav, 40) as usize, tone.samples().len());
        assert_eq!(u32_at(wav, 4) as usize, wav.len() - 8);
    }

    #[test]
    fn test_duration() {
        let tone = AlertTone::default();
        let expected = (TONE_SAMPLE_RATE * TONE_DURATION_MS / 1000) as usize;
        assert_eq!(tone.samples().len(), expected);
    }

    #[test]
    fn test_volume_scales_amplitude() {
        let peak = |tone: &AlertTone| {
            tone.samples()
                .iter()
                .map(|&s| (i16::from(s) - 128).abs())
                .max()
                .unwrap()
        };

        let quiet = AlertTone::new(0.3);
        let loud = AlertTone::new(1.0);
        assert!(peak(&quiet) <= 39);
        assert!(peak(&loud) > 100);
        assert_eq!(peak(&AlertTone::new(0.0)), 0);
    }

    #[test]
    fn test_fades_in_and_out() {
        let tone = AlertTone::new(1.0);
        let samples = tone.samples();
        assert_eq!(samples[0], 128);
        assert_eq!(samples[samples.len() - 1], 128);
    }

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(AlertTone::new(4.0).volume(), 1.0);
        assert_eq!(AlertTone::new(-1.0).volume(), 0.0);
        assert_eq!(AlertTone::new(f32::NAN).volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn test_data_url_round_trips() {
        let tone = AlertTone::default();
        let url = tone.data_url();
        let payload = url.strip_prefix("data:audio/wav;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), tone.wav());
    }
}
