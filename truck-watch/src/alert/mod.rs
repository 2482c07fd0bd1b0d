//! New-order alert sound

mod player;
mod tone;

pub use player::{AlertPlayer, AudioSink, SoundError, SoundResult};
pub use tone::{AlertTone, DEFAULT_VOLUME, TONE_DURATION_MS, TONE_FREQUENCY_HZ, TONE_SAMPLE_RATE};
