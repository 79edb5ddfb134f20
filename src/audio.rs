use crate::properties::{QuirkFlags, Variant};

/// The hard-coded HP48-family replay table (CHIP-48/SUPER-CHIP), a short ROM-dumped
/// sine-like waveform played back at a fixed pitch when no richer sound engine is active.
const HP48_SAMPLE_TABLE: [i16; 16] = [
    0, 6270, 11585, 15137, 16383, 15137, 11585, 6270, 0, -6270, -11585, -15137, -16383, -15137,
    -11585, -6270,
];

/// The COSMAC VIP replay table (CHIP-8/CHIP-10), likewise a short fixed waveform.
const VIP_SAMPLE_TABLE: [i16; 8] = [0, 11585, 16383, 11585, 0, -11585, -16383, -11585];

const VIP_SQUARE_HZ: f64 = 1531.555;

/// Per-variant, per-instant state the audio renderer needs across calls: phase accumulators
/// and the MEGACHIP PCM sample cursor. Declared separately from [crate::processor::Processor]'s
/// other fields because, per the concurrency model (§5), these are the only fields the audio
/// callback thread touches; every other field is owned exclusively by the core's driving thread.
#[derive(Clone, Debug, Default)]
pub struct AudioState {
    phase: f64,
    mc_sample_pos: f64,
}

impl AudioState {
    pub fn new() -> Self {
        AudioState::default()
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }
}

/// A MEGACHIP PCM sample descriptor (§6): an 8-bit unsigned mono sample buffer resampled at
/// `sample_step` fraction per output sample, optionally looping.
pub struct MegaChipSample {
    pub data: Vec<u8>,
    pub step: f64,
    pub looped: bool,
}

/// Renders `frame_count` signed 16-bit mono samples at `sample_rate` into `samples`, selecting
/// a waveform per the table in this crate's specification: a MEGACHIP PCM sample takes
/// priority, then silence when `ST == 0`, then the XO-CHIP programmable pattern, then the
/// variant's fixed replay table, then a variant-appropriate square wave.
///
/// This function never touches an audio device or spawns a thread; it is pure sample
/// synthesis, leaving device output to the embedder.
pub fn render_audio(
    samples: &mut [i16],
    sample_rate: u32,
    sound_timer_active: bool,
    variant: Variant,
    quirks: QuirkFlags,
    xo_audio_pattern: Option<&[u8; 16]>,
    xo_pitch: u8,
    vp595_frequency: u8,
    megachip_sample: Option<MegaChipSample>,
    state: &mut AudioState,
) {
    if let Some(ref sample) = megachip_sample {
        render_megachip_sample(samples, sample, state);
        return;
    }
    if !sound_timer_active {
        samples.iter_mut().for_each(|s| *s = 0);
        state.reset_phase();
        return;
    }
    if quirks.contains(QuirkFlags::XO_CHIP_SOUND) {
        if let Some(pattern) = xo_audio_pattern {
            render_xo_chip_pattern(samples, sample_rate, pattern, xo_pitch, state);
            return;
        }
    }
    match variant {
        Variant::Chip48 | Variant::SChip10 | Variant::SChip11 | Variant::SChipC | Variant::SChipModern => {
            render_table(samples, sample_rate, &HP48_SAMPLE_TABLE, 4000.0, state)
        }
        Variant::Chip8 | Variant::Chip10 => {
            render_table(samples, sample_rate, &VIP_SAMPLE_TABLE, VIP_SQUARE_HZ, state)
        }
        Variant::Chip8X => {
            let hz = 27535.0 / (vp595_frequency as f64 + 1.0);
            render_square(samples, sample_rate, hz, state)
        }
        _ => render_square(samples, sample_rate, VIP_SQUARE_HZ, state),
    }
}

fn render_table(samples: &mut [i16], sample_rate: u32, table: &[i16], table_hz: f64, state: &mut AudioState) {
    let step = table.len() as f64 * table_hz / sample_rate as f64;
    for sample in samples.iter_mut() {
        let idx = state.phase as usize % table.len();
        *sample = table[idx];
        state.phase = (state.phase + step) % table.len() as f64;
    }
}

fn render_square(samples: &mut [i16], sample_rate: u32, hz: f64, state: &mut AudioState) {
    let step = hz / sample_rate as f64;
    for sample in samples.iter_mut() {
        *sample = if state.phase < 0.5 { i16::MAX / 2 } else { i16::MIN / 2 };
        state.phase = (state.phase + step) % 1.0;
    }
}

fn render_xo_chip_pattern(
    samples: &mut [i16],
    sample_rate: u32,
    pattern: &[u8; 16],
    pitch: u8,
    state: &mut AudioState,
) {
    let playback_rate = 4000.0 * 2f64.powf((pitch as f64 - 64.0) / 48.0) / 128.0;
    let bit_step = playback_rate / sample_rate as f64;
    for sample in samples.iter_mut() {
        let bit_index = (state.phase * 128.0) as usize % 128;
        let byte = pattern[bit_index / 8];
        let bit = (byte >> (7 - (bit_index % 8))) & 0x1;
        *sample = if bit != 0 { i16::MAX / 2 } else { i16::MIN / 2 };
        state.phase = (state.phase + bit_step) % 1.0;
    }
}

fn render_megachip_sample(samples: &mut [i16], sample: &MegaChipSample, state: &mut AudioState) {
    for out in samples.iter_mut() {
        let idx = state.mc_sample_pos as usize;
        if idx >= sample.data.len() {
            if sample.looped && !sample.data.is_empty() {
                state.mc_sample_pos = 0.0;
            } else {
                *out = 0;
                continue;
            }
        }
        let idx = state.mc_sample_pos as usize;
        let raw = sample.data.get(idx).copied().unwrap_or(128);
        *out = ((raw as i32 - 128) * 256).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        state.mc_sample_pos += sample.step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_when_sound_timer_inactive() {
        let mut samples = [1i16; 8];
        let mut state = AudioState::new();
        render_audio(
            &mut samples,
            8000,
            false,
            Variant::Chip8,
            QuirkFlags::empty(),
            None,
            64,
            0,
            None,
            &mut state,
        );
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_chip8_uses_vip_table_nonzero() {
        let mut samples = [0i16; 16];
        let mut state = AudioState::new();
        render_audio(
            &mut samples,
            8000,
            true,
            Variant::Chip8,
            QuirkFlags::empty(),
            None,
            64,
            0,
            None,
            &mut state,
        );
        assert!(samples.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_xo_chip_pattern_used_when_quirk_set() {
        let mut samples = [0i16; 32];
        let mut state = AudioState::new();
        let pattern = [0xFFu8; 16];
        render_audio(
            &mut samples,
            8000,
            true,
            Variant::XoChip,
            QuirkFlags::XO_CHIP_SOUND,
            Some(&pattern),
            64,
            0,
            None,
            &mut state,
        );
        assert!(samples.iter().all(|&s| s == i16::MAX / 2));
    }

    #[test]
    fn test_chip8x_frequency_changes_square_wave_period() {
        let mut low = [0i16; 64];
        let mut high = [0i16; 64];
        let mut state_low = AudioState::new();
        let mut state_high = AudioState::new();
        render_audio(
            &mut low, 8000, true, Variant::Chip8X, QuirkFlags::empty(), None, 64, 0, None,
            &mut state_low,
        );
        render_audio(
            &mut high, 8000, true, Variant::Chip8X, QuirkFlags::empty(), None, 64, 255, None,
            &mut state_high,
        );
        assert_ne!(low, high);
    }

    #[test]
    fn test_megachip_sample_resamples_pcm() {
        let mut samples = [0i16; 4];
        let mut state = AudioState::new();
        let data = vec![0u8, 64, 128, 192, 255];
        let mega = MegaChipSample { data, step: 1.0, looped: false };
        render_audio(
            &mut samples,
            8000,
            true,
            Variant::MegaChip,
            QuirkFlags::empty(),
            None,
            64,
            0,
            Some(mega),
            &mut state,
        );
        assert_eq!(samples[0], i16::MIN);
    }
}
