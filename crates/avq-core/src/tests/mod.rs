//! Integration test suite for avq-core
//!
//! Whole-session tests across the encoder, the decoder and the G.192
//! framing, including independent sessions running on separate threads.

use crate::bitstream::G192Frame;
use crate::codecs::swb::{SwbAvqDecoder, SwbAvqEncoder};
use crate::types::*;

/// Common test utilities
pub mod utils {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Envelope falling linearly from band 0 to band 7
    pub fn falling_envelope() -> [f32; NB_SUBBANDS] {
        let mut envelope = [0.0f32; NB_SUBBANDS];
        for (b, e) in envelope.iter_mut().enumerate() {
            *e = (NB_SUBBANDS - b) as f32;
        }
        envelope
    }

    /// Block with the same smooth positive shape in every band
    pub fn harmonic_block(side: &SideInfo, frame: usize) -> Vec<f32> {
        let coarse = crate::codecs::swb::tables::COARSE_GAIN[usize::from(side.global_gain_index)];
        let phase = frame as f32 * 0.1;
        (0..SWB_COEFS)
            .map(|i| {
                let j = (i % SUBBAND_LEN) as f32;
                let shape = 1.5 + 0.5 * (0.8 * j + phase).sin();
                coarse * side.envelope[i / SUBBAND_LEN] * shape
            })
            .collect()
    }

    /// Block of uniform noise scaled by the envelope
    pub fn noise_block(rng: &mut SmallRng, side: &SideInfo) -> Vec<f32> {
        let coarse = crate::codecs::swb::tables::COARSE_GAIN[usize::from(side.global_gain_index)];
        (0..SWB_COEFS)
            .map(|i| coarse * side.envelope[i / SUBBAND_LEN] * rng.gen_range(-2.0f32..2.0))
            .collect()
    }

    /// Seeded generator for a session
    pub fn session_rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    /// Calculate signal-to-noise ratio in dB
    pub fn calculate_snr(original: &[f32], processed: &[f32]) -> f32 {
        if original.len() != processed.len() {
            return 0.0;
        }

        let signal_power: f64 = original.iter().map(|&x| f64::from(x).powi(2)).sum();
        let noise_power: f64 = original
            .iter()
            .zip(processed.iter())
            .map(|(&orig, &proc)| f64::from(orig - proc).powi(2))
            .sum();

        if noise_power == 0.0 {
            return f32::INFINITY;
        }

        10.0 * (signal_power / noise_power).log10() as f32
    }

    /// Run a session and return the soft bits of every frame
    pub fn run_session(seed: u64, frames: usize) -> Vec<Vec<u16>> {
        let config = SwbAvqConfig::new();
        let mut encoder = SwbAvqEncoder::new(config).unwrap();
        let mut decoder = SwbAvqDecoder::new(config).unwrap();
        let mut rng = session_rng(seed);
        let modes = [BweMode::Normal, BweMode::Harmonic, BweMode::Transient];

        let mut stream = Vec::with_capacity(frames);
        for frame in 0..frames {
            let side = SideInfo::new(falling_envelope(), modes[(frame / 4) % 3], 3);
            let coefs = noise_block(&mut rng, &side);

            let mut bits = vec![0u16; config.max_frame_bits()];
            let report = encoder.encode_frame(&coefs, &side, &mut bits).unwrap();
            bits.truncate(report.bits_written);

            let mut output = [0.0f32; SWB_COEFS];
            decoder.decode_frame(&bits, &side, &mut output).unwrap();
            assert_eq!(output, report.reconstruction);
            stream.push(bits);
        }
        stream
    }
}

#[cfg(test)]
mod session_tests {
    use super::utils::*;
    use super::*;

    /// Sessions on separate threads are independent and deterministic
    #[test]
    fn test_concurrent_sessions() {
        let handles: Vec<_> = [1u64, 1, 2, 3]
            .into_iter()
            .map(|seed| std::thread::spawn(move || run_session(seed, 16)))
            .collect();
        let streams: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(streams[0], streams[1]);
        assert_ne!(streams[0], streams[2]);
        assert_eq!(run_session(3, 16), streams[3]);
    }

    /// A shaped signal is reconstructed above the noise floor
    #[test]
    fn test_harmonic_session_quality() {
        let config = SwbAvqConfig::new();
        let mut encoder = SwbAvqEncoder::new(config).unwrap();
        let mut decoder = SwbAvqDecoder::new(config).unwrap();

        for frame in 0..8 {
            let side = SideInfo::new(falling_envelope(), BweMode::Normal, 2);
            let coefs = harmonic_block(&side, frame);
            let mut bits = vec![0u16; config.max_frame_bits()];
            let report = encoder.encode_frame(&coefs, &side, &mut bits).unwrap();

            let mut output = [0.0f32; SWB_COEFS];
            decoder
                .decode_frame(&bits[..report.bits_written], &side, &mut output)
                .unwrap();
            let snr = calculate_snr(&coefs, &output);
            assert!(snr > 0.0, "frame {}: SNR {:.2} dB", frame, snr);
        }
    }

    /// A stream survives G.192 serialisation with erasures in between
    #[test]
    fn test_g192_stream_with_erasures() {
        let config = SwbAvqConfig::new();
        let mut encoder = SwbAvqEncoder::new(config).unwrap();
        let mut decoder = SwbAvqDecoder::new(config).unwrap();
        let mut rng = session_rng(42);

        let mut wire = Vec::new();
        let mut sides = Vec::new();
        for frame in 0..10 {
            let side = SideInfo::new(falling_envelope(), BweMode::Harmonic, 4);
            let coefs = noise_block(&mut rng, &side);
            let mut bits = vec![0u16; config.max_frame_bits()];
            let report = encoder.encode_frame(&coefs, &side, &mut bits).unwrap();
            bits.truncate(report.bits_written);
            let good = frame % 4 != 3;
            wire.extend_from_slice(&G192Frame::new(bits, good).to_bytes());
            sides.push(side);
        }

        let mut offset = 0;
        for (frame, side) in sides.iter().enumerate() {
            let (parsed, used) = G192Frame::from_bytes(&wire[offset..]).unwrap();
            offset += used;

            let mut output = [0.0f32; SWB_COEFS];
            let types = decoder.decode_g192(&parsed, side, &mut output).unwrap();
            if !parsed.is_good_frame() {
                assert_eq!(types, [BandType::Zero; NB_SUBBANDS], "frame {}", frame);
            }
            assert!(output.iter().all(|v| v.is_finite()));
        }
        assert_eq!(offset, wire.len());
        assert_eq!(decoder.state().frame_count, 10);
    }
}
