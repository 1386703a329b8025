//! SWB Test Modules
//!
//! Frame-level scenarios of the layered coder and property tests over random
//! blocks.


use crate::codecs::swb::tables::COARSE_GAIN;
use crate::codecs::swb::{SwbAvqDecoder, SwbAvqEncoder};
use crate::types::{BandType, FrameReport, SideInfo, NB_SUBBANDS, SUBBAND_LEN, SWB_COEFS};

/// Envelope ranking band 0 first and band 7 last
pub const DESCENDING_ENVELOPE: [f32; NB_SUBBANDS] = [8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];

/// Block whose normalised bands all equal `pattern`
pub fn shaped_block(side: &SideInfo, pattern: &[f32; SUBBAND_LEN]) -> [f32; SWB_COEFS] {
    let coarse = COARSE_GAIN[usize::from(side.global_gain_index)];
    let mut coefs = [0.0f32; SWB_COEFS];
    for b in 0..NB_SUBBANDS {
        for j in 0..SUBBAND_LEN {
            coefs[b * SUBBAND_LEN + j] = coarse * side.envelope[b] * pattern[j];
        }
    }
    coefs
}

/// Encode a frame and decode it with a separate decoder
pub fn round_trip(
    encoder: &mut SwbAvqEncoder,
    decoder: &mut SwbAvqDecoder,
    coefs: &[f32],
    side: &SideInfo,
) -> (FrameReport, [f32; SWB_COEFS], [BandType; NB_SUBBANDS]) {
    let mut bits = vec![0u16; encoder.config().max_frame_bits()];
    let report = encoder.encode_frame(coefs, side, &mut bits).unwrap();
    let mut output = [0.0f32; SWB_COEFS];
    let types = decoder
        .decode_frame(&bits[..report.bits_written], side, &mut output)
        .unwrap();
    (report, output, types)
}
