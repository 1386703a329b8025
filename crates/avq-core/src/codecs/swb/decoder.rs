//! Layered SWB decoder
//!
//! This module provides the decoder side of the two-layer AVQ coder and the
//! per-frame reconstruction context that the encoder replays through its
//! local decoder.

use super::bands::*;
use super::postproc;
use super::state::DecoderState;
use super::tables::*;
use crate::bitstream::{G192Frame, SoftBitReader, SoftBitWriter};
use crate::codecs::avq::{decode_subvectors, AvqFrame};
use crate::error::{AvqError, Result};
use crate::types::{
    BandType, BweMode, CodingPath, FillDecision, SideInfo, SwbAvqConfig, NB_SUBBANDS,
    SUBBAND_LEN, SWB_COEFS,
};
use crate::utils::validation::validate_buffer_size;

/// Fill parameters of one zero band as carried in the bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FillField {
    pub candidate: usize,
    pub gain_index: usize,
}

impl FillField {
    /// Read a fixed-size field (layer 2 header)
    pub fn read_fixed(reader: &mut SoftBitReader<'_>) -> Option<Self> {
        let on = reader.read_bit() == 1;
        let candidate = reader.read_bits(FILL_CANDIDATE_BITS) as usize;
        let gain_index = reader.read_bits(FILL_GAIN_BITS) as usize;
        on.then_some(Self {
            candidate,
            gain_index,
        })
    }

    /// Read a leftover field: the enable flag, then the parameters if set
    ///
    /// Returns the field and the bits it took.
    pub fn read_leftover(reader: &mut SoftBitReader<'_>) -> (Option<Self>, usize) {
        if reader.read_bit() == 0 {
            return (None, FILL_ON_BITS);
        }
        let candidate = reader.read_bits(FILL_CANDIDATE_BITS) as usize;
        let gain_index = reader.read_bits(FILL_GAIN_BITS) as usize;
        (
            Some(Self {
                candidate,
                gain_index,
            }),
            FILL_FIELD_BITS,
        )
    }

    pub fn write_fixed(writer: &mut SoftBitWriter<'_>, field: Option<Self>) {
        let (on, candidate, gain_index) =
            field.map_or((0, 0, 0), |f| (1, f.candidate, f.gain_index));
        writer.write_bits(on, FILL_ON_BITS);
        writer.write_bits(candidate as u32, FILL_CANDIDATE_BITS);
        writer.write_bits(gain_index as u32, FILL_GAIN_BITS);
    }

    /// Write a leftover field; returns the bits written
    pub fn write_leftover(writer: &mut SoftBitWriter<'_>, field: Option<Self>) -> usize {
        match field {
            Some(f) => {
                Self::write_fixed(writer, Some(f));
                FILL_FIELD_BITS
            }
            None => {
                writer.write_bits(0, FILL_ON_BITS);
                FILL_ON_BITS
            }
        }
    }
}

/// Normalised reconstruction of one frame in progress
#[derive(Debug, Clone)]
pub(crate) struct FrameContext {
    pub layout: BandLayout,
    pub gains: BandGains,
    pub path: CodingPath,
    pub mode: BweMode,
    /// Layer 1 fine gain index, shared by both layers
    pub fine_index: u32,
    pub values: [f32; SWB_COEFS],
    pub types: [BandType; NB_SUBBANDS],
    pub nq: [u8; NB_SUBBANDS],
}

impl FrameContext {
    pub fn new(config: &SwbAvqConfig, side: &SideInfo, path: CodingPath) -> Self {
        Self {
            layout: BandLayout::for_frame(config, side),
            gains: band_gains(side),
            path,
            mode: side.mode,
            fine_index: 0,
            values: [0.0; SWB_COEFS],
            types: [BandType::Zero; NB_SUBBANDS],
            nq: [0; NB_SUBBANDS],
        }
    }

    /// Linear value of the frame's fine gain
    pub fn fine_gain(&self) -> f32 {
        fine_gain_value(self.fine_index, self.gains.absolute)
    }

    /// Place the decoded subvectors of a layer in their bands
    pub fn place_layer(&mut self, bands: &[usize], frame: &AvqFrame, band_type: BandType) {
        let fine_gain = self.fine_gain();
        for (k, &b) in bands.iter().enumerate() {
            let q = frame.nq[k];
            if q == 0 {
                continue;
            }
            let band = reconstruct_band(&frame.points[k], fine_gain, self.path);
            self.values[band_range(b)].copy_from_slice(&band);
            self.types[b] = band_type;
            self.nq[b] = q;
        }
    }

    /// Sign plan of a layer; empty on the direct path
    pub fn sign_plan(&self, bands: &[usize]) -> SignPlan {
        match self.path {
            CodingPath::Direct => SignPlan::empty(),
            CodingPath::Residual => sign_plan(&self.values, bands),
        }
    }

    /// Whether band `b` was coded by the layer of `band_type`
    pub fn is_coded(&self, b: usize, band_type: BandType) -> bool {
        self.types[b] == band_type && self.nq[b] > 0
    }

    /// Gradient plan of a layer for the bits left after its signs
    pub fn gradient_plan(
        &self,
        bands: &[usize],
        band_type: BandType,
        remaining: usize,
    ) -> GradientPlan {
        let coded = bands.iter().filter(|&&b| self.is_coded(b, band_type)).count();
        GradientPlan::new(coded, remaining)
    }

    /// Zero bands a layer may fill
    ///
    /// Layer 1 leaves the bands scheduled for layer 2 to that layer.
    pub fn fill_targets(&self, band_type: BandType) -> [Option<usize>; MAX_LAYER_FILLS] {
        match band_type {
            BandType::Layer1 => self
                .layout
                .fill_targets(&self.types, self.layout.layer2_bands()),
            _ => self.layout.fill_targets(&self.types, &[]),
        }
    }

    pub fn fill_candidates(&self) -> FillCandidates {
        fill_candidates(&self.values, &self.nq)
    }

    /// Apply a signalled fill to `target`
    ///
    /// Returns the decision actually applied; a candidate index past the
    /// candidate list is ignored.
    pub fn apply_fill(
        &mut self,
        target: usize,
        field: Option<FillField>,
        candidates: &FillCandidates,
        band_type: BandType,
        state: &DecoderState,
        weight: f32,
    ) -> Option<FillDecision> {
        let field = field?;
        let Some(source) = candidates.get(field.candidate) else {
            tracing::warn!(
                "Fill of band {} names candidate {} of {}, ignored",
                target,
                field.candidate,
                candidates.bands().len()
            );
            return None;
        };

        tracing::trace!(
            "Filling band {} from band {} (gain index {})",
            target,
            source,
            field.gain_index
        );
        self.fill_band(target, source, field.gain_index, band_type, state, weight);
        Some(FillDecision {
            band: target,
            source,
            candidate: field.candidate,
            gain_index: field.gain_index,
            layer: band_type,
        })
    }

    /// Reconstruct a zero band from a coded band
    ///
    /// The band is blended with the previous frame when that frame left it
    /// empty, and smoothed with its neighbours when the mode changed.
    pub fn fill_band(
        &mut self,
        target: usize,
        source: usize,
        gain_index: usize,
        band_type: BandType,
        state: &DecoderState,
        weight: f32,
    ) {
        let gain = FILL_GAIN[gain_index.min(FILL_GAIN.len() - 1)];
        let mut band = [0.0f32; SUBBAND_LEN];
        for (v, &c) in band.iter_mut().zip(self.values[band_range(source)].iter()) {
            *v = gain * c;
        }
        if state.prev_zero[target] {
            postproc::blend_band(&mut band, &state.prev_coefs[band_range(target)], weight);
        }
        self.values[band_range(target)].copy_from_slice(&band);

        if state.prev_mode != self.mode {
            postproc::smooth_band(&mut self.values, target);
        }
        self.types[target] = band_type;
    }

    /// Denormalise into `output` and carry the frame into the decoder state
    pub fn finish(&self, state: &mut DecoderState, output: &mut [f32]) {
        denormalise(&self.values, &self.gains, output);
        state.prev_coefs = self.values;
        for (zero, band_type) in state.prev_zero.iter_mut().zip(self.types.iter()) {
            *zero = *band_type == BandType::Zero;
        }
        state.prev_mode = self.mode;
        state.frame_count += 1;
    }
}

/// Layered SWB decoder
///
/// One decoder per session. Frames must be decoded in order; the decoder
/// keeps the previous frame for sign recovery and zero-band blending.
#[derive(Debug, Clone)]
pub struct SwbAvqDecoder {
    config: SwbAvqConfig,
    state: DecoderState,
}

impl SwbAvqDecoder {
    /// Create a new decoder
    ///
    /// # Arguments
    /// * `config` - Layer configuration, shared with the encoder
    ///
    /// # Returns
    /// * The decoder, or an error if the configuration is invalid
    pub fn new(config: SwbAvqConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: DecoderState::new(),
        })
    }

    /// Decoder configuration
    pub fn config(&self) -> &SwbAvqConfig {
        &self.config
    }

    /// Persistent decoder state
    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Reset to the initial state (call start)
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Decode one frame
    ///
    /// Layer 2 is decoded only when `bits` is long enough to hold it, so a
    /// frame truncated to layer 1 still decodes.
    ///
    /// # Arguments
    /// * `bits` - Soft bits of the frame, path flag and layer 1 first
    /// * `side` - Side information of the frame
    /// * `output` - Receives the 64 reconstructed coefficients
    ///
    /// # Returns
    /// * The band classification of the frame
    pub fn decode_frame(
        &mut self,
        bits: &[u16],
        side: &SideInfo,
        output: &mut [f32],
    ) -> Result<[BandType; NB_SUBBANDS]> {
        side.validate()?;
        validate_buffer_size(output.len(), SWB_COEFS)?;

        let mode_a = is_mode_a(side.mode, self.state.prev_mode);
        let layer1_len = self.config.layer1.budget_bits + usize::from(mode_a);
        if bits.len() < layer1_len {
            return Err(AvqError::BufferTooSmall {
                needed: layer1_len,
                actual: bits.len(),
            });
        }
        let with_layer2 = self.config.layers == 2
            && bits.len() >= layer1_len + self.config.layer2.budget_bits;

        let mut reader = SoftBitReader::new(bits);
        let path = if mode_a && reader.read_bit() == 0 {
            CodingPath::Direct
        } else {
            CodingPath::Residual
        };
        let mut ctx = FrameContext::new(&self.config, side, path);
        let weight = blend_weight(side.mode);
        let layout = ctx.layout;

        ctx.fine_index = reader.read_bits(FINE_GAIN_BITS);
        let inhibited = reader.read_bits(FILL_INHIBIT_BITS) == 1;
        let fill_active = self.config.zero_band_fill && !inhibited;

        let avq_budget = self.config.layer1.avq_budget(LAYER1_HEADER_BITS);
        let end = reader.position() + avq_budget;
        let (layer1_used, remaining) = self.decode_layer(
            &mut reader,
            &mut ctx,
            layout.layer1_bands(),
            avq_budget,
            BandType::Layer1,
            weight,
        );
        if fill_active {
            self.decode_fills(
                &mut reader,
                &mut ctx,
                BandType::Layer1,
                None,
                remaining,
                weight,
            );
        }
        reader.seek(end);

        let mut layer2_used = 0;
        if with_layer2 {
            let header = fill_active.then(|| FillField::read_fixed(&mut reader));
            let header_bits = if fill_active { FILL_FIELD_BITS } else { 0 };

            let avq_budget = self.config.layer2.avq_budget(header_bits);
            let end = reader.position() + avq_budget;
            let (used, remaining) = self.decode_layer(
                &mut reader,
                &mut ctx,
                layout.layer2_bands(),
                avq_budget,
                BandType::Layer2,
                weight,
            );
            layer2_used = used;
            if let Some(header) = header {
                self.decode_fills(
                    &mut reader,
                    &mut ctx,
                    BandType::Layer2,
                    Some(header),
                    remaining,
                    weight,
                );
            }
            reader.seek(end);
        }

        tracing::debug!(
            "Decoded frame {}: path={:?} nq={:?} bits L1={} L2={} fill inhibited={}",
            self.state.frame_count,
            path,
            ctx.nq,
            layer1_used,
            layer2_used,
            inhibited
        );

        ctx.finish(&mut self.state, output);
        Ok(ctx.types)
    }

    /// Decode a G.192 frame, concealing it when flagged bad
    ///
    /// # Errors
    ///
    /// Returns an error if the side information or output buffer is invalid,
    /// or if a good frame is shorter than layer 1.
    pub fn decode_g192(
        &mut self,
        frame: &G192Frame,
        side: &SideInfo,
        output: &mut [f32],
    ) -> Result<[BandType; NB_SUBBANDS]> {
        if frame.is_good_frame() {
            self.decode_frame(&frame.data_bits, side, output)
        } else {
            self.conceal_frame(side, output)
        }
    }

    /// Conceal a lost frame
    ///
    /// The previous frame is repeated at half amplitude and every band is
    /// reported as zero.
    pub fn conceal_frame(
        &mut self,
        side: &SideInfo,
        output: &mut [f32],
    ) -> Result<[BandType; NB_SUBBANDS]> {
        side.validate()?;
        validate_buffer_size(output.len(), SWB_COEFS)?;

        let values = postproc::attenuate(&self.state.prev_coefs);
        denormalise(&values, &band_gains(side), output);

        tracing::debug!("Concealed frame {}", self.state.frame_count);

        self.state.prev_coefs = values;
        self.state.prev_zero = [true; NB_SUBBANDS];
        self.state.prev_mode = side.mode;
        self.state.frame_count += 1;
        Ok([BandType::Zero; NB_SUBBANDS])
    }

    /// Decode the lattice indices, signs and gradient codes of one layer
    ///
    /// Leaves the reader after the gradient codes and returns the lattice
    /// index bits with the leftover bits still unread.
    fn decode_layer(
        &self,
        reader: &mut SoftBitReader<'_>,
        ctx: &mut FrameContext,
        bands: &[usize],
        avq_budget: usize,
        band_type: BandType,
        weight: f32,
    ) -> (usize, usize) {
        let avq_start = reader.position();
        let frame = decode_subvectors(reader, bands.len(), avq_budget);
        ctx.place_layer(bands, &frame, band_type);

        reader.seek(avq_start + frame.bits_used);
        let mut remaining = avq_budget - frame.bits_used;

        let plan = ctx.sign_plan(bands);
        let n_signs = plan.len().min(remaining);
        let mut negative = [false; SWB_COEFS];
        for sign in negative.iter_mut().take(n_signs) {
            *sign = reader.read_bit() == 1;
        }
        postproc::apply_signs(
            &mut ctx.values,
            &plan,
            &negative[..n_signs],
            &self.state.prev_coefs,
            weight,
        );
        remaining -= n_signs;

        if self.config.gradient_refinement {
            let gradients = ctx.gradient_plan(bands, band_type, remaining);
            let mut k = 0;
            for &b in bands {
                if !ctx.is_coded(b, band_type) {
                    continue;
                }
                let width = gradients.width(k);
                if width == 0 {
                    break;
                }
                let curve = reader.read_bits(width) as usize;
                apply_gradient(&mut ctx.values[band_range(b)], curve);
                k += 1;
            }
            remaining -= gradients.bits();
        }

        (frame.bits_used, remaining)
    }

    /// Read the fill fields of a layer and fill its zero bands
    ///
    /// The first target takes `header` when the layer has one; the others
    /// need a complete field's worth of leftover bits.
    fn decode_fills(
        &self,
        reader: &mut SoftBitReader<'_>,
        ctx: &mut FrameContext,
        band_type: BandType,
        header: Option<Option<FillField>>,
        mut remaining: usize,
        weight: f32,
    ) {
        let candidates = ctx.fill_candidates();
        for (k, target) in ctx.fill_targets(band_type).into_iter().flatten().enumerate() {
            let field = match header {
                Some(field) if k == 0 => field,
                _ => {
                    if remaining < FILL_FIELD_BITS {
                        break;
                    }
                    let (field, bits) = FillField::read_leftover(reader);
                    remaining -= bits;
                    field
                }
            };
            ctx.apply_fill(target, field, &candidates, band_type, &self.state, weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(mode: BweMode, path: CodingPath) -> FrameContext {
        let side = SideInfo::new([1.0; NB_SUBBANDS], mode, 2);
        let mut ctx = FrameContext::new(&SwbAvqConfig::new(), &side, path);
        ctx.values[band_range(0)].fill(2.0);
        ctx.nq[0] = 2;
        ctx.types[0] = BandType::Layer1;
        ctx
    }

    #[test]
    fn test_fill_smoothing_keys_on_mode() {
        let mut state = DecoderState::new();
        state.prev_zero = [false; NB_SUBBANDS];
        state.prev_mode = BweMode::Transient;

        // Same mode on another path: a plain copy
        let mut steady = context(BweMode::Transient, CodingPath::Direct);
        steady.fill_band(1, 0, 3, BandType::Layer2, &state, 1.0);
        assert_eq!(steady.values[band_range(1)], [2.0; SUBBAND_LEN]);
        assert_eq!(steady.types[1], BandType::Layer2);

        // Mode switch on the same path: the band edge meets the empty band 2
        let mut switched = context(BweMode::Normal, CodingPath::Residual);
        switched.fill_band(1, 0, 3, BandType::Layer1, &state, 1.0);
        assert_eq!(switched.values[8], 2.0);
        assert_eq!(switched.values[15], 1.5);
        assert_eq!(switched.types[1], BandType::Layer1);
    }

    #[test]
    fn test_fill_blends_with_previous_empty_band() {
        let mut state = DecoderState::new();
        state.prev_coefs[band_range(1)].fill(-4.0);

        let mut ctx = context(BweMode::Normal, CodingPath::Direct);
        ctx.fill_band(1, 0, 1, BandType::Layer2, &state, 0.75);
        // 0.75·(0.5·2) + 0.25·4
        assert_eq!(ctx.values[band_range(1)], [1.75; SUBBAND_LEN]);
    }

    #[test]
    fn test_apply_fill_ignores_missing_candidate() {
        let state = DecoderState::new();
        let mut ctx = context(BweMode::Normal, CodingPath::Direct);
        let candidates = ctx.fill_candidates();
        assert_eq!(candidates.bands(), &[0]);

        let field = FillField {
            candidate: 2,
            gain_index: 0,
        };
        let applied = ctx.apply_fill(5, Some(field), &candidates, BandType::Layer2, &state, 1.0);
        assert_eq!(applied, None);
        assert_eq!(ctx.types[5], BandType::Zero);

        let field = FillField {
            candidate: 0,
            gain_index: 0,
        };
        let applied = ctx.apply_fill(5, Some(field), &candidates, BandType::Layer2, &state, 1.0);
        assert_eq!(applied.map(|d| d.source), Some(0));
        assert_eq!(ctx.types[5], BandType::Layer2);
    }

    #[test]
    fn test_leftover_fill_field_sizes() {
        let mut buf = [0u16; 8];
        let mut writer = SoftBitWriter::new(&mut buf);
        let field = FillField {
            candidate: 3,
            gain_index: 1,
        };
        assert_eq!(FillField::write_leftover(&mut writer, None), 1);
        assert_eq!(FillField::write_leftover(&mut writer, Some(field)), 5);
        assert_eq!(writer.position(), 6);

        let mut reader = SoftBitReader::new(&buf);
        assert_eq!(FillField::read_leftover(&mut reader), (None, 1));
        assert_eq!(FillField::read_leftover(&mut reader), (Some(field), 5));
    }
}
