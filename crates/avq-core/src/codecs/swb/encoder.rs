//! Layered SWB encoder
//!
//! The encoder normalises the block, picks the coding path, codes the
//! perceptually ranked bands in two layers and signals up to two zero-band
//! fills per layer. Every decision that the decoder must mirror is taken on the local
//! decoder's state, and the frame is finally decoded by that local decoder so
//! both sides carry the same previous-frame memory.

use super::bands::*;
use super::decoder::{FillField, FrameContext, SwbAvqDecoder};
use super::postproc;
use super::state::{DecoderState, EncoderState};
use super::tables::*;
use crate::bitstream::SoftBitWriter;
use crate::codecs::avq::encode_subvectors;
use crate::error::Result;
use crate::types::{
    BandType, CodingPath, FillDecision, FrameReport, SideInfo, SwbAvqConfig, MAX_FRAME_FILLS,
    NB_SUBBANDS, SUBBAND_LEN, SWB_COEFS,
};
use crate::utils::validation::{validate_buffer_size, validate_coefficients};

/// Layered SWB encoder
///
/// # Example
/// ```
/// use avq_core::codecs::swb::{SwbAvqDecoder, SwbAvqEncoder};
/// use avq_core::types::{BweMode, SideInfo, SwbAvqConfig};
///
/// let config = SwbAvqConfig::new();
/// let mut encoder = SwbAvqEncoder::new(config)?;
/// let mut decoder = SwbAvqDecoder::new(config)?;
///
/// let side = SideInfo::new([1.0; 8], BweMode::Normal, 2);
/// let coefs = [0.0f32; 64];
/// let mut bits = vec![0u16; config.max_frame_bits()];
/// let report = encoder.encode_frame(&coefs, &side, &mut bits)?;
///
/// let mut output = [0.0f32; 64];
/// decoder.decode_frame(&bits[..report.bits_written], &side, &mut output)?;
/// assert_eq!(output, report.reconstruction);
/// # Ok::<(), avq_core::AvqError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SwbAvqEncoder {
    config: SwbAvqConfig,
    state: EncoderState,
    local: SwbAvqDecoder,
}

impl SwbAvqEncoder {
    /// Create a new encoder
    ///
    /// # Arguments
    /// * `config` - Layer configuration, shared with the decoder
    ///
    /// # Returns
    /// * The encoder, or an error if the configuration is invalid
    pub fn new(config: SwbAvqConfig) -> Result<Self> {
        let local = SwbAvqDecoder::new(config)?;
        Ok(Self {
            config,
            state: EncoderState::new(),
            local,
        })
    }

    /// Encoder configuration
    pub fn config(&self) -> &SwbAvqConfig {
        &self.config
    }

    /// Encoder-only state
    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// State of the local decoder
    pub fn decoder_state(&self) -> &DecoderState {
        self.local.state()
    }

    /// Reset to the initial state (call start)
    pub fn reset(&mut self) {
        self.state.reset();
        self.local.reset();
    }

    /// Size in bits of the next frame for the given mode
    pub fn frame_bits(&self, side: &SideInfo) -> usize {
        self.config
            .frame_bits(is_mode_a(side.mode, self.local.state().prev_mode))
    }

    /// Encode one frame
    ///
    /// # Arguments
    /// * `coefs` - The 64 transform coefficients of the block
    /// * `side` - Side information of the frame
    /// * `output` - Receives the soft bits; must hold [`Self::frame_bits`] words
    ///
    /// # Returns
    /// * A report with the band classification, bit usage and the local
    ///   reconstruction
    pub fn encode_frame(
        &mut self,
        coefs: &[f32],
        side: &SideInfo,
        output: &mut [u16],
    ) -> Result<FrameReport> {
        validate_coefficients(coefs)?;
        side.validate()?;

        let prev = self.local.state().clone();
        let mode_a = is_mode_a(side.mode, prev.prev_mode);
        let frame_bits = self.config.frame_bits(mode_a);
        validate_buffer_size(output.len(), frame_bits)?;

        let gains = band_gains(side);
        let y = normalise(coefs, &gains);
        let layout = BandLayout::for_frame(&self.config, side);

        let path = if mode_a {
            let count = low_level_count(&y, &layout) as f32;
            self.state.low_level_smoothed = LOW_LEVEL_SMOOTHING * self.state.low_level_smoothed
                + (1.0 - LOW_LEVEL_SMOOTHING) * count;
            self.state.residual_flag =
                residual_decision(self.state.low_level_smoothed, self.state.residual_flag);
            if self.state.residual_flag {
                CodingPath::Residual
            } else {
                CodingPath::Direct
            }
        } else {
            CodingPath::Residual
        };

        let mut problematic = [false; NB_SUBBANDS];
        for (b, flag) in problematic.iter_mut().enumerate() {
            let detected = is_problematic(&y[band_range(b)]);
            *flag = update_hysteresis(&mut self.state.hysteresis[b], detected);
        }
        let fill_inhibited = layout
            .unscheduled_bands()
            .iter()
            .any(|&b| problematic[b]);
        let fill_active = self.config.zero_band_fill && !fill_inhibited;

        let mut ctx = FrameContext::new(&self.config, side, path);
        let layers = LayerEncoder {
            gradient_refinement: self.config.gradient_refinement,
            y: &y,
            problematic: &problematic,
            prev: &prev,
            weight: blend_weight(side.mode),
        };

        let mut fills = [None; MAX_FRAME_FILLS];
        let (layer1_used, layer2_used) = {
            let mut writer = SoftBitWriter::new(&mut output[..frame_bits]);
            if mode_a {
                writer.write_bits(u32::from(path == CodingPath::Residual), PATH_FLAG_BITS);
            }

            let fine_pos = writer.position();
            writer.write_bits(0, FINE_GAIN_BITS);
            writer.write_bits(u32::from(fill_inhibited), FILL_INHIBIT_BITS);

            let avq_budget = self.config.layer1.avq_budget(LAYER1_HEADER_BITS);
            let end = writer.position() + avq_budget;
            let (layer1_used, remaining) = layers.encode_layer(
                &mut writer,
                &mut ctx,
                layout.layer1_bands(),
                avq_budget,
                BandType::Layer1,
                Some(fine_pos),
            );
            if fill_active {
                layers.encode_fills(
                    &mut writer,
                    &mut ctx,
                    BandType::Layer1,
                    None,
                    remaining,
                    &mut fills,
                );
            }
            writer.pad_to(end);

            let mut layer2_used = 0;
            if self.config.layers == 2 {
                let header_pos = writer.position();
                let header_bits = if fill_active { FILL_FIELD_BITS } else { 0 };
                writer.write_bits(0, header_bits);

                let avq_budget = self.config.layer2.avq_budget(header_bits);
                let end = writer.position() + avq_budget;
                let (used, remaining) = layers.encode_layer(
                    &mut writer,
                    &mut ctx,
                    layout.layer2_bands(),
                    avq_budget,
                    BandType::Layer2,
                    None,
                );
                layer2_used = used;
                if fill_active {
                    layers.encode_fills(
                        &mut writer,
                        &mut ctx,
                        BandType::Layer2,
                        Some(header_pos),
                        remaining,
                        &mut fills,
                    );
                }
                writer.pad_to(end);
            }

            (layer1_used, layer2_used)
        };

        let mut reconstruction = [0.0f32; SWB_COEFS];
        let band_types = self
            .local
            .decode_frame(&output[..frame_bits], side, &mut reconstruction)?;
        self.state.frame_count += 1;

        tracing::debug!(
            "Encoded frame {}: mode={} path={:?} nq={:?} bits L1={} L2={} fills={:?}",
            self.state.frame_count,
            side.mode,
            path,
            ctx.nq,
            layer1_used,
            layer2_used,
            fills
        );

        Ok(FrameReport {
            band_types,
            nq: ctx.nq,
            path,
            path_flag_sent: mode_a,
            layer1_bits_used: layer1_used,
            layer2_bits_used: layer2_used,
            bits_written: frame_bits,
            fills,
            fill_inhibited,
            reconstruction,
        })
    }
}

/// Per-frame inputs of the layer coder
struct LayerEncoder<'a> {
    gradient_refinement: bool,
    y: &'a [f32; SWB_COEFS],
    problematic: &'a [bool; NB_SUBBANDS],
    prev: &'a DecoderState,
    weight: f32,
}

impl LayerEncoder<'_> {
    /// Code the bands of one layer with their signs and gradient codes
    ///
    /// Layer 1 passes the position of its fine gain placeholder; the gain is
    /// chosen from its bands and shared with layer 2, whose targets are
    /// divided by it. Leaves the cursor after the gradient codes and returns
    /// the lattice index bits with the leftover bits still free.
    fn encode_layer(
        &self,
        writer: &mut SoftBitWriter<'_>,
        ctx: &mut FrameContext,
        bands: &[usize],
        avq_budget: usize,
        band_type: BandType,
        fine_pos: Option<usize>,
    ) -> (usize, usize) {
        let shared_gain = if fine_pos.is_some() {
            1.0
        } else {
            ctx.fine_gain()
        };
        let mut targets = [[0.0f32; SUBBAND_LEN]; NB_SUBBANDS];
        for (t, &b) in targets.iter_mut().zip(bands.iter()) {
            *t = lattice_target(&self.y[band_range(b)], ctx.path).map(|v| v / shared_gain);
        }
        let targets = &targets[..bands.len()];

        let avq_start = writer.position();
        let frame = encode_subvectors(writer, targets, avq_budget);

        if let Some(pos) = fine_pos {
            let ratio = fine_gain_ratio(targets, frame.points());
            ctx.fine_index = quantise_fine_gain(ratio, ctx.gains.absolute);
            writer.seek(pos);
            writer.write_bits(ctx.fine_index, FINE_GAIN_BITS);
        }

        ctx.place_layer(bands, &frame, band_type);

        writer.seek(avq_start + frame.bits_used);
        let mut remaining = avq_budget - frame.bits_used;

        let plan = ctx.sign_plan(bands);
        let n_signs = plan.len().min(remaining);
        let mut negative = [false; SWB_COEFS];
        for (sign, &i) in negative.iter_mut().zip(plan.positions().iter()).take(n_signs) {
            *sign = self.y[i] < 0.0;
            writer.write_bit(u8::from(*sign));
        }
        postproc::apply_signs(
            &mut ctx.values,
            &plan,
            &negative[..n_signs],
            &self.prev.prev_coefs,
            self.weight,
        );
        remaining -= n_signs;

        if self.gradient_refinement {
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
                let range = band_range(b);
                let curve = select_gradient(
                    &self.y[range.clone()],
                    &ctx.values[range.clone()],
                    1 << width,
                );
                writer.write_bits(curve as u32, width);
                apply_gradient(&mut ctx.values[range], curve);
                k += 1;
            }
            remaining -= gradients.bits();
        }

        tracing::trace!(
            "{:?}: bands={:?} nq={:?} fine_index={} signs={}/{} leftover={}",
            band_type,
            bands,
            frame.nq(),
            ctx.fine_index,
            n_signs,
            plan.len(),
            remaining
        );

        (frame.bits_used, remaining)
    }

    /// Decide and write the fill fields of a layer, filling its zero bands
    ///
    /// The first target goes to the header at `header_pos` when the layer
    /// has one; the others need a complete field's worth of leftover bits.
    fn encode_fills(
        &self,
        writer: &mut SoftBitWriter<'_>,
        ctx: &mut FrameContext,
        band_type: BandType,
        header_pos: Option<usize>,
        mut remaining: usize,
        fills: &mut [Option<FillDecision>; MAX_FRAME_FILLS],
    ) {
        let candidates = ctx.fill_candidates();
        for (k, target) in ctx.fill_targets(band_type).into_iter().flatten().enumerate() {
            let field = choose_fill(ctx, &candidates, self.y, target, self.problematic);
            match header_pos {
                Some(pos) if k == 0 => {
                    let end = writer.position();
                    writer.seek(pos);
                    FillField::write_fixed(writer, field);
                    writer.seek(end);
                }
                _ => {
                    if remaining < FILL_FIELD_BITS {
                        break;
                    }
                    remaining -= FillField::write_leftover(writer, field);
                }
            }

            let applied =
                ctx.apply_fill(target, field, &candidates, band_type, self.prev, self.weight);
            if let (Some(decision), Some(slot)) =
                (applied, fills.iter_mut().find(|slot| slot.is_none()))
            {
                *slot = Some(decision);
            }
        }
    }
}

/// Pick the fill source of a zero band, if worth sending
fn choose_fill(
    ctx: &FrameContext,
    candidates: &FillCandidates,
    y: &[f32; SWB_COEFS],
    target: usize,
    problematic: &[bool; NB_SUBBANDS],
) -> Option<FillField> {
    if problematic[target] {
        tracing::trace!("Zero band {} is problematic, no fill", target);
        return None;
    }

    let wanted = &y[band_range(target)];
    let mut best: Option<(usize, f32)> = None;
    for (k, &b) in candidates.bands().iter().enumerate() {
        let rho = correlation(wanted, &ctx.values[band_range(b)]);
        if best.map_or(true, |(_, r)| rho > r) {
            best = Some((k, rho));
        }
    }

    let (candidate, rho) = best?;
    if rho <= FILL_MIN_CORRELATION {
        return None;
    }
    let source = candidates.get(candidate)?;
    Some(FillField {
        candidate,
        gain_index: quantise_fill_gain(wanted, &ctx.values[band_range(source)]),
    })
}
