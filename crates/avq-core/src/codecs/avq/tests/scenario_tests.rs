//! Allocation scenarios of the split quantiser and multiplexer

use crate::bitstream::{g192_to_hard_bits, SoftBitReader, SoftBitWriter, G192_ZERO};
use crate::codecs::avq::tables::{LEADERS, Q3_INDEX_COUNT, Q4_INDEX_COUNT};
use crate::codecs::avq::tables::Family;
use crate::codecs::avq::*;

fn encode(input: &[[f32; DIM]], budget: usize) -> (Vec<u16>, AvqFrame) {
    let mut buf = vec![G192_ZERO; budget];
    let mut writer = SoftBitWriter::new(&mut buf);
    let frame = encode_subvectors(&mut writer, input, budget);
    (buf, frame)
}

/// Codebook sizes match the index field widths
#[test]
fn test_codebook_totals() {
    assert_eq!(LEADERS.total(Family::Q3), Q3_INDEX_COUNT);
    assert_eq!(LEADERS.total(Family::Q4), Q4_INDEX_COUNT);
}

/// All-zero block: zero codebooks, one stop bit each, zero output
#[test]
fn test_all_zero_block() {
    let (buf, frame) = encode(&[[0.0; DIM]; 8], 36);
    assert!(frame.nq().iter().all(|&q| q == 0));
    assert_eq!(frame.bits_used, 8);
    assert!(g192_to_hard_bits(&buf).iter().all(|&b| b == 0));

    let mut reader = SoftBitReader::new(&buf);
    let decoded = decode_subvectors(&mut reader, 8, 36);
    assert!(decoded.points().iter().all(|p| *p == [0; DIM]));
    assert_eq!(decoded.bits_used, 8);
}

/// A subvector carrying 90% of the energy gets the bits
#[test]
fn test_single_dominant_subvector() {
    let mut input = [[0.5f32, -0.5, 0.5, -0.5, 0.0, 0.0, 0.0, 0.0]; 8];
    input[3] = [6.0, -4.0, 2.0, 2.0, -2.0, 1.0, 1.0, 1.0];

    let total: f32 = input.iter().flatten().map(|v| v * v).sum();
    let dominant: f32 = input[3].iter().map(|v| v * v).sum();
    assert!(dominant / total > 0.9);

    let (_, frame) = encode(&input, 36);
    let nq = frame.nq();
    assert!(nq[3] > 0);
    for (i, &q) in nq.iter().enumerate() {
        if i != 3 {
            assert!(q < nq[3], "subvector {} got nq={} vs dominant {}", i, q, nq[3]);
        }
    }
}

/// Over-budget allocations drop the lowest-priority subvector
#[test]
fn test_budget_exceeding_allocation() {
    let mut points = [[0i32; DIM]; 8];
    points[0] = [4, 4, 0, 0, 0, 0, 0, 0];
    points[1] = [0, 0, 6, 2, 0, 0, 0, 0];
    points[2] = [0, 0, 0, 0, 0, -4, 4, 0];
    let estimates = [10, 30, 20, 0, 0, 0, 0, 0];

    let mut buf = vec![G192_ZERO; 36];
    let mut writer = SoftBitWriter::new(&mut buf);
    let frame = mux(&mut writer, &points, &estimates, 36);

    // 3 × 15 bits cannot fit: the smallest estimate loses
    assert_eq!(frame.nq(), &[0, 3, 3, 0, 0, 0, 0, 0]);
    assert_eq!(frame.points()[0], [0; DIM]);
    assert_eq!(frame.bits_used, 36);

    let mut reader = SoftBitReader::new(&buf);
    let decoded = demux(&mut reader, 8, 36);
    assert_eq!(decoded, frame);
}

/// The low-rate profile shares the same packing rules
#[test]
fn test_low_rate_profile() {
    let input = [[1.5f32, -1.2, 0.8, 0.4, 0.0, 0.3, -0.2, 0.1], [0.2f32; DIM]];
    let (buf, frame) = encode(&input, 12);
    assert!(frame.bits_used <= 12);

    let mut reader = SoftBitReader::new(&buf);
    let decoded = decode_subvectors(&mut reader, 2, 12);
    assert_eq!(decoded, frame);
    assert_eq!(packed_bits(frame.nq(), 12), Some(frame.bits_used));
}
