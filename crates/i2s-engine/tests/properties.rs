//! Property tests: byte-count encoding, range checks, buffer validation,
//! pre-fill, poison ordering and the lock retry bound.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

mod common;

use common::{streaming, words_buffer, zero_buffer, Rig};
use embassy_futures::block_on;
use i2s_engine::regs::{
    CHANNEL_EN, CHANNEL_RESET, CHANNEL_TX, CLKGEN_CFG, MMCM_LOCKED, UNMASK_ALL,
};
use i2s_engine::{
    byte_count_field, ChannelState, ClockGenerator, ClockSource, DataFormat, Error, Invalid,
    BUFFER_SIZE, MAX_BUFFERS, MAX_LOCK_ATTEMPTS, NUM_CHANNELS, PREFILL_THRESHOLD,
};
use platform::mocks::{MockDelay, MockRegisters, RecordingCompletion};
use platform::{Direction, MboStatus};
use proptest::prelude::*;

fn any_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Rx), Just(Direction::Tx)]
}

fn any_format() -> impl Strategy<Value = DataFormat> {
    prop_oneof![
        Just(DataFormat::Undefined),
        Just(DataFormat::Delayed),
        Just(DataFormat::DelayedSeq),
        Just(DataFormat::Seq),
        Just(DataFormat::LeftMono),
        Just(DataFormat::LeftStereo),
        Just(DataFormat::RightMono),
        Just(DataFormat::RightStereo),
    ]
}

const LEFT_FIELD: u32 = 0x0000_FC00;
const RIGHT_FIELD: u32 = 0x003F_0000;
const SEQ_FIELD: u32 = 0x0001_FC00;

proptest! {
    /// The byte count never leaks into the control bits it is ORed with.
    #[test]
    fn byte_count_stays_in_its_field(format in any_format(), bpf in any::<u8>()) {
        let field = byte_count_field(format, bpf);
        prop_assert_eq!(field & !(LEFT_FIELD | RIGHT_FIELD | SEQ_FIELD), 0);
        prop_assert_eq!(field & (CHANNEL_EN | CHANNEL_TX | CHANNEL_RESET | UNMASK_ALL), 0);
    }

    /// Stereo layouts split the frame evenly; mono and sequential layouts
    /// carry the whole frame in one field.
    #[test]
    fn byte_count_encoding(bpf in 0u8..64) {
        let b = u32::from(bpf);
        let half = b / 2;
        prop_assert_eq!(byte_count_field(DataFormat::Undefined, bpf), 0);
        prop_assert_eq!(byte_count_field(DataFormat::LeftMono, bpf), b << 10);
        prop_assert_eq!(byte_count_field(DataFormat::RightMono, bpf), b << 16);
        prop_assert_eq!(byte_count_field(DataFormat::LeftStereo, bpf), (half << 10) | (half << 16));
        prop_assert_eq!(
            byte_count_field(DataFormat::LeftStereo, bpf),
            byte_count_field(DataFormat::RightStereo, bpf)
        );
        for format in [DataFormat::Delayed, DataFormat::DelayedSeq, DataFormat::Seq] {
            prop_assert_eq!(byte_count_field(format, bpf), b << 10);
        }
    }

    /// Every entry point rejects an out-of-range index without side effects.
    #[test]
    fn out_of_range_index_mutates_nothing(index in NUM_CHANNELS..usize::MAX, dir in any_direction()) {
        let rig = Rig::locked();
        let dev = rig.device();
        let sink = RecordingCompletion::leak();
        let range = Error::Range { index };

        prop_assert_eq!(block_on(dev.configure(index, streaming(dir))), Err(range));
        let rejected = dev.enqueue(index, zero_buffer(sink, 0, 16)).unwrap_err();
        prop_assert_eq!(rejected.error, range);
        prop_assert_eq!(dev.poison(index), Err(range));
        prop_assert_eq!(dev.activate_rx(index), Err(range));
        prop_assert_eq!(dev.transfer(index), Err(range));
        prop_assert!(dev.status(index).is_err());

        prop_assert!(rig.i2s.writes().is_empty());
        prop_assert!(rig.clk.writes().is_empty());
        prop_assert_eq!(sink.count(), 0);
    }

    /// A length that is not a multiple of four is refused and the queue is
    /// left exactly as it was.
    #[test]
    fn misaligned_length_leaves_queue_unchanged(
        channel in 0..NUM_CHANNELS,
        queued in 0usize..8,
        length in (1usize..BUFFER_SIZE).prop_filter("not quadlet aligned", |l| l % 4 != 0),
    ) {
        let rig = Rig::locked();
        let dev = rig.device();
        let sink = RecordingCompletion::leak();
        block_on(dev.configure(channel, streaming(Direction::Rx))).unwrap();
        for n in 0..queued {
            dev.enqueue(channel, zero_buffer(sink, n, 16)).unwrap();
        }

        let mbo = zero_buffer(sink, 99, BUFFER_SIZE).with_length(length);
        let rejected = dev.enqueue(channel, mbo).unwrap_err();

        prop_assert_eq!(rejected.error, Error::InvalidArgument(Invalid::Alignment));
        prop_assert_eq!(rejected.mbo.buffer_length, length);
        prop_assert_eq!(dev.status(channel).unwrap().pending, queued);
        prop_assert_eq!(sink.count(), 0);
    }

    /// Poisoning returns every pending buffer, oldest first, closed and
    /// unprocessed, and leaves the channel uninitialized.
    #[test]
    fn poison_returns_all_pending_in_fifo_order(
        channel in 0..NUM_CHANNELS,
        pending in 0..=MAX_BUFFERS,
    ) {
        let rig = Rig::locked();
        let dev = rig.device();
        let sink = RecordingCompletion::leak();
        block_on(dev.configure(channel, streaming(Direction::Rx))).unwrap();
        for ctx in 0..pending {
            dev.enqueue(channel, zero_buffer(sink, ctx, 8)).unwrap();
        }

        dev.poison(channel).unwrap();

        let expected: Vec<_> = (0..pending).map(|ctx| (ctx, MboStatus::Closed, 0)).collect();
        prop_assert_eq!(sink.outcomes(), expected);
        let status = dev.status(channel).unwrap();
        prop_assert_eq!(status.state, ChannelState::Uninitialized);
        prop_assert_eq!(status.pending, 0);
    }

    /// A Tx channel starts only on the threshold-th buffer, which sends
    /// exactly that many buffers.
    #[test]
    fn tx_prefill_threshold(channel in 0..NUM_CHANNELS, words in 1usize..16) {
        let rig = Rig::locked();
        let dev = rig.device();
        let sink = RecordingCompletion::leak();
        block_on(dev.configure(channel, streaming(Direction::Tx))).unwrap();
        let payload = vec![0x5A5A_5A5A; words];

        for n in 0..PREFILL_THRESHOLD - 1 {
            dev.enqueue(channel, words_buffer(sink, n, &payload)).unwrap();
        }
        prop_assert_eq!(dev.status(channel).unwrap().state, ChannelState::Initialized);
        prop_assert_eq!(sink.count(), 0);

        dev.enqueue(channel, words_buffer(sink, PREFILL_THRESHOLD - 1, &payload)).unwrap();

        let expected: Vec<_> = (0..PREFILL_THRESHOLD)
            .map(|ctx| (ctx, MboStatus::Success, words * 4))
            .collect();
        prop_assert_eq!(sink.outcomes(), expected);
        prop_assert_eq!(dev.status(channel).unwrap().state, ChannelState::Enabled);
    }

    /// Lock observed after `k` polls is reported as `k`; never more than
    /// the retry bound.
    #[test]
    fn lock_reports_attempts_used(k in 1..=MAX_LOCK_ATTEMPTS + 2) {
        let clk = MockRegisters::new();
        let mut script = vec![0; usize::from(k) - 1];
        script.push(MMCM_LOCKED);
        clk.script_reads(CLKGEN_CFG, &script);
        let gen = ClockGenerator::new(&clk, MockDelay::new());

        let result = block_on(gen.try_lock(ClockSource::Phy1Rmck0));

        if k <= MAX_LOCK_ATTEMPTS {
            prop_assert_eq!(result, Ok(k));
            prop_assert_eq!(clk.read_count(CLKGEN_CFG), usize::from(k));
        } else {
            prop_assert_eq!(result, Err(Error::NoDevice));
            prop_assert_eq!(clk.read_count(CLKGEN_CFG), usize::from(MAX_LOCK_ATTEMPTS));
        }
    }
}
