//! Interrupt triage and the deferred worker, end to end.
//!
//! The interrupt path only records what the status registers say; data moves
//! when the worker runs. Status registers are write-one-to-clear here, as on
//! the hardware.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

mod common;

use common::{streaming, words_buffer, zero_buffer, Rig};
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use i2s_engine::regs::{
    channel_reg, CBBAR, CCR, CSR, DCCRA, DCCRB, DSCR, FIFO_OVERFLOW, FIFO_UNDERFLOW, NBBAR,
    RX_INT_UNMASK, RX_SERV_REQ, TX_INT_UNMASK, TX_SERV_REQ,
};
use i2s_engine::{ChannelState, Error, ServiceReport, PREFILL_THRESHOLD};
use platform::mocks::{words_of, RecordingCompletion};
use platform::{Direction, MboStatus};

/// Mark every channel status register write-one-to-clear.
fn status_registers_clear_on_write(rig: &Rig) {
    for ch in 0..8 {
        rig.i2s.write_one_to_clear(channel_reg(ch, CSR));
    }
}

/// Raise `bits` in the status register of `ch` and flag it globally.
fn raise(rig: &Rig, ch: usize, bits: u32) {
    rig.i2s.set(channel_reg(ch, CSR), bits);
    rig.i2s.set(DSCR, rig.i2s.get(DSCR) | (1 << ch));
}

// ── Tx ───────────────────────────────────────────────────────────────────────

/// Tx scenario: pre-fill enables the channel, the next service request is
/// answered by the worker with the queued buffer.
#[tokio::test]
async fn tx_service_request_moves_next_buffer() {
    let rig = Rig::locked();
    status_registers_clear_on_write(&rig);
    let dev = rig.device();
    dev.configure(0, streaming(Direction::Tx)).await.unwrap();
    let sink = RecordingCompletion::leak();
    for n in 0..PREFILL_THRESHOLD {
        dev.enqueue(0, words_buffer(sink, n, &[0x10 + n as u32])).unwrap();
    }
    dev.enqueue(0, words_buffer(sink, 7, &[0xAA, 0xBB])).unwrap();
    assert_eq!(dev.status(0).unwrap().state, ChannelState::Enabled);
    rig.i2s.clear_log();

    raise(&rig, 0, TX_SERV_REQ);
    assert!(dev.on_interrupt(), "ready channel schedules the worker");

    let ccr = channel_reg(0, CCR);
    assert_ne!(rig.i2s.get(ccr) & TX_INT_UNMASK, 0, "tx service held off");
    assert!(rig.i2s.writes_to(channel_reg(0, NBBAR)).is_empty(), "no data moved in irq");
    assert!(dev.status(0).unwrap().ready);

    let report = dev.service_ready_channels();

    assert_eq!(report, ServiceReport { serviced: 1, starved: 0 });
    assert_eq!(rig.i2s.writes_to(channel_reg(0, NBBAR)), vec![0xAA, 0xBB]);
    assert_eq!(sink.outcomes().last(), Some(&(7, MboStatus::Success, 8)));
    assert_eq!(rig.i2s.get(channel_reg(0, CSR)) & TX_SERV_REQ, 0, "request cleared");
    assert_eq!(rig.i2s.get(ccr) & TX_INT_UNMASK, 0, "tx service re-armed");
    assert!(!dev.status(0).unwrap().ready);
}

// ── Rx ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rx_service_request_fills_head_buffer() {
    let rig = Rig::locked();
    status_registers_clear_on_write(&rig);
    let dev = rig.device();
    dev.configure(5, streaming(Direction::Rx)).await.unwrap();
    dev.activate_rx(5).unwrap();
    let sink = RecordingCompletion::leak();
    dev.enqueue(5, zero_buffer(sink, 1, 16)).unwrap();
    dev.enqueue(5, zero_buffer(sink, 2, 16)).unwrap();
    rig.i2s.script_reads(channel_reg(5, CBBAR), &[0x11, 0x22, 0x33, 0x44]);

    raise(&rig, 5, RX_SERV_REQ);
    assert!(dev.on_interrupt());
    assert_ne!(rig.i2s.get(channel_reg(5, CCR)) & RX_INT_UNMASK, 0);

    dev.service_ready_channels();

    let done = sink.take();
    assert_eq!(done.len(), 1, "one buffer per service request");
    assert_eq!(done[0].context, 1);
    assert_eq!(done[0].status, MboStatus::Success);
    assert_eq!(done[0].processed_length, 16);
    assert_eq!(words_of(done[0].memory.as_deref().unwrap()), vec![0x11, 0x22, 0x33, 0x44]);
    assert_eq!(dev.status(5).unwrap().pending, 1);
    assert_eq!(rig.i2s.get(channel_reg(5, CCR)) & RX_INT_UNMASK, 0);
}

#[tokio::test]
async fn only_flagged_channels_are_serviced() {
    let rig = Rig::locked();
    let dev = rig.device();
    let sink = RecordingCompletion::leak();
    for ch in [1, 2] {
        dev.configure(ch, streaming(Direction::Rx)).await.unwrap();
        dev.activate_rx(ch).unwrap();
        dev.enqueue(ch, zero_buffer(sink, ch, 8)).unwrap();
    }
    rig.i2s.set(channel_reg(1, CSR), RX_SERV_REQ);
    rig.i2s.set(channel_reg(2, CSR), RX_SERV_REQ);
    rig.i2s.set(DSCR, 1 << 2);

    dev.on_interrupt();
    let report = dev.service_ready_channels();

    assert_eq!(report.serviced, 1);
    assert_eq!(sink.outcomes(), vec![(2, MboStatus::Success, 8)]);
    assert_eq!(dev.status(1).unwrap().pending, 1);
}

// ── FIFO errors ──────────────────────────────────────────────────────────────

/// Overflow halts the port, records the fault and still schedules the
/// worker; with nothing queued the worker pass is starved and the channel
/// stays ready for the next pass.
#[tokio::test]
async fn overflow_halts_port_and_starved_pass_keeps_ready() {
    let rig = Rig::locked();
    status_registers_clear_on_write(&rig);
    let dev = rig.device();
    dev.configure(4, streaming(Direction::Rx)).await.unwrap();
    dev.activate_rx(4).unwrap();
    rig.i2s.set(DCCRA, 0x0003_0A00);
    rig.i2s.clear_log();

    raise(&rig, 4, FIFO_OVERFLOW);
    assert!(dev.on_interrupt());

    assert_eq!(rig.i2s.get(DCCRB), 0, "owning port stopped");
    assert_eq!(rig.i2s.get(DCCRA), 0x0003_0A00, "other port untouched");
    assert_eq!(rig.i2s.get(channel_reg(4, CCR)), 0);
    assert_eq!(rig.i2s.get(channel_reg(4, CSR)) & FIFO_OVERFLOW, 0, "overflow cleared");
    let status = dev.status(4).unwrap();
    assert!(status.fifo_overflow);
    assert!(status.ready);

    let report = dev.service_ready_channels();

    assert_eq!(report, ServiceReport { serviced: 0, starved: 1 });
    assert!(dev.status(4).unwrap().ready, "starved channel stays ready");
    assert_eq!(dev.transfer(4), Err(Error::Again));
}

#[tokio::test]
async fn underflow_halts_port_without_scheduling() {
    let rig = Rig::locked();
    status_registers_clear_on_write(&rig);
    let dev = rig.device();
    dev.configure(3, streaming(Direction::Tx)).await.unwrap();

    raise(&rig, 3, FIFO_UNDERFLOW);
    assert!(!dev.on_interrupt());

    let status = dev.status(3).unwrap();
    assert!(status.fifo_underflow);
    assert!(!status.ready);
    assert_eq!(rig.i2s.get(DCCRA), 0);
    assert_eq!(rig.i2s.get(channel_reg(3, CSR)), 0);
}

#[tokio::test]
async fn configure_clears_recorded_faults() {
    let rig = Rig::locked();
    let dev = rig.device();
    dev.configure(6, streaming(Direction::Tx)).await.unwrap();
    raise(&rig, 6, FIFO_UNDERFLOW | FIFO_OVERFLOW);
    dev.on_interrupt();
    assert!(dev.status(6).unwrap().fifo_underflow);

    dev.poison(6).unwrap();
    dev.configure(6, streaming(Direction::Tx)).await.unwrap();

    let status = dev.status(6).unwrap();
    assert!(!status.fifo_overflow);
    assert!(!status.fifo_underflow);
    assert!(!status.ready);
}

// ── worker task ──────────────────────────────────────────────────────────────

/// The worker task wakes on the interrupt notification and runs one pass.
#[test]
fn worker_task_runs_after_interrupt() {
    let rig = Rig::locked();
    let dev = rig.device();
    let sink = RecordingCompletion::leak();

    let outcome = embassy_futures::block_on(select(dev.run_deferred_worker(), async {
        dev.configure(2, streaming(Direction::Rx)).await.unwrap();
        dev.activate_rx(2).unwrap();
        dev.enqueue(2, zero_buffer(sink, 5, 4)).unwrap();
        raise(&rig, 2, RX_SERV_REQ);

        assert!(dev.on_interrupt());
        assert_eq!(sink.count(), 0, "irq path moves no data");
        yield_now().await;
        sink.outcomes()
    }));

    assert!(
        matches!(outcome, Either::Second(ref done) if done == &[(5, MboStatus::Success, 4)]),
        "worker never returns; the driver sees one completed buffer"
    );
}

/// A service request that found the queue empty leaves the channel's
/// interrupt held off; the next buffer must still reach the FIFO.
#[test]
fn buffer_queued_after_starved_pass_is_serviced() {
    let rig = Rig::locked();
    status_registers_clear_on_write(&rig);
    let dev = rig.device();
    let sink = RecordingCompletion::leak();

    let outcome = embassy_futures::block_on(select(dev.run_deferred_worker(), async {
        dev.configure(0, streaming(Direction::Tx)).await.unwrap();
        for n in 0..PREFILL_THRESHOLD {
            dev.enqueue(0, words_buffer(sink, n, &[1])).unwrap();
        }
        raise(&rig, 0, TX_SERV_REQ);
        assert!(dev.on_interrupt());
        yield_now().await;
        let status = dev.status(0).unwrap();
        assert!(status.ready, "empty queue: channel stays ready");
        assert_ne!(rig.i2s.get(channel_reg(0, CCR)) & TX_INT_UNMASK, 0);
        rig.i2s.clear_log();

        dev.enqueue(0, words_buffer(sink, 9, &[0xCAFE, 0xF00D])).unwrap();
        yield_now().await;
        (sink.outcomes(), rig.i2s.writes_to(channel_reg(0, NBBAR)))
    }));

    assert!(matches!(
        outcome,
        Either::Second((ref done, ref fifo))
            if done.last() == Some(&(9, MboStatus::Success, 8)) && fifo == &[0xCAFE, 0xF00D]
    ));
    assert!(!dev.status(0).unwrap().ready);
    assert_eq!(rig.i2s.get(channel_reg(0, CCR)) & TX_INT_UNMASK, 0, "tx service re-armed");
}

#[test]
fn idle_interrupt_does_not_wake_worker() {
    let rig = Rig::locked();
    let dev = rig.device();

    let outcome = embassy_futures::block_on(select(dev.run_deferred_worker(), async {
        assert!(!dev.on_interrupt());
        yield_now().await;
        dev.status(0).unwrap().ready
    }));

    assert!(matches!(outcome, Either::Second(false)));
}
