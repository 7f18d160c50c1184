//! Actor definition for `Stats`.
//!
//! Tracks the process-wide frame/detection/drop counters that back the `system/health`
//! heartbeat (§4.8) and the Emitter's shutdown summary.

use chrono::Utc;
use ractor::{pg, Actor, ActorProcessingErr, ActorRef};
use ridsentinel_types::{FrameCounters, MacFrameKind};
use tracing::{info, trace};

use crate::actors::ENGINE_PG;

pub struct StatsActor;

/// Messages handled by the `StatsActor`.
#[derive(Debug)]
pub enum StatsMsg {
    /// One frame of the given class was counted.
    Frame(MacFrameKind),
    /// `n` bytes were received (diagnostic only).
    Bytes(u64),
    /// One Remote ID record was emitted to the pub/sub sink.
    Detection,
    /// One sample block was dropped under back-pressure.
    DroppedBlock,
    /// One packet (used by non-frame-counted ingestors such as BLE).
    Pkts(u32),
    Reconnect,
    Error,
    Reset,
    Print,
    Exit,
}

#[derive(Debug)]
pub struct State {
    pub start: i64,
    pub frame_counters: FrameCounters,
    pub detection_count: u64,
    pub dropped_block_count: u64,
    pub bytes: u64,
    pub pkts: u32,
    pub reconnect: usize,
    pub err: u32,
}

impl State {
    fn new() -> Self {
        Self {
            start: Utc::now().timestamp(),
            frame_counters: FrameCounters::default(),
            detection_count: 0,
            dropped_block_count: 0,
            bytes: 0,
            pkts: 0,
            reconnect: 0,
            err: 0,
        }
    }
}

#[ractor::async_trait]
impl Actor for StatsActor {
    type Msg = StatsMsg;
    type State = State;
    type Arguments = String;

    #[tracing::instrument(skip(self, args))]
    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        let name = myself.get_name().unwrap_or_default();
        trace!("{name}({args}) starting.");
        pg::join(ENGINE_PG.into(), vec![myself.get_cell()]);
        Ok(State::new())
    }

    #[tracing::instrument(skip(self))]
    async fn handle(&self, myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            StatsMsg::Frame(kind) => state.frame_counters.increment(kind),
            StatsMsg::Bytes(n) => state.bytes += n,
            StatsMsg::Detection => state.detection_count += 1,
            StatsMsg::DroppedBlock => state.dropped_block_count += 1,
            StatsMsg::Pkts(n) => state.pkts += n,
            StatsMsg::Reconnect => state.reconnect += 1,
            StatsMsg::Error => state.err += 1,
            StatsMsg::Print => {
                let uptime = Utc::now().timestamp() - state.start;
                info!(
                    "uptime={uptime}s detections={} dropped_blocks={} bytes={} pkts={} reconnects={} errors={} frames={:?}",
                    state.detection_count, state.dropped_block_count, state.bytes, state.pkts, state.reconnect, state.err, state.frame_counters
                );
            }
            StatsMsg::Reset => *state = State::new(),
            StatsMsg::Exit => myself.kill(),
        }
        Ok(())
    }
}
