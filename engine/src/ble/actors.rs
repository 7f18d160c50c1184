//! The `BleWorker` actor: owns the BLE adapter, runs its scan loop, and posts decoded
//! Remote ID records to the Orchestrator's detection queue.

use std::sync::mpsc::{SyncSender, TrySendError};
use std::time::Duration;

use eyre::Result;
use ractor::{pg::join, Actor, ActorProcessingErr, ActorRef};
use ridsentinel_types::{Provenance, RemoteIdRecord, Transport};
use tokio::time::timeout;
use tracing::{error, trace, warn};

use super::{Advertisement, BackoffPolicy};
use crate::actors::{StatsMsg, ENGINE_PG};
use crate::remoteid_decoder::decode_ble;

/// §6: the BLE Source interface. An opaque external collaborator; the worker only
/// needs one scan window's worth of advertisements at a time.
#[async_trait::async_trait]
pub trait BleSource: Send + Sync {
    async fn scan(&self, window: Duration) -> Result<Vec<Advertisement>>;
}

pub struct BleWorker;

pub struct BleWorkerState {
    /// Bounded per §8 invariant 8: a full queue drops and counts the block rather
    /// than blocking the scan loop or growing without end.
    pub out: SyncSender<RemoteIdRecord>,
    pub stat: ActorRef<StatsMsg>,
    pub source: Box<dyn BleSource>,
    pub scan_window: Duration,
    pub backoff: BackoffPolicy,
}

impl BleWorkerState {
    pub fn new(out: SyncSender<RemoteIdRecord>, stat: ActorRef<StatsMsg>, source: Box<dyn BleSource>) -> Self {
        Self {
            out,
            stat,
            source,
            scan_window: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
        }
    }
}

pub enum BleWorkerMsg {
    Start,
}

#[ractor::async_trait]
impl Actor for BleWorker {
    type Msg = BleWorkerMsg;
    type State = BleWorkerState;
    type Arguments = BleWorkerState;

    async fn pre_start(&self, myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        join(ENGINE_PG.into(), vec![myself.get_cell()]);
        Ok(args)
    }

    async fn handle(&self, myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            BleWorkerMsg::Start => {
                trace!("BleWorker starting scan loop");
                let mut consecutive_failures = 0u32;

                loop {
                    let outcome = timeout(state.scan_window + Duration::from_secs(1), state.source.scan(state.scan_window)).await;

                    match outcome {
                        Ok(Ok(advertisements)) => {
                            consecutive_failures = 0;
                            for ad in advertisements {
                                handle_advertisement(state, &ad);
                            }
                        }
                        Ok(Err(e)) => {
                            warn!("BLE adapter error: {e}");
                            state.stat.cast(StatsMsg::Error)?;
                            consecutive_failures += 1;
                        }
                        Err(_) => {
                            warn!("BLE scan window timed out");
                            consecutive_failures += 1;
                        }
                    }

                    if consecutive_failures > 0 {
                        let delay = state.backoff.delay_for(consecutive_failures);
                        trace!("backing off {delay:?} after {consecutive_failures} failures");
                        tokio::time::sleep(delay).await;
                        state.stat.cast(StatsMsg::Reconnect)?;
                    }

                    if myself.get_status() == ractor::ActorStatus::Stopping {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

fn handle_advertisement(state: &BleWorkerState, ad: &Advertisement) {
    for payload in ad.candidate_payloads() {
        let provenance = Provenance {
            source_timestamp: ad.seen_at,
            transport: Transport::BleAdvertising,
            source_address: Some(ad.address.clone()),
            center_freq_hz: None,
            gain_db: ad.rssi_dbm,
        };
        match decode_ble(payload, provenance) {
            Ok(record) => {
                let _ = state.stat.cast(StatsMsg::Pkts(1));
                match state.out.try_send(record) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("detection queue full, dropping block");
                        let _ = state.stat.cast(StatsMsg::DroppedBlock);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        error!("detection queue closed");
                    }
                }
                // Only the first emittable payload per advertisement is forwarded;
                // service-data and manufacturer-data usually carry the same message.
                return;
            }
            Err(_) => continue,
        }
    }
}
