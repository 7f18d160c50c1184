//! Actor definition for `Supervisor`.
//!

use ractor::{pg, Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tracing::trace;

use crate::actors::ENGINE_PG;

#[derive(Debug)]
pub enum SuperMsg {
    Dummy,
}

/// Parent of every worker actor spawned by this crate (Sample, DSP, Emitter, Hopper,
/// BLE). Supervises lifecycle events; does not itself drive any of the pipeline.
pub struct Supervisor;

#[ractor::async_trait]
impl Actor for Supervisor {
    type Msg = SuperMsg;
    type State = ();
    type Arguments = ();

    #[tracing::instrument(skip(self, myself))]
    async fn pre_start(&self, myself: ActorRef<Self::Msg>, _args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        pg::join(ENGINE_PG.into(), vec![myself.get_cell()]);
        Ok(())
    }

    #[tracing::instrument(skip(self, _myself))]
    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, _state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            SuperMsg::Dummy => trace!("Dummy message received."),
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, _myself))]
    async fn handle_supervisor_evt(&self, _myself: ActorRef<Self::Msg>, message: SupervisionEvent, _state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorTerminated(cell, ..) => {
                trace!("Actor {} is finished.", cell.get_name().unwrap_or_default());
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                trace!("Actor {} terminated with: {err}", cell.get_name().unwrap_or_default());
            }
            SupervisionEvent::ProcessGroupChanged(msg) => {
                trace!("Process group changed {msg:?}");
            }
            SupervisionEvent::ActorStarted(cell) => {
                trace!("Actor {} is started.", cell.get_name().unwrap_or_default());
            }
        }
        Ok(())
    }
}
