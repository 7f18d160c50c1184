//! Actors shared across the detection pipeline's worker roles (§5).
//!
//! Actors:
//!
//! `StatsActor`
//!
//! Accumulates frame/detection counters and reconnect/error counts across all
//! workers; printed on a timer and on shutdown.
//!
//! `Supervisor`
//!
//! The parent of every worker actor this crate spawns; logs lifecycle events.
//!

pub use stats::*;
pub use supervisor::*;

mod stats;
mod supervisor;

use eyre::Result;
use ractor::{Actor, ActorRef};
use tracing::trace;

/// Name of the actor process group joined by every worker in this crate.
pub const ENGINE_PG: &str = "ridsentinel_engine";

#[derive(Clone, Debug)]
pub struct Context {
    pub supervisor: ActorRef<SuperMsg>,
    pub stats: ActorRef<StatsMsg>,
}

/// Spawns the generic supervisor and the stats-gathering actor every worker role
/// registers with.
pub async fn init_engine_runtime() -> Result<Context> {
    trace!("starting supervisor actor.");
    let tag = String::from("engine:supervisor");
    let (sup, _h) = Actor::spawn(Some(tag), Supervisor, ()).await?;

    trace!("starting stats actor.");
    let tag = String::from("engine:stats");
    let (stat, _h) = Actor::spawn_linked(Some(tag), StatsActor, "engine".into(), sup.get_cell()).await?;

    Ok(Context { supervisor: sup, stats: stat })
}
