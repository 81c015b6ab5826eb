//! Comms subsystem — external I/O channels.
//!
//! Only the console channel exists. [`start`] spawns it as its own task and
//! returns the join handle; the caller decides when to await it.

pub mod pty;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::subsystems::agents::RagAgent;

/// Spawn the console channel. When it exits (EOF or error) the shared
/// `shutdown` token is cancelled so the rest of the process stops too.
pub fn start(agent: Arc<RagAgent>, shutdown: CancellationToken) -> JoinHandle<Result<(), AppError>> {
    info!("loading pty channel");
    let channel = pty::PtyChannel::new("pty0", agent);
    tokio::spawn(async move {
        let result = channel.run(shutdown.clone()).await;
        shutdown.cancel();
        result
    })
}
