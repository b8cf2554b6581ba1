// SIGINT/SIGTERM -> cancellation of the running job

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::CancelHandle;

/// Set once SIGINT or SIGTERM arrives after [`install`].
#[derive(Debug, Clone, Default)]
pub struct SignalFlag(Arc<AtomicBool>);

impl SignalFlag {
    pub fn received(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Turn SIGINT and SIGTERM into a cancel request on `handle`.
///
/// Only one handler can be installed per process.
pub fn install(handle: CancelHandle) -> Result<SignalFlag, ctrlc::Error> {
    let flag = SignalFlag::default();
    let raised = flag.clone();
    ctrlc::set_handler(move || forward(&raised, &handle))?;
    Ok(flag)
}

fn forward(flag: &SignalFlag, handle: &CancelHandle) {
    if !flag.received() {
        tracing::info!("signal received, cancelling");
    }
    flag.raise();
    handle.request();
}
