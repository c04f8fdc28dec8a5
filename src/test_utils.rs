use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Observes how many tracked executions overlap in time.
///
/// Tests wrap an operator callback in [`ConcurrencyProbe::run`] and assert
/// on [`ConcurrencyProbe::peak`] to check that fan-out actually happens and
/// never exceeds the configured parallelism.
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an execution as active for `hold`, recording the high-water
    /// mark of simultaneously active executions.
    pub async fn run(&self, hold: Duration) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(hold).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// The largest number of executions that were ever active at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_tracks_overlap() {
        let probe = ConcurrencyProbe::new();

        tokio::join!(
            probe.run(Duration::from_millis(20)),
            probe.run(Duration::from_millis(20)),
        );

        assert_eq!(probe.peak(), 2);
    }
}
