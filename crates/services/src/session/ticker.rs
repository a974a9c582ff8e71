use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cancellable once-per-period pulse, decoupled from any UI lifecycle.
///
/// A background task forwards interval ticks over a channel; the session
/// loop awaits [`Self::tick`] and feeds each pulse into
/// `SessionController::on_tick`. Dropping the ticker aborts the task, so a
/// finished or abandoned session cannot leak an interval that keeps firing.
#[derive(Debug)]
pub struct Ticker {
    rx: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// One pulse per second, the session tick rate.
    #[must_use]
    pub fn seconds() -> Self {
        Self::every(Duration::from_secs(1))
    }

    #[must_use]
    pub fn every(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    /// Wait for the next pulse. Returns `None` once stopped.
    pub async fn tick(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.handle.abort();
        self.rx.close();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
