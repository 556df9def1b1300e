pub mod telegram;

pub use telegram::{run as run_telegram, Command};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Chat Action Keepalive
// ============================================================================

/// Refreshes a chat action ("uploading document…") while a conversion runs.
///
/// Telegram clears a chat action after about five seconds, so the callback is
/// fired once immediately and then at a fixed interval until stopped.
pub struct ChatActionKeepalive {
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl ChatActionKeepalive {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the loop, awaiting `on_tick` at each interval.
    pub fn start<F, Fut>(&self, on_tick: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.running.store(true, Ordering::Relaxed);
        let running = self.running.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                on_tick().await;
            }
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for ChatActionKeepalive {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

impl Drop for ChatActionKeepalive {
    fn drop(&mut self) {
        self.stop();
    }
}
