use log::info;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_BATCH_SIZE: usize = 6;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(100);

/// Fixed-size batch pacing: every `batch_size` operations must span at least `window`.
/// Call [`Throttler::tick`] once after each operation.
#[derive(Debug)]
pub struct Throttler {
    batch_size: usize,
    window: Duration,
    processed: usize,
    window_start: Instant,
}

impl Default for Throttler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_WINDOW)
    }
}

impl Throttler {
    pub fn new(batch_size: usize, window: Duration) -> Self {
        Throttler {
            batch_size: batch_size.max(1),
            window,
            processed: 0,
            window_start: Instant::now(),
        }
    }

    /// Records one finished operation and, when the window is full, sleeps out
    /// whatever is left of it before starting the next one.
    pub async fn tick(&mut self) {
        self.processed += 1;
        if self.processed < self.batch_size {
            return;
        }

        let elapsed = self.window_start.elapsed();
        if elapsed < self.window {
            let remaining = self.window - elapsed;
            info!(
                "Processed {} items in {}s, pausing {}s for quota",
                self.processed,
                elapsed.as_secs(),
                remaining.as_secs()
            );
            tokio::time::sleep(remaining).await;
        }
        self.processed = 0;
        self.window_start = Instant::now();
    }
}
