use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_UPLOAD_TICK: Duration = Duration::from_millis(300);

/// The estimate never claims more than this before the response is in.
pub const UPLOAD_CAP: f64 = 90.0;
const MAX_INCREMENT: f64 = 30.0;

/// What the upload indicator shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSnapshot {
    pub percent: u8,
    pub finished: bool,
}

/// Cosmetic upload progress estimate
///
/// The transfer itself reports nothing, so each tick adds a random step up to
/// [`UPLOAD_CAP`]. Only the arrival of the response moves it to 100.
pub struct UploadProgress {
    rng: StdRng,
    percent: f64,
    finished: bool,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            percent: 0.0,
            finished: false,
        }
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            percent: self.percent.floor() as u8,
            finished: self.finished,
        }
    }

    pub fn is_capped(&self) -> bool {
        self.percent >= UPLOAD_CAP
    }

    /// Advance by one random step, saturating at the cap.
    pub fn tick(&mut self) -> UploadSnapshot {
        if !self.finished && !self.is_capped() {
            let step = self.rng.gen_range(0.0..MAX_INCREMENT);
            self.percent = (self.percent + step).min(UPLOAD_CAP);
        }
        self.snapshot()
    }

    pub fn finish(&mut self) -> UploadSnapshot {
        self.percent = 100.0;
        self.finished = true;
        self.snapshot()
    }

    /// Drive `request` to completion while ticking every `tick`.
    ///
    /// Ticking stops at the cap. When `request` resolves the estimate is
    /// forced to 100 and reported once more. Dropping the returned future
    /// drops the timer with it.
    pub async fn track<F, T>(
        &mut self,
        request: F,
        tick: Duration,
        mut on_tick: impl FnMut(UploadSnapshot),
    ) -> T
    where
        F: Future<Output = T>,
    {
        let tick = tick.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(request);

        let output = loop {
            tokio::select! {
                output = &mut request => break output,
                _ = ticker.tick(), if !self.is_capped() => {
                    on_tick(self.tick());
                }
            }
        };

        on_tick(self.finish());
        output
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}
