//! Wall clock and sleeper backed by chrono and tokio.

use std::time::Duration;

use chrono::Utc;

use crate::application::ports::{Clock, Sleeper};

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
