use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// There is no presence backend; the "online" figure is a random pick in this
/// range, refreshed on a timer.
pub const ONLINE_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

pub fn random_online_count<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(ONLINE_RANGE)
}

/// Publishes a fresh count immediately and then every `period`, until every
/// receiver is gone.
pub async fn run_online_counter(sender: watch::Sender<u32>, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let count = random_online_count(&mut rand::thread_rng());
        if sender.send(count).is_err() {
            log::debug!("Online counter stopped: no receivers");
            break;
        }
    }
}
