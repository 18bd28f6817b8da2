//! 测速任务：按固定周期采样已下载字节数，两次采样之差即为速度。

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::shared_state::SharedState;

/// 采样一次：写入 `speed` 并同步到进度属性。
fn sample(state: &SharedState, last: &mut u64) {
    let now = state.downloaded_size.load(Ordering::Acquire);
    let speed = now.saturating_sub(*last);
    *last = now;

    state.speed.store(speed, Ordering::Release);
    let _ = state.progress.update_field(|p| {
        p.speed = speed;
        p.downloaded_size = p.downloaded_size.max(now);
    });
}

pub(super) async fn run_metrics_ticker(state: Arc<SharedState>, period: Duration) {
    let mut halted = state.halted.watch();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval 的第一次 tick 立即完成
    ticker.tick().await;

    let mut last = state.downloaded_size.load(Ordering::Acquire);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !state.downloading.load(Ordering::Acquire) {
                    break;
                }
                sample(&state, &mut last);
            }
            _ = halted.wait_for(|h| *h) => break,
        }
    }

    state.speed.store(0, Ordering::Release);
    let _ = state.progress.update_field(|p| p.speed = 0);
}
