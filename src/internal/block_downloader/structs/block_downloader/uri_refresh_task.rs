use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::internal::block_downloader::structs::uri_refresher::UriRefresher;

use super::shared_state::SharedState;

/// 周期刷新 URI 列表，直到任务结束。首次刷新已在派发前同步完成。
pub(super) async fn run_uri_refresher(
    state: Arc<SharedState>,
    refresher: UriRefresher,
    period: Duration,
) {
    let mut halted = state.halted.watch();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !state.downloading.load(Ordering::Acquire) {
                    break;
                }
                refresher.refresh_into(&state.uris);
            }
            _ = halted.wait_for(|h| *h) => break,
        }
    }
}
