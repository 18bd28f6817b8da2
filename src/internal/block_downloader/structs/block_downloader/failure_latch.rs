//! 失败闩：第一个不可恢复的错误把任务转为失败，此后的错误只记录日志。

use std::sync::atomic::Ordering;

use tracing::{debug, error};

use crate::internal::block_downloader::structs::download_error::DownloadError;

use super::job_context::JobContext;

/// 尝试拉下失败闩。只有第一个调用者会写入 `failed_message` 并触发 `on_failed` 钩子。
///
/// `failed` 标志先于 `failed_message` 置位；对外的 `failed()` 读的是后者。
pub(super) async fn latch_failure(ctx: &JobContext, err: &DownloadError) -> bool {
    let state = &ctx.state;
    if state
        .failed
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        debug!(error = %err, "download already failed, error ignored");
        return false;
    }

    let _ = state.failed_message.set(err.to_string());
    error!(error = %err, target_file = %state.target_file.display(), "download failed");
    ctx.hooks.lock().await.run_on_failed(err).await;
    true
}
