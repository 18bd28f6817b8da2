//! 完成反应器：完成队列的唯一消费者。
//!
//! 负责派发初始 worker、在 worker 完成后领取下一块并补位，以及在没有 worker
//! 存活时给出本次运行的终态（完成 / 失败 / 暂停）。

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::internal::block_downloader::structs::download_error::DownloadError;
use crate::internal::block_downloader::structs::download_status::DownloadStatus;
use crate::internal::block_downloader::structs::worker_outcome::WorkerOutcome;
use crate::internal::states::queue_reactive::QueueReactiveConsumer;

use super::failure_latch::latch_failure;
use super::job_context::JobContext;
use super::worker::supervise_worker;

/// 反应器收尾时需要等待退出的后台任务。
pub(super) struct BackgroundTasks {
    pub ticker: JoinHandle<()>,
    pub refresher: Option<JoinHandle<()>>,
}

/// 领取到的块交给一个新 worker，使用当前的 `uris[0]`。
fn dispatch(ctx: &Arc<JobContext>, block: usize) -> Result<(), DownloadError> {
    let Some(uri) = ctx.state.current_uri() else {
        ctx.state.queue.release(block);
        return Err(DownloadError::NoSourceUri);
    };
    debug!(block, uri = %uri, "block dispatched");
    tokio::spawn(supervise_worker(Arc::clone(ctx), block, uri));
    Ok(())
}

/// 领取并派发下一块；没有可领取的块时返回 `Ok(false)`。
fn dispatch_next(ctx: &Arc<JobContext>) -> Result<bool, DownloadError> {
    match ctx.state.queue.claim_next() {
        Some(block) => dispatch(ctx, block).map(|_| true),
        None => Ok(false),
    }
}

/// 派发错误按不可恢复处理：拉下失败闩并停止派发。
async fn fail_dispatch(ctx: &JobContext, err: DownloadError) {
    latch_failure(ctx, &err).await;
    ctx.state.downloading.store(false, Ordering::Release);
}

pub(super) async fn run_reactor(
    ctx: Arc<JobContext>,
    mut consumer: QueueReactiveConsumer<WorkerOutcome>,
    tasks: BackgroundTasks,
) {
    let state = &ctx.state;
    let mut active: usize = 0;

    for _ in 0..state.worker_limit() {
        match dispatch_next(&ctx) {
            Ok(true) => active += 1,
            Ok(false) => break,
            Err(err) => {
                fail_dispatch(&ctx, err).await;
                break;
            }
        }
    }
    debug!(workers = active, "initial workers dispatched");

    while active > 0 {
        let Some(outcome) = consumer.recv().await else {
            warn!("completion queue closed unexpectedly");
            break;
        };
        active -= 1;

        match outcome {
            WorkerOutcome::Failed { block } => {
                debug!(block, "worker failed, stopping dispatch");
                state.downloading.store(false, Ordering::Release);
            }
            WorkerOutcome::Paused { block } => {
                debug!(block, "worker paused");
            }
            WorkerOutcome::Completed { block } => {
                debug!(block, "block completed");
                if !state.downloading.load(Ordering::Acquire) {
                    continue;
                }
                match dispatch_next(&ctx) {
                    Ok(true) => active += 1,
                    Ok(false) => {}
                    Err(err) => fail_dispatch(&ctx, err).await,
                }
            }
        }
    }

    settle(&ctx, tasks).await;
}

/// 所有 worker 均已退出：停止后台任务并发布终态。
async fn settle(ctx: &JobContext, tasks: BackgroundTasks) {
    let state = &ctx.state;
    state.downloading.store(false, Ordering::Release);

    let _ = state.halted.update(true);
    for handle in std::iter::once(tasks.ticker).chain(tasks.refresher) {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    let status = if !state.failed.load(Ordering::Acquire) && state.queue.all_done() {
        ctx.hooks.lock().await.run_on_completed().await;
        state.completed.store(true, Ordering::Release);
        DownloadStatus::Completed
    } else if state.failed.load(Ordering::Acquire) {
        DownloadStatus::Failed
    } else {
        DownloadStatus::Paused
    };

    info!(
        ?status,
        downloaded_size = state.downloaded_size.load(Ordering::Acquire),
        target_file = %state.target_file.display(),
        "download finished"
    );
    let _ = state.status.update(status);
}
