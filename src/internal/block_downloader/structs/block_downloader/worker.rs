//! worker：负责一个块，从当前 `begin_offset` 下载到 `end_offset`，失败时有限次重试。

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::internal::block_downloader::structs::download_error::DownloadError;
use crate::internal::block_downloader::structs::worker_outcome::WorkerOutcome;

use super::chunk_handler::{HandleOneChunkParams, handle_one_chunk};
use super::failure_latch::latch_failure;
use super::job_context::JobContext;
use super::range_request::{FetchRangeParams, fetch_range_response};

/// 一次请求的结束方式。
enum AttemptEnd {
    Completed,
    Paused,
}

/// 派发入口：worker 跑在独立任务里，由本任务等待其结束。
///
/// worker 任务 panic（例如用户钩子 panic）时不会上报结果，这里代为释放块、
/// 拉下失败闩并上报失败，保证反应器总能等到每个 worker 的结果。
pub(super) async fn supervise_worker(ctx: Arc<JobContext>, block: usize, uri: String) {
    let worker = tokio::spawn(run_worker(Arc::clone(&ctx), block, uri));
    if let Err(join_err) = worker.await {
        ctx.state.queue.release(block);
        latch_failure(&ctx, &DownloadError::TaskJoin(join_err)).await;
        report(&ctx, WorkerOutcome::Failed { block });
    }
}

fn report(ctx: &JobContext, outcome: WorkerOutcome) {
    debug!(block = outcome.block(), ?outcome, "worker finished");
    if ctx.outcomes.send(outcome).is_err() {
        warn!(block = outcome.block(), "completion queue closed, outcome dropped");
    }
}

/// 下载指定块，把结果推入完成队列。
async fn run_worker(ctx: Arc<JobContext>, block: usize, uri: String) {
    debug!(block, uri = %uri, "worker started");

    let outcome = match download_block(&ctx, block, uri).await {
        Ok(outcome) => outcome,
        Err(err) => {
            ctx.state.queue.release(block);
            latch_failure(&ctx, &err).await;
            WorkerOutcome::Failed { block }
        }
    };
    report(&ctx, outcome);
}

/// 打开目标文件：只写、不存在则创建、绝不截断。
async fn open_target_file(path: &Path) -> Result<File, DownloadError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(false);
    #[cfg(unix)]
    options.mode(0o666);
    options.open(path).await.map_err(DownloadError::OpenFile)
}

/// 每个 worker 独占一个文件句柄；无论结果如何，上报前都先 flush。
async fn download_block(
    ctx: &JobContext,
    block: usize,
    uri: String,
) -> Result<WorkerOutcome, DownloadError> {
    let mut file = open_target_file(&ctx.state.target_file).await?;
    let result = retry_loop(ctx, block, uri, &mut file).await;
    let flushed = file.flush().await.map_err(DownloadError::FlushFile);
    let outcome = result?;
    flushed?;
    Ok(outcome)
}

async fn retry_loop(
    ctx: &JobContext,
    block: usize,
    mut uri: String,
    file: &mut File,
) -> Result<WorkerOutcome, DownloadError> {
    let state = &ctx.state;
    loop {
        match attempt(ctx, block, &uri, file).await {
            Ok(AttemptEnd::Completed) => {
                state.queue.release(block);
                return Ok(WorkerOutcome::Completed { block });
            }
            Ok(AttemptEnd::Paused) => {
                state.queue.release(block);
                return Ok(WorkerOutcome::Paused { block });
            }
            Err(err) if err.is_retryable() => {
                if state.queue.retry_count(block) >= ctx.config.max_retries {
                    return Err(err);
                }
                let retry = state.queue.note_retry(block);
                warn!(block, retry, uri = %uri, error = %err, "range request failed, retrying");

                if let Some(refresher) = ctx.refresher.as_ref().filter(|_| err.wants_uri_refresh()) {
                    refresher.refresh_into(&state.uris);
                }
                uri = state.current_uri().ok_or(DownloadError::NoSourceUri)?;
                file.flush().await.map_err(DownloadError::FlushFile)?;
            }
            Err(err) => return Err(err),
        }
    }
}

/// 一次 Range 请求：定位文件游标，逐段读取响应体并写入。
async fn attempt(
    ctx: &JobContext,
    block: usize,
    uri: &str,
    file: &mut File,
) -> Result<AttemptEnd, DownloadError> {
    let state = &ctx.state;
    if !state.downloading.load(Ordering::Acquire) {
        return Ok(AttemptEnd::Paused);
    }
    let Some((mut begin, end)) = state.queue.pending_range(block) else {
        return Ok(AttemptEnd::Completed);
    };

    file.seek(SeekFrom::Start(begin))
        .await
        .map_err(DownloadError::SeekFile)?;

    let resp = fetch_range_response(FetchRangeParams {
        client: &ctx.client,
        uri,
        headers: &state.headers,
        begin,
        end,
    })
    .await?;
    let mut stream = resp.bytes_stream();

    loop {
        if !state.downloading.load(Ordering::Acquire) {
            return Ok(AttemptEnd::Paused);
        }
        let Some(next) = stream.next().await else {
            return Err(DownloadError::UnexpectedEof { offset: begin, end });
        };
        let chunk = next.map_err(DownloadError::BodyRead)?;
        state.queue.reset_retry(block);

        let written = handle_one_chunk(HandleOneChunkParams {
            ctx,
            block,
            chunk,
            begin,
            end,
            file: &mut *file,
        })
        .await?;

        if let Some(progress) = written {
            if progress.completed {
                return Ok(AttemptEnd::Completed);
            }
            begin = progress.begin_offset;
        }
    }
}
