//! 分块下载：处理一段响应数据，写文件、更新块与整体进度、触发钩子。

use std::sync::atomic::Ordering;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::internal::block_downloader::structs::block::inclusive_len;
use crate::internal::block_downloader::structs::block_queue::WriteProgress;
use crate::internal::block_downloader::structs::download_error::DownloadError;

use super::job_context::JobContext;

/// 处理单段数据时的参数（形参超过 3 个，用 struct 承载）。
pub(super) struct HandleOneChunkParams<'a> {
    pub ctx: &'a JobContext,
    pub block: usize,
    pub chunk: Bytes,
    /// 当前 `begin_offset`，文件游标已位于此处
    pub begin: u64,
    pub end: u64,
    pub file: &'a mut File,
}

/// 写入一段数据：超出 `end` 的部分直接丢弃，写满时返回 `completed == true`。
pub(super) async fn handle_one_chunk(
    params: HandleOneChunkParams<'_>,
) -> Result<Option<WriteProgress>, DownloadError> {
    let need = inclusive_len(params.begin, params.end);
    let take = (params.chunk.len() as u64).min(need) as usize;
    if take == 0 {
        return Ok(None);
    }
    let data = params.chunk.slice(..take);

    params
        .file
        .write_all(&data)
        .await
        .map_err(DownloadError::WriteFile)?;

    let state = &params.ctx.state;
    let written = take as u64;
    let Some(progress) = state.queue.record_write(params.block, written) else {
        return Ok(None);
    };
    let current = state.downloaded_size.fetch_add(written, Ordering::AcqRel) + written;

    // 多个 worker 的更新可能乱序到达，只前进不后退
    let _ = state
        .progress
        .update_field(|p| p.downloaded_size = p.downloaded_size.max(current));
    if let Some(snapshot) = state.progress.get_current() {
        params.ctx.hooks.lock().await.run_on_progress(&snapshot);
    }

    Ok(Some(progress))
}
