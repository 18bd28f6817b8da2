//! 任务运行期共享状态：计数器、标志位与可监听属性。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64};

use crate::internal::block_downloader::structs::block_queue::BlockQueue;
use crate::internal::block_downloader::structs::download_progress::DownloadProgress;
use crate::internal::block_downloader::structs::download_status::DownloadStatus;
use crate::internal::block_downloader::structs::job_info::JobInfo;
use crate::states::unlock_reactive::UnlockReactiveProperty;

#[derive(Debug)]
pub(super) struct SharedState {
    pub target_file: PathBuf,
    pub headers: HashMap<String, String>,
    pub thread_count: usize,
    pub queue: BlockQueue,
    /// 当前 URI 列表，刷新时整体替换
    pub uris: UnlockReactiveProperty<Vec<String>>,

    pub downloading: AtomicBool,
    pub completed: AtomicBool,
    pub failed: AtomicBool,
    pub failed_message: OnceLock<String>,

    pub downloaded_size: AtomicU64,
    pub speed: AtomicU64,

    pub progress: UnlockReactiveProperty<DownloadProgress>,
    pub status: UnlockReactiveProperty<DownloadStatus>,
    /// 反应器收尾时置为 true，通知测速与刷新任务退出
    pub halted: UnlockReactiveProperty<bool>,
}

impl SharedState {
    pub fn new(info: JobInfo) -> Self {
        let queue = BlockQueue::new(info.block_list);
        let downloaded = queue.downloaded_size();
        let total = queue.total_size();

        Self {
            target_file: info.target_file,
            headers: info.headers,
            thread_count: info.thread_count,
            queue,
            uris: UnlockReactiveProperty::new(info.uris),
            downloading: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            failed_message: OnceLock::new(),
            downloaded_size: AtomicU64::new(downloaded),
            speed: AtomicU64::new(0),
            progress: UnlockReactiveProperty::new(DownloadProgress {
                downloaded_size: downloaded,
                total_size: total,
                speed: 0,
            }),
            status: UnlockReactiveProperty::new(DownloadStatus::Idle),
            halted: UnlockReactiveProperty::new(false),
        }
    }

    /// 当前优先使用的地址 `uris[0]`。
    pub fn current_uri(&self) -> Option<String> {
        self.uris.map(|uris| uris.first().cloned()).flatten()
    }

    /// 实际启动的 worker 数：`min(thread_count, 块数)`，`thread_count` 为 0 时按 1 处理。
    pub fn worker_limit(&self) -> usize {
        self.thread_count.max(1).min(self.queue.len())
    }
}
