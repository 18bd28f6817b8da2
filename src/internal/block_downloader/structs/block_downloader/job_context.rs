use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;

use crate::internal::block_downloader::structs::download_hooks_container::DownloadHooksContainer;
use crate::internal::block_downloader::structs::downloader_config::DownloaderConfig;
use crate::internal::block_downloader::structs::uri_refresher::UriRefresher;
use crate::internal::block_downloader::structs::worker_outcome::WorkerOutcome;
use crate::internal::states::queue_reactive::QueueReactiveProperty;

use super::shared_state::SharedState;

/// 一次运行内 worker 与反应器共用的上下文，`begin_download` 时构造。
pub(super) struct JobContext {
    pub state: Arc<SharedState>,
    pub client: Client,
    pub config: DownloaderConfig,
    pub refresher: Option<UriRefresher>,
    pub hooks: Mutex<DownloadHooksContainer>,
    /// worker → 反应器 的完成队列
    pub outcomes: QueueReactiveProperty<WorkerOutcome>,
}
