//! 分块并发下载器
//!
//! 把一个远程资源按调用方给出的块列表，用有限个 worker 并发地以 HTTP Range
//! 请求下载到本地文件的对应偏移处。
//!
//! ## 功能特性
//!
//! - **并发分块**：最多 `thread_count` 个 worker，每个 worker 完成后由反应器补位
//! - **断点续传**：块自身记录进度，把上次的块列表原样交回即可继续
//! - **有限重试**：非 2xx 响应或读响应体失败时重试，必要时刷新 URI 列表
//! - **协作式暂停**：`pause()` 后各 worker 在下一个数据段边界退出
//! - **响应式状态**：`progress()` / `status()` / `uris()` 均可监听
//! - **钩子机制**：完成、失败、进度三个阶段可插入自定义逻辑
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! # use parallel_downloader::block_downloader::{BlockDownloader, JobInfo, split_blocks};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let info = JobInfo::new(
//!     "large_file.zip",
//!     split_blocks(8 * 1024 * 1024, 1024 * 1024),
//!     vec!["https://example.com/large_file.zip".to_string()],
//!     4,
//! );
//! let downloader = BlockDownloader::new(info)
//!     .on_completed(|| async { println!("done") });
//! downloader.begin_download()?;
//! let status = downloader.wait_finished().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## 内部实现说明
//!
//! - `worker`：单块下载与重试
//! - `reactor`：完成队列消费、补位派发、终态发布
//! - `metrics_ticker` / `uri_refresh_task`：周期测速与周期刷新 URI
//! - `failure_latch`：失败只生效一次

mod chunk_handler;
mod failure_latch;
mod http_client;
mod job_context;
mod metrics_ticker;
mod range_request;
mod reactor;
mod shared_state;
mod uri_refresh_task;
mod worker;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::info;

use crate::internal::states::queue_reactive::QueueReactiveProperty;
use crate::states::unlock_reactive::UnlockReactiveProperty;

use super::download_error::DownloadError;
use super::download_hooks_container::DownloadHooksContainer;
use super::download_progress::DownloadProgress;
use super::download_status::DownloadStatus;
use super::downloader_config::DownloaderConfig;
use super::hook_adapters::{OnCompletedHookAdapter, OnFailedHookAdapter, OnProgressHookAdapter};
use super::job_info::JobInfo;
use super::uri_refresher::UriRefresher;
use super::worker_outcome::WorkerOutcome;
use crate::internal::block_downloader::traits::download_hook::DownloadHook;

use http_client::build_http_client;
use job_context::JobContext;
use metrics_ticker::run_metrics_ticker;
use reactor::{BackgroundTasks, run_reactor};
use shared_state::SharedState;
use uri_refresh_task::run_uri_refresher;

/// 分块下载器。一个实例对应一次运行；暂停后用 [`job_info`](Self::job_info) 构造新实例续传。
pub struct BlockDownloader {
    state: Arc<SharedState>,
    client: Client,
    config: DownloaderConfig,
    refresher: Option<UriRefresher>,
    /// 启动前登记的钩子，启动时移入运行上下文
    pending_hooks: Mutex<DownloadHooksContainer>,
    started: AtomicBool,
    outcomes: OnceLock<QueueReactiveProperty<WorkerOutcome>>,
}

impl BlockDownloader {
    pub fn new(info: JobInfo) -> Self {
        Self {
            state: Arc::new(SharedState::new(info)),
            client: build_http_client(),
            config: DownloaderConfig::default(),
            refresher: None,
            pending_hooks: Mutex::new(DownloadHooksContainer::default()),
            started: AtomicBool::new(false),
            outcomes: OnceLock::new(),
        }
    }

    /// 使用自定义 HTTP 客户端（如需代理、超时）。不要开启 gzip。
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_config(mut self, config: DownloaderConfig) -> Self {
        self.config = config;
        self
    }

    /// 配置 URI 刷新函数。
    ///
    /// `refresh_time_ms > 0` 时在首次派发前刷新一次，之后按该周期刷新；
    /// 为 0 时只在响应状态错误重试前刷新。刷新函数在下载任务中同步调用，应尽快返回。
    pub fn with_refresh<F>(mut self, func: F, refresh_time_ms: u64) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.refresher = Some(UriRefresher::new(func, refresh_time_ms));
        self
    }

    fn hooks_mut(&mut self) -> &mut DownloadHooksContainer {
        self.pending_hooks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 添加一个完整钩子；可多次调用，按添加顺序执行。
    pub fn with_hook(mut self, hook: impl DownloadHook + 'static) -> Self {
        self.hooks_mut().add(hook);
        self
    }

    /// 全部块下载完成后调用一次。
    pub fn on_completed<F, Fut>(mut self, f: F) -> Self
    where
        F: FnMut() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks_mut().add(OnCompletedHookAdapter(f));
        self
    }

    /// 首次出现不可恢复错误时调用一次，参数为错误描述。
    pub fn on_failed<F, Fut>(mut self, f: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks_mut().add(OnFailedHookAdapter(f));
        self
    }

    /// 每次写盘后调用。
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&DownloadProgress) + Send + Sync + 'static,
    {
        self.hooks_mut().add(OnProgressHookAdapter(f));
        self
    }

    /// 开始下载并立即返回。
    ///
    /// 只在目标路径是目录时失败（另有重复启动、不在 tokio 运行时内两种防护）；
    /// 运行期错误通过 `failed()` / `failed_message()` / `on_failed` 报告。
    pub fn begin_download(&self) -> Result<(), DownloadError> {
        let state = &self.state;
        if state.target_file.is_dir() {
            return Err(DownloadError::TargetIsDir);
        }
        let runtime = Handle::try_current().map_err(|_| DownloadError::NoRuntime)?;
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(DownloadError::AlreadyStarted);
        }

        info!(
            target_file = %state.target_file.display(),
            blocks = state.queue.len(),
            downloaded_size = state.downloaded_size.load(Ordering::Acquire),
            "download started"
        );
        state.downloading.store(true, Ordering::Release);
        let _ = state.status.update(DownloadStatus::Running);

        let period = self.refresher.as_ref().and_then(UriRefresher::period);
        if let (Some(refresher), Some(_)) = (&self.refresher, period) {
            refresher.refresh_into(&state.uris);
        }

        let hooks = std::mem::take(
            &mut *self
                .pending_hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let (outcomes, consumer) = QueueReactiveProperty::new();
        let _ = self.outcomes.set(outcomes.clone());

        let ctx = Arc::new(JobContext {
            state: Arc::clone(state),
            client: self.client.clone(),
            config: self.config.clone(),
            refresher: self.refresher.clone(),
            hooks: tokio::sync::Mutex::new(hooks),
            outcomes,
        });

        let ticker = runtime.spawn(run_metrics_ticker(
            Arc::clone(state),
            self.config.speed_sample_interval,
        ));
        let refresher = match (&self.refresher, period) {
            (Some(refresher), Some(period)) => Some(runtime.spawn(run_uri_refresher(
                Arc::clone(state),
                refresher.clone(),
                period,
            ))),
            _ => None,
        };

        runtime.spawn(run_reactor(
            ctx,
            consumer,
            BackgroundTasks { ticker, refresher },
        ));
        Ok(())
    }

    /// 请求暂停：各 worker 在下一个数据段边界退出。幂等，本次运行内不可恢复。
    pub fn pause(&self) {
        if self.state.downloading.swap(false, Ordering::AcqRel) {
            info!(target_file = %self.state.target_file.display(), "pause requested");
        }
    }

    /// 挂起直到本次运行进入终态；尚未启动时直接返回当前状态。
    pub async fn wait_finished(&self) -> DownloadStatus {
        if !self.started.load(Ordering::Acquire) {
            return self.status();
        }
        let mut watcher = self.state.status.watch();
        watcher
            .wait_for(DownloadStatus::is_terminal)
            .await
            .unwrap_or_else(|_| self.status())
    }

    /// 最近一个采样窗口内的字节数。
    pub fn speed(&self) -> u64 {
        self.state.speed.load(Ordering::Acquire)
    }

    pub fn downloaded_size(&self) -> u64 {
        self.state.downloaded_size.load(Ordering::Acquire)
    }

    pub fn downloading(&self) -> bool {
        self.state.downloading.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> bool {
        self.state.completed.load(Ordering::Acquire)
    }

    /// 失败闩已拉下且失败信息已写入。
    ///
    /// 闩本身先于信息落定，这里以信息为准，`failed()` 为 true 时 `failed_message()` 一定有值。
    pub fn failed(&self) -> bool {
        self.state.failed_message.get().is_some()
    }

    /// 导致失败的第一个错误的描述。
    pub fn failed_message(&self) -> Option<String> {
        self.state.failed_message.get().cloned()
    }

    /// 可监听的下载进度。
    pub fn progress(&self) -> UnlockReactiveProperty<DownloadProgress> {
        self.state.progress.clone()
    }

    pub fn status(&self) -> DownloadStatus {
        self.state.status.get_or_default()
    }

    /// 可监听的当前 URI 列表。
    pub fn uris(&self) -> UnlockReactiveProperty<Vec<String>> {
        self.state.uris.clone()
    }

    /// 最近一个 worker 的退出结果。
    pub fn last_outcome(&self) -> Option<WorkerOutcome> {
        self.outcomes.get().and_then(QueueReactiveProperty::last)
    }

    /// 当前任务快照：块进度与 URI 列表均为最新值，可直接用于续传。
    pub fn job_info(&self) -> JobInfo {
        let state = &self.state;
        JobInfo {
            target_file: state.target_file.clone(),
            block_list: state.queue.snapshot(),
            uris: state.uris.get_or_default(),
            headers: state.headers.clone(),
            thread_count: state.thread_count,
        }
    }
}
