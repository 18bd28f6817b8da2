pub mod block;
pub mod block_downloader;
pub mod block_queue;
pub mod download_error;
pub mod download_hooks_container;
pub mod download_progress;
pub mod download_status;
pub mod downloader_config;
pub(crate) mod hook_adapters;
pub mod job_info;
pub mod uri_refresher;
pub mod worker_outcome;

// 重导出公共类型
pub use block::{Block, split_blocks};
pub use block_downloader::BlockDownloader;
pub use block_queue::BlockQueue;
pub use download_error::DownloadError;
pub use download_progress::DownloadProgress;
pub use download_status::DownloadStatus;
pub use downloader_config::{DEFAULT_SPEED_SAMPLE_INTERVAL, DownloaderConfig, MAX_RETRIES};
pub use job_info::JobInfo;
pub use uri_refresher::{RefreshUriFunc, UriRefresher};
pub use worker_outcome::WorkerOutcome;
