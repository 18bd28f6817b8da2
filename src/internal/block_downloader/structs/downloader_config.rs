use std::time::Duration;

/// 单个 worker 连续重试的上限
pub const MAX_RETRIES: u32 = 5;

/// 默认测速采样间隔：1 秒
pub const DEFAULT_SPEED_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// 单个 worker 在两次成功读取之间允许的最大重试次数
    pub max_retries: u32,
    /// 测速任务的采样间隔，`speed` 即该窗口内的字节数
    pub speed_sample_interval: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            speed_sample_interval: DEFAULT_SPEED_SAMPLE_INTERVAL,
        }
    }
}
