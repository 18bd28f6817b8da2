/// 下载进度：响应式状态，由 worker 写入、测速任务补充速度。
///
/// 调用方通过下载器的 `progress()` 读取或监听；进度比例可用 [`DownloadProgress::pct`] 获取。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    /// 已下载的字节数（含续传前已有的部分）
    pub downloaded_size: u64,
    /// 全部块的总字节数
    pub total_size: u64,
    /// 最近一个采样窗口内的字节数
    pub speed: u64,
}

impl DownloadProgress {
    /// 进度百分比（0～100）；总大小为 0 时返回 `f64::NAN`。
    pub fn pct(&self) -> f64 {
        if self.total_size == 0 {
            return f64::NAN;
        }
        (self.downloaded_size as f64 / self.total_size as f64) * 100.0
    }
}
