/// 下载状态（由下载器内部维护，外部只读监听）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl DownloadStatus {
    /// 本次运行已经结束。
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Paused | DownloadStatus::Completed | DownloadStatus::Failed
        )
    }
}
