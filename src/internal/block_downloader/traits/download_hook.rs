//! 下载流程钩子：在「进度 / 完成 / 失败」插入自定义逻辑。

use async_trait::async_trait;

use crate::internal::block_downloader::structs::download_error::DownloadError;
use crate::internal::block_downloader::structs::download_progress::DownloadProgress;

/// 下载流程钩子。
///
/// 使用方式二选一（可混用）：
/// - **单阶段**：用下载器的 `on_completed` / `on_failed` / `on_progress` 传入闭包；
/// - **完整钩子**：实现本 trait，通过下载器的 `with_hook` 注册。
///
/// 同一次运行内 `on_completed` 与 `on_failed` 互斥，且各自至多触发一次。
#[async_trait]
pub trait DownloadHook: Send + Sync {
    /// 每次写盘之后调用，携带最新的聚合进度。
    fn on_progress(&mut self, _progress: &DownloadProgress) {}

    /// 全部块下载完成后、`completed` 置位前调用。
    async fn on_completed(&mut self) {}

    /// 失败闩首次被拉下时调用，`error` 为导致失败的那一个错误。
    async fn on_failed(&mut self, _error: &DownloadError) {}
}
