//! 单阶段钩子适配器：将闭包包装成 [`DownloadHook`]，供 `on_xx` 构造方法使用。

use std::future::Future;

use async_trait::async_trait;

use crate::internal::block_downloader::structs::download_error::DownloadError;
use crate::internal::block_downloader::structs::download_progress::DownloadProgress;
use crate::internal::block_downloader::traits::download_hook::DownloadHook;

/// 仅实现「进度」的钩子适配器。
pub(crate) struct OnProgressHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F> DownloadHook for OnProgressHookAdapter<F>
where
    F: FnMut(&DownloadProgress) + Send + Sync + 'static,
{
    fn on_progress(&mut self, progress: &DownloadProgress) {
        (self.0)(progress);
    }
}

/// 仅实现「完成」的钩子适配器。
pub(crate) struct OnCompletedHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> DownloadHook for OnCompletedHookAdapter<F>
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_completed(&mut self) {
        (self.0)().await
    }
}

/// 仅实现「失败」的钩子适配器。闭包拿到的是错误的文本描述。
pub(crate) struct OnFailedHookAdapter<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> DownloadHook for OnFailedHookAdapter<F>
where
    F: FnMut(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_failed(&mut self, error: &DownloadError) {
        (self.0)(error.to_string()).await
    }
}
