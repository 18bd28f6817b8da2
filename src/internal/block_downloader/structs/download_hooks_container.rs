use crate::internal::block_downloader::structs::download_error::DownloadError;
use crate::internal::block_downloader::structs::download_progress::DownloadProgress;
use crate::internal::block_downloader::traits::download_hook::DownloadHook;

/// 钩子容器：按注册顺序依次执行所有钩子。
#[derive(Default)]
pub struct DownloadHooksContainer {
    hooks: Vec<Box<dyn DownloadHook>>,
}

impl DownloadHooksContainer {
    /// 添加一个下载钩子；支持多次调用以注册多个钩子。
    pub fn add(&mut self, hook: impl DownloadHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn run_on_progress(&mut self, progress: &DownloadProgress) {
        for h in self.hooks.iter_mut() {
            h.on_progress(progress);
        }
    }

    pub async fn run_on_completed(&mut self) {
        for h in self.hooks.iter_mut() {
            h.on_completed().await;
        }
    }

    pub async fn run_on_failed(&mut self, error: &DownloadError) {
        for h in self.hooks.iter_mut() {
            h.on_failed(error).await;
        }
    }
}
