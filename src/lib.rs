/// 内部导出的模块
mod internal;

#[cfg(test)]
mod tests;

/// 分块并发下载器：任务描述、下载器本体、错误与状态类型、钩子接口
pub mod block_downloader {
    use crate::internal;
    pub use internal::block_downloader::structs::*;
    pub use internal::block_downloader::traits::download_hook::DownloadHook;
}

pub mod states {
    pub mod unlock_reactive {
        use crate::internal;
        pub use internal::states::unlock_reactive::*;
    }
}
