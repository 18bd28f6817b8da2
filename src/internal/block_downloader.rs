//! 分块下载器领域模块：把一个远程资源按块并发下载到本地文件。
//!
//! 对外导出以 [`crate::block_downloader`] 为准，此处仅做模块划分。

pub mod structs;
pub mod traits;
