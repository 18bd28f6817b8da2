pub mod block_downloader;
pub mod states;
