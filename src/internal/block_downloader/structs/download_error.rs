//! 下载相关错误类型。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("target file cannot be dir")]
    TargetIsDir,

    #[error("download already started")]
    AlreadyStarted,

    #[error("begin_download must be called inside a tokio runtime")]
    NoRuntime,

    #[error("no source uri available")]
    NoSourceUri,

    #[error("invalid uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response status unsuccessful: {0}")]
    ResponseStatus(u16),

    #[error("reading response body failed: {0}")]
    BodyRead(reqwest::Error),

    #[error("response body ended early at offset {offset}, expected up to {end}")]
    UnexpectedEof { offset: u64, end: u64 },

    #[error("open target file failed: {0}")]
    OpenFile(std::io::Error),

    #[error("seek target file failed: {0}")]
    SeekFile(std::io::Error),

    #[error("write target file failed: {0}")]
    WriteFile(std::io::Error),

    #[error("flush target file failed: {0}")]
    FlushFile(std::io::Error),

    #[error("worker task ended abnormally: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl DownloadError {
    /// 可重试的错误：非 2xx 响应，或读取响应体时的传输错误。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::ResponseStatus(_)
                | DownloadError::BodyRead(_)
                | DownloadError::UnexpectedEof { .. }
        )
    }

    /// 重试前是否需要刷新 URI 列表：只有响应状态错误才需要。
    pub fn wants_uri_refresh(&self) -> bool {
        matches!(self, DownloadError::ResponseStatus(_))
    }
}
