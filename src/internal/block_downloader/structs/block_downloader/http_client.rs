//! 下载专用 HTTP 客户端。

use reqwest::Client;
use tracing::warn;

/// 每个主机保留的空闲连接上限，足够覆盖任意 worker 数
const POOL_MAX_IDLE_PER_HOST: usize = 999;

/// 构造默认客户端：不启用 gzip，保证 Range 偏移与落盘字节一一对应。
pub(super) fn build_http_client() -> Client {
    match Client::builder()
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "building tuned http client failed, using defaults");
            Client::new()
        }
    }
}
