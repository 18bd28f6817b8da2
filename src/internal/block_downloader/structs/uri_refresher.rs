use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::states::unlock_reactive::UnlockReactiveProperty;

/// 调用方提供的刷新函数：返回新的完整 URI 列表，下标 0 为之后优先使用的地址。
pub type RefreshUriFunc = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// URI 刷新策略：刷新函数 + 周期。
///
/// 周期为 0 时不启动周期任务，但 worker 遇到响应状态错误时仍会调用刷新函数。
#[derive(Clone)]
pub struct UriRefresher {
    func: RefreshUriFunc,
    refresh_time_ms: u64,
}

impl fmt::Debug for UriRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UriRefresher")
            .field("refresh_time_ms", &self.refresh_time_ms)
            .finish_non_exhaustive()
    }
}

impl UriRefresher {
    pub fn new<F>(func: F, refresh_time_ms: u64) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            refresh_time_ms,
        }
    }

    /// 周期刷新的间隔；为 0 时返回 `None`。
    pub fn period(&self) -> Option<Duration> {
        (self.refresh_time_ms > 0).then(|| Duration::from_millis(self.refresh_time_ms))
    }

    /// 调用刷新函数并整体替换 `uris`。返回空列表时保留原值。
    pub fn refresh_into(&self, uris: &UnlockReactiveProperty<Vec<String>>) -> bool {
        let fresh = (self.func)();
        if fresh.is_empty() {
            warn!("uri refresh returned an empty list, keeping current uris");
            return false;
        }
        debug!(uri = %fresh[0], count = fresh.len(), "uris refreshed");
        let _ = uris.update(fresh);
        true
    }
}
