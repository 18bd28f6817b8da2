//! # ReactiveProperty：响应式属性内核
//!
//! 下载器对外暴露的可监听状态（进度、状态、URI 列表）都基于本模块实现。
//! [`UnlockReactiveProperty`](super::unlock_reactive::UnlockReactiveProperty) 是它的对外别名。
//!
//! 本模块**不对外导出**，仅供 `states` 子模块内部复用。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tokio::sync::watch::error::RecvError;

// ──────────────────────────── Error ────────────────────────────

/// 响应式属性统一错误类型
#[derive(Debug, Error)]
pub enum ReactivePropertyError {
    /// 监听器已被销毁
    #[error("watcher closed")]
    WatcherClosed,

    /// watch 通道接收失败
    #[error("receive failed: {0}")]
    RecvError(#[from] RecvError),
}

// ──────────────────────────── Inner ────────────────────────────

/// 内部共享状态，包含值发送器和销毁标志。
#[derive(Debug)]
pub(crate) struct Inner<T> {
    pub(crate) sender: watch::Sender<Option<T>>,
    pub(crate) is_dropped: AtomicBool,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.is_dropped.store(true, Ordering::Relaxed);
        let _ = self.sender.send(None);
    }
}

// ──────────────────────────── ReactiveProperty ────────────────────────────

/// 响应式属性内核：提供 new / update / update_field / get_current / watch 等基础能力。
#[derive(Clone, Debug)]
pub struct ReactiveProperty<T: Clone + Send + Sync> {
    pub(crate) inner: Arc<Inner<T>>,
    pub(crate) cache_receiver: watch::Receiver<Option<T>>,
}

impl<T> ReactiveProperty<T>
where
    T: Clone + Send + Sync,
{
    /// 创建一个新的响应式属性。
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(Some(value));
        let cache_receiver = sender.subscribe();
        Self {
            inner: Arc::new(Inner {
                sender,
                is_dropped: AtomicBool::new(false),
            }),
            cache_receiver,
        }
    }

    /// 更新属性的值，所有监听者都会收到通知。
    pub fn update(&self, new_value: T) -> Result<&Self, ReactivePropertyError> {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Ok(self);
        }
        // 没有监听者时 send 会返回 Err，但值仍需写入，send_replace 不关心接收端
        self.inner.sender.send_replace(Some(new_value));
        Ok(self)
    }

    /// 使用闭包原地修改部分字段。
    ///
    /// 修改在 watch 通道的写锁内完成，多个任务并发调用时不会互相覆盖。
    pub fn update_field<F>(&self, updater: F) -> Result<&Self, ReactivePropertyError>
    where
        F: FnOnce(&mut T),
    {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Ok(self);
        }

        self.inner.sender.send_modify(|slot| {
            if let Some(current) = slot.as_mut() {
                updater(current);
            }
        });
        Ok(self)
    }

    /// 获取当前属性值的快照（会 clone）；只需读取部分字段时用 [`map()`](Self::map)。
    pub fn get_current(&self) -> Option<T> {
        self.cache_receiver.borrow().as_ref().cloned()
    }

    /// 获取当前值，如果属性已销毁则返回默认值。
    pub fn get_or_default(&self) -> T
    where
        T: Default,
    {
        self.get_current().unwrap_or_default()
    }

    /// 对当前值应用转换函数；属性已销毁时返回 `None`。
    pub fn map<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.cache_receiver.borrow().as_ref().map(f)
    }

    /// 创建一个监听器，用于异步监听属性值的变化。
    pub fn watch(&self) -> PropertyWatcher<T> {
        PropertyWatcher {
            receiver: self.inner.sender.subscribe(),
            inner: Arc::clone(&self.inner),
        }
    }
}

// ──────────────────────────── PropertyWatcher ────────────────────────────

/// 属性监听器，用于异步接收属性值的变化。
pub struct PropertyWatcher<T> {
    receiver: watch::Receiver<Option<T>>,
    #[allow(dead_code)]
    inner: Arc<Inner<T>>,
}

impl<T> PropertyWatcher<T>
where
    T: Clone + Send + Sync,
{
    /// 异步等待属性值的变化，返回新值。
    pub async fn changed(&mut self) -> Result<T, ReactivePropertyError> {
        self.receiver.changed().await?;
        match self.receiver.borrow_and_update().as_ref() {
            None => Err(ReactivePropertyError::WatcherClosed),
            Some(value) => Ok(value.clone()),
        }
    }

    /// 同步获取当前值的克隆（不标记为已读）。
    pub fn borrow(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }

    /// 挂起直到当前值满足条件，返回满足条件的那个值。
    ///
    /// 先检查当前值再等待变化；状态一旦满足（例如下载进入终态）立即返回。
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<T, ReactivePropertyError>
    where
        F: FnMut(&T) -> bool,
    {
        loop {
            if let Some(value) = self.receiver.borrow_and_update().as_ref() {
                if predicate(value) {
                    return Ok(value.clone());
                }
            }
            self.receiver.changed().await?;
        }
    }
}
