//! # QueueReactiveProperty：微队列响应式属性
//!
//! 基于 tokio::sync::mpsc 实现的单向消息队列。
//! 下载器用它作为 worker → 完成反应器 的唯一完成通道。
//!
//! ## 特性
//! - 无锁设计（基于 mpsc::unbounded_channel）
//! - 严格 FIFO 顺序
//! - 生产者可以有多个（Clone sender），消费者只有一个
//! - 仅库内部使用（`pub(crate)`）

use super::reactive_core::ReactiveProperty;
use tokio::sync::mpsc;

/// 微队列响应式属性（生产者端）
///
/// 可以 Clone，多个 worker 可以同时往队列推送结果。
#[derive(Clone, Debug)]
pub(crate) struct QueueReactiveProperty<T: Clone + Send + Sync + 'static> {
    sender: mpsc::UnboundedSender<T>,
    // 记录最近一条消息，供外部只读查询
    last: ReactiveProperty<Option<T>>,
}

/// 微队列消费者
///
/// 不可 Clone，只能有一个消费者，按 FIFO 顺序消费消息。
#[derive(Debug)]
pub(crate) struct QueueReactiveConsumer<T: Clone + Send + Sync + 'static> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> QueueReactiveProperty<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// 创建一个新的微队列，返回 (生产者, 消费者)。
    pub(crate) fn new() -> (Self, QueueReactiveConsumer<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let producer = Self {
            sender,
            last: ReactiveProperty::new(None),
        };
        let consumer = QueueReactiveConsumer { receiver };

        (producer, consumer)
    }

    /// 发送消息到队列；接收端已关闭时返回 `Err(T)`。
    pub(crate) fn send(&self, value: T) -> Result<(), T> {
        let _ = self.last.update(Some(value.clone()));
        self.sender.send(value).map_err(|e| e.0)
    }

    /// 最近一条发送的消息。
    pub(crate) fn last(&self) -> Option<T> {
        self.last.get_current().flatten()
    }
}

impl<T> QueueReactiveConsumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// 异步接收下一条消息；发送端全部关闭时返回 `None`。
    pub(crate) async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}
