//! 块队列：按插入顺序保存全部块，向 worker 分发下一个未领取的块。
//!
//! 所有读写都在同一把互斥锁内完成，锁内不做任何 IO，也不跨越 `.await`，
//! 因此用 `std::sync::Mutex` 即可。

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::block::Block;

/// 有序的块池。worker 通过下标引用自己负责的块。
#[derive(Debug)]
pub struct BlockQueue {
    blocks: Mutex<Vec<Block>>,
}

/// 一次写入之后块的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    /// 写入后的 `begin_offset`
    pub begin_offset: u64,
    /// 本块是否已经写满
    pub completed: bool,
}

impl BlockQueue {
    /// 接管块列表。传入的 `downloading` / `retry_count` 属于上一次运行，统一清零。
    pub fn new(mut blocks: Vec<Block>) -> Self {
        for block in blocks.iter_mut() {
            block.downloading = false;
            block.retry_count = 0;
            if block.remaining() == 0 {
                block.completed = true;
            }
        }
        Self {
            blocks: Mutex::new(blocks),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Block>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 领取第一个既未完成、也未被领取的块：标记为下载中并清零重试计数。
    pub fn claim_next(&self) -> Option<usize> {
        let mut blocks = self.lock();
        let index = blocks.iter().position(Block::is_claimable)?;
        let block = &mut blocks[index];
        block.downloading = true;
        block.retry_count = 0;
        Some(index)
    }

    /// 所有块均已完成。
    pub fn all_done(&self) -> bool {
        self.lock().iter().all(|b| b.completed)
    }

    /// 块总数。
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 某块当前待下载的闭区间 `(begin, end)`；块已写满时返回 `None`。
    pub fn pending_range(&self, index: usize) -> Option<(u64, u64)> {
        let blocks = self.lock();
        let block = blocks.get(index)?;
        if block.completed || block.begin_offset > block.end_offset {
            return None;
        }
        Some((block.begin_offset, block.end_offset))
    }

    /// 记录一次写入：前移 `begin_offset`、累加 `downloaded_size`，写满时标记完成。
    pub fn record_write(&self, index: usize, written: u64) -> Option<WriteProgress> {
        let mut blocks = self.lock();
        let block = blocks.get_mut(index)?;
        block.downloaded_size = block.downloaded_size.saturating_add(written);
        match block.begin_offset.checked_add(written) {
            Some(begin) => {
                block.begin_offset = begin;
                if begin > block.end_offset {
                    block.completed = true;
                }
            }
            // 只有 `end_offset == u64::MAX` 的块写满时才会走到这里
            None => {
                block.begin_offset = u64::MAX;
                block.completed = true;
            }
        }
        Some(WriteProgress {
            begin_offset: block.begin_offset,
            completed: block.completed,
        })
    }

    /// 重试计数加一，返回新值。
    pub fn note_retry(&self, index: usize) -> u32 {
        match self.lock().get_mut(index) {
            Some(block) => {
                block.retry_count += 1;
                block.retry_count
            }
            None => 0,
        }
    }

    /// 当前重试计数。
    pub fn retry_count(&self, index: usize) -> u32 {
        self.lock().get(index).map(|b| b.retry_count).unwrap_or(0)
    }

    /// 成功读到数据后清零重试计数。
    pub fn reset_retry(&self, index: usize) {
        if let Some(block) = self.lock().get_mut(index) {
            block.retry_count = 0;
        }
    }

    /// worker 离开本块（完成、暂停或失败）。
    pub fn release(&self, index: usize) {
        if let Some(block) = self.lock().get_mut(index) {
            block.downloading = false;
        }
    }

    /// 正在被下载的块数。
    pub fn downloading_count(&self) -> usize {
        self.lock().iter().filter(|b| b.downloading).count()
    }

    /// 全部块已下载字节之和，用于断点续传时的初始进度。
    pub fn downloaded_size(&self) -> u64 {
        self.lock().iter().map(|b| b.downloaded_size).sum()
    }

    /// 全部块的总字节数。
    pub fn total_size(&self) -> u64 {
        self.lock().iter().map(Block::size).sum()
    }

    /// 当前全部块的快照。
    pub fn snapshot(&self) -> Vec<Block> {
        self.lock().clone()
    }
}
