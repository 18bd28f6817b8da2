//! 下载块：目标文件中的一段闭区间字节范围，带有自己的进度与重试计数。

use serde::{Deserialize, Serialize};

/// 目标文件中的一段闭区间 `[begin_offset, end_offset]`。
///
/// `begin_offset` 会随写入前移，始终满足 `begin_offset == 初始起点 + downloaded_size`，
/// 因此从持久化状态恢复时，直接把上次的 Block 原样交回即可从断点继续。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 下一个待写入字节的偏移（含）
    pub begin_offset: u64,
    /// 本块最后一个字节的偏移（含）
    pub end_offset: u64,
    /// 本块已写入的字节数
    #[serde(default)]
    pub downloaded_size: u64,
    /// 是否有 worker 正在下载本块；仅运行期有效
    #[serde(skip)]
    pub downloading: bool,
    /// 是否已下载完成
    #[serde(default)]
    pub completed: bool,
    /// 当前 worker 连续失败的次数；仅运行期有效
    #[serde(skip)]
    pub retry_count: u32,
}

impl Block {
    /// 创建一个尚未下载的块，`begin <= end`。
    pub fn new(begin_offset: u64, end_offset: u64) -> Self {
        Self {
            begin_offset,
            end_offset,
            downloaded_size: 0,
            downloading: false,
            completed: false,
            retry_count: 0,
        }
    }

    /// 创建时的起始偏移。
    pub fn initial_offset(&self) -> u64 {
        self.begin_offset.saturating_sub(self.downloaded_size)
    }

    /// 本块总字节数。
    pub fn size(&self) -> u64 {
        inclusive_len(self.initial_offset(), self.end_offset)
    }

    /// 还需下载的字节数。
    pub fn remaining(&self) -> u64 {
        inclusive_len(self.begin_offset, self.end_offset)
    }

    /// 可被领取：未完成且没有 worker 附着。
    pub fn is_claimable(&self) -> bool {
        !self.completed && !self.downloading
    }
}

/// 闭区间 `[begin, end]` 的字节数；`begin > end` 时为 0。
///
/// `end == u64::MAX` 时 `end + 1` 会溢出，因此在 u128 上计算。
pub(crate) fn inclusive_len(begin: u64, end: u64) -> u64 {
    let len = (u128::from(end) + 1).saturating_sub(u128::from(begin));
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// 按固定大小把 `[0, file_size)` 切成连续的块，最后一块可能更短。
///
/// `file_size == 0` 或 `block_size == 0` 时返回空列表。
pub fn split_blocks(file_size: u64, block_size: u64) -> Vec<Block> {
    let mut blocks = Vec::new();
    if block_size == 0 {
        return blocks;
    }

    let mut start: u64 = 0;
    while start < file_size {
        let end = start.saturating_add(block_size).min(file_size);
        blocks.push(Block::new(start, end - 1));
        start = end;
    }
    blocks
}
