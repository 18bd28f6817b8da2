use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::block::Block;

/// 一次下载任务的完整描述，由外部协作方（长度探测、续传持久化）构造后交给下载器。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    /// 目标文件路径，不能是目录
    pub target_file: PathBuf,
    /// 按偏移顺序排列的块，两两不相交且覆盖整个文件
    pub block_list: Vec<Block>,
    /// 等价的源地址列表，下标 0 为当前使用的地址
    pub uris: Vec<String>,
    /// 每个请求都会附带的请求头（每个名字只有一个值）
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 并发 worker 数上限
    pub thread_count: usize,
}

impl JobInfo {
    pub fn new(
        target_file: impl Into<PathBuf>,
        block_list: Vec<Block>,
        uris: Vec<String>,
        thread_count: usize,
    ) -> Self {
        Self {
            target_file: target_file.into(),
            block_list,
            uris,
            headers: HashMap::new(),
            thread_count,
        }
    }

    /// 追加一个请求头；同名请求头会被覆盖。
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
