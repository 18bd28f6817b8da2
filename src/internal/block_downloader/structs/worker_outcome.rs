/// worker 退出时交给完成反应器的结果，经由唯一的完成队列按到达顺序传递。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// 块已写满
    Completed { block: usize },
    /// 观察到暂停信号，主动退出
    Paused { block: usize },
    /// 不可恢复的错误，已经过失败闩
    Failed { block: usize },
}

impl WorkerOutcome {
    pub fn block(&self) -> usize {
        match *self {
            WorkerOutcome::Completed { block }
            | WorkerOutcome::Paused { block }
            | WorkerOutcome::Failed { block } => block,
        }
    }
}
