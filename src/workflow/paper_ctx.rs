//! 论文处理上下文
//!
//! 封装"我正在处理第几批的第几篇论文、用的是哪个凭证"这一信息

use std::fmt::Display;

/// 论文处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperCtx {
    /// 论文在全部列表中的位置（从0开始），决定分配的凭证
    pub position: usize,

    /// 批次编号（从1开始，仅用于日志显示）
    pub batch_num: usize,

    /// 分配到的凭证下标
    pub credential: usize,
}

impl PaperCtx {
    pub fn new(position: usize, batch_num: usize, credential: usize) -> Self {
        Self {
            position,
            batch_num,
            credential,
        }
    }
}

impl Display for PaperCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[论文 #{} 批次#{} 凭证#{}]",
            self.position + 1,
            self.batch_num,
            self.credential
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(PaperCtx::new(0, 1, 0).to_string(), "[论文 #1 批次#1 凭证#0]");
    }
}
