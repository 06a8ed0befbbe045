//! 默认值 Defaults

/// Rows per block / 每块行数
pub const BLOCK_SIZE: usize = 100;

/// Speculative rows past the last loaded block / 最后加载块之后的推测行数
pub const OVERFLOW: usize = 1;

/// Virtual row count before any load / 加载前的虚拟行数
pub const INITIAL_ROW_COUNT: usize = 1;
