//! Error types for cache operations
//! 缓存操作的错误类型

use thiserror::Error;

use crate::BlockState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("block {id} is {state:?}, load needs Dirty / 块 {id} 为 {state:?}，加载需要 Dirty")]
  InvalidState { id: usize, state: BlockState },

  #[error("block size must be > 0 / 块大小必须大于 0")]
  BlockSize,
}

pub type Result<T> = std::result::Result<T, Error>;
