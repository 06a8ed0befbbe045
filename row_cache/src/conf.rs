//! Cache configuration / 缓存配置

use crate::{
  Error, Result,
  consts::{BLOCK_SIZE, INITIAL_ROW_COUNT, OVERFLOW},
};

/// Cache option, later entries win
/// 缓存选项，后出现的生效
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conf {
  /// Rows per block, must be > 0 / 每块行数，必须大于 0
  BlockSize(usize),
  /// Rows assumed past a loaded block until the end is known
  /// 末尾未知时，假设已加载块之后还有的行数
  Overflow(usize),
  /// Evict above this many blocks (min 1), unset = never
  /// 超过此块数时淘汰（最小 1），未设置则不淘汰
  MaxBlocks(usize),
  /// Starting virtual row count / 初始虚拟行数
  InitialRowCount(usize),
}

/// Resolved options / 解析后的选项
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Opt {
  pub block_size: usize,
  pub overflow: usize,
  pub max_blocks: Option<usize>,
  pub initial_row_count: usize,
}

impl Opt {
  pub fn new(conf: &[Conf]) -> Result<Self> {
    let mut opt = Self {
      block_size: BLOCK_SIZE,
      overflow: OVERFLOW,
      max_blocks: None,
      initial_row_count: INITIAL_ROW_COUNT,
    };
    for c in conf {
      match *c {
        Conf::BlockSize(n) => opt.block_size = n,
        Conf::Overflow(n) => opt.overflow = n,
        Conf::MaxBlocks(n) => opt.max_blocks = Some(n.max(1)),
        Conf::InitialRowCount(n) => opt.initial_row_count = n,
      }
    }
    if opt.block_size == 0 {
      return Err(Error::BlockSize);
    }
    Ok(opt)
  }
}
