//! Row handle / 行句柄

use std::{cell::Cell, fmt, rc::Rc};

struct Inner<R> {
  data: R,
  idx: Cell<usize>,
  open: Cell<bool>,
}

/// Shared handle to one row, moved between slots without copying data
/// 单行的共享句柄，在槽位间移动而不复制数据
pub struct Row<R>(Rc<Inner<R>>);

impl<R> Row<R> {
  #[inline]
  pub fn new(idx: usize, data: R) -> Self {
    Self(Rc::new(Inner {
      data,
      idx: Cell::new(idx),
      open: Cell::new(false),
    }))
  }

  #[inline]
  pub fn data(&self) -> &R {
    &self.0.data
  }

  /// Current row index / 当前行号
  #[inline]
  pub fn index(&self) -> usize {
    self.0.idx.get()
  }

  #[inline]
  pub(crate) fn set_index(&self, idx: usize) {
    self.0.idx.set(idx);
  }

  /// Expanded state, a block holding open rows is never evicted
  /// 展开状态，持有展开行的块永不淘汰
  #[inline]
  pub fn is_open(&self) -> bool {
    self.0.open.get()
  }

  #[inline]
  pub fn set_open(&self, open: bool) {
    self.0.open.set(open);
  }

  /// Same handle / 同一句柄
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl<R> Clone for Row<R> {
  #[inline]
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }
}

impl<R: fmt::Debug> fmt::Debug for Row<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Row")
      .field("idx", &self.index())
      .field("open", &self.is_open())
      .field("data", self.data())
      .finish()
  }
}
