//! Block: one fixed-size segment of the virtual row set
//! 块：虚拟行集中的一个定长段

use crate::{Error, Result, Row};

/// Block lifecycle / 块生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  /// Needs (re)load / 需要（重新）加载
  Dirty,
  /// Fetch in flight / 获取中
  Loading,
  /// Settled, success or not / 已落定，无论成功与否
  Loaded,
}

/// Block snapshot for diagnostics / 用于诊断的块快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
  pub start: usize,
  pub end: usize,
  pub state: BlockState,
  pub last_accessed: u64,
  /// Last fetch failure / 最近一次获取失败
  pub fail: Option<String>,
}

pub(crate) struct Block<R> {
  pub id: usize,
  pub start: usize,
  pub end: usize,
  state: BlockState,
  rows: Vec<Option<Row<R>>>,
  last_accessed: u64,
  version: u64,
  fail: Option<String>,
  destroyed: bool,
}

impl<R> Block<R> {
  /// End saturates at `usize::MAX`, the last block of the range is short
  /// 末尾在 `usize::MAX` 处饱和，范围内最后一块偏短
  pub fn new(id: usize, size: usize) -> Self {
    let start = id.saturating_mul(size);
    Self {
      id,
      start,
      end: start.saturating_add(size),
      state: BlockState::Dirty,
      rows: std::iter::repeat_with(|| None).take(size).collect(),
      last_accessed: 0,
      version: 0,
      fail: None,
      destroyed: false,
    }
  }

  #[inline]
  pub fn state(&self) -> BlockState {
    self.state
  }

  #[inline]
  pub fn last_accessed(&self) -> u64 {
    self.last_accessed
  }

  /// Dirty → Loading, returns the version the fetch must carry back
  /// Dirty → Loading，返回获取结果需要带回的版本
  pub fn begin_load(&mut self) -> Result<u64> {
    if self.state != BlockState::Dirty || self.destroyed {
      return Err(Error::InvalidState {
        id: self.id,
        state: self.state,
      });
    }
    self.state = BlockState::Loading;
    Ok(self.version)
  }

  /// Apply a fetch result, false if stale (re-marked or destroyed since)
  /// 应用获取结果，过期（之后被重新标记或已销毁）返回 false
  ///
  /// A failure keeps whatever rows the block already held.
  /// 失败时保留块已持有的行。
  pub fn settle(&mut self, version: u64, res: std::result::Result<Vec<R>, String>) -> bool {
    if self.destroyed || version != self.version || self.state != BlockState::Loading {
      return false;
    }
    self.state = BlockState::Loaded;
    match res {
      Ok(li) => {
        let mut li = li.into_iter();
        for (slot, idx) in self.rows.iter_mut().zip(self.start..self.end) {
          let open = slot.as_ref().is_some_and(Row::is_open);
          *slot = li.next().map(|data| {
            let row = Row::new(idx, data);
            // Expansion survives a reload / 展开状态在重新加载后保留
            row.set_open(open);
            row
          });
        }
        self.fail = None;
      }
      Err(e) => self.fail = Some(e),
    }
    true
  }

  /// Force reload, in-flight results become stale
  /// 强制重新加载，进行中的结果随之过期
  #[inline]
  pub fn set_dirty(&mut self) {
    self.version += 1;
    self.state = BlockState::Dirty;
  }

  #[inline]
  pub fn touch(&mut self, seq: u64) {
    self.last_accessed = seq;
  }

  #[inline]
  pub fn contains(&self, idx: usize) -> bool {
    idx >= self.start && idx < self.end
  }

  #[inline]
  pub fn row(&self, idx: usize) -> Option<&Row<R>> {
    if !self.contains(idx) {
      return None;
    }
    self.rows[idx - self.start].as_ref()
  }

  /// Place a row, its index follows / 放置行，行号随之更新
  #[inline]
  pub fn put(&mut self, idx: usize, row: Row<R>) {
    if self.contains(idx) {
      row.set_index(idx);
      self.rows[idx - self.start] = Some(row);
    }
  }

  #[inline]
  pub fn blank(&mut self, idx: usize) {
    if self.contains(idx) {
      self.rows[idx - self.start] = None;
    }
  }

  /// Resident rows in order / 按序的驻留行
  pub fn rows(&self) -> impl Iterator<Item = &Row<R>> {
    self.rows.iter().flatten()
  }

  /// Any open row below the virtual row count
  /// 虚拟行数以内是否有展开行
  pub fn is_any_row_open(&self, virtual_row_count: usize) -> bool {
    self
      .rows()
      .any(|r| r.index() < virtual_row_count && r.is_open())
  }

  /// Release slots, true only the first time
  /// 释放槽位，仅首次返回 true
  pub fn destroy(&mut self) -> bool {
    if self.destroyed {
      return false;
    }
    self.destroyed = true;
    self.rows.iter_mut().for_each(|slot| *slot = None);
    true
  }

  pub fn info(&self) -> BlockInfo {
    BlockInfo {
      start: self.start,
      end: self.end,
      state: self.state,
      last_accessed: self.last_accessed,
      fail: self.fail.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_block_is_dirty() {
    let b: Block<u32> = Block::new(2, 10);
    assert_eq!(b.state(), BlockState::Dirty);
    assert_eq!((b.start, b.end), (20, 30));
    assert!(b.row(25).is_none());
    assert!(b.row(30).is_none());
  }

  #[test]
  fn double_load_rejected() {
    let mut b: Block<u32> = Block::new(0, 4);
    assert_eq!(b.begin_load().unwrap(), 0);
    assert!(matches!(
      b.begin_load(),
      Err(Error::InvalidState {
        id: 0,
        state: BlockState::Loading
      })
    ));
    assert!(b.settle(0, Ok(vec![1, 2, 3, 4])));
    assert!(matches!(
      b.begin_load(),
      Err(Error::InvalidState {
        state: BlockState::Loaded,
        ..
      })
    ));
  }

  #[test]
  fn settle_short_page() {
    let mut b: Block<u32> = Block::new(1, 4);
    let v = b.begin_load().unwrap();
    assert!(b.settle(v, Ok(vec![7, 8])));
    assert_eq!(b.row(4).map(|r| *r.data()), Some(7));
    assert_eq!(b.row(5).map(|r| r.index()), Some(5));
    assert!(b.row(6).is_none());
  }

  #[test]
  fn failure_keeps_rows() {
    let mut b: Block<u32> = Block::new(0, 2);
    let v = b.begin_load().unwrap();
    b.settle(v, Ok(vec![1, 2]));
    b.set_dirty();
    let v = b.begin_load().unwrap();
    assert!(b.settle(v, Err("boom".into())));
    assert_eq!(b.state(), BlockState::Loaded);
    assert_eq!(b.info().fail.as_deref(), Some("boom"));
    assert_eq!(b.row(1).map(|r| *r.data()), Some(2));
  }

  #[test]
  fn stale_result_dropped() {
    let mut b: Block<u32> = Block::new(0, 2);
    let old = b.begin_load().unwrap();
    b.set_dirty();
    assert!(!b.settle(old, Ok(vec![1, 2])));
    assert_eq!(b.state(), BlockState::Dirty);

    let v = b.begin_load().unwrap();
    assert!(b.destroy());
    assert!(!b.destroy());
    assert!(!b.settle(v, Ok(vec![1, 2])));
  }

  #[test]
  fn reload_keeps_open() {
    let mut b: Block<u32> = Block::new(0, 4);
    let v = b.begin_load().unwrap();
    b.settle(v, Ok(vec![1, 2, 3, 4]));
    b.row(2).unwrap().set_open(true);
    b.set_dirty();
    let v = b.begin_load().unwrap();
    assert!(b.settle(v, Ok(vec![5, 6, 7, 8])));
    assert_eq!(b.row(2).map(|r| *r.data()), Some(7));
    assert!(b.row(2).unwrap().is_open());
    assert!(!b.row(1).unwrap().is_open());
    assert!(b.is_any_row_open(4));
  }

  #[test]
  fn last_block_saturates() {
    let mut b: Block<u32> = Block::new(usize::MAX / 10, 10);
    assert_eq!(b.start, usize::MAX - 5);
    assert_eq!(b.end, usize::MAX);
    assert!(!b.contains(usize::MAX));
    let v = b.begin_load().unwrap();
    assert!(b.settle(v, Ok((0..10).collect())));
    assert_eq!(b.rows().count(), 5);
    assert_eq!(b.row(usize::MAX - 1).map(|r| *r.data()), Some(4));
  }

  #[test]
  fn open_rows() {
    let mut b: Block<u32> = Block::new(0, 4);
    let v = b.begin_load().unwrap();
    b.settle(v, Ok(vec![1, 2, 3, 4]));
    assert!(!b.is_any_row_open(4));
    b.row(3).unwrap().set_open(true);
    assert!(b.is_any_row_open(4));
    // past the virtual end / 超出虚拟末尾
    assert!(!b.is_any_row_open(3));
  }
}
