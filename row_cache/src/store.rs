//! Windowed store with insert-at-index
//! 支持按位置插入的窗口化存储
//!
//! Inserting shifts every cached row at or after the index down by the
//! number of new rows, across block boundaries. Blocks are visited from the
//! highest id down so a source row is always read before it is overwritten.
//! 插入会把索引处及之后的所有缓存行下移新行数个位置，可跨越块边界。
//! 块按 id 从高到低访问，保证源行总在被覆盖前读取。

use std::{ops::Deref, rc::Rc};

use load_gate::Gate;
use log::debug;

use crate::{BlockCache, Conf, DataSource, Event, Result, Row, RowOf, cache::Entry};

/// [`BlockCache`] plus row insertion / [`BlockCache`] 加行插入
pub struct WindowedStore<S: DataSource>(BlockCache<S>);

impl<S: DataSource> WindowedStore<S> {
  pub fn new(
    src: S,
    gate: Rc<Gate>,
    sort: S::Sort,
    filter: S::Filter,
    conf: &[Conf],
  ) -> Result<Self> {
    BlockCache::new(src, gate, sort, filter, conf).map(Self)
  }

  #[inline]
  pub fn cache(&self) -> &BlockCache<S> {
    &self.0
  }

  /// Insert rows at index, returns the handles placed into cached blocks.
  /// Rows landing in blocks that are not cached are dropped, the source is
  /// expected to serve them on the next load.
  /// 在索引处插入行，返回放入已缓存块的句柄。
  /// 落在未缓存块中的行被丢弃，由数据源在下次加载时提供。
  pub fn insert_at(&self, index: usize, rows: Vec<S::Row>) -> Vec<RowOf<S>> {
    let core = &self.0.0;
    let n = rows.len();
    let mut rows: Vec<_> = rows.into_iter().map(Some).collect();
    let mut added = Vec::new();
    let mut dirty = false;

    for e in core.entries().into_iter().rev() {
      let (start, end) = {
        let b = e.block.borrow();
        (b.start, b.end)
      };
      if end <= index {
        continue;
      }

      dirty |= self.shift(&e, start, end, index.saturating_add(n), n);

      let mut b = e.block.borrow_mut();
      for (i, slot) in rows.iter_mut().enumerate() {
        let p = index.saturating_add(i);
        if !b.contains(p) {
          continue;
        }
        if let Some(data) = slot.take() {
          let row = Row::new(p, data);
          b.put(p, row.clone());
          added.push(row);
        }
      }
    }
    added.sort_by_key(|r: &RowOf<S>| r.index());

    if self.is_max_row_found() {
      let mut st = core.st.borrow_mut();
      st.virtual_row_count = st.virtual_row_count.saturating_add(n);
    }
    debug!("insert {n} rows at {index}, {} placed", added.len());

    if dirty {
      core.gate.tick();
    }
    core.updated();
    core.emit(&Event::RowsAdded(added.clone()));
    added
  }

  /// Move rows `[from, end)` of one block down by `n`, true if any source
  /// row was missing and the block had to be re-marked
  /// 将块内 `[from, end)` 的行下移 `n`，若有源行缺失导致块被重新标记则返回 true
  fn shift(&self, e: &Entry<S>, start: usize, end: usize, from: usize, n: usize) -> bool {
    let core = &self.0.0;
    let mut dirty = false;
    for p in (start.max(from)..end).rev() {
      // Source may sit in an earlier block, or this one
      // 源行可能位于更早的块，也可能就在本块
      let src = core.peek(p - n);
      let mut b = e.block.borrow_mut();
      match src {
        Some(row) => b.put(p, row),
        None => {
          debug!("row {} not resident, re-mark block {}", p - n, b.id);
          b.blank(p);
          b.set_dirty();
          dirty = true;
        }
      }
    }
    dirty
  }
}

impl<S: DataSource> Deref for WindowedStore<S> {
  type Target = BlockCache<S>;

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl<S: DataSource> From<BlockCache<S>> for WindowedStore<S> {
  #[inline]
  fn from(cache: BlockCache<S>) -> Self {
    Self(cache)
  }
}
