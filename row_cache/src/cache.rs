//! Windowed block cache / 窗口化块缓存
//!
//! Rows map to blocks by `row / block_size`. A block is created on first
//! read, registered with the shared [`Gate`] and loaded when the gate admits
//! it. Completions revise the virtual row count.
//! 行按 `row / block_size` 映射到块。块在首次读取时创建，注册到共享的
//! [`Gate`]，由闸门放行后加载。加载完成后修正虚拟行数。

use std::{
  cell::{Cell, RefCell},
  cmp::Reverse,
  collections::BTreeMap,
  rc::{Rc, Weak},
};

use load_gate::{Gate, Key, Loadable};
use log::{debug, warn};

use crate::{
  BlockInfo, BlockState, Conf, DataSource, Event, Page, Result, Row,
  block::Block,
  conf::Opt,
  event::{Listener, SubId, Subs},
};

/// Row handle of a source / 数据源的行句柄
pub type RowOf<S> = Row<<S as DataSource>::Row>;

pub(crate) struct Entry<S: DataSource> {
  pub key: Key,
  pub block: RefCell<Block<S::Row>>,
  core: Weak<Core<S>>,
}

impl<S: DataSource> Loadable for Entry<S> {
  fn is_dirty(&self) -> bool {
    self.block.borrow().state() == BlockState::Dirty
  }

  fn start(&self) -> bool {
    self.core.upgrade().is_some_and(|core| core.load(self))
  }
}

pub(crate) struct State<S: DataSource> {
  pub virtual_row_count: usize,
  pub max_row_found: bool,
  pub active: bool,
  pub blocks: BTreeMap<usize, Rc<Entry<S>>>,
}

pub(crate) struct Core<S: DataSource> {
  pub opt: Opt,
  pub gate: Rc<Gate>,
  pub st: RefCell<State<S>>,
  pub subs: Subs<S::Row>,
  src: Rc<S>,
  sort: S::Sort,
  filter: S::Filter,
  seq: Cell<u64>,
}

impl<S: DataSource> Core<S> {
  #[inline]
  pub fn is_active(&self) -> bool {
    self.st.borrow().active
  }

  #[inline]
  pub fn virtual_row_count(&self) -> usize {
    self.st.borrow().virtual_row_count
  }

  #[inline]
  pub fn entry(&self, id: usize) -> Option<Rc<Entry<S>>> {
    self.st.borrow().blocks.get(&id).cloned()
  }

  /// Live blocks, ascending id / 存活块，按 id 升序
  pub fn entries(&self) -> Vec<Rc<Entry<S>>> {
    self.st.borrow().blocks.values().cloned().collect()
  }

  /// Resident row without creating a block or touching recency
  /// 驻留行，不创建块也不更新访问序
  pub fn peek(&self, idx: usize) -> Option<RowOf<S>> {
    let entry = self.entry(idx / self.opt.block_size)?;
    let b = entry.block.borrow();
    b.row(idx).cloned()
  }

  fn next_seq(&self) -> u64 {
    let seq = self.seq.get() + 1;
    self.seq.set(seq);
    seq
  }

  fn create(self: &Rc<Self>, id: usize) -> Rc<Entry<S>> {
    let key = self.gate.next_key();
    let entry = Rc::new(Entry {
      key,
      block: RefCell::new(Block::new(id, self.opt.block_size)),
      core: Rc::downgrade(self),
    });
    self.st.borrow_mut().blocks.insert(id, entry.clone());
    self.gate.register(key, entry.clone());
    debug!("create block {id}");

    self.purge_if_needed(&entry);
    self.gate.tick();
    entry
  }

  /// Issue the fetch for a block the gate admitted
  /// 为闸门放行的块发起获取
  fn load(&self, entry: &Entry<S>) -> bool {
    let (id, start, end, version) = {
      let mut b = entry.block.borrow_mut();
      match b.begin_load() {
        Ok(version) => (b.id, b.start, b.end, version),
        Err(e) => {
          warn!("{e}");
          return false;
        }
      }
    };
    debug!("load block {id} [{start}, {end})");

    let src = self.src.clone();
    let sort = self.sort.clone();
    let filter = self.filter.clone();
    let gate = self.gate.clone();
    let weak = entry.core.clone();
    let key = entry.key;

    compio::runtime::spawn(async move {
      let res = src
        .fetch(start, end, &sort, &filter)
        .await
        .map_err(|e| e.to_string());
      match weak.upgrade() {
        Some(core) => core.loaded(id, key, version, res),
        // Cache dropped, the gate still gets its slot back
        // 缓存已释放，闸门仍需收回名额
        None => {
          gate.done();
          gate.tick();
        }
      }
    })
    .detach();
    true
  }

  fn loaded(
    &self,
    id: usize,
    key: Key,
    version: u64,
    res: std::result::Result<Page<S::Row>, String>,
  ) {
    let last_row = res.as_ref().ok().and_then(|p| p.last_row);
    let ok = res.is_ok();
    if let Err(e) = &res {
      warn!("load block {id} failed: {e}");
    }

    let entry = self
      .st
      .borrow()
      .blocks
      .get(&id)
      .filter(|e| e.key == key)
      .cloned();
    let current = match entry {
      Some(entry) => {
        let mut b = entry.block.borrow_mut();
        b.settle(version, res.map(|p| p.rows))
      }
      None => false,
    };
    debug!("loaded block {id}, ok={ok}, last_row={last_row:?}, current={current}");

    self.gate.done();
    self.gate.tick();

    if current && ok {
      self.infer_size(id, last_row);
    }
  }

  fn infer_size(&self, id: usize, last_row: Option<usize>) {
    let changed = {
      let mut st = self.st.borrow_mut();
      if let Some(n) = last_row {
        st.virtual_row_count = n;
        st.max_row_found = true;
        true
      } else if !st.max_row_found {
        let candidate = id
          .saturating_add(1)
          .saturating_mul(self.opt.block_size)
          .saturating_add(self.opt.overflow);
        if candidate > st.virtual_row_count {
          st.virtual_row_count = candidate;
          true
        } else {
          false
        }
      } else {
        false
      }
    };
    if changed {
      debug!("virtual row count {}", self.virtual_row_count());
      self.updated();
    }
  }

  fn purge_if_needed(&self, just_created: &Rc<Entry<S>>) {
    let Some(max) = self.opt.max_blocks else {
      return;
    };
    let victims = {
      let st = self.st.borrow();
      if st.blocks.len() <= max {
        return;
      }
      let mut li: Vec<_> = st
        .blocks
        .values()
        .filter(|e| !Rc::ptr_eq(e, just_created))
        .cloned()
        .collect();
      li.sort_by_key(|e| Reverse(e.block.borrow().last_accessed()));
      li.split_off((max - 1).min(li.len()))
    };

    let count = self.virtual_row_count();
    for e in victims {
      if e.block.borrow().is_any_row_open(count) {
        continue;
      }
      debug!("evict block {}", e.block.borrow().id);
      self.remove(&e);
    }
  }

  pub fn remove(&self, e: &Entry<S>) {
    {
      let mut st = self.st.borrow_mut();
      let id = e.block.borrow().id;
      if st.blocks.get(&id).is_some_and(|cur| cur.key == e.key) {
        st.blocks.remove(&id);
      }
    }
    e.block.borrow_mut().destroy();
    self.gate.unregister(e.key);
  }

  pub fn updated(&self) {
    self.emit(&Event::CacheUpdated);
  }

  /// Inactive caches stay silent / 非活动缓存不发通知
  pub fn emit(&self, e: &Event<S::Row>) {
    if self.is_active() {
      self.subs.emit(e);
    }
  }

  fn destroy(&self) {
    let li: Vec<_> = {
      let mut st = self.st.borrow_mut();
      st.active = false;
      std::mem::take(&mut st.blocks).into_values().collect()
    };
    for e in li {
      e.block.borrow_mut().destroy();
      self.gate.unregister(e.key);
    }
  }
}

/// Windowed, eviction-aware cache over a lazily fetched row set
/// 懒加载行集上的窗口化、可淘汰缓存
///
/// Loads run on the current compio runtime, so reads that create blocks must
/// happen inside one.
/// 加载运行在当前 compio 运行时上，因此会创建块的读取必须在运行时内进行。
pub struct BlockCache<S: DataSource>(pub(crate) Rc<Core<S>>);

impl<S: DataSource> BlockCache<S> {
  pub fn new(
    src: S,
    gate: Rc<Gate>,
    sort: S::Sort,
    filter: S::Filter,
    conf: &[Conf],
  ) -> Result<Self> {
    let opt = Opt::new(conf)?;
    Ok(Self(Rc::new(Core {
      opt,
      gate,
      st: RefCell::new(State {
        virtual_row_count: opt.initial_row_count,
        max_row_found: false,
        active: true,
        blocks: BTreeMap::new(),
      }),
      subs: Subs::new(),
      src: Rc::new(src),
      sort,
      filter,
      seq: Cell::new(0),
    })))
  }

  /// Row at index, creating and scheduling its block if absent.
  /// `None` is a placeholder: not loaded yet, failed, or cache destroyed.
  /// 获取行，块不存在则创建并调度。
  /// `None` 为占位：尚未加载、加载失败或缓存已销毁。
  pub fn get(&self, idx: usize) -> Option<RowOf<S>> {
    let core = &self.0;
    if !core.is_active() {
      return None;
    }
    let id = idx / core.opt.block_size;
    let entry = match core.entry(id) {
      Some(entry) => entry,
      None => core.create(id),
    };
    let seq = core.next_seq();
    let mut b = entry.block.borrow_mut();
    b.touch(seq);
    b.row(idx).cloned()
  }

  /// Resident row only, never creates a block. Recency is left untouched,
  /// so peeking never delays eviction of the block.
  /// 仅返回驻留行，从不创建块。不更新访问序，因此不会推迟块的淘汰。
  #[inline]
  pub fn peek(&self, idx: usize) -> Option<RowOf<S>> {
    self.0.peek(idx)
  }

  #[inline]
  pub fn virtual_row_count(&self) -> usize {
    self.0.virtual_row_count()
  }

  #[inline]
  pub fn is_max_row_found(&self) -> bool {
    self.0.st.borrow().max_row_found
  }

  /// Override the row count. `None` keeps the max-row flag. While the end
  /// is unknown the count never lands on a block boundary.
  /// 覆盖行数。`None` 保留末尾标志。末尾未知时行数不落在块边界上。
  pub fn set_virtual_row_count(&self, count: usize, max_row_found: Option<bool>) {
    {
      let mut st = self.0.st.borrow_mut();
      if let Some(found) = max_row_found {
        st.max_row_found = found;
      }
      st.virtual_row_count = if !st.max_row_found && count % self.0.opt.block_size == 0 {
        count.saturating_add(1)
      } else {
        count
      };
    }
    self.0.updated();
  }

  /// Mark every block dirty and reload lazily in place
  /// 标记所有块为脏，原地懒重载
  pub fn refresh(&self) {
    for e in self.0.entries() {
      e.block.borrow_mut().set_dirty();
    }
    debug!("refresh {} blocks", self.0.st.borrow().blocks.len());
    self.0.gate.tick();
  }

  /// Re-mark one block for loading, false if not cached
  /// 重新标记单个块待加载，未缓存返回 false
  pub fn mark_dirty(&self, block_id: usize) -> bool {
    let Some(e) = self.0.entry(block_id) else {
      return false;
    };
    e.block.borrow_mut().set_dirty();
    self.0.gate.tick();
    true
  }

  /// Drop every block without open rows, regardless of the threshold
  /// 丢弃所有不含展开行的块，无视阈值
  pub fn purge_cache(&self) {
    let count = self.virtual_row_count();
    for e in self.0.entries() {
      if e.block.borrow().is_any_row_open(count) {
        continue;
      }
      self.0.remove(&e);
    }
    self.0.updated();
  }

  /// Destroy every block and stop reacting to loads, idempotent
  /// 销毁所有块并停止响应加载，可重复调用
  pub fn destroy(&self) {
    self.0.destroy();
  }

  #[inline]
  pub fn is_active(&self) -> bool {
    self.0.is_active()
  }

  pub fn subscribe(&self, f: impl Fn(&Event<S::Row>) + 'static) -> SubId {
    let f: Listener<S::Row> = Rc::new(f);
    self.0.subs.add(f)
  }

  pub fn unsubscribe(&self, id: SubId) -> bool {
    self.0.subs.rm(id)
  }

  /// Resident rows below the virtual row count, in order
  /// 虚拟行数以内的驻留行，按序
  pub fn for_each_row(&self, mut f: impl FnMut(&RowOf<S>)) {
    let count = self.virtual_row_count();
    for e in self.0.entries() {
      let b = e.block.borrow();
      b.rows().filter(|r| r.index() < count).for_each(&mut f);
    }
  }

  /// Per-block diagnostics / 每块诊断信息
  pub fn block_state(&self) -> BTreeMap<usize, BlockInfo> {
    self
      .0
      .st
      .borrow()
      .blocks
      .iter()
      .map(|(id, e)| (*id, e.block.borrow().info()))
      .collect()
  }

  #[inline]
  pub fn block_count(&self) -> usize {
    self.0.st.borrow().blocks.len()
  }

  #[inline]
  pub fn block_size(&self) -> usize {
    self.0.opt.block_size
  }

  #[inline]
  pub fn gate(&self) -> &Rc<Gate> {
    &self.0.gate
  }
}

impl<S: DataSource> Drop for BlockCache<S> {
  fn drop(&mut self) {
    self.0.destroy();
  }
}
