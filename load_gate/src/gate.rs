//! Admission gate / 准入闸门

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
  sync::atomic::{
    AtomicBool, AtomicUsize,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
  },
};

use log::{debug, trace, warn};

use crate::{Loadable, Pick};

/// Default max concurrent loads / 默认最大并发加载数
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Registration key / 注册键
pub type Key = u64;

/// Load admission gate / 加载准入闸门
pub struct Gate {
  max: usize,
  pick: Pick,
  active: AtomicBool,
  loads: AtomicUsize,
  seq: Cell<Key>,
  li: RefCell<Vec<(Key, Rc<dyn Loadable>)>>,
}

impl Gate {
  /// Create with max concurrent loads (min 1)
  /// 创建，指定最大并发加载数（最小 1）
  pub fn new(max: usize) -> Rc<Self> {
    Self::with_pick(max, Pick::default())
  }

  /// Create with max concurrent loads and pick policy
  /// 创建，指定最大并发加载数和选择策略
  pub fn with_pick(max: usize, pick: Pick) -> Rc<Self> {
    Rc::new(Self {
      max: max.max(1),
      pick,
      active: AtomicBool::new(true),
      loads: AtomicUsize::new(0),
      seq: Cell::new(0),
      li: RefCell::new(Vec::new()),
    })
  }

  /// New unique registration key / 新的唯一注册键
  #[inline]
  pub fn next_key(&self) -> Key {
    let key = self.seq.get();
    self.seq.set(key + 1);
    key
  }

  /// Add to scheduling, no-op if key already registered
  /// 加入调度，键已注册则不做任何事
  pub fn register(&self, key: Key, item: Rc<dyn Loadable>) {
    let mut li = self.li.borrow_mut();
    if li.iter().any(|(k, _)| *k == key) {
      return;
    }
    li.push((key, item));
  }

  /// Remove from scheduling, no-op if absent
  /// 移出调度，不存在则不做任何事
  pub fn unregister(&self, key: Key) {
    self.li.borrow_mut().retain(|(k, _)| *k != key);
  }

  /// A started load finished (success or not)
  /// 已启动的加载结束（无论成功与否）
  pub fn done(&self) {
    if self
      .loads
      .fetch_update(AcqRel, Acquire, |n| n.checked_sub(1))
      .is_err()
    {
      warn!("load done without active load");
    }
  }

  /// Start at most one load if below the cap, true if started
  /// 低于上限时最多启动一个加载，启动返回 true
  pub fn tick(&self) -> bool {
    if !self.is_active() {
      return false;
    }

    let loads = self.loads.load(Acquire);
    if loads >= self.max {
      trace!("tick: {loads} loads in flight, max {}", self.max);
      return false;
    }

    // Release the borrow before start, it may register or unregister
    // 启动前释放借用，start 可能注册或注销
    let item = {
      let li = self.li.borrow();
      self.pick.select(li.iter().map(|(_, i)| i)).cloned()
    };
    let Some(item) = item else {
      return false;
    };

    self.loads.fetch_add(1, AcqRel);
    if item.start() {
      debug!("tick: start load, {} in flight", self.active_loads());
      true
    } else {
      self.loads.fetch_sub(1, AcqRel);
      false
    }
  }

  /// Stop starting new loads, in-flight loads keep running
  /// 停止启动新加载，进行中的加载继续
  #[inline]
  pub fn deactivate(&self) {
    self.active.store(false, Release);
  }

  #[inline]
  pub fn is_active(&self) -> bool {
    self.active.load(Acquire)
  }

  /// Loads in flight / 进行中的加载数
  #[inline]
  pub fn active_loads(&self) -> usize {
    self.loads.load(Relaxed)
  }

  #[inline]
  pub fn max_concurrent(&self) -> usize {
    self.max
  }

  #[inline]
  pub fn pick(&self) -> Pick {
    self.pick
  }

  /// Registered count / 已注册数
  #[inline]
  pub fn len(&self) -> usize {
    self.li.borrow().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.li.borrow().is_empty()
  }
}
