//! Cache notifications / 缓存通知

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use crate::Row;

/// Cache notification / 缓存通知
pub enum Event<R> {
  /// Row count or rows changed, re-read / 行数或行已变化，需重新读取
  CacheUpdated,
  /// Rows created by an insert / 插入创建的行
  RowsAdded(Vec<Row<R>>),
}

/// Subscriber callback / 订阅回调
pub type Listener<R> = Rc<dyn Fn(&Event<R>)>;

/// Subscription id / 订阅 ID
pub type SubId = u64;

pub(crate) struct Subs<R> {
  seq: Cell<SubId>,
  li: RefCell<Vec<(SubId, Listener<R>)>>,
}

impl<R> Subs<R> {
  pub fn new() -> Self {
    Self {
      seq: Cell::new(0),
      li: RefCell::new(Vec::new()),
    }
  }

  pub fn add(&self, f: Listener<R>) -> SubId {
    let id = self.seq.get();
    self.seq.set(id + 1);
    self.li.borrow_mut().push((id, f));
    id
  }

  pub fn rm(&self, id: SubId) -> bool {
    let mut li = self.li.borrow_mut();
    let len = li.len();
    li.retain(|(i, _)| *i != id);
    li.len() != len
  }

  /// Listeners may subscribe or read the cache while being called
  /// 回调执行期间可以订阅或读取缓存
  pub fn emit(&self, e: &Event<R>) {
    let li: Vec<_> = self.li.borrow().iter().map(|(_, f)| f.clone()).collect();
    for f in li {
      f(e);
    }
  }
}
