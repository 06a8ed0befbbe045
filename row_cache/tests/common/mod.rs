//! Test data sources / 测试数据源

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc, time::Duration};

use futures::channel::oneshot;
use row_cache::{DataSource, Page};

type Reply = Result<Page<u32>, String>;

/// Let spawned fetches run / 让已派生的获取任务运行
pub async fn settle() {
  compio::time::sleep(Duration::from_millis(5)).await;
}

pub fn rows(start: usize, end: usize) -> Vec<u32> {
  (start..end).map(|i| i as u32).collect()
}

/// Pending fetch / 待完成的获取
pub struct Req {
  pub start: usize,
  pub end: usize,
  tx: oneshot::Sender<Reply>,
}

impl Req {
  pub fn ok(self, rows: Vec<u32>, last_row: Option<usize>) {
    let _ = self.tx.send(Ok(Page { rows, last_row }));
  }

  /// Rows equal to their index / 行值等于行号
  pub fn fill(self, last_row: Option<usize>) {
    let li = rows(self.start, self.end);
    self.ok(li, last_row);
  }

  pub fn fail(self, msg: &str) {
    let _ = self.tx.send(Err(msg.to_string()));
  }
}

/// Source completed by hand / 手动完成的数据源
#[derive(Clone, Default)]
pub struct Manual(Rc<RefCell<Vec<Req>>>);

impl Manual {
  /// Oldest pending fetch starting at `start` / 起始于 `start` 的最早待完成获取
  pub fn take(&self, start: usize) -> Req {
    let mut li = self.0.borrow_mut();
    let pos = li
      .iter()
      .position(|r| r.start == start)
      .unwrap_or_else(|| panic!("no pending fetch at {start}"));
    li.remove(pos)
  }

  pub fn len(&self) -> usize {
    self.0.borrow().len()
  }

  pub fn starts(&self) -> Vec<usize> {
    self.0.borrow().iter().map(|r| r.start).collect()
  }
}

impl DataSource for Manual {
  type Row = u32;
  type Sort = ();
  type Filter = ();
  type Error = String;

  async fn fetch(&self, start: usize, end: usize, _: &(), _: &()) -> Reply {
    let (tx, rx) = oneshot::channel();
    self.0.borrow_mut().push(Req { start, end, tx });
    rx.await.unwrap_or_else(|_| Err("canceled".into()))
  }
}

/// In-memory source of `total` rows, value = index
/// 含 `total` 行的内存数据源，值等于行号
pub struct Mem {
  pub total: usize,
  pub calls: Rc<RefCell<Vec<(usize, usize)>>>,
}

impl Mem {
  pub fn new(total: usize) -> Self {
    Self {
      total,
      calls: Rc::default(),
    }
  }
}

impl DataSource for Mem {
  type Row = u32;
  type Sort = ();
  type Filter = ();
  type Error = String;

  async fn fetch(&self, start: usize, end: usize, _: &(), _: &()) -> Reply {
    self.calls.borrow_mut().push((start, end));
    let li = rows(start.min(self.total), end.min(self.total));
    let last_row = (end >= self.total).then_some(self.total);
    Ok(Page { rows: li, last_row })
  }
}

/// Records the sort and filter it was asked with / 记录收到的排序和过滤
#[derive(Clone, Default)]
pub struct Probe(pub Rc<RefCell<Vec<(String, u8)>>>);

impl DataSource for Probe {
  type Row = u32;
  type Sort = String;
  type Filter = u8;
  type Error = String;

  async fn fetch(&self, start: usize, end: usize, sort: &String, filter: &u8) -> Reply {
    self.0.borrow_mut().push((sort.clone(), *filter));
    Ok(Page {
      rows: rows(start, end),
      last_row: None,
    })
  }
}
