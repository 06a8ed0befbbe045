//! External data source / 外部数据源

use std::{fmt::Display, future::Future};

/// Rows fetched for one block / 为一个块获取的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<R> {
  pub rows: Vec<R>,
  /// Total row count when the source knows the end
  /// 数据源已知末尾时的总行数
  pub last_row: Option<usize>,
}

/// Performs the I/O behind a cache / 缓存背后执行 I/O 的数据源
///
/// Sort and filter are opaque to the cache and passed through unchanged.
/// 排序与过滤对缓存不透明，原样传递。
pub trait DataSource: 'static {
  type Row: 'static;
  type Sort: Clone + 'static;
  type Filter: Clone + 'static;
  type Error: Display + 'static;

  /// Fetch rows `[start, end)` / 获取 `[start, end)` 行
  fn fetch(
    &self,
    start: usize,
    end: usize,
    sort: &Self::Sort,
    filter: &Self::Filter,
  ) -> impl Future<Output = Result<Page<Self::Row>, Self::Error>>;
}
