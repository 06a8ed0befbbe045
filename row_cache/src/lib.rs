#![cfg_attr(docsrs, feature(doc_cfg))]

//! # row_cache - Windowed block cache
//! 窗口化块缓存
//!
//! A cache over a lazily fetched, dynamically sized row set. Rows are grouped
//! into fixed-size blocks, the unit of fetch and eviction.
//! 懒加载、动态大小行集上的缓存。行按定长块分组，块是获取与淘汰的单位。
//!
//! | Part            | Role                                         |
//! |-----------------|----------------------------------------------|
//! | [`BlockCache`]  | block map, size estimate, eviction / 块映射、大小估计、淘汰 |
//! | [`WindowedStore`] | adds `insert_at` / 增加 `insert_at`         |
//! | [`Gate`]        | shared bound on in-flight loads / 共享并发加载上限 |
//!
//! While the end is unknown the row count grows speculatively:
//! 末尾未知时行数推测增长：
//! `(block_id + 1) * block_size + overflow`.

mod block;
mod cache;
mod conf;
pub mod consts;
mod error;
mod event;
mod row;
mod source;
mod store;

pub use block::{BlockInfo, BlockState};
pub use cache::{BlockCache, RowOf};
pub use conf::Conf;
pub use error::{Error, Result};
pub use event::{Event, Listener, SubId};
pub use load_gate::{Gate, Pick};
pub use row::Row;
pub use source::{DataSource, Page};
pub use store::WindowedStore;
