#![cfg_attr(docsrs, feature(doc_cfg))]

//! # load_gate - Shared load admission gate
//! 共享加载准入闸门
//!
//! Bounds how many blocks are loading at once across every cache that holds
//! the same [`Gate`]. The bound is aggregate, not per cache.
//! 限制持有同一 [`Gate`] 的所有缓存中同时加载的块数。上限是总量，而非每个缓存。
//!
//! Single-threaded: share as `Rc<Gate>` inside one runtime thread.
//! 单线程：在同一运行时线程内以 `Rc<Gate>` 共享。

mod gate;
mod pick;

pub use gate::{DEFAULT_MAX_CONCURRENT, Gate, Key};
pub use pick::Pick;

/// Something the gate can start loading
/// 闸门可以启动加载的对象
pub trait Loadable {
  /// Waiting for a load / 等待加载
  fn is_dirty(&self) -> bool;

  /// Start loading, false if nothing was started
  /// 开始加载，未启动返回 false
  ///
  /// The gate counts the load before calling this, and each started load
  /// must later report back through [`Gate::done`] exactly once.
  /// 闸门在调用前计数，每个已启动的加载之后必须恰好调用一次 [`Gate::done`]。
  fn start(&self) -> bool;
}
