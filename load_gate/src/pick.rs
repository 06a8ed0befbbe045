//! Block selection policy / 块选择策略

use std::rc::Rc;

use crate::Loadable;

/// Which dirty block a tick starts
/// 每次 tick 启动哪个脏块
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pick {
  /// Forward scan keeps overwriting its candidate, the last dirty block in
  /// registration order wins. Changing this alters observable load order.
  /// 正向扫描不断覆盖候选，按注册顺序最后一个脏块胜出。修改会改变可观察的加载顺序。
  #[default]
  LastDirtyWins,
  /// First dirty block in registration order / 按注册顺序第一个脏块
  FirstDirty,
}

impl Pick {
  /// Select from registered items / 从已注册项中选择
  pub fn select<'a, I>(self, li: I) -> Option<&'a Rc<dyn Loadable>>
  where
    I: IntoIterator<Item = &'a Rc<dyn Loadable>>,
  {
    let mut iter = li.into_iter().filter(|i| i.is_dirty());
    match self {
      Self::LastDirtyWins => iter.last(),
      Self::FirstDirty => iter.next(),
    }
  }
}
