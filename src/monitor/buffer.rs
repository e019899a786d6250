//! 有界环形缓冲区
//!
//! 最新的元素位于下标 0，超出容量时从尾部淘汰最旧的元素。
//! 请求日志与健康检查样本共用这一实现。

use std::collections::VecDeque;

use parking_lot::RwLock;

/// 按插入顺序保存最近 N 个元素（最新在前）
pub struct RecentBuffer<T> {
    capacity: usize,
    items: RwLock<VecDeque<T>>,
}

impl<T: Clone> RecentBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 插入到最前端，超出容量时淘汰最旧的元素
    pub fn push(&self, item: T) {
        let mut items = self.items.write();
        items.push_front(item);
        while items.len() > self.capacity {
            items.pop_back();
        }
    }

    /// 返回最近 `limit` 个元素的拷贝（最新在前）
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let items = self.items.read();
        items.iter().take(limit).cloned().collect()
    }

    /// 在整个缓冲区中按顺序筛选，最多返回 `limit` 个
    pub fn filter<F>(&self, limit: usize, mut predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let items = self.items.read();
        items
            .iter()
            .filter(|item| predicate(item))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }
}
