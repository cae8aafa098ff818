//! # 按字节计量的 LRU 存储
//!
//! ## 设计思路
//!
//! `lru::LruCache` 只按条目数量限制容量，这里改用无界实例，
//! 自己维护 `current_bytes`，按字节预算淘汰最久未使用的条目。
//!
//! ## 实现思路
//!
//! - 条目大小在写入时按位图实际像素字节数计算一次，之后不再重新测量。
//! - 写入后若超出预算，从最久未使用一端逐个淘汰，但永远不淘汰刚写入的条目。
//! - 单个条目本身就超出预算时照常写入并标记 `oversized`，其余条目全部被清空。
//!
//! 存储只在 UI 上下文中通过 `&mut self` 修改，因此不需要锁。

use lru::LruCache;

use super::{Bitmap, ImageKey};

/// 缓存条目：位图与写入时计算的大小。
#[derive(Debug, Clone)]
pub struct CacheEntry {
    bitmap: Bitmap,
    size_bytes: u64,
}

impl CacheEntry {
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// 一次写入的结果。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// 按淘汰先后顺序排列的键。
    pub evicted: Vec<ImageKey>,
    /// 该条目单独就超出了整体预算。
    pub oversized: bool,
}

pub struct LruStore {
    entries: LruCache<ImageKey, CacheEntry>,
    capacity_bytes: u64,
    current_bytes: u64,
}

impl LruStore {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity_bytes,
            current_bytes: 0,
        }
    }

    /// 条目大小：解码后位图的实际字节数。
    pub fn size_of(bitmap: &Bitmap) -> u64 {
        bitmap.byte_count()
    }

    /// 读取并刷新最近使用顺序。
    pub fn get(&mut self, key: &ImageKey) -> Option<Bitmap> {
        self.entries.get(key).map(|entry| entry.bitmap.clone())
    }

    /// 读取但不刷新最近使用顺序。
    pub fn peek(&self, key: &ImageKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &ImageKey) -> bool {
        self.entries.contains(key)
    }

    /// 写入条目，并按字节预算淘汰最久未使用的其他条目。
    pub fn insert(&mut self, key: ImageKey, bitmap: Bitmap) -> InsertOutcome {
        let size_bytes = Self::size_of(&bitmap);

        if let Some(previous) = self.entries.pop(&key) {
            self.current_bytes = self.current_bytes.saturating_sub(previous.size_bytes);
        }

        self.entries.push(key.clone(), CacheEntry { bitmap, size_bytes });
        self.current_bytes += size_bytes;

        let mut outcome = InsertOutcome {
            evicted: Vec::new(),
            oversized: size_bytes > self.capacity_bytes,
        };

        if outcome.oversized {
            log::warn!(
                "⚠️ 单个条目超出缓存预算（BudgetExceededOnSingleEntry）- key: {} 大小: {}KB 预算: {}KB",
                key,
                size_bytes / 1024,
                self.capacity_bytes / 1024
            );
        }

        // 刚写入的条目位于最近使用端，len > 1 时弹出的一定是其他条目
        while self.current_bytes > self.capacity_bytes && self.entries.len() > 1 {
            let Some((evicted_key, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.current_bytes = self.current_bytes.saturating_sub(evicted.size_bytes);
            log::debug!(
                "🧹 淘汰缓存条目 - key: {} 释放: {}KB 当前: {}KB",
                evicted_key,
                evicted.size_bytes / 1024,
                self.current_bytes / 1024
            );
            outcome.evicted.push(evicted_key);
        }

        outcome
    }

    pub fn remove(&mut self, key: &ImageKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_bytes(&self) -> u64 {
        self.current_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// 从最久未使用到最近使用排列的键。
    pub fn keys_lru_order(&self) -> Vec<ImageKey> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(name: &str) -> ImageKey {
        ImageKey::from(name)
    }

    /// 10x10 RGBA = 400 字节
    fn bitmap_400() -> Bitmap {
        Bitmap::solid(10, 10, [9, 9, 9, 255])
    }

    #[test]
    fn size_is_computed_from_dimensions() {
        let mut store = LruStore::new(10_000);
        store.insert(key("a"), Bitmap::solid(12, 7, [0, 0, 0, 0]));
        let entry = store.peek(&key("a")).expect("entry should exist");
        assert_eq!(entry.size_bytes(), 12 * 7 * 4);
        assert_eq!(entry.size_bytes(), entry.bitmap().pixels().len() as u64);
        assert_eq!(store.current_bytes(), 12 * 7 * 4);
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let mut store = LruStore::new(1_200);
        store.insert(key("a"), bitmap_400());
        store.insert(key("b"), bitmap_400());
        store.insert(key("c"), bitmap_400());

        // 访问 a，使 b 成为最久未使用
        assert!(store.get(&key("a")).is_some());

        let outcome = store.insert(key("d"), bitmap_400());
        assert_eq!(outcome.evicted, vec![key("b")]);
        assert!(!outcome.oversized);
        assert_eq!(store.keys_lru_order(), vec![key("c"), key("a"), key("d")]);
        assert_eq!(store.current_bytes(), 1_200);
    }

    #[test]
    fn peek_does_not_bump_recency() {
        let mut store = LruStore::new(800);
        store.insert(key("a"), bitmap_400());
        store.insert(key("b"), bitmap_400());
        assert!(store.peek(&key("a")).is_some());

        let outcome = store.insert(key("c"), bitmap_400());
        assert_eq!(outcome.evicted, vec![key("a")]);
    }

    #[test]
    fn oversized_entry_is_kept_and_clears_everything_else() {
        let mut store = LruStore::new(1_000);
        store.insert(key("a"), bitmap_400());
        store.insert(key("b"), bitmap_400());

        let outcome = store.insert(key("huge"), Bitmap::solid(20, 20, [0, 0, 0, 0]));
        assert!(outcome.oversized);
        assert_eq!(outcome.evicted, vec![key("a"), key("b")]);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&key("huge")));
        assert_eq!(store.current_bytes(), 1_600);
    }

    #[test]
    fn reinserting_same_key_replaces_accounting() {
        let mut store = LruStore::new(10_000);
        store.insert(key("a"), bitmap_400());
        store.insert(key("a"), Bitmap::solid(5, 5, [0, 0, 0, 0]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_bytes(), 100);
    }

    #[test]
    fn remove_and_clear_release_bytes() {
        let mut store = LruStore::new(10_000);
        store.insert(key("a"), bitmap_400());
        store.insert(key("b"), bitmap_400());

        assert!(store.remove(&key("a")).is_some());
        assert!(store.remove(&key("a")).is_none());
        assert_eq!(store.current_bytes(), 400);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.current_bytes(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u32, u32),
        Get(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0u8..8, 1u32..40, 1u32..40).prop_map(|(k, w, h)| Op::Insert(k, w, h)),
            1 => (0u8..8).prop_map(Op::Get),
        ]
    }

    proptest! {
        #[test]
        fn byte_accounting_matches_lru_model(
            capacity in 1u64..12_000,
            ops in prop::collection::vec(op_strategy(), 1..60),
        ) {
            let mut store = LruStore::new(capacity);
            // 模型：从最久未使用到最近使用
            let mut model: Vec<(ImageKey, u64)> = Vec::new();

            for op in ops {
                match op {
                    Op::Get(k) => {
                        let k = key(&k.to_string());
                        let hit = store.get(&k).is_some();
                        let pos = model.iter().position(|(m, _)| *m == k);
                        prop_assert_eq!(hit, pos.is_some());
                        if let Some(pos) = pos {
                            let item = model.remove(pos);
                            model.push(item);
                        }
                    }
                    Op::Insert(k, w, h) => {
                        let k = key(&k.to_string());
                        let size = u64::from(w) * u64::from(h) * 4;
                        model.retain(|(m, _)| *m != k);
                        model.push((k.clone(), size));

                        let mut expected_evicted = Vec::new();
                        while model.iter().map(|(_, s)| s).sum::<u64>() > capacity && model.len() > 1 {
                            expected_evicted.push(model.remove(0).0);
                        }

                        let outcome = store.insert(k, Bitmap::solid(w, h, [0, 0, 0, 0]));
                        prop_assert_eq!(outcome.evicted, expected_evicted);
                        prop_assert_eq!(outcome.oversized, size > capacity);

                        let total: u64 = model.iter().map(|(_, s)| s).sum();
                        prop_assert!(total <= capacity || model.len() == 1);
                    }
                }

                let total: u64 = model.iter().map(|(_, s)| s).sum();
                prop_assert_eq!(store.current_bytes(), total);
                let expected_order: Vec<ImageKey> = model.iter().map(|(k, _)| k.clone()).collect();
                prop_assert_eq!(store.keys_lru_order(), expected_order);
            }
        }
    }
}
