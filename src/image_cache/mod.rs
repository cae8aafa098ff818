//! # 图片缓存模块（image_cache）
//!
//! ## 设计思路
//!
//! 该模块将“资源解析 → 两阶段解码 → 按字节预算缓存 → 发布给显示组件”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `cache`：作用域级缓存，编排请求、去重、发布与淘汰
//! - `worker`：后台解码任务与结果回传
//! - `decoder`：采样因子计算与两阶段解码
//! - `lru_store`：按字节计量的 LRU 存储
//! - `state`：加载状态与可观察句柄
//! - `resources/pipeline`：打包资源与编解码细节
//! - `config/error/source`：配置、错误、键与位图模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 显示组件 request(key, w, h)
//!    ↓
//! cache.rs（命中？→ 同步 Ready）
//!    ↓ 未命中
//! worker.rs（spawn_blocking + timeout）
//!    ├─ resources.rs（逻辑名 → ResourceId）
//!    └─ decoder.rs（header 尺寸 → 采样因子 → pipeline 解码）
//!    ↓ mpsc
//! cache.rs pump()（写入 lru_store、淘汰、watch 发布终态）
//!    ↓
//! ImageHandle（Pending → Ready / Failed）
//! ```

mod cache;
mod config;
mod decoder;
mod error;
mod lru_store;
mod pipeline;
mod resources;
mod source;
mod state;
mod worker;

pub use cache::{CacheStats, ImageCache};
pub use config::{CacheConfig, DEFAULT_MAX_MEMORY_BYTES, MEMORY_FRACTION, RGBA_BYTES_PER_PIXEL};
pub use decoder::{Decoder, calculate_sample_size};
pub use error::ImageError;
pub use lru_store::{CacheEntry, InsertOutcome, LruStore};
pub use resources::{BundledResources, ResourceStore};
pub use source::{Bitmap, ImageKey, ResourceId, default_placeholder};
pub use state::{ImageHandle, LoadState};
