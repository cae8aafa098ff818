//! # 图库图片缓存 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              显示组件（列表页 / 详情页）                 │
//! │                                                          │
//! │   request(key, w, h) ──→ ImageHandle (watch 观察)        │
//! │          ↑ 每帧 pump()        ↓ Pending/Ready/Failed     │
//! └──────────┼───────────────────────────────────────────────┘
//!            ↕ 构造注入（作用域持有 ImageCache）
//! ┌──────────┼───────────────────────────────────────────────┐
//! │          ↕             缓存核心 (Rust)                   │
//! │                                                          │
//! │  ┌─ image_cache ── ImageCache（UI 上下文，&mut self）     │
//! │  │   ├─ lru_store  按字节预算的 LRU                      │
//! │  │   ├─ worker     spawn_blocking + timeout → mpsc       │
//! │  │   ├─ decoder    header 尺寸 → 采样因子 → 解码         │
//! │  │   └─ resources  打包资源（逻辑名 → ResourceId）       │
//! │  │                                                       │
//! │  ├─ catalog ────── 只读 JSON 数据清单                     │
//! │  └─ error ──────── AppError（外围流程统一错误）           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，用于清单加载与演示程序 |
//! | [`image_cache`] | 两阶段解码、按字节预算的 LRU、在途去重、作用域销毁 |
//! | [`catalog`] | 打包数据清单的只读访问 |

pub mod catalog;
pub mod error;
pub mod image_cache;
