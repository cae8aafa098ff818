//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 图片链路内部使用 `ImageError`，在缓存边界转换为 `LoadState::Failed`。
//! 目录加载、数据清单解析与演示程序等外围流程统一返回 `AppError`，
//! 替代分散的 `.map_err(|e| e.to_string())` 与 `expect()`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::image_cache::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片加载链路错误（资源 / 解码 / 配置）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据清单解析失败
    #[error("数据清单错误: {0}")]
    Catalog(String),

    /// 命令行参数错误
    #[error("参数错误: {0}")]
    Usage(String),
}
