//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“解析资源 → 读取尺寸 → 解码 → 发布”链路中的所有错误来源。
//! 错误在缓存边界被转换为终态 `LoadState::Failed`，永远不会让调用方崩溃。
//!
//! ## 实现思路
//!
//! - 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//! - 派生 `Clone`：同一 key 的多个观察者需要收到同一个失败结果。
//! - 单个条目超出整体预算（BudgetExceededOnSingleEntry）不属于错误：
//!   条目照常写入，仅记录告警并计数，见 `lru_store`。

/// 图片加载链路统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// 逻辑名无法解析为已打包的资源。
    #[error("资源不存在：{0}")]
    ResourceNotFound(String),

    /// 编解码失败或尺寸为零。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 无法识别的图片格式。
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    /// 请求参数非法（如目标宽高为 0）。
    #[error("请求参数错误：{0}")]
    InvalidRequest(String),

    /// 像素或内存超出配置上限。
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 解码耗时超出配置的上限。
    #[error("超时错误：{0}")]
    Timeout(String),

    /// 读取打包资源目录失败。
    #[error("文件错误：{0}")]
    FileSystem(String),

    /// 所属作用域已销毁。
    #[error("已取消：{0}")]
    Cancelled(String),
}

impl ImageError {
    /// 稳定的错误码，便于日志聚合与界面映射。
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceNotFound(_) => "resource_not_found",
            Self::Decode(_) => "decode",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Timeout(_) => "timeout",
            Self::FileSystem(_) => "file_system",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

impl From<ImageError> for String {
    fn from(error: ImageError) -> Self {
        error.to_string()
    }
}
