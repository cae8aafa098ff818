//! # 加载状态与可观察句柄
//!
//! ## 设计思路
//!
//! 每个请求返回一个 `ImageHandle`，内部是 `tokio::sync::watch` 接收端：
//! - UI 每次重绘读取最新值（`state` / `bitmap`），无需轮询协议
//! - 需要响应式刷新的调用方 `await` `changed()`
//!
//! 状态机：`Pending -> Ready` 或 `Pending -> Failed`，终态之后不再变化。
//! 同一 key 的并发请求共享同一个发送端，因此观察到的是同一个终态位图。

use tokio::sync::watch;

use super::{Bitmap, ImageError, ImageKey};

/// 单个请求的加载状态。
#[derive(Debug, Clone)]
pub enum LoadState {
    /// 尚无解码结果，显示占位图。
    Pending { placeholder: Bitmap },
    /// 解码完成。
    Ready(Bitmap),
    /// 解码失败，回退到占位图。
    Failed { error: ImageError, placeholder: Bitmap },
}

impl LoadState {
    /// 当前应绘制的位图。
    pub fn bitmap(&self) -> &Bitmap {
        match self {
            Self::Pending { placeholder } => placeholder,
            Self::Ready(bitmap) => bitmap,
            Self::Failed { placeholder, .. } => placeholder,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// 真实图片是否已就绪（用于淡入等效果）。
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn error(&self) -> Option<&ImageError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// 请求句柄：可观察的加载状态。
#[derive(Debug, Clone)]
pub struct ImageHandle {
    key: ImageKey,
    receiver: watch::Receiver<LoadState>,
}

impl ImageHandle {
    pub(crate) fn new(key: ImageKey, receiver: watch::Receiver<LoadState>) -> Self {
        Self { key, receiver }
    }

    /// 直接以给定状态创建（同步命中、立即失败等场景）。
    pub(crate) fn resolved(key: ImageKey, state: LoadState) -> Self {
        let (_sender, receiver) = watch::channel(state);
        Self::new(key, receiver)
    }

    pub fn key(&self) -> &ImageKey {
        &self.key
    }

    /// 最新状态的快照。
    pub fn state(&self) -> LoadState {
        self.receiver.borrow().clone()
    }

    /// 当前应绘制的位图。
    pub fn bitmap(&self) -> Bitmap {
        self.receiver.borrow().bitmap().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.receiver.borrow().is_loaded()
    }

    pub fn is_terminal(&self) -> bool {
        self.receiver.borrow().is_terminal()
    }

    /// 等待下一次状态变化。
    ///
    /// 返回 `false` 表示发布端已经被丢弃（作用域销毁），之后不会再有变化。
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// 等待终态；若发布端在终态前被丢弃，返回当时的最新状态。
    pub async fn wait_terminal(&mut self) -> LoadState {
        loop {
            let current = self.receiver.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if self.receiver.changed().await.is_err() {
                return self.receiver.borrow().clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_cache::default_placeholder;

    #[test]
    fn pending_shows_placeholder() {
        let placeholder = default_placeholder();
        let state = LoadState::Pending {
            placeholder: placeholder.clone(),
        };
        assert!(state.bitmap().ptr_eq(&placeholder));
        assert!(!state.is_terminal());
        assert!(!state.is_loaded());
    }

    #[test]
    fn failed_falls_back_to_placeholder() {
        let placeholder = default_placeholder();
        let state = LoadState::Failed {
            error: ImageError::Decode("broken".to_string()),
            placeholder: placeholder.clone(),
        };
        assert!(state.is_terminal());
        assert!(!state.is_loaded());
        assert!(state.bitmap().ptr_eq(&placeholder));
        assert_eq!(state.error(), Some(&ImageError::Decode("broken".to_string())));
    }

    #[tokio::test]
    async fn handle_observes_single_transition() {
        let placeholder = default_placeholder();
        let (sender, receiver) = watch::channel(LoadState::Pending {
            placeholder: placeholder.clone(),
        });
        let mut handle = ImageHandle::new(ImageKey::from("pug"), receiver);
        let mut other = handle.clone();

        let ready = Bitmap::solid(4, 4, [1, 1, 1, 255]);
        sender.send_replace(LoadState::Ready(ready.clone()));

        assert!(handle.changed().await);
        assert!(handle.is_loaded());
        assert!(handle.bitmap().ptr_eq(&ready));

        let terminal = other.wait_terminal().await;
        assert!(terminal.bitmap().ptr_eq(&ready));
    }

    #[tokio::test]
    async fn wait_terminal_returns_pending_when_publisher_dropped() {
        let (sender, receiver) = watch::channel(LoadState::Pending {
            placeholder: default_placeholder(),
        });
        let mut handle = ImageHandle::new(ImageKey::from("pug"), receiver);
        drop(sender);

        let state = handle.wait_terminal().await;
        assert!(!state.is_terminal());
        assert!(!handle.changed().await);
    }

    #[test]
    fn resolved_handle_is_immediately_readable() {
        let ready = Bitmap::solid(2, 2, [0, 0, 0, 255]);
        let handle = ImageHandle::resolved(ImageKey::from("pug"), LoadState::Ready(ready.clone()));
        assert!(handle.is_loaded());
        assert!(handle.bitmap().ptr_eq(&ready));
    }
}
