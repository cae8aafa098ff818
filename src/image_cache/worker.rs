//! # 后台解码任务
//!
//! ## 设计思路
//!
//! 解码是整条链路里唯一会阻塞的操作，必须在 UI 上下文之外执行：
//! - 解析资源与解码放进 `spawn_blocking`
//! - 用 `tokio::time::timeout` 约束单次解码耗时
//! - 结果通过 mpsc 交回 UI 上下文，工作线程从不直接修改存储
//!
//! 接收端被丢弃（作用域销毁）时，结果被静默丢弃，不报错也不重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{Bitmap, Decoder, ImageError, ImageKey, ResourceStore};

/// 一次解码请求。
#[derive(Debug, Clone)]
pub(crate) struct DecodeJob {
    pub(crate) key: ImageKey,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// 解码完成后交回 UI 上下文的结果。
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) key: ImageKey,
    pub(crate) result: Result<Bitmap, ImageError>,
    pub(crate) elapsed: Duration,
}

/// 工作线程共享的只读上下文。
pub(crate) struct WorkerContext {
    runtime: Handle,
    resources: Arc<dyn ResourceStore>,
    decoder: Decoder,
    timeout: Duration,
    completions: mpsc::UnboundedSender<Completion>,
}

impl WorkerContext {
    pub(crate) fn new(
        runtime: Handle,
        resources: Arc<dyn ResourceStore>,
        decoder: Decoder,
        timeout: Duration,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            runtime,
            resources,
            decoder,
            timeout,
            completions,
        }
    }

    /// 在后台调度一次解码。
    pub(crate) fn spawn_decode(&self, job: DecodeJob) {
        let resources = Arc::clone(&self.resources);
        let decoder = self.decoder.clone();
        let timeout = self.timeout;
        let completions = self.completions.clone();

        self.runtime.spawn(async move {
            let started = Instant::now();
            let key = job.key.clone();

            let blocking = tokio::task::spawn_blocking(move || run_decode_job(resources.as_ref(), &decoder, &job));

            let result = match tokio::time::timeout(timeout, blocking).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(ImageError::Decode(format!("解码任务异常终止：{}", join_err))),
                Err(_) => Err(ImageError::Timeout(format!(
                    "{} 解码超过 {}ms",
                    key,
                    timeout.as_millis()
                ))),
            };

            let completion = Completion {
                key,
                result,
                elapsed: started.elapsed(),
            };

            if let Err(err) = completions.send(completion) {
                log::debug!("🗑️ 作用域已销毁，丢弃解码结果 - key: {}", err.0.key);
            }
        });
    }
}

/// 解析资源并解码（阻塞）。
fn run_decode_job(
    resources: &dyn ResourceStore,
    decoder: &Decoder,
    job: &DecodeJob,
) -> Result<Bitmap, ImageError> {
    let resolve_start = Instant::now();
    let id = resources.resolve_resource_id(job.key.as_str())?;
    let resolve_elapsed = resolve_start.elapsed();

    let decode_start = Instant::now();
    let bitmap = decoder.decode(resources, id, job.width, job.height)?;
    let decode_elapsed = decode_start.elapsed();

    log::info!(
        "✅ 图片解码完成 - key: {} ({}) 输出: {}x{} resolve={}ms decode={}ms",
        job.key,
        id,
        bitmap.width(),
        bitmap.height(),
        resolve_elapsed.as_millis(),
        decode_elapsed.as_millis()
    );

    Ok(bitmap)
}
