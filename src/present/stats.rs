//! 渲染吞吐统计.

use std::time::Instant;

/// 渲染吞吐统计
///
/// 第一张图像只启动计时; 之后每张图像计数加一, 吞吐为计数除以自首张图像起经过的秒数.
#[derive(Debug, Default)]
pub struct RenderStats {
    started: Option<Instant>,
    pictures: u64,
}

impl RenderStats {
    /// 创建统计
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次解码完成, 返回当前吞吐 (图像/秒); 首次调用或耗时为零时返回 `None`
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        let Some(started) = self.started else {
            self.started = Some(now);
            return None;
        };

        self.pictures += 1;
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(self.pictures as f64 / elapsed)
    }

    /// 首张图像之后统计到的图像数
    pub fn pictures(&self) -> u64 {
        self.pictures
    }
}
