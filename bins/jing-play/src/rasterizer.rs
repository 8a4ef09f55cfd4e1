//! 日志 rasterizer: 不绘制像素, 只记录呈现序列.

use jing::present::Rasterizer;
use jing_codec::VideoPicture;
use log::{debug, info};

/// 每隔多少张图像输出一次 info 日志
const REPORT_INTERVAL: u64 = 100;

/// 记录呈现情况的 rasterizer
#[derive(Debug, Default)]
pub struct LoggingRasterizer {
    drawn: u64,
    skipped: u64,
    last_sequence_id: Option<u64>,
}

impl LoggingRasterizer {
    /// 创建 rasterizer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rasterizer<VideoPicture> for LoggingRasterizer {
    fn draw(&mut self, picture: &VideoPicture) {
        if let Some(last) = self.last_sequence_id {
            // 序号间隔即两次刷新之间被替换掉的图像
            self.skipped += picture.sequence_id.saturating_sub(last + 1);
        }
        self.last_sequence_id = Some(picture.sequence_id);
        self.drawn += 1;

        debug!(
            "呈现 #{} {}x{}{}",
            picture.sequence_id,
            picture.width,
            picture.height,
            if picture.is_keyframe { " (key)" } else { "" }
        );
        if self.drawn % REPORT_INTERVAL == 0 {
            info!("已呈现 {} 张图像, 跳过 {} 张", self.drawn, self.skipped);
        }
    }
}

impl Drop for LoggingRasterizer {
    fn drop(&mut self) {
        info!("呈现结束: 共 {} 张, 跳过 {} 张", self.drawn, self.skipped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_skipped_sequence_ids() {
        let mut rasterizer = LoggingRasterizer::new();
        for id in [0, 1, 4, 5] {
            rasterizer.draw(&VideoPicture::filled(16, 16, 0, id));
        }
        assert_eq!(rasterizer.drawn, 4);
        assert_eq!(rasterizer.skipped, 2);
    }
}
