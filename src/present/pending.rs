//! 待呈现图像槽.
//!
//! 任意时刻最多保留一张图像, 新图像到达时旧图像立即释放, 不排队.

/// 待呈现图像槽
#[derive(Debug)]
pub struct PendingPicture<P> {
    slot: Option<P>,
    dropped: u64,
}

impl<P> PendingPicture<P> {
    /// 创建空槽
    pub fn new() -> Self {
        Self {
            slot: None,
            dropped: 0,
        }
    }

    /// 放入新图像, 返回是否替换 (并释放) 了尚未呈现的旧图像
    pub fn install(&mut self, picture: P) -> bool {
        match self.slot.replace(picture) {
            Some(old) => {
                drop(old);
                self.dropped += 1;
                true
            }
            None => false,
        }
    }

    /// 取出待呈现图像
    pub fn take(&mut self) -> Option<P> {
        self.slot.take()
    }

    /// 释放待呈现图像 (不计入丢帧)
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// 是否有图像待呈现
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// 被新图像替换而未呈现的图像数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<P> Default for PendingPicture<P> {
    fn default() -> Self {
        Self::new()
    }
}
