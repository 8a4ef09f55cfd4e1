//! 解码后的图像.

/// 视频图像
///
/// 包含解码后的 YUV420P 像素数据, 3 个平面: Y, U, V.
#[derive(Debug, Clone)]
pub struct VideoPicture {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数 (linesize / stride)
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 对应编码分块的提交序号
    pub sequence_id: u64,
    /// 是否由关键帧分块解码而来
    pub is_keyframe: bool,
}

impl VideoPicture {
    /// 创建填充为单一灰度的图像 (色度平面取中值)
    pub fn filled(width: u32, height: u32, luma: u8, sequence_id: u64) -> Self {
        let w = width as usize;
        let h = height as usize;
        let cw = w.div_ceil(2);
        let ch = h.div_ceil(2);
        Self {
            data: vec![vec![luma; w * h], vec![0x80; cw * ch], vec![0x80; cw * ch]],
            linesize: vec![w, cw, cw],
            width,
            height,
            sequence_id,
            is_keyframe: false,
        }
    }

    /// 所有平面的总字节数
    pub fn byte_size(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }
}
