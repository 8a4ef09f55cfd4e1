//! 解码引擎接口定义.
//!
//! 解码引擎被视为不透明的异步服务: 接受一次配置和一串编码分块,
//! 解码结果 (图像或错误) 通过回调异步送回, 与提交节奏无关.

use bytes::Bytes;
use jing_core::JingResult;

use crate::parsers::h264::Sps;

/// 解码引擎配置
///
/// 由第一个成功解析的 SPS 推导, 在码流生命周期内不可变.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 编解码器描述串, 如 `avc1.42C01E`
    pub codec: String,
    /// 宽度 (像素, 已裁剪)
    pub coded_width: u32,
    /// 高度 (像素, 已裁剪)
    pub coded_height: u32,
}

impl DecoderConfig {
    /// 从 SPS 推导配置
    pub fn from_sps(sps: &Sps) -> Self {
        Self {
            codec: sps.codec_descriptor(),
            coded_width: sps.width,
            coded_height: sps.height,
        }
    }
}

impl std::fmt::Display for DecoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}x{}",
            self.codec, self.coded_width, self.coded_height
        )
    }
}

/// 编码分块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// 含 IDR 切片, 解码器可从此处开始
    Key,
    /// 依赖先前图像的分块
    Delta,
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// 提交给解码引擎的一块 Annex B 数据
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// 关键帧 / 非关键帧
    pub kind: ChunkKind,
    /// Annex B 形式的编码数据
    pub data: Bytes,
    /// 本地递增的提交序号 (与码流内时间戳无关)
    pub sequence_id: u64,
}

impl EncodedChunk {
    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为关键帧分块
    pub fn is_key(&self) -> bool {
        self.kind == ChunkKind::Key
    }
}

/// 解码引擎 trait
///
/// 使用流程:
/// 1. 调用 `configure()` 提供由 SPS 推导的配置, 失败时可以在下一个 SPS 重试
/// 2. 调用 `submit()` 提交编码分块, 立即返回, 不等待解码完成
/// 3. 解码结果由引擎通过其自身的回调通道异步送出
/// 4. 调用 `close()` 释放引擎, 不等待仍在进行的解码
pub trait DecodeEngine {
    /// 解码输出的图像类型, drop 即释放其资源
    type Picture;

    /// 配置引擎
    fn configure(&mut self, config: &DecoderConfig) -> JingResult<()>;

    /// 提交一个编码分块 (fire-and-forget)
    fn submit(&mut self, chunk: EncodedChunk) -> JingResult<()>;

    /// 关闭引擎
    ///
    /// 默认实现为空操作.
    fn close(&mut self) {}
}
