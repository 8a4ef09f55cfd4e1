//! # Jing (镜)
//!
//! H.264 裸流接入与按刷新率节拍的画面呈现.
//!
//! - **码流解析**: Annex B / 长度前缀封装识别与转换, NAL 单元分类
//! - **参数探测**: Exp-Golomb 比特流读取, SPS 解析, 编解码器描述串
//! - **呈现协调**: 解码引擎配置与提交, 最多一张待呈现图像, 状态合并
//!
//! # 快速开始
//!
//! ```rust
//! use jing::codec::parsers::h264::{FormatDetector, StreamFormat};
//!
//! let mut detector = FormatDetector::default();
//! let frame = [0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84];
//! assert_eq!(detector.detect(&frame), StreamFormat::AnnexB);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `jing-core` | 错误类型与比特流读取 |
//! | `jing-codec` | H.264 解析与解码引擎接口 |

/// 错误类型与比特流读取
pub use jing_core as core;

/// H.264 解析与解码引擎接口
pub use jing_codec as codec;

pub mod present;

/// 获取 Jing 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
