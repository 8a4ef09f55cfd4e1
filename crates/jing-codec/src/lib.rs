//! # jing-codec
//!
//! Jing H.264 码流处理库, 提供码流解析与解码引擎抽象.
//!
//! - `parsers::h264`: NAL 单元扫描、封装格式识别与转换、SPS 解析、单元分类
//! - `decoder`: 解码引擎配置、编码分块与 `DecodeEngine` trait
//! - `frame`: 解码后的图像
//!
//! ## 使用示例
//!
//! ```rust
//! use jing_codec::parsers::h264::{StreamFormat, UnitClass, scan};
//!
//! let data = [0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84];
//! let units = scan(&data, StreamFormat::AnnexB).unwrap();
//! assert_eq!(units.len(), 1);
//! assert_eq!(units[0].class(), UnitClass::KeyFrameSlice);
//! ```

pub mod decoder;
pub mod frame;
pub mod parsers;

// 重导出常用类型
pub use decoder::{ChunkKind, DecodeEngine, DecoderConfig, EncodedChunk};
pub use frame::VideoPicture;
pub use parsers::h264::{NalUnit, NalUnitType, Sps, StreamFormat, UnitClass};
