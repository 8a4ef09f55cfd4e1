//! H.264/AVC 码流解析器.
//!
//! 提供对 H.264 Annex B 和长度前缀 (AVCC) 码流的解析能力:
//! - NAL 单元分割、类型识别与语义分类
//! - 封装格式自动识别 (每条码流只识别一次)
//! - SPS (Sequence Parameter Set) 解析
//! - Annex B ↔ 长度前缀格式转换

pub mod nal;
pub mod sps;
pub mod stream;

pub use nal::{NalUnit, NalUnitType, UnitClass, classify};
pub use sps::{ConstraintFlags, Ratio, Sps, parse_sps};
pub use stream::{
    FormatDetector, NormalizedFrame, StreamFormat, detect_format, normalize, scan, scan_partial,
    split_annex_b, split_length_prefixed, to_annex_b, to_length_prefixed,
};
