//! # jing-core
//!
//! jing 核心库, 提供统一错误类型与比特流读取器.
//!
//! 上层的 H.264 解析器 (`jing-codec`) 与呈现协调器 (`jing`) 均依赖本 crate.

pub mod bitreader;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use error::{JingError, JingResult};
