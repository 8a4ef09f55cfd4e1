//! 统一错误类型定义.
//!
//! 所有 jing crate 共用的错误类型, 支持跨模块传播.
//!
//! 错误分级:
//! - `MalformedBitstream`: 当前 NAL 单元放弃解析, 码流继续
//! - `TruncatedUnit`: 当前帧消息剩余部分放弃, 下一条消息独立处理
//! - `UnknownFormat`: 未识别封装格式, 原样透传
//!
//! 以上情况均不会终止呈现协调器的生命周期.

use thiserror::Error;

/// jing 统一错误类型
#[derive(Debug, Error)]
pub enum JingError {
    /// 比特流损坏 (Exp-Golomb 越界, 裁剪参数非法等)
    #[error("比特流损坏: {0}")]
    MalformedBitstream(String),

    /// 长度前缀声明的长度超过剩余字节数
    #[error("NAL 单元截断: 声明长度 {declared}, 剩余 {remaining} 字节")]
    TruncatedUnit {
        /// 长度前缀声明的字节数
        declared: usize,
        /// 缓冲区中实际剩余的字节数
        remaining: usize,
    },

    /// 无法识别的封装格式
    #[error("无法识别的封装格式")]
    UnknownFormat,

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 解码引擎错误
    #[error("解码引擎错误: {0}")]
    Codec(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// jing 统一 Result 类型
pub type JingResult<T> = Result<T, JingError>;

impl JingError {
    /// 构造比特流损坏错误
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBitstream(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_unit_message() {
        let err = JingError::TruncatedUnit {
            declared: 10,
            remaining: 3,
        };
        let msg = format!("{err}");
        assert!(msg.contains("10"), "错误信息应包含声明长度, actual={msg}");
        assert!(msg.contains('3'), "错误信息应包含剩余长度, actual={msg}");
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: JingError = io.into();
        assert!(matches!(err, JingError::Io(_)));
    }
}
