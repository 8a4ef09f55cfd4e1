//! 文件回放源: 把 Annex B 裸流切分为逐帧消息.
//!
//! 录制端通常每张图像发布一条消息: 参数集/SEI 等非 VCL 单元与其后的切片同属一条.

use jing_codec::parsers::h264::{
    NalUnit, StreamFormat, detect_format, split_annex_b, to_annex_b, to_length_prefixed,
};
use jing_core::{JingError, JingResult};

/// 按访问单元切分 Annex B 裸流, 每个访问单元重新编码为一条 Annex B 消息
///
/// 新访问单元从以下位置开始:
/// - 切片之后出现的非 VCL 单元 (AUD/SPS/PPS/SEI 等)
/// - `first_mb_in_slice == 0` 的切片 (新图像的第一个切片)
pub fn split_access_units(data: &[u8]) -> JingResult<Vec<Vec<u8>>> {
    if detect_format(data, 1) != StreamFormat::AnnexB {
        return Err(JingError::UnknownFormat);
    }

    let mut messages = Vec::new();
    let mut current: Vec<NalUnit<'_>> = Vec::new();
    let mut has_slice = false;

    for unit in split_annex_b(data) {
        let starts_new = if unit.nal_type.is_vcl() {
            has_slice && first_mb_in_slice(&unit) == Some(0)
        } else {
            has_slice
        };
        if starts_new {
            messages.push(to_annex_b(&current));
            current.clear();
            has_slice = false;
        }
        has_slice |= unit.nal_type.is_vcl();
        current.push(unit);
    }
    if !current.is_empty() {
        messages.push(to_annex_b(&current));
    }
    Ok(messages)
}

/// 将 Annex B 消息改写为长度前缀格式
pub fn repackage_length_prefixed(
    messages: Vec<Vec<u8>>,
    box_size: usize,
) -> JingResult<Vec<Vec<u8>>> {
    messages
        .iter()
        .map(|msg| to_length_prefixed(&split_annex_b(msg), box_size))
        .collect()
}

/// 切片头部的第一个字段
fn first_mb_in_slice(unit: &NalUnit<'_>) -> Option<u32> {
    unit.rbsp_reader().read_exp_golomb_unsigned().ok()
}
