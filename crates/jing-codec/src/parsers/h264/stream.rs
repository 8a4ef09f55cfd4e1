//! H.264 码流封装格式: 分割, 自动识别与转换.
//!
//! # Annex B 格式
//!
//! Annex B 使用起始码 (start code) 分隔 NAL 单元:
//! - 3 字节起始码: `00 00 01`
//! - 4 字节起始码: `00 00 00 01`
//!
//! # 长度前缀格式 (AVCC)
//!
//! 每个 NAL 单元前带 `box_size` 字节的大端长度 (`box_size` 取 1~4, 常见为 4):
//! ```text
//! [length: box_size bytes BE] [NAL data: length bytes]
//! ```
//!
//! 解码引擎只接受 Annex B, 长度前缀输入需先经 [`normalize`] 改写.

use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder};
use jing_core::{JingError, JingResult};
use log::{debug, trace, warn};

use super::nal::NalUnit;

/// Annex B 4 字节起始码
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// 自动识别时依次尝试的长度前缀宽度 (常规的 4 字节优先)
const PROBE_BOX_SIZES: [usize; 4] = [4, 2, 1, 3];

/// 自动识别默认校验的单元个数
pub const DEFAULT_PROBE_UNITS: usize = 3;

/// 码流封装格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// 起始码分隔
    AnnexB,
    /// 长度前缀分隔, 携带前缀宽度 (1~4 字节)
    LengthPrefixed {
        /// 长度前缀宽度 (字节)
        box_size: usize,
    },
    /// 无法识别
    Unknown,
}

impl StreamFormat {
    /// 是否已识别
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnnexB => write!(f, "annexb"),
            Self::LengthPrefixed { box_size } => write!(f, "packet(box_size={box_size})"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================
// 分割
// ============================================================

/// 按给定封装格式分割出全部 NAL 单元
///
/// 长度前缀声明的长度超过剩余字节时返回 `TruncatedUnit`.
/// `Unknown` 格式不产生任何单元.
pub fn scan(buffer: &[u8], format: StreamFormat) -> JingResult<Vec<NalUnit<'_>>> {
    let (units, err) = scan_partial(buffer, format);
    match err {
        Some(err) => Err(err),
        None => Ok(units),
    }
}

/// 与 [`scan`] 相同, 但截断时仍返回截断点之前的完整单元
pub fn scan_partial(
    buffer: &[u8],
    format: StreamFormat,
) -> (Vec<NalUnit<'_>>, Option<JingError>) {
    match format {
        StreamFormat::AnnexB => (split_annex_b(buffer), None),
        StreamFormat::LengthPrefixed { box_size } => split_length_prefixed(buffer, box_size),
        StreamFormat::Unknown => (Vec::new(), None),
    }
}

/// 从 Annex B 字节流中分割出所有 NAL 单元
///
/// 支持 3 字节与 4 字节起始码, 返回的 NAL 单元不含起始码, 其余字节原样保留.
/// 空单元 (如末尾孤立的起始码) 静默丢弃,
/// forbidden_zero_bit 非法的单元跳过, 在下一个起始码处重新同步.
pub fn split_annex_b(data: &[u8]) -> Vec<NalUnit<'_>> {
    let offsets = find_start_codes(data);
    let mut nalus = Vec::with_capacity(offsets.len());

    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(data.len());

        // 跳过起始码
        let nal_start = skip_start_code(data, start);
        if nal_start >= end {
            continue;
        }

        // 单元尾部的 0 字节属于载荷, 4 字节起始码的前导 0 已由 find_start_codes 吸收;
        // 全 0 的片段视为起始码之间的填充
        let unit = &data[nal_start..end];
        if unit.iter().all(|&b| b == 0x00) {
            continue;
        }

        match NalUnit::parse(unit) {
            Ok(nalu) => nalus.push(nalu),
            Err(err) => debug!("H.264: 跳过非法 NAL 单元, offset={}, {}", nal_start, err),
        }
    }

    nalus
}

/// 从长度前缀数据中提取 NAL 单元
///
/// 返回截断点之前的完整单元, 以及截断时的错误.
pub fn split_length_prefixed(
    data: &[u8],
    box_size: usize,
) -> (Vec<NalUnit<'_>>, Option<JingError>) {
    if !(1..=4).contains(&box_size) {
        return (
            Vec::new(),
            Some(JingError::InvalidArgument(format!(
                "长度前缀宽度非法, box_size={}",
                box_size
            ))),
        );
    }

    let mut nalus = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        if pos + box_size > data.len() {
            return (
                nalus,
                Some(JingError::TruncatedUnit {
                    declared: box_size,
                    remaining: data.len() - pos,
                }),
            );
        }
        let nal_len = BigEndian::read_uint(&data[pos..pos + box_size], box_size) as usize;
        pos += box_size;

        let remaining = data.len() - pos;
        if nal_len > remaining {
            return (
                nalus,
                Some(JingError::TruncatedUnit {
                    declared: nal_len,
                    remaining,
                }),
            );
        }

        if nal_len > 0 {
            match NalUnit::parse(&data[pos..pos + nal_len]) {
                Ok(nalu) => nalus.push(nalu),
                Err(err) => debug!("H.264: 跳过非法 NAL 单元, offset={}, {}", pos, err),
            }
        }
        pos += nal_len;
    }

    (nalus, None)
}

// ============================================================
// 自动识别
// ============================================================

/// 根据缓冲区开头的字节识别封装格式
///
/// 以起始码开头即为 Annex B; 否则依次按 4/2/1/3 字节宽度解释长度前缀,
/// 要求连续 `probe_units` 个单元 (或恰好走到缓冲区末尾) 都落在合理的 NAL 头部上.
///
/// 长度为 256~511 的 4 字节前缀同样以 `00 00 01` 开头. 以起始码开头的缓冲区
/// 若能按长度前缀完整走通至少两个单元, 按长度前缀处理.
pub fn detect_format(buffer: &[u8], probe_units: usize) -> StreamFormat {
    let probe_units = probe_units.max(1);

    if starts_with_start_code(buffer) {
        let strict_units = probe_units.max(2);
        return PROBE_BOX_SIZES
            .into_iter()
            .find(|&box_size| corroborate_length_prefixed(buffer, box_size, strict_units, 2))
            .map_or(StreamFormat::AnnexB, |box_size| {
                debug!("起始码与 {} 字节长度前缀冲突, 按长度前缀处理", box_size);
                StreamFormat::LengthPrefixed { box_size }
            });
    }

    for box_size in PROBE_BOX_SIZES {
        if corroborate_length_prefixed(buffer, box_size, probe_units, 1) {
            return StreamFormat::LengthPrefixed { box_size };
        }
    }

    StreamFormat::Unknown
}

/// 单条码流的封装格式识别缓存
///
/// 识别出非 `Unknown` 结果后即锁定, 之后的帧消息不再运行启发式判断.
/// 启发式判断在跨消息边界时并不完全可靠, 逐条重判会导致结果不一致.
#[derive(Debug, Clone)]
pub struct FormatDetector {
    probe_units: usize,
    cached: Option<StreamFormat>,
    heuristic_runs: usize,
}

impl FormatDetector {
    /// 创建识别器
    pub fn new(probe_units: usize) -> Self {
        Self {
            probe_units: probe_units.max(1),
            cached: None,
            heuristic_runs: 0,
        }
    }

    /// 返回码流格式, 首次识别成功后缓存
    pub fn detect(&mut self, buffer: &[u8]) -> StreamFormat {
        if let Some(format) = self.cached {
            return format;
        }

        self.heuristic_runs += 1;
        let format = detect_format(buffer, self.probe_units);
        if format.is_known() {
            debug!("码流识别为 {}", format);
            self.cached = Some(format);
        } else {
            trace!("本条消息未能识别码流格式, len={}", buffer.len());
        }
        format
    }

    /// 已锁定的格式
    pub fn format(&self) -> Option<StreamFormat> {
        self.cached
    }

    /// 启发式判断实际运行的次数
    pub fn heuristic_runs(&self) -> usize {
        self.heuristic_runs
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_UNITS)
    }
}

fn starts_with_start_code(buffer: &[u8]) -> bool {
    buffer.starts_with(&START_CODE[1..]) || buffer.starts_with(&START_CODE)
}

/// NAL 头部是否合理: forbidden_zero_bit 为 0, 类型为已定义的 1~23
fn is_plausible_header(header: u8) -> bool {
    header & 0x80 == 0 && (1..=23).contains(&(header & 0x1F))
}

/// 按 `box_size` 宽度走查长度前缀, 至少 `min_units` 个单元成立才算通过
fn corroborate_length_prefixed(
    buffer: &[u8],
    box_size: usize,
    probe_units: usize,
    min_units: usize,
) -> bool {
    let mut pos = 0;
    let mut units = 0;

    while units < probe_units && pos < buffer.len() {
        if pos + box_size > buffer.len() {
            return false;
        }
        let nal_len = BigEndian::read_uint(&buffer[pos..pos + box_size], box_size) as usize;
        pos += box_size;
        if nal_len == 0 || nal_len > buffer.len() - pos {
            return false;
        }
        if !is_plausible_header(buffer[pos]) {
            return false;
        }
        pos += nal_len;
        units += 1;
    }

    units >= min_units.max(1) && (units == probe_units || pos == buffer.len())
}

// ============================================================
// 转换
// ============================================================

/// 将 NAL 单元序列改写为 Annex B (4 字节起始码)
pub fn to_annex_b(units: &[NalUnit<'_>]) -> Vec<u8> {
    let total: usize = units.iter().map(|u| u.data.len() + START_CODE.len()).sum();
    let mut out = Vec::with_capacity(total);

    for nalu in units {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nalu.data);
    }

    out
}

/// 将 NAL 单元序列改写为长度前缀格式
///
/// 单元长度无法放入 `box_size` 字节时返回 `InvalidArgument`.
pub fn to_length_prefixed(units: &[NalUnit<'_>], box_size: usize) -> JingResult<Vec<u8>> {
    if !(1..=4).contains(&box_size) {
        return Err(JingError::InvalidArgument(format!(
            "长度前缀宽度非法, box_size={}",
            box_size
        )));
    }

    let max_len = (1u64 << (8 * box_size)) - 1;
    let total: usize = units.iter().map(|u| u.data.len() + box_size).sum();
    let mut out = Vec::with_capacity(total);
    let mut prefix = [0u8; 4];

    for nalu in units {
        let len = nalu.data.len() as u64;
        if len > max_len {
            return Err(JingError::InvalidArgument(format!(
                "NAL 单元长度 {} 超出 {} 字节前缀范围",
                len, box_size
            )));
        }
        BigEndian::write_uint(&mut prefix[..box_size], len, box_size);
        out.extend_from_slice(&prefix[..box_size]);
        out.extend_from_slice(nalu.data);
    }

    Ok(out)
}

/// 规范化结果
#[derive(Debug)]
pub struct NormalizedFrame<'a> {
    /// Annex B 数据; 输入已是 Annex B 或格式未知时原样借用
    pub data: Cow<'a, [u8]>,
    /// 长度前缀截断时的错误, 此时 `data` 只含截断点之前的单元
    pub truncated: Option<JingError>,
}

/// 将一条帧消息规范化为解码引擎要求的 Annex B 形式
///
/// `AnnexB` 与 `Unknown` 均原样透传; 格式未知时解码引擎配置会持续失败,
/// 直到出现可识别的单元.
pub fn normalize(buffer: &[u8], format: StreamFormat) -> NormalizedFrame<'_> {
    match format {
        StreamFormat::LengthPrefixed { box_size } => {
            let (units, truncated) = split_length_prefixed(buffer, box_size);
            if let Some(err) = &truncated {
                warn!(
                    "长度前缀帧消息截断, 保留 {} 个完整单元: {}",
                    units.len(),
                    err
                );
            }
            NormalizedFrame {
                data: Cow::Owned(to_annex_b(&units)),
                truncated,
            }
        }
        StreamFormat::AnnexB | StreamFormat::Unknown => NormalizedFrame {
            data: Cow::Borrowed(buffer),
            truncated: None,
        },
    }
}

// ============================================================
// 内部工具函数
// ============================================================

/// 查找所有起始码的位置
fn find_start_codes(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0x00 && data[i + 1] == 0x00 {
            if data[i + 2] == 0x01 {
                // 3 字节起始码
                positions.push(i);
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0x00 && data[i + 3] == 0x01 {
                // 4 字节起始码
                positions.push(i);
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    positions
}

/// 跳过起始码, 返回 NAL 数据的起始位置
fn skip_start_code(data: &[u8], pos: usize) -> usize {
    if data[pos..].starts_with(&START_CODE) {
        pos + 4
    } else if data[pos..].starts_with(&START_CODE[1..]) {
        pos + 3
    } else {
        pos
    }
}
