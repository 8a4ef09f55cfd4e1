//! H.264 NAL (Network Abstraction Layer) 单元与类型识别.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```
//!
//! NAL 单元借用所在帧消息的缓冲区, 只在处理该条消息期间存活.

use jing_core::{BitReader, JingError, JingResult};

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片 (P/B slice)
    Slice,
    /// 数据分区 A (DPA)
    SliceDpa,
    /// 数据分区 B (DPB)
    SliceDpb,
    /// 数据分区 C (DPC)
    SliceDpc,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// SPS 扩展
    SpsExtension,
    /// 未知类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            _ => Self::Unknown(type_id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }

    /// 是否为关键帧 (IDR)
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// 语义分类, 决定是否尝试解析 SPS 以及分块的关键帧标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    /// 序列参数集
    Sps,
    /// 图像参数集
    Pps,
    /// 增补增强信息
    Sei,
    /// IDR 切片 (关键帧)
    KeyFrameSlice,
    /// 非 IDR 切片 (含数据分区)
    OtherSlice,
    /// 其它类型, 包括未识别的类型编号
    Other,
}

impl UnitClass {
    /// 从 NAL 头部字节分类, 只看低 5 位的 `nal_unit_type`
    pub fn from_header(header: u8) -> Self {
        match NalUnitType::from_type_id(header & 0x1F) {
            NalUnitType::Sps => Self::Sps,
            NalUnitType::Pps => Self::Pps,
            NalUnitType::Sei => Self::Sei,
            NalUnitType::SliceIdr => Self::KeyFrameSlice,
            NalUnitType::Slice
            | NalUnitType::SliceDpa
            | NalUnitType::SliceDpb
            | NalUnitType::SliceDpc => Self::OtherSlice,
            _ => Self::Other,
        }
    }
}

/// 按头部字节对 NAL 单元分类
pub fn classify(unit: &NalUnit<'_>) -> UnitClass {
    UnitClass::from_header(unit.header())
}

/// 帧消息中的 NAL 单元 (不含起始码或长度前缀, 含 NAL 头部字节)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    /// NAL 单元类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (参考重要性, 0-3)
    pub ref_idc: u8,
    /// 头部字节 + 载荷, 借用自帧消息缓冲区
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// 从 NAL 数据 (含头部字节) 解析
    ///
    /// `forbidden_zero_bit` 为 1 说明该位置并非合法的 NAL 起点, 调用方应重新同步.
    pub fn parse(data: &'a [u8]) -> JingResult<Self> {
        let Some(&header) = data.first() else {
            return Err(JingError::malformed("H.264: NAL 单元数据为空"));
        };

        let forbidden = (header >> 7) & 1;
        if forbidden != 0 {
            return Err(JingError::malformed(format!(
                "H.264: forbidden_zero_bit 非法, header=0x{:02X}",
                header
            )));
        }

        Ok(Self {
            nal_type: NalUnitType::from_type_id(header & 0x1F),
            ref_idc: (header >> 5) & 0x03,
            data,
        })
    }

    /// NAL 头部字节
    pub fn header(&self) -> u8 {
        self.data[0]
    }

    /// 头部之后的原始载荷 (仍含防竞争字节)
    pub fn payload(&self) -> &'a [u8] {
        &self.data[1..]
    }

    /// 在载荷上创建已去除防竞争字节的比特流读取器
    pub fn rbsp_reader(&self) -> BitReader<'a> {
        BitReader::new_rbsp(self.payload())
    }

    /// 获取 RBSP (Raw Byte Sequence Payload) 数据
    pub fn rbsp(&self) -> Vec<u8> {
        jing_core::bitreader::remove_emulation_prevention(self.payload())
    }

    /// 语义分类
    pub fn class(&self) -> UnitClass {
        classify(self)
    }
}
