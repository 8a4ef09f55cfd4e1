//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 从 SPS 中提取配置解码引擎所需的信息:
//! - Profile / constraint 标志 / Level, 合成 `avc1.PPCCLL` 编解码器描述串
//! - 图像宽度和高度 (以宏块为单位, 需要 cropping 调整)
//! - 可选的 VUI 信息 (SAR, 帧率)
//!
//! 字段顺序由标准固定, 任何条件分支中的字段都必须完整消费, 否则后续字段会错位.

use bitflags::bitflags;
use jing_core::{BitReader, JingError, JingResult};
use log::debug;

use super::nal::{NalUnit, NalUnitType};

bitflags! {
    /// constraint_set0..5 标志位 (按位序从高到低), 低 2 位为保留位
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConstraintFlags: u8 {
        /// constraint_set0_flag
        const SET0 = 0x80;
        /// constraint_set1_flag
        const SET1 = 0x40;
        /// constraint_set2_flag
        const SET2 = 0x20;
        /// constraint_set3_flag
        const SET3 = 0x10;
        /// constraint_set4_flag
        const SET4 = 0x08;
        /// constraint_set5_flag
        const SET5 = 0x04;
    }
}

/// 有理数 (SAR / 帧率)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    /// 分子
    pub num: u32,
    /// 分母
    pub den: u32,
}

impl Ratio {
    /// 创建有理数
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// 转为浮点数
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        f64::from(self.num) / f64::from(self.den)
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Sps {
    /// profile_idc (编码规格, 如 66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位 (含保留位原值)
    pub constraint_flags: ConstraintFlags,
    /// level_idc (编码级别, 如 30=3.0, 41=4.1)
    pub level_idc: u8,
    /// SPS ID (seq_parameter_set_id)
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// 图像宽度 (像素, 已应用 cropping)
    pub width: u32,
    /// 图像高度 (像素, 已应用 cropping)
    pub height: u32,
    /// 是否为帧编码 (非场编码)
    pub frame_mbs_only: bool,
    /// pic_width_in_mbs_minus1 + 1
    pub pic_width_in_mbs: u32,
    /// pic_height_in_map_units_minus1 + 1
    pub pic_height_in_map_units: u32,
    /// cropping 偏移 (以 cropping 单位计)
    pub crop_left: u32,
    /// cropping 偏移
    pub crop_right: u32,
    /// cropping 偏移
    pub crop_top: u32,
    /// cropping 偏移
    pub crop_bottom: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub poc_type: u32,
    /// SAR (Sample Aspect Ratio), 仅当 VUI 中存在
    pub sar: Option<Ratio>,
    /// 帧率, 仅当 VUI 中存在 timing_info
    pub fps: Option<Ratio>,
}

impl Sps {
    /// 从 SPS NAL 单元解析 (自动去除防竞争字节)
    pub fn from_nal_unit(unit: &NalUnit<'_>) -> JingResult<Self> {
        if unit.nal_type != NalUnitType::Sps {
            return Err(JingError::InvalidArgument(format!(
                "H.264: 期望 SPS, 实际为 {}",
                unit.nal_type
            )));
        }
        let mut br = unit.rbsp_reader();
        parse_sps(&mut br)
    }

    /// 宏块对齐的宽度 (裁剪前)
    pub fn coded_width(&self) -> u32 {
        self.pic_width_in_mbs * 16
    }

    /// 宏块对齐的高度 (裁剪前)
    pub fn coded_height(&self) -> u32 {
        let factor = if self.frame_mbs_only { 1 } else { 2 };
        self.pic_height_in_map_units * factor * 16
    }

    /// 编解码器描述串, 形如 `avc1.42E01E`
    ///
    /// 依次为 profile_idc, constraint 字节, level_idc 的两位大写十六进制.
    pub fn codec_descriptor(&self) -> String {
        format!(
            "avc1.{:02X}{:02X}{:02X}",
            self.profile_idc,
            self.constraint_flags.bits(),
            self.level_idc
        )
    }
}

/// 预定义的 SAR 表 (ITU-T H.264 表 E-1)
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 1),    // 0: 未指定
    (1, 1),    // 1: 1:1
    (12, 11),  // 2: 12:11
    (10, 11),  // 3: 10:11
    (16, 11),  // 4: 16:11
    (40, 33),  // 5: 40:33
    (24, 11),  // 6: 24:11
    (20, 11),  // 7: 20:11
    (32, 11),  // 8: 32:11
    (80, 33),  // 9: 80:33
    (18, 11),  // 10: 18:11
    (15, 11),  // 11: 15:11
    (64, 33),  // 12: 64:33
    (160, 99), // 13: 160:99
    (4, 3),    // 14: 4:3
    (3, 2),    // 15: 3:2
    (2, 1),    // 16: 2:1
];

/// aspect_ratio_idc 中表示显式 SAR 的取值
const EXTENDED_SAR: u32 = 255;

/// 从 RBSP 读取器解析 SPS (读取器位于 NAL 头部之后)
pub fn parse_sps(br: &mut BitReader<'_>) -> JingResult<Sps> {
    let profile_idc = br.read_u8()?;
    // constraint_set0..5_flag (6 bits) + reserved_zero_2bits (2 bits)
    let constraint_bits = br.read_unsigned(6)?;
    let reserved = br.read_unsigned(2)?;
    let constraint_flags =
        ConstraintFlags::from_bits_retain(((constraint_bits << 2) | reserved) as u8);
    let level_idc = br.read_u8()?;

    let sps_id = br.read_exp_golomb_unsigned()?;
    if sps_id > 31 {
        return Err(JingError::malformed(format!(
            "H.264: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let mut chroma_format_idc = 1; // 默认 4:2:0
    let mut separate_colour_plane_flag = false;
    let mut bit_depth_luma = 8;
    let mut bit_depth_chroma = 8;

    // High profile 及以上有额外字段, 即使不对外暴露也必须完整消费
    if is_high_profile(profile_idc) {
        chroma_format_idc = br.read_exp_golomb_unsigned()?;
        if chroma_format_idc > 3 {
            return Err(JingError::malformed(format!(
                "H.264: chroma_format_idc 非法, value={}",
                chroma_format_idc
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane_flag = br.read_bool()?;
        }
        bit_depth_luma = br.read_exp_golomb_unsigned()?.saturating_add(8);
        bit_depth_chroma = br.read_exp_golomb_unsigned()?.saturating_add(8);
        if !(8..=14).contains(&bit_depth_luma) || !(8..=14).contains(&bit_depth_chroma) {
            return Err(JingError::malformed(format!(
                "H.264: 位深非法, luma={}, chroma={}",
                bit_depth_luma, bit_depth_chroma
            )));
        }
        br.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

        if br.read_bool()? {
            // seq_scaling_matrix_present_flag
            skip_seq_scaling_lists(br, chroma_format_idc)?;
        }
    }

    let log2_max_frame_num_minus4 = br.read_exp_golomb_unsigned()?;
    if log2_max_frame_num_minus4 > 12 {
        return Err(JingError::malformed(format!(
            "H.264: log2_max_frame_num_minus4 超出范围, value={}",
            log2_max_frame_num_minus4
        )));
    }

    let poc_type = br.read_exp_golomb_unsigned()?;
    match poc_type {
        0 => {
            let log2_max_poc_lsb_minus4 = br.read_exp_golomb_unsigned()?;
            if log2_max_poc_lsb_minus4 > 12 {
                return Err(JingError::malformed(format!(
                    "H.264: log2_max_pic_order_cnt_lsb_minus4 超出范围, value={}",
                    log2_max_poc_lsb_minus4
                )));
            }
        }
        1 => {
            br.skip_bits(1)?; // delta_pic_order_always_zero_flag
            br.read_exp_golomb_signed()?; // offset_for_non_ref_pic
            br.read_exp_golomb_signed()?; // offset_for_top_to_bottom_field
            let num_ref_in_poc = br.read_exp_golomb_unsigned()?;
            if num_ref_in_poc > 255 {
                return Err(JingError::malformed(format!(
                    "H.264: num_ref_frames_in_pic_order_cnt_cycle 超出范围, value={}",
                    num_ref_in_poc
                )));
            }
            for _ in 0..num_ref_in_poc {
                br.read_exp_golomb_signed()?; // offset_for_ref_frame[i]
            }
        }
        2 => {}
        _ => {
            return Err(JingError::malformed(format!(
                "H.264: pic_order_cnt_type 非法, value={}",
                poc_type
            )));
        }
    }

    let max_num_ref_frames = br.read_exp_golomb_unsigned()?;
    br.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag

    // 图像尺寸 (宏块单位)
    let pic_width_in_mbs = br.read_exp_golomb_unsigned()?.saturating_add(1);
    let pic_height_in_map_units = br.read_exp_golomb_unsigned()?.saturating_add(1);

    let frame_mbs_only = br.read_bool()?;
    if !frame_mbs_only {
        br.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }

    br.skip_bits(1)?; // direct_8x8_inference_flag

    let mut crop_left = 0u32;
    let mut crop_right = 0u32;
    let mut crop_top = 0u32;
    let mut crop_bottom = 0u32;
    if br.read_bool()? {
        // frame_cropping_flag
        crop_left = br.read_exp_golomb_unsigned()?;
        crop_right = br.read_exp_golomb_unsigned()?;
        crop_top = br.read_exp_golomb_unsigned()?;
        crop_bottom = br.read_exp_golomb_unsigned()?;
    }

    let chroma_array_type = if separate_colour_plane_flag {
        0
    } else {
        chroma_format_idc
    };
    let (width, height) = cropped_size(
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        chroma_array_type,
        [crop_left, crop_right, crop_top, crop_bottom],
    )?;

    // VUI 只用于补充信息, 截断或取值非法时不影响尺寸与编解码器描述
    let (sar, fps) = match br.read_bool() {
        Ok(true) => match parse_vui(br) {
            Ok(vui) => vui,
            Err(err) => {
                debug!("H.264: 忽略无法解析的 VUI: {}", err);
                (None, None)
            }
        },
        _ => (None, None),
    };

    Ok(Sps {
        profile_idc,
        constraint_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        bit_depth_luma,
        bit_depth_chroma,
        width,
        height,
        frame_mbs_only,
        pic_width_in_mbs,
        pic_height_in_map_units,
        crop_left,
        crop_right,
        crop_top,
        crop_bottom,
        max_num_ref_frames,
        poc_type,
        sar,
        fps,
    })
}

// ============================================================
// 辅助函数
// ============================================================

/// 是否为带 chroma/位深/量化矩阵扩展块的 profile
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134
    )
}

/// 获取 cropping 单位 (CropUnitX, CropUnitY)
fn cropping_unit(chroma_array_type: u32, frame_mbs_only: bool) -> (u32, u32) {
    let height_mult = if frame_mbs_only { 1 } else { 2 };
    match chroma_array_type {
        0 | 3 => (1, height_mult),
        2 => (2, height_mult),
        _ => (2, 2 * height_mult), // 4:2:0
    }
}

/// 计算裁剪后的像素尺寸
///
/// 宏块对齐尺寸先算出, 裁剪量不能达到或超过对齐尺寸.
fn cropped_size(
    pic_width_in_mbs: u32,
    pic_height_in_map_units: u32,
    frame_mbs_only: bool,
    chroma_array_type: u32,
    [left, right, top, bottom]: [u32; 4],
) -> JingResult<(u32, u32)> {
    let overflow = || JingError::malformed("H.264: 计算图像尺寸时发生溢出");

    let (crop_unit_x, crop_unit_y) = cropping_unit(chroma_array_type, frame_mbs_only);
    let raw_width = pic_width_in_mbs.checked_mul(16).ok_or_else(overflow)?;
    let raw_height = pic_height_in_map_units
        .checked_mul(if frame_mbs_only { 16 } else { 32 })
        .ok_or_else(overflow)?;
    let crop_x = left
        .checked_add(right)
        .and_then(|v| v.checked_mul(crop_unit_x))
        .ok_or_else(overflow)?;
    let crop_y = top
        .checked_add(bottom)
        .and_then(|v| v.checked_mul(crop_unit_y))
        .ok_or_else(overflow)?;

    if crop_x >= raw_width || crop_y >= raw_height {
        return Err(JingError::malformed(format!(
            "H.264: 裁剪参数非法, raw={}x{}, crop_x={}, crop_y={}",
            raw_width, raw_height, crop_x, crop_y
        )));
    }

    Ok((raw_width - crop_x, raw_height - crop_y))
}

/// 消费 seq_scaling_list_present_flag[i] 及其后的量化矩阵
fn skip_seq_scaling_lists(br: &mut BitReader<'_>, chroma_format_idc: u32) -> JingResult<()> {
    let list_count = if chroma_format_idc != 3 { 8 } else { 12 };
    for list_idx in 0..list_count {
        if br.read_bool()? {
            let size = if list_idx < 6 { 16 } else { 64 };
            skip_scaling_list(br, size)?;
        }
    }
    Ok(())
}

/// 消费一个 delta 编码的量化矩阵
fn skip_scaling_list(br: &mut BitReader<'_>, size: usize) -> JingResult<()> {
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = br.read_exp_golomb_signed()?;
            if !(-128..=127).contains(&delta_scale) {
                return Err(JingError::malformed(format!(
                    "H.264: delta_scale 超出范围, value={}",
                    delta_scale
                )));
            }
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

/// 解析 VUI 中的 SAR 与帧率, 其余字段只消费不保留
fn parse_vui(br: &mut BitReader<'_>) -> JingResult<(Option<Ratio>, Option<Ratio>)> {
    let mut sar = None;

    // aspect_ratio_info_present_flag
    if br.read_bool()? {
        let ar_idc = br.read_unsigned(8)?;
        if ar_idc == EXTENDED_SAR {
            let sar_w = br.read_unsigned(16)?;
            let sar_h = br.read_unsigned(16)?;
            if sar_w == 0 || sar_h == 0 {
                return Err(JingError::malformed(format!(
                    "H.264: VUI 扩展 SAR 非法, sar={}:{}",
                    sar_w, sar_h
                )));
            }
            sar = Some(Ratio::new(sar_w, sar_h));
        } else if let Some(&(w, h)) = SAR_TABLE.get(ar_idc as usize) {
            if w > 0 {
                sar = Some(Ratio::new(w, h));
            }
        } else {
            return Err(JingError::malformed(format!(
                "H.264: VUI aspect_ratio_idc 非法, value={}",
                ar_idc
            )));
        }
    }

    // overscan_info_present_flag
    if br.read_bool()? {
        br.skip_bits(1)?; // overscan_appropriate_flag
    }

    // video_signal_type_present_flag
    if br.read_bool()? {
        br.skip_bits(3)?; // video_format
        br.skip_bits(1)?; // video_full_range_flag
        if br.read_bool()? {
            // colour_description_present_flag
            br.skip_bits(24)?; // colour_primaries, transfer_characteristics, matrix_coefficients
        }
    }

    // chroma_loc_info_present_flag
    if br.read_bool()? {
        br.read_exp_golomb_unsigned()?;
        br.read_exp_golomb_unsigned()?;
    }

    // timing_info_present_flag
    let mut fps = None;
    if br.read_bool()? {
        let num_units_in_tick = br.read_unsigned(32)?;
        let time_scale = br.read_unsigned(32)?;
        br.skip_bits(1)?; // fixed_frame_rate_flag

        if num_units_in_tick == 0 || time_scale == 0 {
            return Err(JingError::malformed(format!(
                "H.264: VUI timing 非法, num_units_in_tick={}, time_scale={}",
                num_units_in_tick, time_scale
            )));
        }
        // fps = time_scale / (2 * num_units_in_tick)
        fps = num_units_in_tick
            .checked_mul(2)
            .map(|den| Ratio::new(time_scale, den));
    }

    Ok((sar, fps))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试用 SPS 比特串构造器
    #[derive(Default)]
    struct SpsBits {
        bits: Vec<bool>,
    }

    impl SpsBits {
        fn u(&mut self, n: u32, val: u32) -> &mut Self {
            for i in (0..n).rev() {
                self.bits.push((val >> i) & 1 != 0);
            }
            self
        }

        fn flag(&mut self, val: bool) -> &mut Self {
            self.bits.push(val);
            self
        }

        fn ue(&mut self, val: u32) -> &mut Self {
            let code = u64::from(val) + 1;
            let len = 64 - code.leading_zeros();
            for _ in 0..len - 1 {
                self.bits.push(false);
            }
            for i in (0..len).rev() {
                self.bits.push((code >> i) & 1 != 0);
            }
            self
        }

        fn se(&mut self, val: i32) -> &mut Self {
            let code = if val > 0 {
                (val as u32) * 2 - 1
            } else {
                (-val) as u32 * 2
            };
            self.ue(code)
        }

        /// 追加 rbsp_stop_one_bit 并按字节对齐
        fn finish(&mut self) -> Vec<u8> {
            self.bits.push(true);
            let mut bytes = Vec::new();
            for chunk in self.bits.chunks(8) {
                let mut byte = 0u8;
                for (i, &bit) in chunk.iter().enumerate() {
                    if bit {
                        byte |= 1 << (7 - i);
                    }
                }
                bytes.push(byte);
            }
            bytes
        }
    }

    /// 写 profile/constraint/level/sps_id, 可选 High 扩展块
    fn header(b: &mut SpsBits, profile: u8, constraints: u8, level: u8) {
        b.u(8, u32::from(profile))
            .u(8, u32::from(constraints))
            .u(8, u32::from(level))
            .ue(0);
        if is_high_profile(profile) {
            b.ue(1) // chroma_format_idc
                .ue(0) // bit_depth_luma_minus8
                .ue(0) // bit_depth_chroma_minus8
                .flag(false) // qpprime_y_zero_transform_bypass_flag
                .flag(false); // seq_scaling_matrix_present_flag
        }
    }

    /// 写 frame_num/poc (type 0)/参考帧/尺寸/帧场/裁剪字段
    fn body(
        b: &mut SpsBits,
        width_mbs_minus1: u32,
        height_units_minus1: u32,
        frame_mbs_only: bool,
        crop: Option<[u32; 4]>,
    ) {
        b.ue(0) // log2_max_frame_num_minus4
            .ue(0) // pic_order_cnt_type
            .ue(0) // log2_max_pic_order_cnt_lsb_minus4
            .ue(1) // max_num_ref_frames
            .flag(false) // gaps_in_frame_num_value_allowed_flag
            .ue(width_mbs_minus1)
            .ue(height_units_minus1)
            .flag(frame_mbs_only);
        if !frame_mbs_only {
            b.flag(false); // mb_adaptive_frame_field_flag
        }
        b.flag(true); // direct_8x8_inference_flag
        match crop {
            Some([l, r, t, bo]) => {
                b.flag(true).ue(l).ue(r).ue(t).ue(bo);
            }
            None => {
                b.flag(false);
            }
        }
    }

    fn parse(bytes: &[u8]) -> JingResult<Sps> {
        let mut br = BitReader::new(bytes);
        parse_sps(&mut br)
    }

    #[test]
    fn test_sps_minimal_qcif() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0xC0, 30);
        body(&mut b, 10, 8, true, None);
        b.flag(false); // vui_parameters_present_flag
        let sps = parse(&b.finish()).unwrap();

        assert_eq!(sps.width, 176);
        assert_eq!(sps.height, 144);
        assert_eq!(sps.coded_width(), 176);
        assert_eq!(sps.coded_height(), 144);
        assert!(sps.frame_mbs_only);
        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 30);
        assert!(sps.constraint_flags.contains(ConstraintFlags::SET0));
        assert!(sps.constraint_flags.contains(ConstraintFlags::SET1));
        assert!(!sps.constraint_flags.contains(ConstraintFlags::SET2));
        assert_eq!(sps.codec_descriptor(), "avc1.42C01E");
        assert_eq!(sps.sar, None);
        assert_eq!(sps.fps, None);
    }

    #[test]
    fn test_sps_high_profile_1080p_cropping() {
        let mut b = SpsBits::default();
        header(&mut b, 100, 0x00, 40);
        // 120x68 宏块 = 1920x1088, 底部裁剪 4 个单位 (4:2:0 → 8 行)
        body(&mut b, 119, 67, true, Some([0, 0, 0, 4]));
        b.flag(false);
        let sps = parse(&b.finish()).unwrap();

        assert_eq!(sps.width, 1920);
        assert_eq!(sps.height, 1080);
        assert_eq!(sps.coded_height(), 1088);
        assert_eq!(sps.crop_bottom, 4);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.codec_descriptor(), "avc1.640028");
    }

    #[test]
    fn test_sps_field_coding_doubles_height() {
        let mut b = SpsBits::default();
        header(&mut b, 77, 0x40, 30);
        // 45x18 map units, 场编码 → 720x576
        body(&mut b, 44, 17, false, None);
        b.flag(false);
        let sps = parse(&b.finish()).unwrap();

        assert!(!sps.frame_mbs_only);
        assert_eq!(sps.width, 720);
        assert_eq!(sps.height, 576);
    }

    #[test]
    fn test_sps_field_coding_crop_scaled() {
        let mut b = SpsBits::default();
        header(&mut b, 77, 0x40, 30);
        // 1920x1088 场编码, crop_bottom=2 → 2 * 2 * 2 = 8 行
        body(&mut b, 119, 33, false, Some([0, 0, 0, 2]));
        b.flag(false);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!(sps.height, 1080);
    }

    #[test]
    fn test_sps_high_profile_with_scaling_lists() {
        let mut b = SpsBits::default();
        b.u(8, 100).u(8, 0).u(8, 31).ue(0);
        b.ue(1).ue(0).ue(0).flag(false);
        b.flag(true); // seq_scaling_matrix_present_flag
        // 8 个列表: 第 0 个显式给出 (全部 delta=0 → 全 8), 第 6 个使用默认 (delta 使 next=0), 其余缺省
        for list_idx in 0..8 {
            match list_idx {
                0 => {
                    b.flag(true);
                    for _ in 0..16 {
                        b.se(0);
                    }
                }
                6 => {
                    b.flag(true);
                    b.se(-8); // next_scale = 0 → 使用默认矩阵, 立即停止读取
                }
                _ => {
                    b.flag(false);
                }
            }
        }
        body(&mut b, 79, 44, true, None);
        b.flag(false);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!(sps.width, 1280);
        assert_eq!(sps.height, 720);
    }

    #[test]
    fn test_sps_poc_type1_consumed() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        b.ue(0) // log2_max_frame_num_minus4
            .ue(1) // pic_order_cnt_type
            .flag(false)
            .se(-3)
            .se(5)
            .ue(3)
            .se(1)
            .se(-1)
            .se(2)
            .ue(2)
            .flag(false)
            .ue(21) // 352
            .ue(17) // 288
            .flag(true)
            .flag(true)
            .flag(false)
            .flag(false);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!(sps.poc_type, 1);
        assert_eq!((sps.width, sps.height), (352, 288));
    }

    #[test]
    fn test_sps_poc_type2() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        b.ue(0)
            .ue(2)
            .ue(1)
            .flag(false)
            .ue(19)
            .ue(14)
            .flag(true)
            .flag(true)
            .flag(false)
            .flag(false);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!((sps.width, sps.height), (320, 240));
    }

    #[test]
    fn test_sps_reject_invalid_poc_type() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        b.ue(0).ue(3);
        let err = parse(&b.finish()).unwrap_err();
        assert!(format!("{err}").contains("pic_order_cnt_type"));
    }

    #[test]
    fn test_sps_reject_sps_id_out_of_range() {
        let mut b = SpsBits::default();
        b.u(8, 66).u(8, 0).u(8, 30).ue(32);
        let err = parse(&b.finish()).unwrap_err();
        assert!(matches!(err, JingError::MalformedBitstream(_)));
    }

    #[test]
    fn test_sps_reject_invalid_chroma_format_idc() {
        let mut b = SpsBits::default();
        b.u(8, 100).u(8, 0).u(8, 30).ue(0).ue(4);
        assert!(parse(&b.finish()).is_err());
    }

    #[test]
    fn test_sps_reject_crop_exceeding_width() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        // 宽 176, 左右共裁剪 2 * (44 + 44) = 176
        body(&mut b, 10, 8, true, Some([44, 44, 0, 0]));
        b.flag(false);
        let err = parse(&b.finish()).unwrap_err();
        assert!(matches!(err, JingError::MalformedBitstream(_)));
        assert!(format!("{err}").contains("裁剪参数非法"));
    }

    #[test]
    fn test_sps_reject_crop_exceeding_height() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 10, 8, true, Some([0, 0, 100, 0]));
        b.flag(false);
        assert!(parse(&b.finish()).is_err());
    }

    #[test]
    fn test_sps_truncated_is_malformed() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 10, 8, true, None);
        let bytes = b.finish();
        // 只保留前 4 个字节
        let err = parse(&bytes[..4]).unwrap_err();
        assert!(matches!(err, JingError::MalformedBitstream(_)));
    }

    #[test]
    fn test_sps_missing_vui_flag_tolerated() {
        // 缺少 vui_parameters_present_flag 时视为无 VUI
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 10, 8, true, None);
        let mut bits = b.bits.clone();
        while bits.len() % 8 != 0 {
            bits.push(false);
        }
        let bytes = SpsBits { bits }.bits_to_bytes_exact();
        let sps = parse(&bytes).unwrap();
        assert_eq!((sps.width, sps.height), (176, 144));
    }

    impl SpsBits {
        fn bits_to_bytes_exact(&self) -> Vec<u8> {
            self.bits
                .chunks(8)
                .map(|chunk| {
                    chunk
                        .iter()
                        .enumerate()
                        .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
                })
                .collect()
        }
    }

    #[test]
    fn test_sps_vui_sar_and_fps() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 79, 44, true, None);
        b.flag(true); // vui_parameters_present_flag
        b.flag(true).u(8, 1); // aspect_ratio_idc = 1:1
        b.flag(false); // overscan
        b.flag(true).u(3, 5).flag(false).flag(true).u(8, 1).u(8, 1).u(8, 1);
        b.flag(false); // chroma_loc
        b.flag(true).u(32, 1001).u(32, 60000).flag(true);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!(sps.sar, Some(Ratio::new(1, 1)));
        assert_eq!(sps.fps, Some(Ratio::new(60000, 2002)));
        assert!((sps.fps.unwrap().to_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_sps_vui_extended_sar() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 10, 8, true, None);
        b.flag(true);
        b.flag(true).u(8, 255).u(16, 64).u(16, 45);
        b.flag(false).flag(false).flag(false).flag(false);
        let sps = parse(&b.finish()).unwrap();
        assert_eq!(sps.sar, Some(Ratio::new(64, 45)));
    }

    #[test]
    fn test_sps_invalid_vui_keeps_dimensions() {
        let mut b = SpsBits::default();
        header(&mut b, 66, 0, 30);
        body(&mut b, 10, 8, true, None);
        b.flag(true);
        b.flag(true).u(8, 200); // aspect_ratio_idc 非法
        let sps = parse(&b.finish()).unwrap();
        assert_eq!((sps.width, sps.height), (176, 144));
        assert_eq!(sps.sar, None);
    }

    #[test]
    fn test_from_nal_unit_with_emulation_prevention() {
        // 0x67 头部 + 含 00 00 03 的载荷
        let mut b = SpsBits::default();
        // profile_idc=0, constraint=0, level_idc=1 → 载荷以 00 00 01 开头
        header(&mut b, 0, 0, 1);
        body(&mut b, 10, 8, true, None);
        b.flag(false);
        let rbsp = b.finish();
        assert_eq!(&rbsp[..3], &[0x00, 0x00, 0x01]);

        // 按编码器规则插入防竞争字节
        let mut nal = vec![0x67];
        let mut zeros = 0;
        for &byte in &rbsp {
            if zeros >= 2 && byte <= 0x03 {
                nal.push(0x03);
                zeros = 0;
            }
            nal.push(byte);
            zeros = if byte == 0 { zeros + 1 } else { 0 };
        }
        assert!(nal.len() > rbsp.len() + 1, "应插入防竞争字节");

        let unit = NalUnit::parse(&nal).unwrap();
        let sps = Sps::from_nal_unit(&unit).unwrap();
        assert_eq!((sps.width, sps.height), (176, 144));
        assert_eq!(sps.codec_descriptor(), "avc1.000001");
    }

    #[test]
    fn test_from_nal_unit_reject_non_sps() {
        let unit = NalUnit::parse(&[0x68, 0xCE]).unwrap();
        assert!(matches!(
            Sps::from_nal_unit(&unit),
            Err(JingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_real_encoder_sps() {
        // x264 输出的 1280x720 High@3.1 SPS (含防竞争字节)
        let nal = [
            0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50, 0x05, 0xBB, 0x01, 0x10, 0x00, 0x00,
            0x03, 0x00, 0x10, 0x00, 0x00, 0x03, 0x03, 0xC0, 0xF1, 0x83, 0x19, 0x60,
        ];
        let unit = NalUnit::parse(&nal).unwrap();
        let sps = Sps::from_nal_unit(&unit).unwrap();
        assert_eq!((sps.width, sps.height), (1280, 720));
        assert_eq!(sps.codec_descriptor(), "avc1.64001F");
    }
}
