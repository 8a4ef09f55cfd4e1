//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从单个 NAL 单元的载荷中读取定长字段与 Exp-Golomb 编码,
//! 是 SPS 解析的基础设施.
//!
//! # 防竞争字节
//!
//! NAL 载荷中的 `00 00 03` 序列需要还原为 `00 00` 后才能按位解析.
//! 防竞争字节只会出现在字节对齐位置, 因此 [`BitReader::new_rbsp`] 在读取任何位之前
//! 对整个载荷做一次预处理, 而不是在读位时交错处理.

use std::borrow::Cow;

use crate::{JingError, JingResult};

/// Exp-Golomb 前缀允许的最大前导零个数 (结果需放入 u32)
const MAX_EXP_GOLOMB_PREFIX: u32 = 31;

/// 比特流读取器
///
/// # 示例
/// ```
/// use jing_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_unsigned(4).unwrap(), 0b1011);
/// assert_eq!(br.read_unsigned(4).unwrap(), 0b0001);
/// assert_eq!(br.read_unsigned(8).unwrap(), 0b01010101);
/// ```
pub struct BitReader<'a> {
    /// 源数据 (原样借用, 或去除防竞争字节后的副本)
    data: Cow<'a, [u8]>,
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 在已去除防竞争字节的数据 (RBSP) 上创建读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 在原始 NAL 载荷上创建读取器, 先移除全部防竞争字节
    ///
    /// 载荷中不含 `00 00 03` 时不发生拷贝.
    pub fn new_rbsp(payload: &'a [u8]) -> Self {
        let data = if has_emulation_prevention(payload) {
            Cow::Owned(remove_emulation_prevention(payload))
        } else {
            Cow::Borrowed(payload)
        };
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 读取 1 个位, 作为布尔值返回
    pub fn read_bool(&mut self) -> JingResult<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(JingError::malformed(format!(
                "读取越界, bit_offset={}",
                self.bits_read()
            )));
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit == 1)
    }

    /// 读取 N 个位 (最多 32 位) 作为无符号整数
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_unsigned(&mut self, n: u32) -> JingResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(JingError::InvalidArgument(format!(
                "read_unsigned: n={} 超过 32 位",
                n
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(JingError::malformed(format!(
                "读取 {} 位越界, bits_left={}",
                n,
                self.bits_left()
            )));
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 读取 8 位
    pub fn read_u8(&mut self) -> JingResult<u8> {
        Ok(self.read_unsigned(8)? as u8)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: u32) -> JingResult<()> {
        if (n as usize) > self.bits_left() {
            return Err(JingError::malformed(format!(
                "跳过 {} 位越界, bits_left={}",
                n,
                self.bits_left()
            )));
        }

        let total_bits = self.bit_pos as u32 + n;
        self.byte_pos += (total_bits / 8) as usize;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 读取无符号 Exp-Golomb 编码值 ue(v)
    ///
    /// 统计前导零个数 `k` 直到遇到 1, 再读取 `k` 位后缀, 结果为 `2^k - 1 + suffix`.
    /// 前缀计数过程中越界或前导零超过 31 个均视为码流损坏.
    pub fn read_exp_golomb_unsigned(&mut self) -> JingResult<u32> {
        let mut leading_zeros = 0u32;
        loop {
            if self.is_eof() {
                return Err(JingError::malformed(format!(
                    "Exp-Golomb 前缀越界, leading_zeros={}",
                    leading_zeros
                )));
            }
            if self.read_bool()? {
                break;
            }
            leading_zeros += 1;
            if leading_zeros > MAX_EXP_GOLOMB_PREFIX {
                return Err(JingError::malformed("Exp-Golomb 前导零过多"));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let suffix = self.read_unsigned(leading_zeros)?;
        // leading_zeros == 32 已被拒绝, 2^31 - 1 + suffix 不会溢出 u32
        Ok(((1u64 << leading_zeros) - 1 + u64::from(suffix)) as u32)
    }

    /// 读取有符号 Exp-Golomb 编码值 se(v)
    ///
    /// 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
    pub fn read_exp_golomb_signed(&mut self) -> JingResult<i32> {
        let code = self.read_exp_golomb_unsigned()?;
        let value = code.div_ceil(2) as i64;
        let signed = if code & 1 == 0 { -value } else { value };
        Ok(signed as i32)
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    /// 获取底层数据 (已去除防竞争字节)
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// 载荷中是否存在 `00 00 03` 序列
fn has_emulation_prevention(data: &[u8]) -> bool {
    data.windows(3).any(|w| w == [0x00, 0x00, 0x03])
}

/// 移除防竞争字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// 命中 `00 00 03` 即移除其中的 0x03, 与后续字节取值无关.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let is_emulation_prevention =
            i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03;
        if is_emulation_prevention {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3; // 跳过 0x03
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}
