//! 呈现协调器配置.
//!
//! 可从 JSON 文件加载, 缺省字段取默认值; 命令行参数在其之上覆盖.

use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use jing_core::{JingError, JingResult};
use serde::{Deserialize, Serialize};

/// 刷新率与投递速率的允许范围 (Hz)
pub const RATE_RANGE_HZ: RangeInclusive<f64> = 1.0..=1000.0;

/// 呈现协调器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresentConfig {
    /// 宿主刷新率 (Hz), 决定呈现节拍
    pub refresh_rate_hz: f64,
    /// 长度前缀格式识别时需要连续验证的单元数
    pub detect_probe_units: usize,
    /// 刷新时是否以 info 级别记录状态消息
    pub log_status_updates: bool,
}

impl Default for PresentConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60.0,
            detect_probe_units: jing_codec::parsers::h264::stream::DEFAULT_PROBE_UNITS,
            log_status_updates: true,
        }
    }
}

impl PresentConfig {
    /// 从 JSON 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> JingResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| JingError::Config(format!("{}: {}", path.display(), e)))
    }

    /// 从 JSON 文本解析并校验
    pub fn from_json(text: &str) -> JingResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| JingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> JingResult<()> {
        if !RATE_RANGE_HZ.contains(&self.refresh_rate_hz) {
            return Err(JingError::Config(format!(
                "refresh_rate_hz 须在 {}~{} 之间, 实际为 {}",
                RATE_RANGE_HZ.start(),
                RATE_RANGE_HZ.end(),
                self.refresh_rate_hz
            )));
        }
        if self.detect_probe_units == 0 {
            return Err(JingError::Config(
                "detect_probe_units 至少为 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 刷新间隔; 刷新率超出允许范围时按边界取值
    pub fn refresh_interval(&self) -> Duration {
        rate_interval(self.refresh_rate_hz)
    }
}

/// 把速率 (Hz) 换算为间隔, 非法值收敛到 [`RATE_RANGE_HZ`] 内
pub fn rate_interval(rate_hz: f64) -> Duration {
    let rate = if rate_hz.is_nan() {
        *RATE_RANGE_HZ.start()
    } else {
        rate_hz.clamp(*RATE_RANGE_HZ.start(), *RATE_RANGE_HZ.end())
    };
    Duration::from_secs_f64(1.0 / rate)
}
