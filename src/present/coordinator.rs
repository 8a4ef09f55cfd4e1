//! 解码/呈现协调器.
//!
//! 状态机: `Uninitialized → Configuring → Ready`.
//! - 识别出封装格式后进入 `Configuring`
//! - 找到并成功解析 SPS, 且解码引擎接受配置后进入 `Ready`
//! - `Ready` 状态下每条帧消息规范化为 Annex B 后提交解码
//!
//! 解码完成后图像放入待呈现槽 (最多一张), 由刷新节拍取出绘制.
//! 状态消息在刷新时合并发送, 随后发送 `RenderPassComplete`.

use std::time::Instant;

use bytes::Bytes;
use jing_codec::parsers::h264::{
    FormatDetector, NalUnit, Sps, StreamFormat, UnitClass, normalize, split_annex_b,
};
use jing_codec::{ChunkKind, DecodeEngine, DecoderConfig, EncodedChunk};
use log::{debug, error, info, trace, warn};

use super::config::PresentConfig;
use super::event::{Event, Rasterizer};
use super::pending::PendingPicture;
use super::stats::RenderStats;
use super::status::{HostMessage, HostSink, StatusAccumulator, StatusChannel};

/// 协调器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// 尚未识别出封装格式
    Uninitialized,
    /// 已识别格式, 等待可用的 SPS
    Configuring,
    /// 解码引擎已配置, 帧消息会被提交
    Ready,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Configuring => write!(f, "configuring"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// 解码/呈现协调器
///
/// 独占解码引擎、rasterizer 与待呈现图像. drop 时释放待呈现图像并关闭解码引擎,
/// 不等待仍在进行的解码.
pub struct Coordinator<E: DecodeEngine, H: HostSink> {
    config: PresentConfig,
    state: CoordinatorState,
    detector: FormatDetector,
    engine: Option<E>,
    rasterizer: Option<Box<dyn Rasterizer<E::Picture> + Send>>,
    pending: PendingPicture<E::Picture>,
    status: StatusAccumulator,
    stats: RenderStats,
    decoder_config: Option<DecoderConfig>,
    next_sequence_id: u64,
    host: H,
}

impl<E: DecodeEngine, H: HostSink> Coordinator<E, H> {
    /// 创建协调器
    pub fn new(engine: E, host: H, config: PresentConfig) -> Self {
        Self {
            detector: FormatDetector::new(config.detect_probe_units),
            config,
            state: CoordinatorState::Uninitialized,
            engine: Some(engine),
            rasterizer: None,
            pending: PendingPicture::new(),
            status: StatusAccumulator::new(),
            stats: RenderStats::new(),
            decoder_config: None,
            next_sequence_id: 0,
            host,
        }
    }

    /// 处理一个事件, 返回 `false` 表示应停止事件循环
    pub fn handle(&mut self, event: Event<E::Picture>) -> bool {
        trace!("处理事件: {:?}", event);
        match event {
            Event::Init { rasterizer } => self.init(rasterizer),
            Event::Frame { bytes } => self.on_frame(&bytes),
            Event::Decoded { picture } => self.on_decoded(picture),
            Event::DecodeFailed { message } => self.on_decode_failed(message),
            Event::Refresh => self.on_refresh(),
            Event::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// 安装宿主提供的 rasterizer
    pub fn init(&mut self, rasterizer: Box<dyn Rasterizer<E::Picture> + Send>) {
        if self.rasterizer.is_some() {
            debug!("替换已有的 rasterizer");
        }
        self.rasterizer = Some(rasterizer);
    }

    /// 处理一条帧消息
    pub fn on_frame(&mut self, bytes: &[u8]) {
        if self.engine.is_none() {
            debug!("协调器已关闭, 忽略帧消息");
            return;
        }

        let format = self.detector.detect(bytes);
        if self.state == CoordinatorState::Uninitialized {
            if !format.is_known() {
                debug!("封装格式未识别, 等待后续帧消息, len={}", bytes.len());
                return;
            }
            info!("码流格式: {}", format);
            self.state = CoordinatorState::Configuring;
        }

        let normalized = normalize(bytes, format);
        if normalized.data.is_empty() {
            match &normalized.truncated {
                Some(err) => warn!("帧消息在首个完整单元前截断, 整条丢弃: {}", err),
                None => trace!("空帧消息, 忽略"),
            }
            return;
        }
        let kind = {
            let units = split_annex_b(&normalized.data);
            match self.state {
                CoordinatorState::Configuring => {
                    if !self.try_configure(&units) {
                        trace!("尚未配置解码引擎, 跳过 {} 个单元", units.len());
                        return;
                    }
                }
                CoordinatorState::Ready => self.check_sps_change(&units),
                CoordinatorState::Uninitialized => return,
            }

            if units.iter().any(|u| u.class() == UnitClass::KeyFrameSlice) {
                ChunkKind::Key
            } else {
                ChunkKind::Delta
            }
        };
        let chunk = EncodedChunk {
            kind,
            data: Bytes::from(normalized.data.into_owned()),
            sequence_id: self.next_sequence_id,
        };
        self.next_sequence_id += 1;
        self.submit(chunk);
    }

    /// 处理解码完成的图像 (以当前时间统计吞吐)
    pub fn on_decoded(&mut self, picture: E::Picture) {
        self.on_decoded_at(picture, Instant::now());
    }

    /// 处理解码完成的图像, 以 `now` 作为完成时刻
    pub fn on_decoded_at(&mut self, picture: E::Picture, now: Instant) {
        if self.engine.is_none() {
            return;
        }
        if let Some(fps) = self.stats.record(now) {
            self.status.post(StatusChannel::Render, format!("{fps:.0}"));
        }
        if self.pending.install(picture) {
            trace!("未呈现的图像被替换, 累计丢弃 {}", self.pending.dropped());
        }
    }

    /// 处理解码错误
    pub fn on_decode_failed(&mut self, message: String) {
        error!("解码失败: {}", message);
        self.status.post(StatusChannel::Decode, message);
    }

    /// 处理一次刷新节拍
    pub fn on_refresh(&mut self) {
        if let Some(picture) = self.pending.take() {
            match self.rasterizer.as_mut() {
                Some(rasterizer) => rasterizer.draw(&picture),
                None => trace!("rasterizer 未就绪, 丢弃待呈现图像"),
            }
        }

        if let Some(update) = self.status.take() {
            if self.config.log_status_updates {
                info!("状态: {}", update);
            }
            self.host.post(HostMessage::Status(update));
        }
        self.host.post(HostMessage::RenderPassComplete);
    }

    /// 释放待呈现图像并关闭解码引擎, 可重复调用
    pub fn shutdown(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        self.pending.clear();
        engine.close();
        info!(
            "协调器已关闭, 提交 {} 个分块, 丢弃 {} 张图像",
            self.next_sequence_id,
            self.pending.dropped()
        );
    }

    /// 当前状态
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// 已锁定的码流格式
    pub fn stream_format(&self) -> Option<StreamFormat> {
        self.detector.format()
    }

    /// 当前的解码引擎配置
    pub fn decoder_config(&self) -> Option<&DecoderConfig> {
        self.decoder_config.as_ref()
    }

    /// 下一个分块的提交序号 (即已提交的分块数)
    pub fn next_sequence_id(&self) -> u64 {
        self.next_sequence_id
    }

    /// 是否有图像待呈现
    pub fn has_pending_picture(&self) -> bool {
        self.pending.is_pending()
    }

    /// 被替换而未呈现的图像数
    pub fn dropped_pictures(&self) -> u64 {
        self.pending.dropped()
    }

    /// 解码引擎 (关闭后为 `None`)
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// 宿主消息接收端
    pub fn host(&self) -> &H {
        &self.host
    }

    /// 依次尝试帧消息中的 SPS, 配置成功返回 `true`
    fn try_configure(&mut self, units: &[NalUnit<'_>]) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        for unit in units.iter().filter(|u| u.class() == UnitClass::Sps) {
            let sps = match Sps::from_nal_unit(unit) {
                Ok(sps) => sps,
                Err(e) => {
                    warn!("跳过无法解析的 SPS: {}", e);
                    continue;
                }
            };

            let config = DecoderConfig::from_sps(&sps);
            match engine.configure(&config) {
                Ok(()) => {
                    info!("解码引擎已配置: {}", config);
                    self.decoder_config = Some(config);
                    self.state = CoordinatorState::Ready;
                    return true;
                }
                Err(e) => {
                    error!("配置解码引擎失败 ({}): {}", config, e);
                    self.status.post(StatusChannel::Decode, e.to_string());
                }
            }
        }
        false
    }

    /// 配置在码流生命周期内不变; 参数变化只记录告警
    fn check_sps_change(&self, units: &[NalUnit<'_>]) {
        let Some(current) = self.decoder_config.as_ref() else {
            return;
        };
        for unit in units.iter().filter(|u| u.class() == UnitClass::Sps) {
            match Sps::from_nal_unit(unit) {
                Ok(sps) => {
                    let config = DecoderConfig::from_sps(&sps);
                    if &config != current {
                        warn!("码流参数变化 ({} → {}), 不重新配置", current, config);
                    }
                }
                Err(e) => debug!("跳过无法解析的 SPS: {}", e),
            }
        }
    }

    fn submit(&mut self, chunk: EncodedChunk) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let sequence_id = chunk.sequence_id;
        trace!(
            "提交分块 #{}: {}, {} 字节",
            sequence_id,
            chunk.kind,
            chunk.size()
        );
        if let Err(e) = engine.submit(chunk) {
            error!("提交分块 #{} 失败: {}", sequence_id, e);
            self.status.post(StatusChannel::Decode, e.to_string());
        }
    }
}

impl<E: DecodeEngine, H: HostSink> Drop for Coordinator<E, H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
