//! 探测解码引擎.
//!
//! 不做真正的像素解码: 工作线程按配置尺寸为每个分块生成一张占位图像,
//! 用于在没有平台解码器时走通整条管线. 与真实引擎一样异步回送结果.

use std::sync::mpsc::{self, Sender};
use std::thread;

use jing::present::EventSender;
use jing_codec::{DecodeEngine, DecoderConfig, EncodedChunk, VideoPicture};
use jing_core::{JingError, JingResult};
use log::{debug, info, warn};

/// 支持的最大边长 (像素)
const MAX_DIMENSION: u32 = 8192;

enum Job {
    Configure(DecoderConfig),
    Decode(EncodedChunk),
}

/// 探测解码引擎
pub struct ProbeEngine {
    events: EventSender<VideoPicture>,
    jobs: Option<Sender<Job>>,
}

impl ProbeEngine {
    /// 创建引擎, 解码结果投递到 `events`
    pub fn new(events: EventSender<VideoPicture>) -> Self {
        Self { events, jobs: None }
    }

    fn spawn_worker(&self) -> JingResult<Sender<Job>> {
        let (tx, rx) = mpsc::channel::<Job>();
        let events = self.events.clone();
        thread::Builder::new()
            .name("jing-probe-decoder".into())
            .spawn(move || {
                let mut worker = ProbeWorker::default();
                for job in rx {
                    if !worker.handle(job, &events) {
                        break;
                    }
                }
                debug!("探测解码线程退出, 输出 {} 张图像", worker.decoded);
            })?;
        Ok(tx)
    }
}

impl DecodeEngine for ProbeEngine {
    type Picture = VideoPicture;

    fn configure(&mut self, config: &DecoderConfig) -> JingResult<()> {
        if !config.codec.starts_with("avc1.") {
            return Err(JingError::Codec(format!(
                "不支持的编解码器: {}",
                config.codec
            )));
        }
        if config.coded_width == 0
            || config.coded_height == 0
            || config.coded_width > MAX_DIMENSION
            || config.coded_height > MAX_DIMENSION
        {
            return Err(JingError::Codec(format!(
                "不支持的尺寸: {}x{}",
                config.coded_width, config.coded_height
            )));
        }

        if self.jobs.is_none() {
            self.jobs = Some(self.spawn_worker()?);
        }
        self.send(Job::Configure(config.clone()))?;
        info!("探测解码引擎已配置: {}", config);
        Ok(())
    }

    fn submit(&mut self, chunk: EncodedChunk) -> JingResult<()> {
        self.send(Job::Decode(chunk))
    }

    fn close(&mut self) {
        if self.jobs.take().is_some() {
            debug!("探测解码引擎已关闭");
        }
    }
}

impl ProbeEngine {
    fn send(&self, job: Job) -> JingResult<()> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| JingError::Codec("解码引擎未配置".into()))?;
        jobs.send(job)
            .map_err(|_| JingError::Codec("解码线程已退出".into()))
    }
}

#[derive(Default)]
struct ProbeWorker {
    config: Option<DecoderConfig>,
    seen_key: bool,
    decoded: u64,
}

impl ProbeWorker {
    /// 处理一个任务, 返回 `false` 表示事件循环已退出
    fn handle(&mut self, job: Job, events: &EventSender<VideoPicture>) -> bool {
        match job {
            Job::Configure(config) => {
                self.config = Some(config);
                self.seen_key = false;
                true
            }
            Job::Decode(chunk) => {
                let Some(config) = self.config.as_ref() else {
                    return events.decode_failed("解码引擎未配置");
                };
                if !self.seen_key && !chunk.is_key() {
                    warn!("分块 #{} 之前没有关键帧", chunk.sequence_id);
                    return events.decode_failed(format!(
                        "分块 #{} 之前没有关键帧",
                        chunk.sequence_id
                    ));
                }
                self.seen_key = true;

                let luma = chunk.data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
                let mut picture = VideoPicture::filled(
                    config.coded_width,
                    config.coded_height,
                    luma,
                    chunk.sequence_id,
                );
                picture.is_keyframe = chunk.is_key();
                self.decoded += 1;
                events.decoded(picture)
            }
        }
    }
}
