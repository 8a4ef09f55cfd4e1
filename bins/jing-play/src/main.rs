//! # jing-play
//!
//! 按宿主刷新节拍回放 H.264 裸流, 走通完整的解码/呈现管线:
//! - 文件按访问单元切分为帧消息, 可选改写为长度前缀格式
//! - 探测解码引擎异步输出占位图像
//! - 日志 rasterizer 记录呈现序列与丢帧
//! - 状态消息按刷新节拍汇总输出

mod engine;
mod logging;
mod rasterizer;
mod source;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result, bail};
use clap::Parser;
use jing::present::config::{RATE_RANGE_HZ, rate_interval};
use jing::present::{Coordinator, EventLoop, HostMessage, PresentConfig, RefreshTicker};
use log::{info, warn};

use crate::engine::ProbeEngine;
use crate::rasterizer::LoggingRasterizer;

/// Jing 回放工具
#[derive(Parser)]
#[command(name = "jing-play", version, about = "按刷新节拍回放 H.264 裸流")]
struct Args {
    /// 输入文件路径 (Annex B 裸流)
    input: PathBuf,

    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 刷新率 (Hz), 覆盖配置文件
    #[arg(long)]
    refresh_rate: Option<f64>,

    /// 长度前缀格式识别的验证单元数, 覆盖配置文件
    #[arg(long)]
    probe_units: Option<usize>,

    /// 以长度前缀格式投递帧消息 (前缀宽度 1-4 字节)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    length_prefixed: Option<u8>,

    /// 帧消息投递速率 (消息/秒)
    #[arg(long, default_value_t = 30.0)]
    feed_rate: f64,

    /// 日志详细程度 (-v: debug, -vv: trace jing crate, -vvv: trace 全部)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// 加载配置文件并应用命令行覆盖
    fn present_config(&self) -> Result<PresentConfig> {
        let mut config = match &self.config {
            Some(path) => PresentConfig::from_file(path)
                .with_context(|| format!("加载配置失败, path={}", path.display()))?,
            None => PresentConfig::default(),
        };
        if let Some(rate) = self.refresh_rate {
            config.refresh_rate_hz = rate;
        }
        if let Some(units) = self.probe_units {
            config.detect_probe_units = units;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("jing-play", args.verbose)?;

    let config = args.present_config()?;
    if !RATE_RANGE_HZ.contains(&args.feed_rate) {
        bail!(
            "feed_rate 须在 {}~{} 之间, 实际为 {}",
            RATE_RANGE_HZ.start(),
            RATE_RANGE_HZ.end(),
            args.feed_rate
        );
    }

    let data = std::fs::read(&args.input)
        .with_context(|| format!("读取输入失败, path={}", args.input.display()))?;
    let mut messages = source::split_access_units(&data)
        .with_context(|| format!("切分码流失败, path={}", args.input.display()))?;
    if let Some(box_size) = args.length_prefixed {
        messages = source::repackage_length_prefixed(messages, usize::from(box_size))?;
    }
    info!(
        "jing-play: {} → {} 条帧消息, 刷新率 {} Hz",
        args.input.display(),
        messages.len(),
        config.refresh_rate_hz
    );

    let event_loop = EventLoop::new();
    let sender = event_loop.sender();

    let (host_tx, host_rx) = mpsc::channel();
    let mut coordinator = Coordinator::new(
        ProbeEngine::new(sender.clone()),
        host_tx,
        config.clone(),
    );
    sender.init(Box::new(LoggingRasterizer::new()));

    let host = thread::Builder::new()
        .name("jing-host".into())
        .spawn(move || {
            let mut passes = 0u64;
            for message in host_rx {
                match message {
                    HostMessage::Status(update) => {
                        if let Some(decode) = update.decode {
                            warn!("解码状态: {}", decode);
                        }
                    }
                    HostMessage::RenderPassComplete => passes += 1,
                }
            }
            passes
        })
        .context("创建宿主线程失败")?;

    let feeder_sender = sender.clone();
    let feed_interval = rate_interval(args.feed_rate);
    let drain_delay = config.refresh_interval() * 2;
    let feeder = thread::Builder::new()
        .name("jing-feeder".into())
        .spawn(move || {
            for message in messages {
                if !feeder_sender.frame(message) {
                    return;
                }
                thread::sleep(feed_interval);
            }
            // 留出时间呈现最后一张图像
            thread::sleep(drain_delay);
            feeder_sender.shutdown();
        })
        .context("创建投递线程失败")?;

    let ticker = RefreshTicker::spawn(sender, config.refresh_interval());
    let handled = event_loop.run(&mut coordinator);

    let ticks = ticker.stop();
    feeder.join().ok();
    let submitted = coordinator.next_sequence_id();
    let dropped = coordinator.dropped_pictures();
    drop(coordinator);
    let passes = host.join().unwrap_or(0);

    info!(
        "回放结束: 事件 {}, 节拍 {}, 提交 {}, 丢弃 {}, 刷新完成 {}",
        handled, ticks, submitted, dropped, passes
    );
    Ok(())
}
