//! jing-play 日志初始化.
//!
//! 回放管线跨多个线程运行 (main 事件循环, jing-feeder, jing-refresh, jing-host, 解码线程),
//! 每行日志带线程名, 便于对照帧消息投递与刷新节拍:
//! ```text
//! [10-19 08:30:12.004] DEBUG jing-refresh | 呈现图像 seq=12
//! ```
//! 终端输出按级别着色, 文件输出无色, 写入 $cwd/logs/{prefix}.{date}.log.
//!
//! 过滤规则 (JING_LOG 环境变量优先于 `-v`):
//! - 无 `-v`: info
//! - `-v`: debug, 可看到格式识别与解码配置
//! - `-vv`: jing crate 输出 trace, 其余 info
//! - `-vvv`: 全部 trace
//!
//! 库 crate 走 `log` 门面, 由 tracing-subscriber 的 log 桥接收集.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

const LOG_ENV: &str = "JING_LOG";

const LOG_DIR: &str = "logs";

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 工作区内各 crate 的 target
const JING_TARGETS: &[&str] = &["jing", "jing_core", "jing_codec", "jing_play"];

/// `-v` 次数对应的过滤指令
fn filter_directives(verbosity: u8) -> String {
    match verbosity {
        0 => "info".to_string(),
        1 => "debug".to_string(),
        2 => JING_TARGETS
            .iter()
            .map(|target| format!("{target}=trace"))
            .chain(std::iter::once("info".to_string()))
            .collect::<Vec<_>>()
            .join(","),
        _ => "trace".to_string(),
    }
}

fn resolve_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)))
}

/// 安装终端与滚动文件两路输出
pub fn init(file_prefix: &str, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("创建日志目录失败")?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(LOG_DIR)
        .context("创建日志文件失败")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stdout)
        .event_format(PipelineFormatter { colored: true })
        .with_filter(resolve_filter(verbosity));
    let file_layer = fmt::Layer::default()
        .with_writer(file_writer)
        .with_ansi(false)
        .event_format(PipelineFormatter { colored: false })
        .with_filter(resolve_filter(verbosity));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("安装日志订阅器失败")?;

    Ok(())
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[36m",
        _ => "\x1b[90m",
    }
}

/// 行首: 时间戳, 级别, 线程名
fn write_prefix(writer: &mut Writer<'_>, level: Level, colored: bool) -> std::fmt::Result {
    let now = Local::now().format("%m-%d %H:%M:%S%.3f");
    let current = std::thread::current();
    let thread = current.name().unwrap_or("-");
    if colored {
        write!(writer, "[{now}] {}{level:5}\x1b[0m {thread} | ", level_color(level))
    } else {
        write!(writer, "[{now}] {level:5} {thread} | ")
    }
}

struct PipelineFormatter {
    colored: bool,
}

impl<S, N> FormatEvent<S, N> for PipelineFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_prefix(&mut writer, *event.metadata().level(), self.colored)?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
