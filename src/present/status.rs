//! 状态消息合并与宿主消息.
//!
//! 每个通道只保留最新一条消息, 每次刷新最多向宿主发送一次.

use std::sync::mpsc::Sender;

use log::debug;

/// 状态通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChannel {
    /// 解码错误文本
    Decode,
    /// 渲染帧率文本
    Render,
}

impl std::fmt::Display for StatusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode => write!(f, "decode"),
            Self::Render => write!(f, "render"),
        }
    }
}

/// 一次刷新内合并后的状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// 最新的解码状态
    pub decode: Option<String>,
    /// 最新的渲染状态
    pub render: Option<String>,
}

impl StatusUpdate {
    /// 是否没有任何消息
    pub fn is_empty(&self) -> bool {
        self.decode.is_none() && self.render.is_none()
    }

    fn slot_mut(&mut self, channel: StatusChannel) -> &mut Option<String> {
        match channel {
            StatusChannel::Decode => &mut self.decode,
            StatusChannel::Render => &mut self.render,
        }
    }
}

impl std::fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (channel, message) in [
            (StatusChannel::Decode, &self.decode),
            (StatusChannel::Render, &self.render),
        ] {
            if let Some(message) = message {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", channel, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// 状态累加器
#[derive(Debug, Default)]
pub struct StatusAccumulator {
    pending: StatusUpdate,
}

impl StatusAccumulator {
    /// 创建空累加器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条消息, 覆盖同通道中尚未发送的旧消息
    pub fn post(&mut self, channel: StatusChannel, message: impl Into<String>) {
        *self.pending.slot_mut(channel) = Some(message.into());
    }

    /// 取出合并后的状态并清空; 没有消息时返回 `None`
    pub fn take(&mut self) -> Option<StatusUpdate> {
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }

    /// 是否没有待发送的消息
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// 发往宿主的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// 合并后的状态, 每次刷新最多一条
    Status(StatusUpdate),
    /// 本次刷新处理完毕, 在状态消息之后发送
    RenderPassComplete,
}

/// 宿主消息接收端
pub trait HostSink {
    /// 投递一条消息, 不阻塞
    fn post(&mut self, message: HostMessage);
}

impl HostSink for Sender<HostMessage> {
    fn post(&mut self, message: HostMessage) {
        if self.send(message).is_err() {
            debug!("宿主消息通道已关闭, 丢弃消息");
        }
    }
}

impl HostSink for Vec<HostMessage> {
    fn post(&mut self, message: HostMessage) {
        self.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_message_overwrites_same_channel() {
        let mut acc = StatusAccumulator::new();
        acc.post(StatusChannel::Render, "30");
        acc.post(StatusChannel::Render, "31");
        acc.post(StatusChannel::Decode, "bad chunk");

        let update = acc.take().unwrap();
        assert_eq!(update.render.as_deref(), Some("31"));
        assert_eq!(update.decode.as_deref(), Some("bad chunk"));
        assert!(acc.is_empty());
        assert_eq!(acc.take(), None);
    }

    #[test]
    fn test_take_empty_returns_none() {
        let mut acc = StatusAccumulator::new();
        assert!(acc.take().is_none());
    }

    #[test]
    fn test_status_update_display() {
        let update = StatusUpdate {
            decode: None,
            render: Some("60".into()),
        };
        assert_eq!(update.to_string(), "render=60");
        let update = StatusUpdate {
            decode: Some("err".into()),
            render: Some("60".into()),
        };
        assert_eq!(update.to_string(), "decode=err, render=60");
    }

    #[test]
    fn test_sender_sink_ignores_closed_channel() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink = tx;
        sink.post(HostMessage::RenderPassComplete);
        assert_eq!(rx.recv().unwrap(), HostMessage::RenderPassComplete);
        drop(rx);
        sink.post(HostMessage::RenderPassComplete);
    }
}
