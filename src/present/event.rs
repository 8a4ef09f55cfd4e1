//! 事件循环.
//!
//! 帧消息、解码完成与刷新节拍三类事件汇入同一条有序队列,
//! 由协调器在单一线程上逐个处理, 内部无需加锁.

use std::sync::mpsc::{self, Receiver, Sender};

use bytes::Bytes;
use jing_codec::DecodeEngine;
use log::{debug, info};

use super::coordinator::Coordinator;
use super::status::HostSink;

/// 图像呈现接口, 由宿主提供
pub trait Rasterizer<P> {
    /// 将图像绘制到显示表面
    fn draw(&mut self, picture: &P);
}

/// 协调器事件
pub enum Event<P> {
    /// 宿主提供显示表面
    Init {
        /// 绘制图像的 rasterizer
        rasterizer: Box<dyn Rasterizer<P> + Send>,
    },
    /// 一条帧消息 (封装格式事先未知)
    Frame {
        /// 原始编码字节
        bytes: Bytes,
    },
    /// 解码引擎输出一张图像
    Decoded {
        /// 解码后的图像
        picture: P,
    },
    /// 解码引擎报告错误
    DecodeFailed {
        /// 错误信息
        message: String,
    },
    /// 宿主刷新节拍
    Refresh,
    /// 停止事件循环并释放资源
    Shutdown,
}

impl<P> std::fmt::Debug for Event<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init { .. } => write!(f, "Init"),
            Self::Frame { bytes } => write!(f, "Frame({} bytes)", bytes.len()),
            Self::Decoded { .. } => write!(f, "Decoded"),
            Self::DecodeFailed { message } => write!(f, "DecodeFailed({message})"),
            Self::Refresh => write!(f, "Refresh"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// 事件发送端, 可跨线程克隆
///
/// 所有发送方法在事件循环已退出时返回 `false`.
pub struct EventSender<P> {
    tx: Sender<Event<P>>,
}

impl<P> Clone for EventSender<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> From<Sender<Event<P>>> for EventSender<P> {
    fn from(tx: Sender<Event<P>>) -> Self {
        Self { tx }
    }
}

impl<P> EventSender<P> {
    /// 发送任意事件
    pub fn send(&self, event: Event<P>) -> bool {
        self.tx.send(event).is_ok()
    }

    /// 安装 rasterizer
    pub fn init(&self, rasterizer: Box<dyn Rasterizer<P> + Send>) -> bool {
        self.send(Event::Init { rasterizer })
    }

    /// 投递帧消息
    pub fn frame(&self, bytes: impl Into<Bytes>) -> bool {
        self.send(Event::Frame {
            bytes: bytes.into(),
        })
    }

    /// 投递解码完成的图像
    pub fn decoded(&self, picture: P) -> bool {
        self.send(Event::Decoded { picture })
    }

    /// 投递解码错误
    pub fn decode_failed(&self, message: impl Into<String>) -> bool {
        self.send(Event::DecodeFailed {
            message: message.into(),
        })
    }

    /// 投递刷新节拍
    pub fn refresh(&self) -> bool {
        self.send(Event::Refresh)
    }

    /// 请求停止
    pub fn shutdown(&self) -> bool {
        self.send(Event::Shutdown)
    }
}

/// 单线程事件循环
pub struct EventLoop<P> {
    tx: Sender<Event<P>>,
    rx: Receiver<Event<P>>,
}

impl<P> EventLoop<P> {
    /// 创建事件队列
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// 获取发送端
    pub fn sender(&self) -> EventSender<P> {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// 在当前线程处理事件, 直到收到 `Shutdown` 或所有发送端都已释放
    ///
    /// 返回处理的事件数.
    pub fn run<E, H>(self, coordinator: &mut Coordinator<E, H>) -> u64
    where
        E: DecodeEngine<Picture = P>,
        H: HostSink,
    {
        let Self { tx, rx } = self;
        drop(tx);

        let mut handled = 0u64;
        for event in rx.iter() {
            handled += 1;
            if !coordinator.handle(event) {
                break;
            }
        }
        if handled > 0 {
            debug!("事件循环处理了 {} 个事件", handled);
        }
        coordinator.shutdown();
        info!("事件循环已退出");
        handled
    }

    /// 处理队列中已有的事件 (含处理期间新入队的) 后立即返回, 不阻塞
    ///
    /// 用于嵌入宿主自己的循环. 返回 `false` 表示收到了 `Shutdown`.
    pub fn run_pending<E, H>(&self, coordinator: &mut Coordinator<E, H>) -> bool
    where
        E: DecodeEngine<Picture = P>,
        H: HostSink,
    {
        while let Ok(event) = self.rx.try_recv() {
            if !coordinator.handle(event) {
                return false;
            }
        }
        true
    }

    /// 取出队列中已有的事件, 不交给协调器
    pub fn drain(&self) -> Vec<Event<P>> {
        self.rx.try_iter().collect()
    }
}

impl<P> Default for EventLoop<P> {
    fn default() -> Self {
        Self::new()
    }
}
