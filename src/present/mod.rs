//! 解码/呈现协调.
//!
//! 将异步解码引擎与按刷新率驱动的呈现循环耦合起来:
//! - `coordinator`: 状态机, 帧消息处理与提交
//! - `pending`: 最多一张的待呈现图像槽 (唯一的流控手段)
//! - `status`: 状态消息合并与宿主消息
//! - `event`: 单线程事件循环
//! - `ticker`: 刷新节拍线程

pub mod config;
pub mod coordinator;
pub mod event;
pub mod pending;
pub mod stats;
pub mod status;
pub mod ticker;

pub use config::PresentConfig;
pub use coordinator::{Coordinator, CoordinatorState};
pub use event::{Event, EventLoop, EventSender, Rasterizer};
pub use pending::PendingPicture;
pub use stats::RenderStats;
pub use status::{HostMessage, HostSink, StatusAccumulator, StatusChannel, StatusUpdate};
pub use ticker::RefreshTicker;
