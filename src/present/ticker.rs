//! 刷新节拍线程.
//!
//! 以固定间隔向事件循环投递 `Refresh`, 模拟宿主的垂直同步回调.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::event::EventSender;

/// 刷新节拍线程句柄, drop 时停止
pub struct RefreshTicker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<u64>>,
}

impl RefreshTicker {
    /// 启动节拍线程
    pub fn spawn<P: Send + 'static>(sender: EventSender<P>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("jing-refresh".into())
            .spawn(move || {
                let mut ticks = 0u64;
                while !thread_stop.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    if !sender.refresh() {
                        break;
                    }
                    ticks += 1;
                }
                debug!("刷新节拍线程退出, ticks={}", ticks);
                ticks
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("创建刷新节拍线程失败: {}", e);
                None
            }
        };
        Self { stop, handle }
    }

    /// 停止节拍线程, 返回已发送的节拍数
    pub fn stop(mut self) -> u64 {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::event::{Event, EventLoop};

    #[test]
    fn test_ticker_sends_refresh_events() {
        let event_loop: EventLoop<()> = EventLoop::new();
        let ticker = RefreshTicker::spawn(event_loop.sender(), Duration::from_millis(1));
        thread::sleep(Duration::from_millis(30));
        let ticks = ticker.stop();
        assert!(ticks > 0);

        let received = event_loop
            .drain()
            .into_iter()
            .filter(|e| matches!(e, Event::Refresh))
            .count() as u64;
        assert_eq!(received, ticks);
    }
}
