//! 加载完成门控
//!
//! 单调的一次性异步信号：false直到加载批次完成，之后永久为true。
//! 任意数量的等待者可以同时挂起在该信号上。

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// 加载状态门控 - 进程生命周期内只发生一次false到true的切换
#[derive(Clone)]
pub struct LoadGate {
    tx: Arc<watch::Sender<bool>>,
}

impl LoadGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 打开门控，唤醒所有等待者；重复调用无效果
    pub fn open(&self) {
        let was_open = self.tx.send_replace(true);
        if !was_open {
            info!("Widget load gate opened");
        }
    }

    /// 当前是否已打开
    pub fn is_open(&self) -> bool {
        *self.tx.subscribe().borrow()
    }

    /// 挂起直到门控打开；已打开时立即返回
    pub async fn wait_open(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            // 发送端由self持有，changed()不会失败
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}
