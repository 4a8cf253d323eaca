//! 会话提供者接口
//!
//! 加载批次在获得已认证会话之前保持挂起，不设超时

use crate::types::Session;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// 会话提供者 - 挂起直到已认证会话可用
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// 获取当前会话；在会话就绪前挂起，永不超时
    async fn current_session(&self) -> Session;
}

/// 立即可用的会话提供者
pub struct ReadySessionProvider {
    session: Session,
}

impl ReadySessionProvider {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionProvider for ReadySessionProvider {
    async fn current_session(&self) -> Session {
        self.session.clone()
    }
}

/// 基于watch通道的会话槽 - 认证流程完成后发布会话
pub struct SessionSlot {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// 发布已认证会话，唤醒所有等待者
    pub fn provide(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionSlot {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

#[async_trait]
impl SessionProvider for SessionSlot {
    async fn current_session(&self) -> Session {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(session) = rx.borrow().clone() {
                return session;
            }
            // 发送端由self持有，changed()不会失败
            if rx.changed().await.is_err() {
                unreachable!("session slot sender dropped while provider alive");
            }
        }
    }
}
