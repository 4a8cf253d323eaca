//! Bundle标识符存储接口
//!
//! 持久化宿主应用与Bundle标识符集合的关联，提供读取与原子更新

use crate::error::Result;
use crate::types::{now_ns, AppId, Application, BundleId, ContextId, RuntimeContext};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 标识符存储 - 外部协作者的读写接口
#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// 列出对指定用户可见的应用（自有与共享）
    async fn list_applications(&self, user: &str) -> Result<Vec<Application>>;

    /// 按应用ID查询运行时上下文记录
    async fn list_runtime_contexts(&self, app_id: &AppId) -> Result<Vec<RuntimeContext>>;

    /// 原子替换运行时上下文的完整Bundle列表
    async fn update_runtime_context(
        &self,
        context_id: &ContextId,
        bundle_ids: Vec<BundleId>,
    ) -> Result<()>;

    /// 判断Bundle标识符是否仍对应任何已知应用
    ///
    /// 返回false意味着该Bundle已在上游被删除或卸载
    async fn is_bundle_known(&self, bundle_id: &BundleId) -> Result<bool>;
}

/// 内存标识符存储
pub struct MemoryIdentifierStore {
    applications: RwLock<Vec<Application>>,
    contexts: RwLock<HashMap<ContextId, RuntimeContext>>,
}

impl MemoryIdentifierStore {
    pub fn new() -> Self {
        Self {
            applications: RwLock::new(Vec::new()),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// 添加应用记录
    pub async fn add_application(&self, application: Application) {
        self.applications.write().await.push(application);
    }

    /// 添加运行时上下文记录
    pub async fn add_runtime_context(&self, context: RuntimeContext) {
        self.contexts
            .write()
            .await
            .insert(context.id.clone(), context);
    }

    /// 读取单个运行时上下文（测试用）
    pub async fn get_runtime_context(&self, context_id: &ContextId) -> Option<RuntimeContext> {
        self.contexts.read().await.get(context_id).cloned()
    }
}

impl Default for MemoryIdentifierStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentifierStore for MemoryIdentifierStore {
    async fn list_applications(&self, user: &str) -> Result<Vec<Application>> {
        let applications = self.applications.read().await;
        Ok(applications
            .iter()
            .filter(|app| app.owner == user || app.shared)
            .cloned()
            .collect())
    }

    async fn list_runtime_contexts(&self, app_id: &AppId) -> Result<Vec<RuntimeContext>> {
        let contexts = self.contexts.read().await;
        Ok(contexts
            .values()
            .filter(|ctx| &ctx.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn update_runtime_context(
        &self,
        context_id: &ContextId,
        bundle_ids: Vec<BundleId>,
    ) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        if let Some(context) = contexts.get_mut(context_id) {
            debug!(context_id = %context_id, count = bundle_ids.len(), "Updating runtime context bundle list");
            context.bundle_ids = bundle_ids;
            context.updated_at = now_ns();
        }
        Ok(())
    }

    async fn is_bundle_known(&self, bundle_id: &BundleId) -> Result<bool> {
        let applications = self.applications.read().await;
        Ok(applications
            .iter()
            .any(|app| app.bundle_ids.contains(bundle_id)))
    }
}
