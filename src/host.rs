//! 宿主侧接口
//!
//! 宿主组件注册表与用户可见的进度/警告通道

use crate::types::{ComponentDefinition, WidgetId};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

/// 宿主组件注册表 - 宿主自身的组件枚举表
///
/// 运行时加载的组件定义也会被转发到这里，保证宿主侧
/// 的"列出所有组件类型"包含它们
pub trait HostRegistry: Send + Sync {
    /// 添加组件定义
    fn add_definition(&self, definition: ComponentDefinition);

    /// 是否存在指定ID的定义
    fn contains(&self, widget_id: &WidgetId) -> bool;

    /// 定义数量的可观察计数，用于"内置组件已就绪"门控
    fn definition_count(&self) -> watch::Receiver<usize>;
}

/// 内存宿主注册表
pub struct MemoryHostRegistry {
    definitions: DashMap<WidgetId, ComponentDefinition>,
    count_tx: watch::Sender<usize>,
}

impl MemoryHostRegistry {
    pub fn new() -> Self {
        let (count_tx, _rx) = watch::channel(0);
        Self {
            definitions: DashMap::new(),
            count_tx,
        }
    }

    /// 读取单个定义
    pub fn get(&self, widget_id: &WidgetId) -> Option<ComponentDefinition> {
        self.definitions.get(widget_id).map(|entry| entry.value().clone())
    }

    /// 当前定义数量
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for MemoryHostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry for MemoryHostRegistry {
    fn add_definition(&self, definition: ComponentDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
        self.count_tx.send_replace(self.definitions.len());
    }

    fn contains(&self, widget_id: &WidgetId) -> bool {
        self.definitions.contains_key(widget_id)
    }

    fn definition_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }
}

/// 用户可见进度通道 - 单条原地更新的消息，不堆叠多条通知
pub trait ProgressChannel: Send + Sync {
    /// 原地更新进度文本
    fn update(&self, text: &str);

    /// 发出一次性警告
    fn alert(&self, text: &str);

    /// 关闭进度消息
    fn close(&self);
}

/// 基于tracing的进度通道 - 没有UI时的默认实现
pub struct TracingProgressChannel;

impl ProgressChannel for TracingProgressChannel {
    fn update(&self, text: &str) {
        info!(progress = %text, "Widget load progress");
    }

    fn alert(&self, text: &str) {
        warn!(alert = %text, "Widget load warning");
    }

    fn close(&self) {
        info!("Widget load progress closed");
    }
}

/// 记录型进度通道（测试用）
pub struct RecordingProgressChannel {
    updates: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl RecordingProgressChannel {
    pub fn new() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl Default for RecordingProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressChannel for RecordingProgressChannel {
    fn update(&self, text: &str) {
        self.updates.lock().push(text.to_string());
    }

    fn alert(&self, text: &str) {
        self.alerts.lock().push(text.to_string());
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_registry_count_observable() {
        let registry = MemoryHostRegistry::new();
        let mut count_rx = registry.definition_count();
        assert_eq!(*count_rx.borrow(), 0);

        registry.add_definition(ComponentDefinition::new("builtin_text", "Text"));
        count_rx.changed().await.unwrap();
        assert_eq!(*count_rx.borrow(), 1);
        assert!(registry.contains(&"builtin_text".to_string()));
    }

    #[test]
    fn test_host_registry_last_write_wins() {
        let registry = MemoryHostRegistry::new();
        registry.add_definition(ComponentDefinition::new("w1", "First"));
        registry.add_definition(ComponentDefinition::new("w1", "Second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&"w1".to_string()).unwrap().name, "Second");
    }

    #[test]
    fn test_recording_progress_channel() {
        let channel = RecordingProgressChannel::new();
        channel.update("Loading (1/2)");
        channel.alert("bundle 'b' failed");
        channel.close();

        assert_eq!(channel.updates(), vec!["Loading (1/2)".to_string()]);
        assert_eq!(channel.alerts().len(), 1);
        assert!(channel.is_closed());
    }
}
