//! 宿主调度拦截
//!
//! 实现宿主暴露的可插拔组件解析器接口，使内置组件与运行时
//! 加载组件通过同一个识别分支调度。批次完成前到达的解析请求
//! 挂起在加载门控上，门控打开后重新解析一次。

use crate::error::{LivePanelError, Result};
use crate::host::HostRegistry;
use crate::loader::gate::LoadGate;
use crate::loader::registry::{ConfigPanel, WidgetFactoryTable, WidgetInstance};
use crate::types::{WidgetConfig, WidgetId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// 解析结果
#[derive(Debug)]
pub enum Resolution {
    /// 宿主内置组件，由宿主的静态解析器继续处理
    Builtin,
    /// 运行时加载组件，已通过其工厂构建
    Runtime(WidgetInstance),
}

/// 宿主可插拔解析器接口 - 宿主把每次组件实例化请求交给它
#[async_trait]
pub trait WidgetResolver: Send + Sync {
    /// 解析一次组件实例化请求
    async fn resolve(&self, widget_id: &WidgetId, config: WidgetConfig) -> Result<Resolution>;

    /// 配置变更时重新进入同一解析路径
    async fn on_config_changed(
        &self,
        widget_id: &WidgetId,
        config: WidgetConfig,
    ) -> Result<Resolution>;
}

/// 运行时组件解析器
///
/// 请求状态机：Pending -> Resolved，或
/// Pending -> Waiting(门控关闭) -> Pending -> {Resolved | UnknownComponent}
pub struct RuntimeWidgetResolver {
    table: Arc<WidgetFactoryTable>,
    host: Arc<dyn HostRegistry>,
    gate: LoadGate,
}

impl RuntimeWidgetResolver {
    pub fn new(
        table: Arc<WidgetFactoryTable>,
        host: Arc<dyn HostRegistry>,
        gate: LoadGate,
    ) -> Self {
        Self { table, host, gate }
    }

    /// 打开配置面板；面板未声明时视为未知组件
    pub async fn open_config_panel(&self, widget_id: &WidgetId) -> Result<ConfigPanel> {
        self.await_entry(widget_id).await?;
        let entry = self
            .table
            .get(widget_id)
            .ok_or_else(|| LivePanelError::UnknownComponent {
                widget_id: widget_id.clone(),
            })?;
        let factory = entry
            .config_panel
            .ok_or_else(|| LivePanelError::UnknownComponent {
                widget_id: widget_id.clone(),
            })?;
        factory()
    }

    fn try_resolve(
        &self,
        widget_id: &WidgetId,
        config: &WidgetConfig,
    ) -> Result<Option<Resolution>> {
        // 本地工厂表对运行时组件是权威来源，优先于宿主静态解析
        if let Some(entry) = self.table.get(widget_id) {
            let widget = (entry.render)(config.clone())?;
            return Ok(Some(Resolution::Runtime(widget)));
        }
        if self.host.contains(widget_id) {
            return Ok(Some(Resolution::Builtin));
        }
        Ok(None)
    }

    async fn await_entry(&self, widget_id: &WidgetId) -> Result<()> {
        if self.table.contains(widget_id) {
            return Ok(());
        }
        if !self.gate.is_open() {
            self.gate.wait_open().await;
        }
        if self.table.contains(widget_id) {
            Ok(())
        } else {
            Err(LivePanelError::UnknownComponent {
                widget_id: widget_id.clone(),
            })
        }
    }
}

#[async_trait]
impl WidgetResolver for RuntimeWidgetResolver {
    async fn resolve(&self, widget_id: &WidgetId, config: WidgetConfig) -> Result<Resolution> {
        // 门控状态先于首次解析读取：若此刻已打开，注册表不会再变化
        let was_open = self.gate.is_open();

        if let Some(resolution) = self.try_resolve(widget_id, &config)? {
            return Ok(resolution);
        }

        if !was_open {
            debug!(widget_id = %widget_id, "Resolution waiting for load gate");
            self.gate.wait_open().await;
            if let Some(resolution) = self.try_resolve(widget_id, &config)? {
                return Ok(resolution);
            }
        }

        Err(LivePanelError::UnknownComponent {
            widget_id: widget_id.clone(),
        })
    }

    async fn on_config_changed(
        &self,
        widget_id: &WidgetId,
        config: WidgetConfig,
    ) -> Result<Resolution> {
        // 配置编辑不绕过调度：与新渲染走同一条解析路径
        self.resolve(widget_id, config).await
    }
}
