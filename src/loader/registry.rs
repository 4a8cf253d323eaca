//! 组件注册桥
//!
//! 把组件定义规范化为注册表条目：构建绑定到所属模块上下文的
//! 渲染工厂与可选配置面板工厂，写入本地工厂表（同ID覆盖，
//! 后写胜出），并把定义转发给宿主注册表供宿主侧枚举。

use crate::error::{LivePanelError, Result};
use crate::host::HostRegistry;
use crate::loader::activator::{BindingContext, ModuleInstance};
use crate::types::{ComponentDefinition, WidgetConfig, WidgetId};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 活动组件实例 - 渲染工厂的产物
#[derive(Debug, Clone)]
pub struct WidgetInstance {
    /// 实例ID
    pub instance_id: Uuid,
    /// 组件ID
    pub widget_id: WidgetId,
    /// 所属模块名
    pub module_name: String,
    /// 实例配置
    pub config: WidgetConfig,
}

/// 配置面板实例
#[derive(Debug, Clone)]
pub struct ConfigPanel {
    /// 实例ID
    pub instance_id: Uuid,
    /// 组件ID
    pub widget_id: WidgetId,
    /// 所属模块名
    pub module_name: String,
}

/// 渲染工厂 - 绑定到所属模块的绑定上下文
pub type RenderFactory = Arc<dyn Fn(WidgetConfig) -> Result<WidgetInstance> + Send + Sync>;

/// 配置面板工厂
pub type ConfigPanelFactory = Arc<dyn Fn() -> Result<ConfigPanel> + Send + Sync>;

/// 注册表条目 - 组件定义的可调度缓存形态
#[derive(Clone)]
pub struct RegistryEntry {
    /// 组件ID
    pub widget_id: WidgetId,
    /// 渲染工厂
    pub render: RenderFactory,
    /// 可选配置面板工厂
    pub config_panel: Option<ConfigPanelFactory>,
    /// 所属模块的绑定上下文
    pub bindings: Arc<BindingContext>,
}

/// 本地组件工厂表
///
/// 仅在单次加载批次内由注册桥写入，门控打开后对调度侧只读
pub struct WidgetFactoryTable {
    entries: DashMap<WidgetId, RegistryEntry>,
}

impl WidgetFactoryTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// 写入条目，同ID静默覆盖；返回是否覆盖了已有条目
    pub fn insert(&self, entry: RegistryEntry) -> bool {
        self.entries
            .insert(entry.widget_id.clone(), entry)
            .is_some()
    }

    /// 查找条目
    pub fn get(&self, widget_id: &WidgetId) -> Option<RegistryEntry> {
        self.entries.get(widget_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, widget_id: &WidgetId) -> bool {
        self.entries.contains_key(widget_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WidgetFactoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 组件注册桥
pub struct RegistryBridge {
    table: Arc<WidgetFactoryTable>,
    host: Arc<dyn HostRegistry>,
}

impl RegistryBridge {
    pub fn new(table: Arc<WidgetFactoryTable>, host: Arc<dyn HostRegistry>) -> Self {
        Self { table, host }
    }

    /// 注册一个组件定义
    ///
    /// 标记为运行时来源，构建工厂，写入本地表并转发给宿主注册表。
    /// 工厂构建失败由调用方捕获处理，不影响批次内其余定义。
    pub fn register(
        &self,
        definition: &ComponentDefinition,
        instance: &ModuleInstance,
    ) -> Result<()> {
        let mut definition = definition.clone();
        definition.runtime_sourced = true;

        let render = build_render_factory(&definition, instance)?;
        let config_panel = if definition.has_config_panel {
            Some(build_config_panel_factory(&definition, instance))
        } else {
            None
        };

        let replaced = self.table.insert(RegistryEntry {
            widget_id: definition.id.clone(),
            render,
            config_panel,
            bindings: Arc::clone(&instance.bindings),
        });
        if replaced {
            debug!(widget_id = %definition.id, "Registry entry overwritten (last write wins)");
        }

        self.host.add_definition(definition.clone());
        info!(widget_id = %definition.id, module = %instance.module_name, "Runtime widget registered");
        Ok(())
    }
}

/// 构建渲染工厂
///
/// 定义可以通过`metadata.requires`声明额外的绑定需求；
/// 无法在所属模块上下文中解析时构建失败
fn build_render_factory(
    definition: &ComponentDefinition,
    instance: &ModuleInstance,
) -> Result<RenderFactory> {
    if definition.id.is_empty() {
        return Err(LivePanelError::FactoryConstruction {
            widget_id: definition.id.clone(),
            message: "definition has empty id".to_string(),
        });
    }

    if let Some(requires) = definition.metadata.get("requires") {
        let names: Vec<String> =
            serde_json::from_value(requires.clone()).map_err(|err| {
                LivePanelError::FactoryConstruction {
                    widget_id: definition.id.clone(),
                    message: format!("invalid 'requires' metadata: {}", err),
                }
            })?;
        for name in &names {
            if instance.bindings.resolve(name).is_none() {
                return Err(LivePanelError::FactoryConstruction {
                    widget_id: definition.id.clone(),
                    message: format!(
                        "binding '{}' not available in module '{}'",
                        name, instance.module_name
                    ),
                });
            }
        }
    }

    let widget_id = definition.id.clone();
    let bindings = Arc::clone(&instance.bindings);
    Ok(Arc::new(move |config: WidgetConfig| {
        Ok(WidgetInstance {
            instance_id: Uuid::new_v4(),
            widget_id: widget_id.clone(),
            module_name: bindings.module_name().to_string(),
            config,
        })
    }))
}

fn build_config_panel_factory(
    definition: &ComponentDefinition,
    instance: &ModuleInstance,
) -> ConfigPanelFactory {
    let widget_id = definition.id.clone();
    let bindings = Arc::clone(&instance.bindings);
    Arc::new(move || {
        Ok(ConfigPanel {
            instance_id: Uuid::new_v4(),
            widget_id: widget_id.clone(),
            module_name: bindings.module_name().to_string(),
        })
    })
}
