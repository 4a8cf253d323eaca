//! LivePanel 核心数据类型
//!
//! 运行时组件加载引擎使用的标识符与记录类型

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 基础标识符类型
pub type BundleId = String;
pub type WidgetId = String;
pub type AppId = String;
pub type ContextId = String;
pub type TimestampNs = i64;

/// 组件实例配置
pub type WidgetConfig = HashMap<String, serde_json::Value>;

/// 已认证的用户会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 用户ID
    pub user_id: String,
    /// 显示名称
    pub display_name: Option<String>,
}

impl Session {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: None,
        }
    }
}

/// 宿主应用记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// 应用ID
    pub id: AppId,
    /// 应用名称
    pub name: String,
    /// 应用路径（用于匹配当前宿主位置）
    pub path: String,
    /// 所有者用户ID
    pub owner: String,
    /// 是否为共享/订阅应用
    pub shared: bool,
    /// 应用记录上直接关联的Bundle列表
    pub bundle_ids: Vec<BundleId>,
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// 运行时上下文记录 - 持久化每个宿主应用配置加载的Bundle集合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// 记录ID
    pub id: ContextId,
    /// 所属应用ID
    pub app_id: AppId,
    /// 有序的Bundle标识符集合（插入顺序，无语义）
    pub bundle_ids: Vec<BundleId>,
    /// 最后更新时间
    pub updated_at: TimestampNs,
}

/// 一次成功导入产出的导出对象：符号名 -> 任意值
///
/// 提取完成后即被丢弃，不在进程内长期持有
pub type ExportsObject = HashMap<String, serde_json::Value>;

/// 模块描述符标记字段 - Bundle导出值通过该字段声明自己是可插拔模块
pub const MODULE_MARKER_FIELD: &str = "__livePanelModule__";

/// 可激活模块描述符
///
/// 通过结构化识别从导出对象中提取，没有共享基类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// 模块名称
    #[serde(rename = "moduleName")]
    pub module_name: String,
    /// 模块声明的宿主能力依赖
    #[serde(rename = "imports", default)]
    pub declared_imports: Vec<String>,
    /// 要求的最小宿主版本
    #[serde(rename = "minHostVersion")]
    pub min_host_version: Version,
    /// 兼容的最大宿主版本
    #[serde(rename = "maxHostVersion", default)]
    pub max_host_version: Option<Version>,
    /// 模块提供的组件定义列表
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

/// 组件定义 - 描述一个可实例化的插件UI组件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// 组件唯一ID
    pub id: WidgetId,
    /// 组件名称
    pub name: String,
    /// 组件描述
    #[serde(default)]
    pub description: String,
    /// 图标
    #[serde(default)]
    pub icon: Option<String>,
    /// 是否提供配置面板
    #[serde(rename = "hasConfigPanel", default)]
    pub has_config_panel: bool,
    /// 是否来自运行时加载（宿主内置组件为false）
    #[serde(rename = "runtimeSourced", default)]
    pub runtime_sourced: bool,
    /// 任意附加元数据
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ComponentDefinition {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            icon: None,
            has_config_panel: false,
            runtime_sourced: false,
            metadata: HashMap::new(),
        }
    }

    /// 声明配置面板
    pub fn with_config_panel(mut self) -> Self {
        self.has_config_panel = true;
        self
    }

    /// 附加元数据
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// 当前时间戳（纳秒）
pub fn now_ns() -> TimestampNs {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}
