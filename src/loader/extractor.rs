//! 插件提取器
//!
//! 扫描导出对象，把每个导出值分类为"可插拔模块描述符"或"无关值"。
//! 识别基于结构化标记字段，没有共享基类型可依赖。

use crate::types::{ExportsObject, ModuleDescriptor, MODULE_MARKER_FIELD};
use tracing::{debug, warn};

/// 结构化谓词：该导出值是否携带模块级标记
pub fn is_module_descriptor(value: &serde_json::Value) -> bool {
    value
        .get(MODULE_MARKER_FIELD)
        .and_then(serde_json::Value::as_bool)
        == Some(true)
}

/// 插件提取器
pub struct PluginExtractor;

impl PluginExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从导出对象中提取所有模块描述符
    ///
    /// 未通过谓词的导出值（辅助函数、常量等）是预期情况，静默忽略；
    /// 携带标记但无法反序列化的值记录警告后跳过。
    /// 多个描述符之间不保证顺序。
    pub fn extract(&self, exports: &ExportsObject) -> Vec<ModuleDescriptor> {
        let mut descriptors = Vec::new();

        for (symbol, value) in exports {
            if !is_module_descriptor(value) {
                continue;
            }

            match serde_json::from_value::<ModuleDescriptor>(value.clone()) {
                Ok(descriptor) => {
                    debug!(symbol = %symbol, module = %descriptor.module_name, "Recognized module descriptor");
                    descriptors.push(descriptor);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "Marked export failed to deserialize as module descriptor");
                }
            }
        }

        descriptors
    }
}

impl Default for PluginExtractor {
    fn default() -> Self {
        Self::new()
    }
}
