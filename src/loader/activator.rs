//! 模块激活器
//!
//! 把识别出的模块描述符实例化为绑定到宿主依赖图的活动模块实例。
//! 每个模块获得自己的绑定上下文，工厂内部的依赖查找只解析
//! 本模块的绑定，不会泄漏到其他模块或宿主全局绑定。

use crate::config::LoaderConfig;
use crate::error::{LivePanelError, Result};
use crate::types::{ComponentDefinition, ModuleDescriptor};
use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 宿主能力绑定 - 模块声明的依赖解析后的形态
#[derive(Debug, Clone)]
pub struct HostBinding {
    /// 能力名
    pub name: String,
    /// 宿主提供的能力版本
    pub version: Version,
}

/// 模块作用域的绑定上下文
///
/// 隔离不变式：一个模块的工厂只能看到本上下文中的绑定
#[derive(Debug)]
pub struct BindingContext {
    module_name: String,
    bindings: HashMap<String, HostBinding>,
}

impl BindingContext {
    /// 所属模块名
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// 解析一个绑定；不存在时返回None，绝不回退到宿主全局绑定
    pub fn resolve(&self, name: &str) -> Option<&HostBinding> {
        self.bindings.get(name)
    }

    /// 绑定数量
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// 活动模块实例 - 存活至进程结束，永不拆除
#[derive(Debug)]
pub struct ModuleInstance {
    /// 模块名
    pub module_name: String,
    /// 模块作用域的绑定上下文
    pub bindings: Arc<BindingContext>,
    /// 模块提供的组件定义列表
    pub definitions: Vec<ComponentDefinition>,
}

/// 模块激活器
pub struct ModuleActivator {
    host_version: Version,
    capabilities: HashMap<String, Version>,
}

impl ModuleActivator {
    pub fn new(host_version: Version) -> Self {
        Self {
            host_version,
            capabilities: HashMap::new(),
        }
    }

    /// 从配置构建：宿主版本与能力表
    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        let mut activator = Self::new(config.resolved_host_version()?);
        for (name, version) in &config.host_capabilities {
            activator.register_capability(name, version.clone());
        }
        Ok(activator)
    }

    /// 注册一项宿主能力
    pub fn register_capability(&mut self, name: &str, version: Version) {
        self.capabilities.insert(name.to_string(), version);
    }

    /// 激活模块描述符
    ///
    /// 版本不匹配或声明的依赖无法解析时返回`ActivationFailed`
    pub fn activate(&self, descriptor: ModuleDescriptor) -> Result<ModuleInstance> {
        self.check_host_version(&descriptor)?;

        let mut bindings = HashMap::new();
        for import in &descriptor.declared_imports {
            let version = self.capabilities.get(import).ok_or_else(|| {
                LivePanelError::activation_failed(
                    &descriptor.module_name,
                    format!("unresolved host capability '{}'", import),
                )
            })?;
            bindings.insert(
                import.clone(),
                HostBinding {
                    name: import.clone(),
                    version: version.clone(),
                },
            );
        }

        debug!(
            module = %descriptor.module_name,
            bindings = bindings.len(),
            components = descriptor.components.len(),
            "Activating module"
        );

        let context = Arc::new(BindingContext {
            module_name: descriptor.module_name.clone(),
            bindings,
        });

        info!(module = %descriptor.module_name, "Module activated");

        Ok(ModuleInstance {
            module_name: descriptor.module_name,
            bindings: context,
            definitions: descriptor.components,
        })
    }

    fn check_host_version(&self, descriptor: &ModuleDescriptor) -> Result<()> {
        if self.host_version < descriptor.min_host_version {
            return Err(LivePanelError::activation_failed(
                &descriptor.module_name,
                format!(
                    "requires host >= {}, host is {}",
                    descriptor.min_host_version, self.host_version
                ),
            ));
        }
        if let Some(max) = &descriptor.max_host_version {
            if &self.host_version > max {
                return Err(LivePanelError::activation_failed(
                    &descriptor.module_name,
                    format!("requires host <= {}, host is {}", max, self.host_version),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, imports: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor {
            module_name: name.to_string(),
            declared_imports: imports.iter().map(|i| i.to_string()).collect(),
            min_host_version: Version::new(1, 0, 0),
            max_host_version: None,
            components: vec![ComponentDefinition::new("w1", "Widget")],
        }
    }

    fn activator() -> ModuleActivator {
        let mut activator = ModuleActivator::new(Version::new(1, 5, 0));
        activator.register_capability("render", Version::new(2, 0, 0));
        activator.register_capability("storage", Version::new(1, 1, 0));
        activator
    }

    #[tokio::test]
    async fn test_activate_builds_binding_context() {
        let instance = activator()
            .activate(descriptor("charts", &["render", "storage"]))
            .unwrap();

        assert_eq!(instance.module_name, "charts");
        assert_eq!(instance.bindings.len(), 2);
        assert_eq!(
            instance.bindings.resolve("render").unwrap().version,
            Version::new(2, 0, 0)
        );
        assert_eq!(instance.definitions.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_import_fails_activation() {
        let result = activator().activate(descriptor("charts", &["gpu"]));
        match result {
            Err(LivePanelError::ActivationFailed { module, message }) => {
                assert_eq!(module, "charts");
                assert!(message.contains("gpu"));
            }
            other => panic!("expected ActivationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_min_host_version_enforced() {
        let mut d = descriptor("future", &[]);
        d.min_host_version = Version::new(9, 0, 0);
        assert!(activator().activate(d).is_err());
    }

    #[tokio::test]
    async fn test_max_host_version_enforced() {
        let mut d = descriptor("legacy", &[]);
        d.max_host_version = Some(Version::new(1, 0, 0));
        assert!(activator().activate(d).is_err());
    }

    #[tokio::test]
    async fn test_binding_isolation_between_modules() {
        let activator = activator();
        let a = activator.activate(descriptor("mod_a", &["render"])).unwrap();
        let b = activator.activate(descriptor("mod_b", &["storage"])).unwrap();

        // 一个模块的上下文解析不到另一个模块的绑定
        assert!(a.bindings.resolve("render").is_some());
        assert!(a.bindings.resolve("storage").is_none());
        assert!(b.bindings.resolve("storage").is_some());
        assert!(b.bindings.resolve("render").is_none());
    }
}
