//! LivePanel 配置管理系统
//!
//! 支持YAML配置文件驱动的加载器设置

use crate::error::{LivePanelError, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 加载器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// 当前宿主应用路径（用于解析"当前应用"）
    pub app_path: String,
    /// Bundle命名空间根路径模板，`{bundle_id}` 会被替换
    pub bundle_base_path: String,
    /// 导入清单文件名
    pub manifest_file: String,
    /// 是否在清单请求上附加防缓存参数
    pub cache_busting: bool,
    /// 宿主版本覆盖（默认为框架自身版本）
    pub host_version: Option<Version>,
    /// 宿主提供的能力表：能力名 -> 版本
    pub host_capabilities: HashMap<String, Version>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            app_path: "/".to_string(),
            bundle_base_path: "/widgets/{bundle_id}".to_string(),
            manifest_file: "import-manifest.js".to_string(),
            cache_busting: true,
            host_version: None,
            host_capabilities: HashMap::new(),
        }
    }
}

impl LoaderConfig {
    /// 从YAML文件加载配置
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.app_path.is_empty() {
            return Err(LivePanelError::config("app_path must not be empty"));
        }
        if !self.bundle_base_path.contains("{bundle_id}") {
            return Err(LivePanelError::config(
                "bundle_base_path must contain the {bundle_id} placeholder",
            ));
        }
        if self.manifest_file.is_empty() {
            return Err(LivePanelError::config("manifest_file must not be empty"));
        }
        Ok(())
    }

    /// 解析后的宿主版本
    pub fn resolved_host_version(&self) -> Result<Version> {
        match &self.host_version {
            Some(version) => Ok(version.clone()),
            None => Version::parse(crate::VERSION).map_err(|e| {
                LivePanelError::config(&format!("invalid framework version: {}", e))
            }),
        }
    }

    /// Bundle命名空间根路径
    pub fn bundle_root(&self, bundle_id: &str) -> String {
        self.bundle_base_path.replace("{bundle_id}", bundle_id)
    }

    /// 设置宿主能力
    pub fn with_capability(mut self, name: &str, version: Version) -> Self {
        self.host_capabilities.insert(name.to_string(), version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.cache_busting);
    }

    #[test]
    fn test_bundle_root_substitution() {
        let config = LoaderConfig::default();
        assert_eq!(config.bundle_root("abc"), "/widgets/abc");
    }

    #[test]
    fn test_invalid_base_path_rejected() {
        let config = LoaderConfig {
            bundle_base_path: "/widgets/static".to_string(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(LivePanelError::Config { .. })));
    }

    #[test]
    fn test_resolved_host_version_default() {
        let config = LoaderConfig::default();
        let version = config.resolved_host_version().unwrap();
        assert_eq!(version.to_string(), crate::VERSION);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = LoaderConfig::default()
            .with_capability("render", Version::new(1, 2, 0));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: LoaderConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.app_path, config.app_path);
        assert_eq!(
            parsed.host_capabilities.get("render"),
            Some(&Version::new(1, 2, 0))
        );
    }
}
