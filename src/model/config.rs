//! 查看器配置：默认视图、JSON 折叠策略、剪贴板开关、位置字段映射

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::classifier::PositionSchema;
use crate::model::data_core::ViewerError;
use crate::utils::fs::{read_json_file, write_json_file};

/// 右侧面板的显示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Tree,
    #[default]
    Json,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Tree => ViewMode::Json,
            ViewMode::Json => ViewMode::Tree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub default_view: ViewMode,
    /// 超过该深度的 JSON 容器默认折叠
    pub expand_depth: usize,
    pub enable_clipboard: bool,
    /// 总是折叠的字段名
    pub always_collapse_fields: Vec<String>,
    /// 光标未命中任何节点时是否清空选中
    pub clear_selection_on_miss: bool,
    pub position: PositionSchema,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_view: ViewMode::Json,
            expand_depth: 3,
            enable_clipboard: false,
            always_collapse_fields: vec!["attributes".to_string()],
            clear_selection_on_miss: true,
            position: PositionSchema::php_parser(),
        }
    }
}

impl ViewerConfig {
    /// 从 JSON 文件读取配置，缺省字段取默认值
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let value = read_json_file(path)?;
        let config = serde_json::from_value(value)?;
        tracing::info!("配置已加载: {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        write_json_file(path, &serde_json::to_value(self)?)?;
        tracing::info!("配置已保存: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().expect("创建临时文件失败");
        file.write_all(br#"{"expandDepth": 5, "defaultView": "tree", "position": {"positionField": "loc"}}"#)
            .expect("写入临时文件失败");

        let config = ViewerConfig::load(file.path()).expect("加载配置失败");
        assert_eq!(config.expand_depth, 5);
        assert_eq!(config.default_view, ViewMode::Tree);
        assert_eq!(config.always_collapse_fields, vec!["attributes"]);
        assert!(config.clear_selection_on_miss);
        assert_eq!(config.position.position_field, "loc");
        assert_eq!(config.position.start_offset, "startFilePos");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("viewer.json");
        let config = ViewerConfig {
            enable_clipboard: true,
            position: PositionSchema::generic(),
            ..ViewerConfig::default()
        };
        config.save(&path).expect("保存配置失败");
        assert_eq!(ViewerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"expandDepth": "deep"}"#).unwrap();
        assert!(ViewerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_view_mode_toggle() {
        assert_eq!(ViewMode::Json.toggled(), ViewMode::Tree);
        assert_eq!(ViewMode::Tree.toggled(), ViewMode::Json);
    }
}
