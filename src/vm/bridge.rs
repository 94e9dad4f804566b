//! VM桥接层：模型与外部视图之间的指令
//!
//! 视图层（编辑器、树/JSON 面板）不在本 crate 内，`ViewerState` 只返回
//! `ViewCommand`，由调用方转发给对应的视图。

use serde::Serialize;

use crate::model::path::NodePath;
use crate::model::text::TextRange;

// === 常量定义（消除魔法值） ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_PARSING: &str = "正在解析...";
pub const STATUS_PARSED: &str = "解析完成";
pub const STATUS_STALE: &str = "源码已修改，AST 已过期";
pub const STATUS_COPIED: &str = "已复制到剪贴板";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";
/// 解析器缺失时给用户的提示
pub const HINT_PARSER_UNAVAILABLE: &str = "请确认 PHP 已安装并在 PATH 中，且已安装 nikic/php-parser";

/// 发往视图层的指令，序列化为 `{"type": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ViewCommand {
    /// 在源码中高亮；`reveal` 为真时滚动到可见区域
    #[serde(rename_all = "camelCase")]
    HighlightRange { range: TextRange, reveal: bool },
    ClearHighlight,
    /// 展开从根到该路径上的全部容器
    ExpandAlong(NodePath),
    #[serde(rename_all = "camelCase")]
    ScrollIntoView { element_id: String },
    /// AST 与当前源码版本不一致，询问用户是否重新解析
    #[serde(rename_all = "camelCase")]
    PromptStaleSource { parsed_version: u64, current_version: u64 },
    RequestReparse,
    ShowError { message: String },
}

impl ViewCommand {
    /// 状态栏文字
    pub fn status_text(&self) -> Option<String> {
        match self {
            ViewCommand::PromptStaleSource { .. } => Some(STATUS_STALE.to_string()),
            ViewCommand::RequestReparse => Some(STATUS_PARSING.to_string()),
            ViewCommand::ShowError { message } => Some(format!("{}{}", STATUS_ERROR_PREFIX, message)),
            _ => None,
        }
    }
}
