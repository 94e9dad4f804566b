//! Clipboard  cross-platform clipboard helpers

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Clip(String),
    #[error("剪贴板功能未启用")]
    Disabled,
}

/// 复制节点时的文本：pretty JSON
pub fn clipboard_payload(node: &Value) -> Result<String, ClipboardError> {
    serde_json::to_string_pretty(node).map_err(|e| ClipboardError::Clip(e.to_string()))
}

/// 将文本复制到系统剪贴板
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    use copypasta::{ClipboardContext, ClipboardProvider};
    let mut ctx = ClipboardContext::new().map_err(|e| ClipboardError::Clip(e.to_string()))?;
    ctx.set_contents(text.to_string())
        .map_err(|e| ClipboardError::Clip(e.to_string()))
}

/// 按配置开关复制节点
pub fn copy_node(node: &Value, enabled: bool) -> Result<(), ClipboardError> {
    if !enabled {
        return Err(ClipboardError::Disabled);
    }
    let text = clipboard_payload(node)?;
    copy_to_clipboard(&text)?;
    tracing::info!("已复制 {} 字符到剪贴板", text.chars().count());
    Ok(())
}
