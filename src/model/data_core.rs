//! ViewerState：查看器核心状态（源码、AST、选中状态）与双向同步

use std::path::Path;

use jsonpath_rust::JsonPath; // 提供 query 扩展
use serde_json::Value;
use thiserror::Error;

use crate::model::ast_source::{decode_parser_output, AstSource, ParseFailure, ParseOutcome, SourceError};
use crate::model::breadcrumb::{breadcrumb_trail, Crumb};
use crate::model::config::{ViewMode, ViewerConfig};
use crate::model::json_view::{build_json_rows, JsonRow};
use crate::model::locator::CursorQuery;
use crate::model::path::{NodePath, PathError};
use crate::model::shadow_tree::{AstTreeNode, NodeId};
use crate::model::text::SourceDocument;
use crate::model::tree::AstTree;
use crate::utils::fs::read_text_file;
use crate::vm::bridge::{ViewCommand, HINT_PARSER_UNAVAILABLE, STATUS_PARSING};

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("JSONPath错误: {0}")]
    JsonPath(String),
    #[error("状态错误: {0}")]
    State(String),
    #[error("路径错误: {0}")]
    Path(#[from] PathError),
    #[error("解析器错误: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Selected { node: NodeId, path: NodePath },
}

/// 树视图/JSON 视图上的点击
#[derive(Debug, Clone, PartialEq)]
pub enum NodeClick {
    Path(NodePath),
    /// UI 传来的 namespace，如 `["root", "0", "stmts"]`
    Namespace(Vec<String>),
    /// 节点内容（例如 webview 消息里的节点副本）
    Node(Value),
    Id(NodeId),
}

/// AST 过期时用户的选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleChoice {
    Reparse,
    ContinueAnyway,
}

#[derive(Debug)]
pub struct ViewerState {
    config: ViewerConfig,
    document: SourceDocument,
    tree: Option<AstTree>,
    /// 生成当前 AST 时的源码版本
    parsed_version: Option<u64>,
    last_error: Option<ParseFailure>,
    selection: Selection,
    current_offset: Option<usize>,
    view_mode: ViewMode,
    /// 用户已确认继续使用过期 AST（下次解析前有效）
    accept_stale: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl ViewerState {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            view_mode: config.default_view,
            config,
            document: SourceDocument::default(),
            tree: None,
            parsed_version: None,
            last_error: None,
            selection: Selection::Idle,
            current_offset: None,
            accept_stale: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn document(&self) -> &SourceDocument {
        &self.document
    }

    /// 更新源码文本，返回新的版本号；AST 不会自动更新
    pub fn set_source(&mut self, text: impl Into<String>) -> u64 {
        let version = self.document.set_text(text);
        tracing::debug!("源码版本更新为 {}", version);
        version
    }

    /// 读取源码文件
    pub fn load_source_file(&mut self, p: &Path) -> Result<u64, ViewerError> {
        let text = read_text_file(p)?;
        Ok(self.set_source(text))
    }

    /// 读取解析器输出文件（裸数组或 `{"result": ...}` 包装），视为对当前源码版本的解析结果
    pub fn load_ast_file(&mut self, p: &Path) -> Result<Vec<ViewCommand>, ViewerError> {
        let raw = read_text_file(p)?;
        let outcome = decode_parser_output(&raw)?;
        tracing::info!("AST 文件已加载: {}", p.display());
        Ok(self.on_reparsed(outcome, self.document.version()))
    }

    /// 用给定解析器解析当前源码
    ///
    /// 解析器返回的位置须相对于 `document().text()`，`FnAstSource` 会扣除预处理前缀。
    pub fn reparse_with<S: AstSource>(&mut self, source: &mut S) -> Vec<ViewCommand> {
        let version = self.document.version();
        tracing::info!("{} (版本 {})", STATUS_PARSING, version);
        let outcome = source.parse(self.document.text());
        self.on_reparsed(outcome, version)
    }

    /// 新的解析结果到达：选中状态全部清空
    pub fn on_reparsed(&mut self, outcome: ParseOutcome, version: u64) -> Vec<ViewCommand> {
        self.selection = Selection::Idle;
        self.current_offset = None;
        self.accept_stale = false;

        let mut commands = vec![ViewCommand::ClearHighlight];
        match outcome {
            ParseOutcome::Parsed(roots) => {
                let tree = AstTree::new(roots, self.config.position.clone());
                tracing::info!("AST 已更新: 版本 {}，{} 个节点", version, tree.len());
                self.tree = Some(tree);
                self.parsed_version = Some(version);
                self.last_error = None;
            }
            ParseOutcome::Failed(failure) => {
                tracing::warn!("解析失败: {}", failure.message);
                let message = if failure.unavailable {
                    format!("{} ({})", failure.message, HINT_PARSER_UNAVAILABLE)
                } else {
                    failure.message.clone()
                };
                commands.push(ViewCommand::ShowError { message });
                self.tree = None;
                self.parsed_version = None;
                self.last_error = Some(failure);
            }
        }
        commands
    }

    /// AST 是否落后于当前源码
    pub fn is_stale(&self) -> bool {
        match self.parsed_version {
            Some(parsed) => self.tree.is_some() && parsed != self.document.version(),
            None => false,
        }
    }

    fn stale_prompt(&self) -> Option<ViewCommand> {
        if self.accept_stale || !self.is_stale() {
            return None;
        }
        let parsed_version = self.parsed_version?;
        tracing::warn!(
            "AST 已过期: 解析版本 {}，当前版本 {}",
            parsed_version,
            self.document.version()
        );
        Some(ViewCommand::PromptStaleSource {
            parsed_version,
            current_version: self.document.version(),
        })
    }

    pub fn resolve_stale(&mut self, choice: StaleChoice) -> Vec<ViewCommand> {
        match choice {
            StaleChoice::Reparse => vec![ViewCommand::RequestReparse],
            StaleChoice::ContinueAnyway => {
                self.accept_stale = true;
                Vec::new()
            }
        }
    }

    /// 光标移动：选中包含光标的最小节点
    pub fn on_cursor_moved(&mut self, query: CursorQuery) -> Vec<ViewCommand> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        if let Some(prompt) = self.stale_prompt() {
            return vec![prompt];
        }

        let hit = tree.locate(&query);
        self.current_offset = Some(query.offset);
        match hit {
            Some(id) if self.selected_id() == Some(id) => Vec::new(),
            Some(id) => self.select(id, false),
            None if self.config.clear_selection_on_miss && self.selected_id().is_some() => {
                tracing::debug!("光标 {} 处没有节点，清空选中", query.offset);
                self.clear_selection()
            }
            None => Vec::new(),
        }
    }

    /// 视图中点击节点：解析路径并高亮源码
    pub fn on_node_clicked(&mut self, click: NodeClick) -> Vec<ViewCommand> {
        let Some(tree) = self.tree.as_ref() else {
            tracing::warn!("AST 尚未加载，忽略点击");
            return Vec::new();
        };
        if let Some(prompt) = self.stale_prompt() {
            return vec![prompt];
        }

        let resolved: Result<Option<NodeId>, PathError> = match click {
            NodeClick::Id(id) => Ok(tree.index().get(id).map(|n| n.id)),
            NodeClick::Node(value) => Ok(tree.id_of(&value)),
            NodeClick::Path(path) => tree.id_at(&path),
            NodeClick::Namespace(namespace) => match NodePath::from_namespace(&namespace) {
                Ok(path) => tree.id_at(&path),
                Err(e) => {
                    debug_assert!(false, "非法 namespace {:?}: {}", namespace, e);
                    tracing::error!("非法 namespace {:?}: {}", namespace, e);
                    return Vec::new();
                }
            },
        };

        match resolved {
            Ok(Some(id)) => self.select(id, true),
            Ok(None) => {
                tracing::debug!("点击的值不是 AST 节点");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("路径已失效，清空选中: {}", e);
                self.clear_selection()
            }
        }
    }

    /// 按 JSONPath 选中第一个命中的 AST 节点
    pub fn select_json_path(&mut self, json_path: &str) -> Result<Vec<ViewCommand>, ViewerError> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| ViewerError::State("AST尚未加载".into()))?;
        let hits: Vec<&Value> = tree
            .root()
            .query(json_path)
            .map_err(|e| ViewerError::JsonPath(e.to_string()))?;
        let id = hits
            .into_iter()
            .find_map(|v| tree.index().id_of(v))
            .ok_or_else(|| ViewerError::JsonPath("未匹配到任何 AST 节点".into()))?;
        Ok(self.select(id, true))
    }

    fn select(&mut self, id: NodeId, reveal: bool) -> Vec<ViewCommand> {
        let Some(tree) = self.tree.as_mut() else {
            return Vec::new();
        };
        let Some((path, position)) = tree.index().get(id).map(|n| (n.path.clone(), n.position)) else {
            return Vec::new();
        };
        tree.index_mut().expand_ancestors(id);

        let range = self.document.highlight_range(&position);
        if reveal {
            self.current_offset = Some(position.start_offset);
        }
        tracing::debug!("选中节点 {}: {}", id, path);
        let element_id = path.element_id();
        self.selection = Selection::Selected {
            node: id,
            path: path.clone(),
        };
        vec![
            ViewCommand::HighlightRange { range, reveal },
            ViewCommand::ExpandAlong(path),
            ViewCommand::ScrollIntoView { element_id },
        ]
    }

    pub fn clear_selection(&mut self) -> Vec<ViewCommand> {
        self.selection = Selection::Idle;
        self.current_offset = None;
        vec![ViewCommand::ClearHighlight]
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggled();
        self.view_mode
    }

    /// 树视图中展开/折叠节点
    pub fn toggle_tree_node(&mut self, id: NodeId) {
        if let Some(tree) = self.tree.as_mut() {
            tree.index_mut().toggle_node_expanded(id);
        }
    }

    pub fn tree(&self) -> Option<&AstTree> {
        self.tree.as_ref()
    }

    pub fn last_error(&self) -> Option<&ParseFailure> {
        self.last_error.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_id(&self) -> Option<NodeId> {
        match &self.selection {
            Selection::Selected { node, .. } => Some(*node),
            Selection::Idle => None,
        }
    }

    pub fn selected_node(&self) -> Option<&Value> {
        let id = self.selected_id()?;
        self.tree.as_ref()?.node(id)
    }

    pub fn current_path(&self) -> Option<&NodePath> {
        match &self.selection {
            Selection::Selected { path, .. } => Some(path),
            Selection::Idle => None,
        }
    }

    /// 未选中时为空
    pub fn current_namespace(&self) -> Vec<String> {
        self.current_path().map(NodePath::namespace).unwrap_or_default()
    }

    pub fn current_offset(&self) -> Option<usize> {
        self.current_offset
    }

    /// 树视图中当前可见的行
    pub fn tree_rows(&self) -> Vec<&AstTreeNode> {
        match &self.tree {
            Some(tree) => tree.index().visible_rows().collect(),
            None => Vec::new(),
        }
    }

    /// JSON 视图中当前可见的行
    pub fn json_rows(&self) -> Vec<JsonRow> {
        match &self.tree {
            Some(tree) => build_json_rows(tree.root(), self.current_path(), &self.config, tree.schema()),
            None => Vec::new(),
        }
    }

    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        match (&self.tree, self.current_path()) {
            (Some(tree), Some(path)) => breadcrumb_trail(tree, path),
            _ => Vec::new(),
        }
    }

    /// 选中节点的 pretty JSON（复制到剪贴板用）
    pub fn selected_node_pretty(&self) -> Result<Option<String>, ViewerError> {
        match self.selected_node() {
            Some(node) => Ok(Some(serde_json::to_string_pretty(node)?)),
            None => Ok(None),
        }
    }
}
