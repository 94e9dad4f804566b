//! PHP AST 查看器核心库
//!
//! 提供基于位置的 AST 导航：光标定位最小节点、节点 ⇄ 结构路径互查、
//! 树视图/JSON 视图与选中状态的同步。解析器与界面均在本库之外。

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::ast_source::{AstSource, CachedAstSource, ParseFailure, ParseOutcome};
pub use model::classifier::{is_ast_node, Position, PositionSchema};
pub use model::config::{ViewMode, ViewerConfig};
pub use model::data_core::{NodeClick, Selection, StaleChoice, ViewerError, ViewerState};
pub use model::locator::{locate, CursorQuery};
pub use model::path::{find_path, resolve_path, NodePath, PathError, PathSegment};
pub use model::tree::AstTree;
pub use vm::bridge::ViewCommand;
