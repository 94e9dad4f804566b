//! 原始 JSON 视图：折叠策略与可见行
//!
//! 与树视图不同，JSON 视图展示全部字段（包括位置属性等非节点值），
//! 行按深度优先顺序排列，被折叠容器的子孙不输出。

use serde::Serialize;
use serde_json::Value;

use crate::model::classifier::{is_ast_node, node_kind, PositionSchema};
use crate::model::config::ViewerConfig;
use crate::model::path::{NodePath, PathSegment};

/// JSON 值类型（与 UI 展示解耦）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

impl ValueKind {
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Bool,
            Value::Null => ValueKind::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRow {
    /// 字段名或 `[下标]`，根行为 `root`
    pub name: String,
    pub path: NodePath,
    pub kind: ValueKind,
    /// 子元素数量（对象字段数 / 数组长度）
    pub children: u32,
    /// 轻量预览
    pub preview: String,
    pub depth: u32,
    /// 容器是否折叠；标量恒为 false
    pub collapsed: bool,
    pub selected: bool,
    pub is_node: bool,
}

/// 容器是否默认折叠
///
/// 当前选中路径上的容器永不折叠；`alwaysCollapseFields` 中的字段总是折叠；
/// 其余按 namespace 长度与 `expandDepth` 比较。
pub fn should_collapse(
    path: &NodePath,
    field_name: Option<&str>,
    current: Option<&NodePath>,
    config: &ViewerConfig,
) -> bool {
    if current.is_some_and(|current| current.starts_with(path)) {
        return false;
    }
    if let Some(name) = field_name {
        if config.always_collapse_fields.iter().any(|f| f == name) {
            return true;
        }
    }
    path.namespace_len() > config.expand_depth
}

fn preview_of(v: &Value, schema: &PositionSchema) -> String {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if s.chars().count() > 32 {
                let truncated: String = s.chars().take(32).collect();
                format!("\"{}...\"", truncated)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(m) => match node_kind(v, schema) {
            Some(kind) => format!("{{..}} {}", kind),
            None => format!("{{..}} ({} keys)", m.len()),
        },
        Value::Array(a) => format!("[..] ({} items)", a.len()),
    }
}

struct RowContext<'c> {
    current: Option<&'c NodePath>,
    config: &'c ViewerConfig,
    schema: &'c PositionSchema,
}

/// 生成 JSON 视图的可见行，`root` 为根节点数组
pub fn build_json_rows(
    root: &Value,
    current: Option<&NodePath>,
    config: &ViewerConfig,
    schema: &PositionSchema,
) -> Vec<JsonRow> {
    fn walk(out: &mut Vec<JsonRow>, ctx: &RowContext<'_>, v: &Value, path: &mut NodePath, depth: u32) {
        let (name, field_name) = match path.last() {
            Some(PathSegment::Field(field)) => (field.clone(), Some(field.as_str())),
            Some(PathSegment::Index(index)) => (format!("[{}]", index), None),
            None => ("root".to_string(), None),
        };
        let children = match v {
            Value::Object(m) => m.len() as u32,
            Value::Array(a) => a.len() as u32,
            _ => 0,
        };
        let collapsed = matches!(v, Value::Object(_) | Value::Array(_))
            && should_collapse(path, field_name, ctx.current, ctx.config);
        out.push(JsonRow {
            name,
            path: path.clone(),
            kind: ValueKind::of(v),
            children,
            preview: preview_of(v, ctx.schema),
            depth,
            collapsed,
            selected: ctx.current == Some(&*path),
            is_node: is_ast_node(v, ctx.schema),
        });
        if collapsed {
            return;
        }
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    path.push(PathSegment::Field(k.clone()));
                    walk(out, ctx, child, path, depth + 1);
                    path.pop();
                }
            }
            Value::Array(arr) => {
                for (idx, child) in arr.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    walk(out, ctx, child, path, depth + 1);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    let ctx = RowContext { current, config, schema };
    let mut out = Vec::with_capacity(256);
    let mut path = NodePath::root();
    walk(&mut out, &ctx, root, &mut path, 0);
    out
}
