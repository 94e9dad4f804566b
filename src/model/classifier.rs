//! 节点分类器：判定任意 JSON 值是否为 AST 节点
//!
//! 判定完全是结构化的：对象上带有合法的位置属性即为节点，
//! 不依赖 nodeType 之类的类型标签，也不依赖固定的节点层级。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 位置属性的字段映射（默认对应 PHP-Parser 的 JSON 输出）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionSchema {
    /// 承载位置信息的字段名
    pub position_field: String,
    pub start_offset: String,
    pub end_offset: String,
    pub start_line: String,
    pub end_line: String,
    /// 节点类型字段，按顺序取第一个存在的字符串
    pub kind_fields: Vec<String>,
}

impl Default for PositionSchema {
    fn default() -> Self {
        Self::php_parser()
    }
}

impl PositionSchema {
    /// PHP-Parser：`attributes.{startFilePos,endFilePos,startLine,endLine}` + `nodeType`
    pub fn php_parser() -> Self {
        Self {
            position_field: "attributes".into(),
            start_offset: "startFilePos".into(),
            end_offset: "endFilePos".into(),
            start_line: "startLine".into(),
            end_line: "endLine".into(),
            kind_fields: vec!["nodeType".into(), "kind".into()],
        }
    }

    /// 通用形态：`position.{startOffset,endOffset,startLine,endLine}` + `nodeKind`
    pub fn generic() -> Self {
        Self {
            position_field: "position".into(),
            start_offset: "startOffset".into(),
            end_offset: "endOffset".into(),
            start_line: "startLine".into(),
            end_line: "endLine".into(),
            kind_fields: vec!["nodeKind".into()],
        }
    }
}

/// 节点在源码中的范围（偏移为字节，行号从 1 开始，结束偏移包含在内）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Position {
    /// 跨度，作为“更具体”的度量
    pub fn span(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// 行和偏移都落在范围内（闭区间）
    pub fn contains(&self, offset: usize, line: usize) -> bool {
        self.start_line <= line
            && line <= self.end_line
            && self.start_offset <= offset
            && offset <= self.end_offset
    }
}

/// 读取节点的位置；字段缺失、非整数或违反 start <= end 时返回 None
///
/// 例外：PHP-Parser 用 `end = start - 1` 表示零长度节点（如 `Expr_Error`），
/// 这种情况按 `start` 处的单点节点处理。
pub fn position_of(value: &Value, schema: &PositionSchema) -> Option<Position> {
    let attrs = value
        .as_object()?
        .get(&schema.position_field)?
        .as_object()?;
    let field = |name: &str| {
        attrs
            .get(name)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    };

    let mut position = Position {
        start_offset: field(&schema.start_offset)?,
        end_offset: field(&schema.end_offset)?,
        start_line: field(&schema.start_line)?,
        end_line: field(&schema.end_line)?,
    };
    if position.end_offset.checked_add(1) == Some(position.start_offset) {
        position.end_offset = position.start_offset;
        position.end_line = position.end_line.max(position.start_line);
    }

    (position.start_offset <= position.end_offset && position.start_line <= position.end_line)
        .then_some(position)
}

/// 是否为 AST 节点：非空对象且携带合法位置属性
///
/// 没有位置属性的包装对象不是节点，遍历时会被穿透而不会被匹配。
pub fn is_ast_node(value: &Value, schema: &PositionSchema) -> bool {
    position_of(value, schema).is_some()
}

/// 节点类型字符串（如 `Stmt_Function`）
pub fn node_kind<'a>(value: &'a Value, schema: &PositionSchema) -> Option<&'a str> {
    let map = value.as_object()?;
    schema
        .kind_fields
        .iter()
        .find_map(|field| map.get(field).and_then(Value::as_str))
}

/// 结构化等价：位置完全一致且类型一致（两者都无类型也算一致）
///
/// 仅用于目标节点脱离原树（如从序列化消息重建）时近似身份比较。
pub fn is_same_node(target: &Value, current: &Value, schema: &PositionSchema) -> bool {
    match (position_of(target, schema), position_of(current, schema)) {
        (Some(a), Some(b)) if a == b => node_kind(target, schema) == node_kind(current, schema),
        _ => false,
    }
}

/// 对象或数组
pub fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
