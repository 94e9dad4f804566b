//! 结构路径（namespace）：从根容器到节点的字段名/下标序列
//!
//! 路径总以根标记 `root` 开头，根标记指向保存全部根节点的数组。
//! 正向查找 [`find_path`] 采用先序遍历、首个命中即返回；
//! 反向解析 [`resolve_path`] 逐段做字段/下标访问。

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::model::classifier::{is_same_node, PositionSchema};
use crate::model::walk::walk_nodes;

/// 根标记
pub const ROOT_MARKER: &str = "root";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("路径缺少根标记: {0}")]
    MissingRoot(String),
    #[error("无法解释的路径段: {0:?}")]
    InvalidSegment(String),
    #[error("路径 {path} 下不存在 {segment}")]
    Missing { path: String, segment: String },
    #[error("路径 {path} 处的值不是容器，无法继续访问 {segment}")]
    NotContainer { path: String, segment: String },
}

impl PathError {
    /// 路径本身合法，只是与当前树不符（通常是重新解析后的旧路径）
    pub fn is_stale(&self) -> bool {
        matches!(self, PathError::Missing { .. } | PathError::NotContainer { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl PathSegment {
    /// 纯数字视为下标，其余视为字段名
    fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::InvalidSegment(raw.to_string()));
        }
        if raw.chars().all(|c| c.is_ascii_digit()) {
            raw.parse::<usize>()
                .map(PathSegment::Index)
                .map_err(|_| PathError::InvalidSegment(raw.to_string()))
        } else {
            Ok(PathSegment::Field(raw.to_string()))
        }
    }
}

/// 节点地址。内部只存根标记之后的段，根标记在渲染时补上
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    /// 只含根标记的路径，指向根节点数组
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// 从 UI 给出的 namespace 构造，例如 `["root", "0", "stmts", "0"]`
    pub fn from_namespace<I, S>(namespace: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = namespace.into_iter();
        match iter.next() {
            Some(first) if first.as_ref() == ROOT_MARKER => {}
            Some(first) => return Err(PathError::MissingRoot(first.as_ref().to_string())),
            None => return Err(PathError::MissingRoot(String::new())),
        }
        let segments = iter
            .map(|raw| PathSegment::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// 根标记之后的段数；根路径为 0
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// namespace 长度（含根标记）
    pub fn namespace_len(&self) -> usize {
        self.segments.len() + 1
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// 按段比较的前缀判断（`root-1` 不是 `root-10` 的前缀）
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// 从根开始的所有前缀，包含自身
    pub fn prefixes(&self) -> impl Iterator<Item = NodePath> + '_ {
        (0..=self.segments.len()).map(move |len| NodePath {
            segments: self.segments[..len].to_vec(),
        })
    }

    pub fn namespace(&self) -> Vec<String> {
        std::iter::once(ROOT_MARKER.to_string())
            .chain(self.segments.iter().map(|s| s.to_string()))
            .collect()
    }

    /// 视图元素 id，例如 `root-0-stmts-0`
    pub fn element_id(&self) -> String {
        self.namespace().join("-")
    }

    /// RFC 9535 JSONPath，`$` 对应根节点数组
    pub fn to_json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            match segment {
                PathSegment::Index(index) => out.push_str(&format!("[{}]", index)),
                PathSegment::Field(name)
                    if !name.is_empty()
                        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
                {
                    out.push('.');
                    out.push_str(name);
                }
                PathSegment::Field(name) => {
                    out.push_str(&format!("['{}']", name.replace('\'', "\\'")));
                }
            }
        }
        out
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace().join(" > "))
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    /// 接受 `root.0.stmts.0`、`root/0/stmts/0`、`root > 0 > stmts > 0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c| c == '.' || c == '/' || c == '>')
            .map(str::trim)
            .collect();
        Self::from_namespace(parts)
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.namespace().serialize(serializer)
    }
}

/// 判定“同一节点”的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMatch {
    /// 引用同一内存位置
    Identity,
    /// 位置与类型相同
    Structural,
}

/// 正向查找：先按身份匹配，找不到再退回结构化匹配
///
/// `root` 为根容器（通常是根节点数组）。
pub fn find_path(root: &Value, target: &Value, schema: &PositionSchema) -> Option<NodePath> {
    find_path_with(root, target, schema, NodeMatch::Identity)
        .or_else(|| find_path_with(root, target, schema, NodeMatch::Structural))
}

/// 按指定匹配方式做先序遍历，首个命中即终止
pub fn find_path_with(
    root: &Value,
    target: &Value,
    schema: &PositionSchema,
    mode: NodeMatch,
) -> Option<NodePath> {
    let mut found = None;
    let _ = walk_nodes(root, schema, |path, node| {
        let hit = match mode {
            NodeMatch::Identity => std::ptr::eq(node, target),
            NodeMatch::Structural => is_same_node(target, node, schema),
        };
        if hit {
            found = Some(path.clone());
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

/// 单步访问；数组接受数字字段名，对象接受下标形式的键
fn step<'a>(current: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (current, segment) {
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        (Value::Array(items), PathSegment::Field(name)) => {
            name.parse::<usize>().ok().and_then(|index| items.get(index))
        }
        (Value::Object(map), PathSegment::Field(name)) => map.get(name),
        (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
        _ => None,
    }
}

/// 反向解析：从根容器逐段访问
pub fn resolve_path<'a>(root: &'a Value, path: &NodePath) -> Result<&'a Value, PathError> {
    let mut current = root;
    let mut visited = NodePath::root();
    for segment in path.segments() {
        current = match step(current, segment) {
            Some(next) => next,
            None if matches!(current, Value::Object(_) | Value::Array(_)) => {
                return Err(PathError::Missing {
                    path: visited.to_string(),
                    segment: segment.to_string(),
                })
            }
            None => {
                return Err(PathError::NotContainer {
                    path: visited.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
        visited.push(segment.clone());
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(kind: &str, start: usize, end: usize, extra: Value) -> Value {
        let mut value = json!({
            "nodeKind": kind,
            "position": {"startOffset": start, "endOffset": end, "startLine": 1, "endLine": 1}
        });
        if let (Value::Object(map), Value::Object(fields)) = (&mut value, extra) {
            map.extend(fields);
        }
        value
    }

    fn scenario_tree() -> Value {
        json!([node(
            "FunctionDecl",
            0,
            50,
            json!({"children": [node("Param", 10, 15, json!({}))]})
        )])
    }

    #[test]
    fn test_find_path_of_nested_param() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        let param = &root[0]["children"][0];

        let path = find_path(&root, param, &schema).expect("应该找到路径");
        assert_eq!(path.namespace(), vec!["root", "0", "children", "0"]);
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Index(0),
                PathSegment::Field("children".into()),
                PathSegment::Index(0)
            ]
        );

        let resolved = resolve_path(&root, &path).expect("路径应该可解析");
        assert!(std::ptr::eq(resolved, param), "解析结果应该是同一个引用");
    }

    #[test]
    fn test_round_trip_for_every_node() {
        let schema = PositionSchema::generic();
        let root = json!([
            node("A", 0, 30, json!({
                "left": node("B", 0, 10, json!({})),
                "wrapper": {"inner": [node("C", 12, 20, json!({}))]},
                "right": node("D", 21, 30, json!({"args": [node("E", 22, 23, json!({}))]}))
            })),
            node("F", 31, 40, json!({}))
        ]);

        let mut nodes = Vec::new();
        let _ = walk_nodes(&root, &schema, |_, value| {
            nodes.push(value);
            ControlFlow::Continue(())
        });
        assert_eq!(nodes.len(), 6);

        for target in nodes {
            let path = find_path(&root, target, &schema).unwrap();
            let again = find_path(&root, target, &schema).unwrap();
            assert_eq!(path, again, "路径计算应该是确定的");
            assert!(std::ptr::eq(resolve_path(&root, &path).unwrap(), target));
        }
    }

    #[test]
    fn test_identity_preferred_over_structural_twin() {
        let schema = PositionSchema::generic();
        // 两个位置完全相同的零宽兄弟节点
        let root = json!([node("Block", 0, 10, json!({
            "stmts": [node("Nop", 5, 5, json!({})), node("Nop", 5, 5, json!({}))]
        }))]);
        let second = &root[0]["stmts"][1];

        let by_identity = find_path(&root, second, &schema).unwrap();
        assert_eq!(by_identity.namespace(), vec!["root", "0", "stmts", "1"]);

        let detached = second.clone();
        let by_structure = find_path(&root, &detached, &schema).unwrap();
        assert_eq!(
            by_structure.namespace(),
            vec!["root", "0", "stmts", "0"],
            "脱离原树的目标按结构匹配，取遍历顺序中的第一个"
        );
    }

    #[test]
    fn test_find_path_miss() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        let stranger = node("Other", 100, 120, json!({}));
        assert_eq!(find_path(&root, &stranger, &schema), None);
        assert_eq!(
            find_path_with(&root, &root[0].clone(), &schema, NodeMatch::Identity),
            None,
            "克隆值不满足身份匹配"
        );
    }

    #[test]
    fn test_resolve_stale_path() {
        let root = scenario_tree();
        let stale: NodePath = "root.0.children.3".parse().unwrap();
        let err = resolve_path(&root, &stale).unwrap_err();
        assert!(err.is_stale());
        assert!(matches!(err, PathError::Missing { .. }));

        let too_deep: NodePath = "root.0.nodeKind.x".parse().unwrap();
        let err = resolve_path(&root, &too_deep).unwrap_err();
        assert!(matches!(err, PathError::NotContainer { .. }));
    }

    #[test]
    fn test_resolve_root_returns_container() {
        let root = scenario_tree();
        let resolved = resolve_path(&root, &NodePath::root()).unwrap();
        assert!(std::ptr::eq(resolved, &root));
    }

    #[test]
    fn test_namespace_parsing() {
        let path = NodePath::from_namespace(["root", "0", "stmts", "12"]).unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.element_id(), "root-0-stmts-12");
        assert_eq!(path.to_string(), "root > 0 > stmts > 12");

        let same: NodePath = "root / 0 / stmts / 12".parse().unwrap();
        assert_eq!(path, same);
        let arrows: NodePath = "root > 0 > stmts > 12".parse().unwrap();
        assert_eq!(path, arrows);

        assert!(matches!(
            NodePath::from_namespace(["data", "0"]),
            Err(PathError::MissingRoot(_))
        ));
        assert!(matches!(
            NodePath::from_namespace(Vec::<String>::new()),
            Err(PathError::MissingRoot(_))
        ));
        assert!(matches!(
            "root..stmts".parse::<NodePath>(),
            Err(PathError::InvalidSegment(_))
        ));
    }

    #[test]
    fn test_json_path_rendering() {
        let path = NodePath::from_segments(vec![
            PathSegment::Index(0),
            PathSegment::Field("stmts".into()),
            PathSegment::Index(2),
            PathSegment::Field("key with space".into()),
        ]);
        assert_eq!(path.to_json_path(), "$[0].stmts[2]['key with space']");
        assert_eq!(NodePath::root().to_json_path(), "$");
    }

    #[test]
    fn test_prefix_is_segment_wise() {
        let short: NodePath = "root.1".parse().unwrap();
        let long: NodePath = "root.10.stmts".parse().unwrap();
        let child: NodePath = "root.1.stmts".parse().unwrap();
        assert!(!long.starts_with(&short));
        assert!(child.starts_with(&short));
        assert_eq!(child.prefixes().count(), 3);
        assert_eq!(child.parent(), Some(short));
        assert_eq!(NodePath::root().parent(), None);
    }
}
