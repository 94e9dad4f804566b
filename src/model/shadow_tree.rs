//! 影子树（Shadow Tree）：解析后一次性建立的节点索引
//!
//! 只存结构、路径与位置，不复制节点内容。每个节点分配稳定的整数 id，
//! 另建“节点地址 → id”和“路径 → id”两张表，重复查找无需再遍历整棵树。

use std::collections::HashMap;
use std::ops::ControlFlow;

use serde_json::Value;

use crate::model::classifier::{node_kind, position_of, Position, PositionSchema};
use crate::model::locator::CursorQuery;
use crate::model::path::{NodePath, PathSegment};
use crate::model::walk::walk_nodes;

/// 节点 id，即先序遍历中的序号
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct AstTreeNode {
    pub id: NodeId,
    /// 节点在父级中的字段名或 `[下标]`
    pub name: String,
    pub path: NodePath,
    /// 节点类型，缺失时为 `Unknown`
    pub kind: String,
    /// 树视图标签
    pub label: String,
    pub position: Position,
    pub parent: Option<NodeId>,
    /// 节点深度（用于UI缩进显示）
    pub depth: u32,
    /// 直接子节点数量
    pub children: u32,
    /// 是否展开（用于折叠/展开功能）
    pub expanded: bool,
    /// 是否可见（祖先全部展开）
    pub visible: bool,
}

#[derive(Debug, Default)]
pub struct AstIndex {
    nodes: Vec<AstTreeNode>,
    by_address: HashMap<usize, NodeId>,
    by_path: HashMap<NodePath, NodeId>,
}

fn address_of(value: &Value) -> usize {
    value as *const Value as usize
}

/// 节点的简短说明：优先取 name，其次取标量 value
fn node_detail(value: &Value) -> Option<String> {
    fn name_text(name: &Value) -> Option<String> {
        match name {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    let parts = map.get("parts")?.as_array()?;
                    let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
                    (!parts.is_empty()).then(|| parts.join("\\"))
                }),
            _ => None,
        }
    }

    let map = value.as_object()?;
    if let Some(detail) = map.get("name").and_then(name_text) {
        return Some(detail);
    }
    match map.get("value")? {
        Value::String(s) if s.chars().count() > 20 => {
            let truncated: String = s.chars().take(20).collect();
            Some(format!("{}...", truncated))
        }
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `Stmt_ClassMethod` 或 `Stmt_ClassMethod: foo`
pub fn node_label(kind: &str, value: &Value) -> String {
    match node_detail(value) {
        Some(detail) => format!("{}: {}", kind, detail),
        None => kind.to_string(),
    }
}

impl AstIndex {
    /// 以统一的先序遍历构建索引
    ///
    /// 地址表只在 `root` 未被修改、未被移动其内部元素期间有效，
    /// 因此索引总是和所属的树一同持有（见 `AstTree`）。
    pub fn build(root: &Value, schema: &PositionSchema) -> Self {
        let mut index = AstIndex::default();
        // 当前祖先链（先序遍历中，祖先一定是路径前缀）
        let mut ancestors: Vec<NodeId> = Vec::new();

        let _ = walk_nodes(root, schema, |path, value| {
            while let Some(&top) = ancestors.last() {
                if path.starts_with(&index.nodes[top].path) {
                    break;
                }
                ancestors.pop();
            }

            let Some(position) = position_of(value, schema) else {
                return ControlFlow::Continue(());
            };
            let id = index.nodes.len();
            let parent = ancestors.last().copied();
            if let Some(parent) = parent {
                index.nodes[parent].children += 1;
            }

            let kind = node_kind(value, schema).unwrap_or("Unknown").to_string();
            let name = match path.last() {
                Some(PathSegment::Index(i)) => format!("[{}]", i),
                Some(PathSegment::Field(field)) => field.clone(),
                None => "root".to_string(),
            };
            index.nodes.push(AstTreeNode {
                id,
                name,
                path: path.clone(),
                label: node_label(&kind, value),
                kind,
                position,
                parent,
                depth: ancestors.len() as u32,
                children: 0,
                expanded: false,
                visible: parent.is_none(),
            });
            index.by_address.insert(address_of(value), id);
            index.by_path.insert(path.clone(), id);
            ancestors.push(id);
            ControlFlow::Continue(())
        });

        tracing::debug!("影子树构建完成: {} 个节点", index.nodes.len());
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&AstTreeNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[AstTreeNode] {
        &self.nodes
    }

    /// 身份查找：`value` 必须是索引所属树中的引用
    pub fn id_of(&self, value: &Value) -> Option<NodeId> {
        self.by_address.get(&address_of(value)).copied()
    }

    pub fn id_by_path(&self, path: &NodePath) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// 结构化查找：位置与类型相同的第一个节点
    pub fn find_structural(&self, target: &Value, schema: &PositionSchema) -> Option<NodeId> {
        let position = position_of(target, schema)?;
        let kind = node_kind(target, schema).unwrap_or("Unknown");
        self.nodes
            .iter()
            .find(|n| n.position == position && n.kind == kind)
            .map(|n| n.id)
    }

    /// 与 [`crate::model::locator::locate`] 相同的规则，在索引上执行
    pub fn locate(&self, query: &CursorQuery) -> Option<NodeId> {
        let mut best: Option<&AstTreeNode> = None;
        for node in &self.nodes {
            if !node.position.contains(query.offset, query.line) {
                continue;
            }
            if best.map_or(true, |b| node.position.span() < b.position.span()) {
                best = Some(node);
            }
        }
        best.map(|n| n.id)
    }

    /// 从父到根的祖先 id（不含自身）
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent].parent;
        }
        out
    }

    /// 切换节点的展开状态
    pub fn toggle_node_expanded(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.expanded = !node.expanded;
        }
        self.update_visibility_by_expansion();
    }

    /// 展开全部祖先，使节点在树视图中可见
    pub fn expand_ancestors(&mut self, id: NodeId) {
        for ancestor in self.ancestors(id) {
            self.nodes[ancestor].expanded = true;
        }
        self.update_visibility_by_expansion();
    }

    pub fn collapse_all(&mut self) {
        for node in &mut self.nodes {
            node.expanded = false;
        }
        self.update_visibility_by_expansion();
    }

    /// 根据展开状态更新节点可见性
    pub fn update_visibility_by_expansion(&mut self) {
        // 先序排列保证父节点先于子节点被处理
        for i in 0..self.nodes.len() {
            let visible = match self.nodes[i].parent {
                None => true,
                Some(parent) => self.nodes[parent].visible && self.nodes[parent].expanded,
            };
            self.nodes[i].visible = visible;
        }
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &AstTreeNode> {
        self.nodes.iter().filter(|n| n.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::locator::locate;
    use serde_json::json;

    fn attrs(start: usize, end: usize, line: usize) -> Value {
        json!({"startLine": line, "startFilePos": start, "endLine": line, "endFilePos": end})
    }

    fn sample() -> Value {
        json!([
            {
                "nodeType": "Stmt_Function",
                "name": {"nodeType": "Identifier", "name": "greet", "attributes": attrs(15, 19, 3)},
                "params": [
                    {"nodeType": "Param", "var": {"nodeType": "Expr_Variable", "name": "who", "attributes": attrs(21, 24, 3)}, "attributes": attrs(21, 24, 3)}
                ],
                "stmts": [
                    {"nodeType": "Stmt_Echo", "exprs": [
                        {"nodeType": "Scalar_String", "value": "hello", "attributes": attrs(35, 41, 4)}
                    ], "attributes": attrs(30, 42, 4)}
                ],
                "attributes": {"startLine": 3, "startFilePos": 6, "endLine": 5, "endFilePos": 44}
            },
            {"nodeType": "Stmt_Nop", "attributes": attrs(46, 46, 6)}
        ])
    }

    #[test]
    fn test_index_structure() {
        let root = sample();
        let index = AstIndex::build(&root, &PositionSchema::php_parser());

        assert_eq!(index.len(), 7);
        let kinds: Vec<&str> = index.nodes().iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "Stmt_Function",
                "Identifier",
                "Param",
                "Expr_Variable",
                "Stmt_Echo",
                "Scalar_String",
                "Stmt_Nop"
            ]
        );

        let function = index.get(0).unwrap();
        assert_eq!(function.children, 3);
        assert_eq!(function.depth, 0);
        assert_eq!(function.label, "Stmt_Function: greet");
        assert_eq!(function.name, "[0]");

        let variable = index.get(3).unwrap();
        assert_eq!(variable.parent, Some(2));
        assert_eq!(variable.depth, 2);
        assert_eq!(variable.name, "var");
        assert_eq!(variable.path.element_id(), "root-0-params-0-var");
        assert_eq!(index.ancestors(3), vec![2, 0]);

        let string = index.get(5).unwrap();
        assert_eq!(string.label, "Scalar_String: hello");

        assert_eq!(index.get(6).unwrap().parent, None);
    }

    #[test]
    fn test_identity_and_path_lookup() {
        let root = sample();
        let schema = PositionSchema::php_parser();
        let index = AstIndex::build(&root, &schema);

        let echo = &root[0]["stmts"][0];
        assert_eq!(index.id_of(echo), Some(4));
        assert_eq!(index.id_of(&echo.clone()), None, "克隆值没有身份");
        assert_eq!(index.find_structural(&echo.clone(), &schema), Some(4));

        let path = index.get(4).unwrap().path.clone();
        assert_eq!(index.id_by_path(&path), Some(4));
    }

    #[test]
    fn test_index_locate_agrees_with_tree_walk() {
        let root = sample();
        let schema = PositionSchema::php_parser();
        let index = AstIndex::build(&root, &schema);

        for offset in 0..50 {
            for line in 1..7 {
                let query = CursorQuery::new(offset, line, 1);
                let by_walk = locate(&root, &query, &schema).and_then(|v| index.id_of(v));
                assert_eq!(index.locate(&query), by_walk, "offset={} line={}", offset, line);
            }
        }
    }

    #[test]
    fn test_expansion_controls_visibility() {
        let root = sample();
        let mut index = AstIndex::build(&root, &PositionSchema::php_parser());

        let visible: Vec<NodeId> = index.visible_rows().map(|n| n.id).collect();
        assert_eq!(visible, vec![0, 6], "初始只显示根节点");

        index.expand_ancestors(5);
        let visible: Vec<NodeId> = index.visible_rows().map(|n| n.id).collect();
        assert_eq!(visible, vec![0, 1, 2, 4, 5, 6]);
        assert!(!index.get(5).unwrap().expanded);

        index.toggle_node_expanded(0);
        let visible: Vec<NodeId> = index.visible_rows().map(|n| n.id).collect();
        assert_eq!(visible, vec![0, 6], "折叠父节点后子孙都不可见");

        index.toggle_node_expanded(0);
        index.collapse_all();
        assert_eq!(index.visible_rows().count(), 2);
    }

    #[test]
    fn test_label_variants() {
        assert_eq!(node_label("Name", &json!({"parts": ["Foo", "Bar"]})), "Name");
        assert_eq!(
            node_label("Expr_New", &json!({"name": {"parts": ["Foo", "Bar"]}})),
            "Expr_New: Foo\\Bar"
        );
        assert_eq!(
            node_label("Scalar_String", &json!({"value": "abcdefghijklmnopqrstuvwxyz"})),
            "Scalar_String: abcdefghijklmnopqrst..."
        );
        assert_eq!(node_label("Scalar_Int", &json!({"value": 7})), "Scalar_Int: 7");
    }
}
