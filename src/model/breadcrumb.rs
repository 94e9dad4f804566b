//! 面包屑：选中节点的 namespace 逐段展示，每段带同级节点的下拉菜单

use serde::Serialize;
use serde_json::Value;

use crate::model::classifier::{is_ast_node, node_kind, PositionSchema};
use crate::model::path::{NodePath, PathSegment, ROOT_MARKER};
use crate::model::tree::AstTree;

/// 下拉菜单展开的层数
pub const MENU_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub label: String,
    /// 点击后选中的节点；分组项为 None
    pub target: Option<NodePath>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crumb {
    pub label: String,
    pub path: NodePath,
    /// 该段指向 AST 节点，可以直接点击选中
    pub selectable: bool,
    pub menu: Vec<MenuItem>,
}

fn kind_label(value: &Value, schema: &PositionSchema) -> String {
    node_kind(value, schema).unwrap_or("Unknown").to_string()
}

/// `value` 位于 `path`，列出其下的节点，最多 `depth` 层
fn menu_items(value: &Value, path: &NodePath, depth: usize, schema: &PositionSchema) -> Vec<MenuItem> {
    if depth == 0 {
        return Vec::new();
    }
    let mut items = Vec::new();
    match value {
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                if !is_ast_node(v, schema) {
                    continue;
                }
                let child = path.child(PathSegment::Index(i));
                items.push(MenuItem {
                    label: format!("[{}] - {}", i, kind_label(v, schema)),
                    children: menu_items(v, &child, depth - 1, schema),
                    target: Some(child),
                });
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = path.child(PathSegment::Field(k.clone()));
                if is_ast_node(v, schema) {
                    items.push(MenuItem {
                        label: format!("{} - {}", k, kind_label(v, schema)),
                        children: menu_items(v, &child, depth - 1, schema),
                        target: Some(child),
                    });
                } else if v.is_array() {
                    let children = menu_items(v, &child, depth - 1, schema);
                    if !children.is_empty() {
                        items.push(MenuItem {
                            label: k.clone(),
                            target: None,
                            children,
                        });
                    }
                }
            }
        }
        _ => {}
    }
    items
}

/// 生成 `path` 的面包屑；路径在当前树中失效的部分不输出
pub fn breadcrumb_trail(tree: &AstTree, path: &NodePath) -> Vec<Crumb> {
    let schema = tree.schema();
    let mut crumbs = Vec::with_capacity(path.namespace_len());

    for prefix in path.prefixes() {
        let Ok(value) = tree.resolve(&prefix) else {
            break;
        };
        let (label, menu) = match (prefix.last(), prefix.parent()) {
            (Some(segment), Some(parent_path)) => {
                let label = match segment {
                    PathSegment::Index(i) => format!("[{}]", i),
                    PathSegment::Field(name) => name.clone(),
                };
                let menu = tree
                    .resolve(&parent_path)
                    .map(|parent| menu_items(parent, &parent_path, MENU_DEPTH, schema))
                    .unwrap_or_default();
                (label, menu)
            }
            _ => {
                // 根段的菜单：根节点数组作为一个分组
                let children = menu_items(tree.root(), &prefix, MENU_DEPTH - 1, schema);
                let menu = if children.is_empty() {
                    Vec::new()
                } else {
                    vec![MenuItem {
                        label: ROOT_MARKER.to_string(),
                        target: None,
                        children,
                    }]
                };
                (ROOT_MARKER.to_string(), menu)
            }
        };
        crumbs.push(Crumb {
            label,
            selectable: is_ast_node(value, schema),
            path: prefix,
            menu,
        });
    }
    crumbs
}
