//! 统一遍历：深度优先先序
//!
//! 对象字段按插入顺序、数组元素按下标顺序访问；没有位置属性的容器
//! （包装对象、嵌套数组）会被穿透，只有节点交给访问者。
//! 定位、索引构建、路径查找都走这一套顺序，平局时“先访问者胜出”才可复现。

use std::ops::ControlFlow;

use serde_json::Value;

use crate::model::classifier::{is_ast_node, is_container, PositionSchema};
use crate::model::path::{NodePath, PathSegment};

/// 先序遍历 `root` 下的所有节点，访问者返回 `Break` 时立即停止
pub fn walk_nodes<'a, F>(root: &'a Value, schema: &PositionSchema, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&NodePath, &'a Value) -> ControlFlow<()>,
{
    let mut path = NodePath::root();
    walk_inner(root, schema, &mut path, &mut visit)
}

fn walk_inner<'a, F>(
    value: &'a Value,
    schema: &PositionSchema,
    path: &mut NodePath,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&NodePath, &'a Value) -> ControlFlow<()>,
{
    if is_ast_node(value, schema) {
        visit(path, value)?;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if !is_container(child) {
                    continue;
                }
                path.push(PathSegment::Field(key.clone()));
                let flow = walk_inner(child, schema, path, visit);
                path.pop();
                flow?;
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                if !is_container(child) {
                    continue;
                }
                path.push(PathSegment::Index(index));
                let flow = walk_inner(child, schema, path, visit);
                path.pop();
                flow?;
            }
        }
        _ => {}
    }

    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(start: usize, end: usize) -> Value {
        json!({"startLine": 1, "startFilePos": start, "endLine": 1, "endFilePos": end})
    }

    #[test]
    fn test_preorder_follows_field_order() {
        let schema = PositionSchema::php_parser();
        let root = json!([{
            "nodeType": "Expr_BinaryOp_Plus",
            "right": {"nodeType": "Scalar_Int", "value": 2, "attributes": attrs(4, 4)},
            "left": {"nodeType": "Scalar_Int", "value": 1, "attributes": attrs(0, 0)},
            "attributes": attrs(0, 4)
        }]);

        let mut seen = Vec::new();
        let _ = walk_nodes(&root, &schema, |path, node| {
            seen.push((path.element_id(), node["value"].clone()));
            ControlFlow::Continue(())
        });

        assert_eq!(
            seen,
            vec![
                ("root-0".to_string(), Value::Null),
                ("root-0-right".to_string(), json!(2)),
                ("root-0-left".to_string(), json!(1)),
            ],
            "字段按插入顺序访问，父节点先于子节点"
        );
    }

    #[test]
    fn test_wrappers_are_traversed_through() {
        let schema = PositionSchema::php_parser();
        let root = json!([{
            "meta": {"list": [[{"nodeType": "Deep", "attributes": attrs(1, 2)}]]}
        }]);

        let mut paths = Vec::new();
        let _ = walk_nodes(&root, &schema, |path, _| {
            paths.push(path.element_id());
            ControlFlow::Continue(())
        });
        assert_eq!(paths, vec!["root-0-meta-list-0-0"]);
    }

    #[test]
    fn test_break_stops_walk() {
        let schema = PositionSchema::php_parser();
        let root = json!([
            {"nodeType": "A", "attributes": attrs(0, 1)},
            {"nodeType": "B", "attributes": attrs(2, 3)}
        ]);
        let mut count = 0;
        let flow = walk_nodes(&root, &schema, |_, _| {
            count += 1;
            ControlFlow::Break(())
        });
        assert_eq!(count, 1);
        assert!(flow.is_break());
    }
}
