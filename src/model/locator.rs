//! 位置定位：给定文本偏移，找出包含它的最小节点

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::classifier::{position_of, PositionSchema};
use crate::model::walk::walk_nodes;

/// 光标位置（偏移为字节，行列从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorQuery {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl CursorQuery {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }
}

/// 访问全部可达节点，返回跨度最小的包含节点
///
/// 跨度相同时取先序遍历中先访问到的节点；没有节点包含该位置时返回 None，
/// 这不是错误（例如光标在节点之间的空白处）。
pub fn locate<'a>(root: &'a Value, query: &CursorQuery, schema: &PositionSchema) -> Option<&'a Value> {
    let mut best: Option<(usize, &'a Value)> = None;
    let _ = walk_nodes(root, schema, |_, node| {
        if let Some(position) = position_of(node, schema) {
            let better = best.map_or(true, |(span, _)| position.span() < span);
            if better && position.contains(query.offset, query.line) {
                best = Some((position.span(), node));
            }
        }
        ControlFlow::Continue(())
    });
    best.map(|(_, node)| node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::path::find_path;
    use serde_json::json;

    fn node(kind: &str, start: usize, end: usize, line: (usize, usize), extra: Value) -> Value {
        let mut value = json!({
            "nodeKind": kind,
            "position": {"startOffset": start, "endOffset": end, "startLine": line.0, "endLine": line.1}
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
            (1, 3),
            json!({"children": [node("Param", 10, 15, (1, 1), json!({}))]})
        )])
    }

    #[test]
    fn test_innermost_node_wins() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        let found = locate(&root, &CursorQuery::new(12, 1, 13), &schema).expect("应该定位到节点");
        assert_eq!(found["nodeKind"], "Param");
        assert!(std::ptr::eq(found, &root[0]["children"][0]));

        let outer = locate(&root, &CursorQuery::new(30, 2, 5), &schema).unwrap();
        assert_eq!(outer["nodeKind"], "FunctionDecl");
    }

    #[test]
    fn test_past_end_is_miss() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        assert!(locate(&root, &CursorQuery::new(999, 3, 1), &schema).is_none());
        assert!(locate(&json!([]), &CursorQuery::new(0, 1, 1), &schema).is_none());
    }

    #[test]
    fn test_line_must_match_too() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        // 偏移落在 Param 内，但行号不在 Param 的行范围
        let found = locate(&root, &CursorQuery::new(12, 2, 1), &schema).unwrap();
        assert_eq!(found["nodeKind"], "FunctionDecl");
        assert!(locate(&root, &CursorQuery::new(12, 9, 1), &schema).is_none());
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let schema = PositionSchema::generic();
        let root = scenario_tree();
        assert_eq!(locate(&root, &CursorQuery::new(10, 1, 11), &schema).unwrap()["nodeKind"], "Param");
        assert_eq!(locate(&root, &CursorQuery::new(15, 1, 16), &schema).unwrap()["nodeKind"], "Param");
        assert_eq!(
            locate(&root, &CursorQuery::new(16, 1, 17), &schema).unwrap()["nodeKind"],
            "FunctionDecl"
        );
    }

    #[test]
    fn test_zero_width_twins_pick_first_visited() {
        let schema = PositionSchema::generic();
        let root = json!([node("Block", 0, 10, (1, 1), json!({
            "stmts": [
                node("Nop", 5, 5, (1, 1), json!({"tag": "first"})),
                node("Nop", 5, 5, (1, 1), json!({"tag": "second"}))
            ]
        }))]);

        for _ in 0..3 {
            let found = locate(&root, &CursorQuery::new(5, 1, 6), &schema).unwrap();
            assert_eq!(found["tag"], "first", "跨度相同取先序遍历中的第一个");
        }
    }

    #[test]
    fn test_containment_and_minimality_hold() {
        let schema = PositionSchema::generic();
        let root = json!([
            node("A", 0, 40, (1, 4), json!({
                "body": [
                    node("B", 2, 20, (1, 2), json!({"expr": node("C", 5, 9, (1, 1), json!({}))})),
                    node("D", 21, 39, (3, 4), json!({}))
                ]
            })),
            node("E", 41, 60, (5, 6), json!({}))
        ]);

        let mut all = Vec::new();
        let _ = walk_nodes(&root, &schema, |_, n| {
            all.push(position_of(n, &schema).unwrap());
            ControlFlow::Continue(())
        });

        for (offset, line) in [(0, 1), (6, 1), (15, 2), (25, 3), (39, 4), (45, 5), (70, 7)] {
            let query = CursorQuery::new(offset, line, 1);
            match locate(&root, &query, &schema) {
                Some(found) => {
                    let position = position_of(found, &schema).unwrap();
                    assert!(position.contains(offset, line));
                    for other in all.iter().filter(|p| p.contains(offset, line)) {
                        assert!(position.span() <= other.span());
                    }
                    assert!(find_path(&root, found, &schema).is_some());
                }
                None => assert!(all.iter().all(|p| !p.contains(offset, line))),
            }
        }
    }
}
