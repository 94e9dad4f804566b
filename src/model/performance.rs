//! 性能基准测试模块
//!
//! 生成 PHP-Parser 形状的大型合成 AST，测量索引构建、光标定位与路径查找的耗时。

use std::time::Instant;

use serde_json::{json, Value};

use crate::model::classifier::PositionSchema;
use crate::model::locator::CursorQuery;
use crate::model::path::find_path;
use crate::model::text::SourceDocument;
use crate::model::tree::AstTree;

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 生成 `functions` 个函数、每个函数 `statements` 条 echo 语句的 AST
///
/// 同时生成与位置一一对应的源码文本。
pub fn generate_large_ast(functions: usize, statements: usize) -> (Vec<Value>, String) {
    fn attrs(start: usize, end: usize, start_line: usize, end_line: usize) -> Value {
        json!({"startLine": start_line, "startFilePos": start, "endLine": end_line, "endFilePos": end})
    }

    // `    echo 'value_0000';\n` 固定 23 字节
    const STMT_LEN: usize = 23;
    // `function f_0000() {\n` 与 `}\n`
    const HEAD_LEN: usize = 20;
    const TAIL_LEN: usize = 2;

    let mut source = String::from("<?php\n");
    let mut offset = source.len();
    let mut line = 2;
    let mut roots = Vec::with_capacity(functions);
    for f in 0..functions {
        let fn_start = offset;
        let fn_line = line;
        source.push_str(&format!("function f_{:04}() {{\n", f));
        offset += HEAD_LEN;
        line += 1;

        let mut stmts = Vec::with_capacity(statements);
        for s in 0..statements {
            let echo_start = offset + 4;
            let string_start = echo_start + 5;
            stmts.push(json!({
                "nodeType": "Stmt_Echo",
                "exprs": [{
                    "nodeType": "Scalar_String",
                    "value": format!("value_{:04}", s),
                    "attributes": attrs(string_start, string_start + 11, line, line)
                }],
                "attributes": attrs(echo_start, echo_start + 17, line, line)
            }));
            source.push_str(&format!("    echo 'value_{:04}';\n", s));
            offset += STMT_LEN;
            line += 1;
        }

        roots.push(json!({
            "nodeType": "Stmt_Function",
            "name": {
                "nodeType": "Identifier",
                "name": format!("f_{:04}", f),
                "attributes": attrs(fn_start + 9, fn_start + 14, fn_line, fn_line)
            },
            "params": [],
            "stmts": stmts,
            "attributes": attrs(fn_start, offset, fn_line, line)
        }));
        source.push_str("}\n");
        offset += TAIL_LEN;
        line += 1;
    }
    debug_assert_eq!(offset, source.len());
    (roots, source)
}

/// 测试索引构建性能
pub fn benchmark_index_build(roots: Vec<Value>) -> (AstTree, PerformanceResult) {
    let start = Instant::now();
    let tree = AstTree::new(roots, PositionSchema::php_parser());
    let duration = start.elapsed();

    let details = format!("索引了 {} 个节点", tree.len());
    let result = PerformanceResult::new("索引构建", duration.as_millis(), !tree.is_empty(), &details);
    (tree, result)
}

/// 测试光标定位性能（`samples` 个均匀分布的偏移）
pub fn benchmark_locate(tree: &AstTree, doc: &SourceDocument, samples: usize) -> PerformanceResult {
    let samples = samples.max(1);
    let step = (doc.text().len() / samples).max(1);
    let queries: Vec<CursorQuery> = (0..samples).map(|i| doc.cursor_at_offset(i * step)).collect();

    let start = Instant::now();
    let hits = queries.iter().filter(|q| tree.locate(q).is_some()).count();
    let duration = start.elapsed();
    PerformanceResult::new(
        "光标定位",
        duration.as_millis(),
        hits > 0,
        &format!("{} 次查询命中 {} 次", samples, hits),
    )
}

/// 对比索引查找与整树遍历查找
pub fn benchmark_find_path(tree: &AstTree) -> Vec<PerformanceResult> {
    let Some(last) = tree.index().nodes().last() else {
        return vec![PerformanceResult::new("路径查找", 0, false, "空树")];
    };
    let Ok(target) = tree.resolve(&last.path) else {
        return vec![PerformanceResult::new("路径查找", 0, false, "末尾节点无法解析")];
    };

    let start = Instant::now();
    let indexed = tree.find_path(target);
    let indexed_time = start.elapsed();

    let start = Instant::now();
    let walked = find_path(tree.root(), target, tree.schema());
    let walked_time = start.elapsed();

    vec![
        PerformanceResult::new(
            "路径查找(索引)",
            indexed_time.as_millis(),
            indexed.as_ref() == Some(&last.path),
            &format!("{:?}", indexed.map(|p| p.element_id())),
        ),
        PerformanceResult::new(
            "路径查找(遍历)",
            walked_time.as_millis(),
            walked.as_ref() == Some(&last.path),
            &format!("{:?}", walked.map(|p| p.element_id())),
        ),
    ]
}

/// 运行综合性能测试
pub fn run_performance_suite() -> Vec<PerformanceResult> {
    let mut results = Vec::new();

    // 测试不同规模的数据
    let test_cases = [
        (10, 10),   // 小型
        (100, 50),  // 中型
        (500, 100), // 大型
    ];

    for (functions, statements) in test_cases {
        tracing::info!("测试规模：{} 个函数，每个 {} 条语句", functions, statements);

        let start = Instant::now();
        let (roots, source) = generate_large_ast(functions, statements);
        results.push(PerformanceResult::new(
            &format!("数据生成({}x{})", functions, statements),
            start.elapsed().as_millis(),
            true,
            &format!("源码 {} 字节", source.len()),
        ));

        let doc = SourceDocument::new(source);
        let (tree, build) = benchmark_index_build(roots);
        results.push(build);
        results.push(benchmark_locate(&tree, &doc, 1000));
        results.extend(benchmark_find_path(&tree));
    }

    results
}
