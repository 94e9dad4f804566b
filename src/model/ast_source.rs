//! 解析器协作方：把外部解析器的输出解码为根节点数组
//!
//! 解析器本身（PHP-Parser、HTTP 接口、子进程）不在本 crate 内，
//! 这里只约定输入输出：源码字符串进，节点数组或解析失败结果出。

use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::classifier::PositionSchema;

/// 缓存上限
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// 源码缺少开始标记时补上的前缀
pub const PHP_OPEN_TAG: &str = "<?php\n";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("解析器不可用: {0}")]
    Unavailable(String),
    #[error("解析器输出无法识别: {0}")]
    InvalidOutput(String),
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseFailure {
    pub message: String,
    pub details: Value,
    /// 解析器运行环境缺失（需要给用户可操作的提示）
    pub unavailable: bool,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Value::Null,
            unavailable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Vec<Value>),
    Failed(ParseFailure),
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

impl From<SourceError> for ParseOutcome {
    fn from(err: SourceError) -> Self {
        let unavailable = matches!(err, SourceError::Unavailable(_));
        ParseOutcome::Failed(ParseFailure {
            message: err.to_string(),
            details: Value::Null,
            unavailable,
        })
    }
}

/// 解析器接口
pub trait AstSource {
    fn parse(&mut self, code: &str) -> ParseOutcome;
}

/// 缺少 `<?` 开头时补上 `<?php\n`
pub fn preprocess_code(code: &str) -> Cow<'_, str> {
    if code.trim().starts_with("<?") {
        Cow::Borrowed(code)
    } else {
        Cow::Owned(format!("{}{}", PHP_OPEN_TAG, code))
    }
}

/// 把所有节点的位置前移 `offset` 字节、`lines` 行
///
/// 解析器看到的是补过前缀的代码，位置需要换算回原始源码。落在前缀内的值截为 0（行号截为 1）。
pub fn shift_positions(value: &mut Value, schema: &PositionSchema, offset: usize, lines: usize) {
    fn shift(attrs: &mut serde_json::Map<String, Value>, field: &str, by: usize, floor: u64) {
        if let Some(n) = attrs.get(field).and_then(Value::as_u64) {
            let shifted = n.saturating_sub(by as u64).max(floor);
            attrs.insert(field.to_string(), Value::from(shifted));
        }
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if *key == schema.position_field {
                    if let Value::Object(attrs) = child {
                        shift(attrs, &schema.start_offset, offset, 0);
                        shift(attrs, &schema.end_offset, offset, 0);
                        shift(attrs, &schema.start_line, lines, 1);
                        shift(attrs, &schema.end_line, lines, 1);
                    }
                } else {
                    shift_positions(child, schema, offset, lines);
                }
            }
        }
        Value::Array(arr) => {
            for child in arr {
                shift_positions(child, schema, offset, lines);
            }
        }
        _ => {}
    }
}

/// 解码解析器输出
///
/// 支持：裸节点数组；`{"result": "<json>"}` 包装；
/// `{"error": true, "message", "details"}`；`{"error": "Parse Error: ", "0": "..."}`。
pub fn decode_parser_output(raw: &str) -> Result<ParseOutcome, SourceError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<ParseOutcome, SourceError> {
    match value {
        Value::Array(roots) => Ok(ParseOutcome::Parsed(roots)),
        Value::Object(mut map) => {
            if let Some(error) = map.remove("error") {
                let message = match error {
                    Value::String(prefix) => {
                        let detail = map.get("0").and_then(Value::as_str).unwrap_or_default();
                        format!("{}{}", prefix, detail)
                    }
                    _ => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Failed to parse PHP code")
                        .to_string(),
                };
                return Ok(ParseOutcome::Failed(ParseFailure {
                    message,
                    details: map.remove("details").unwrap_or(Value::Null),
                    unavailable: false,
                }));
            }
            match map.remove("result") {
                Some(Value::String(inner)) => decode_parser_output(&inner),
                Some(inner @ Value::Array(_)) => decode_value(inner),
                Some(other) => Err(SourceError::InvalidOutput(format!(
                    "result 字段类型不正确: {}",
                    other
                ))),
                None => Err(SourceError::InvalidOutput("缺少 result 或 error 字段".into())),
            }
        }
        Value::Null => Ok(ParseOutcome::Parsed(Vec::new())),
        other => Err(SourceError::InvalidOutput(format!("顶层值不是数组或对象: {}", other))),
    }
}

/// 以闭包充当解析器：闭包返回解析器的原始输出文本
///
/// 返回的节点位置总是相对于调用方传入的代码，预处理补上的前缀会被扣除。
pub struct FnAstSource<F> {
    run: F,
    schema: PositionSchema,
}

impl<F> FnAstSource<F>
where
    F: FnMut(&str) -> Result<String, SourceError>,
{
    pub fn new(run: F) -> Self {
        Self {
            run,
            schema: PositionSchema::php_parser(),
        }
    }

    /// 解析器输出的位置字段不是 PHP-Parser 形态时使用
    pub fn with_schema(mut self, schema: PositionSchema) -> Self {
        self.schema = schema;
        self
    }
}

impl<F> AstSource for FnAstSource<F>
where
    F: FnMut(&str) -> Result<String, SourceError>,
{
    fn parse(&mut self, code: &str) -> ParseOutcome {
        let prepared = preprocess_code(code);
        let prefix = prepared.len() - code.len();
        let outcome = (self.run)(&prepared).and_then(|raw| decode_parser_output(&raw));
        match outcome {
            Ok(ParseOutcome::Parsed(mut roots)) if prefix > 0 => {
                let lines = prepared[..prefix].matches('\n').count();
                for root in &mut roots {
                    shift_positions(root, &self.schema, prefix, lines);
                }
                ParseOutcome::Parsed(roots)
            }
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("PHP Parser Error: {}", e);
                e.into()
            }
        }
    }
}

/// 成功解析结果的有界缓存，满了按插入顺序淘汰
///
/// 以原始代码为键：补前缀与否对应不同的位置，不能共享条目。
pub struct CachedAstSource<S> {
    inner: S,
    capacity: usize,
    cache: HashMap<String, Vec<Value>>,
    order: VecDeque<String>,
}

impl<S: AstSource> CachedAstSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            cache: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.order.clear();
    }
}

impl<S: AstSource> AstSource for CachedAstSource<S> {
    fn parse(&mut self, code: &str) -> ParseOutcome {
        if let Some(roots) = self.cache.get(code) {
            tracing::debug!("解析缓存命中 ({} 字节)", code.len());
            return ParseOutcome::Parsed(roots.clone());
        }

        let outcome = self.inner.parse(code);
        if let ParseOutcome::Parsed(roots) = &outcome {
            if self.cache.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.cache.remove(&oldest);
                }
            }
            self.cache.insert(code.to_string(), roots.clone());
            self.order.push_back(code.to_string());
        }
        outcome
    }
}
