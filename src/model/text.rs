//! 源码文档：文本、版本号与偏移 ⇄ 行列换算
//!
//! 偏移按字节计（与 PHP-Parser 的 FilePos 一致），行列从 1 开始。

use serde::Serialize;

use crate::model::classifier::Position;
use crate::model::locator::CursorQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

/// 编辑器高亮范围，结束列不包含在内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// 行首偏移表，建一次 O(n)，每次换算 O(log n)
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 超出文本末尾的偏移会被夹到末尾
    pub fn position_at(&self, offset: usize) -> TextPosition {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        TextPosition {
            line: line_idx + 1,
            column: offset - self.line_starts[line_idx] + 1,
        }
    }

    /// 行列夹到合法范围后换算为偏移
    pub fn offset_at(&self, position: TextPosition) -> usize {
        let line_idx = position.line.clamp(1, self.line_starts.len()) - 1;
        let line_start = self.line_starts[line_idx];
        let line_end = self
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        (line_start + position.column.max(1) - 1).min(line_end)
    }
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    text: String,
    version: u64,
    lines: LineIndex,
}

impl Default for SourceDocument {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SourceDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = LineIndex::new(&text);
        Self {
            text,
            version: 0,
            lines,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// 替换文本并递增版本号
    pub fn set_text(&mut self, text: impl Into<String>) -> u64 {
        self.text = text.into();
        self.lines = LineIndex::new(&self.text);
        self.version += 1;
        self.version
    }

    pub fn position_at(&self, offset: usize) -> TextPosition {
        self.lines.position_at(offset)
    }

    pub fn offset_at(&self, line: usize, column: usize) -> usize {
        self.lines.offset_at(TextPosition { line, column })
    }

    /// 编辑器光标事件的载荷
    pub fn cursor_at(&self, line: usize, column: usize) -> CursorQuery {
        let offset = self.offset_at(line, column);
        let position = self.position_at(offset);
        CursorQuery::new(offset, position.line, position.column)
    }

    pub fn cursor_at_offset(&self, offset: usize) -> CursorQuery {
        let offset = offset.min(self.text.len());
        let position = self.position_at(offset);
        CursorQuery::new(offset, position.line, position.column)
    }

    /// 节点位置 → 高亮范围；结束偏移是最后一个字符，所以结束列 +1
    pub fn highlight_range(&self, position: &Position) -> TextRange {
        let start = self.position_at(position.start_offset);
        let end = self.position_at(position.end_offset);
        TextRange {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column + 1,
        }
    }
}
