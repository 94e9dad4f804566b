//! IO helper: 源码、AST 与配置文件的读写

use std::{fs::File, io::BufReader, path::Path};

use serde_json::Value;
use crate::model::data_core::ViewerError;

/// 从文件读取JSON数据
pub fn read_json_file(p: &Path) -> Result<Value, ViewerError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v: Value = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 将JSON数据保存到文件（格式化输出）
pub fn write_json_file(p: &Path, value: &Value) -> Result<(), ViewerError> {
    let f = File::create(p)?;
    serde_json::to_writer_pretty(f, value)?;
    Ok(())
}

/// 读取文本文件（源码或解析器原始输出）
pub fn read_text_file(p: &Path) -> Result<String, ViewerError> {
    Ok(std::fs::read_to_string(p)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_keeps_field_order() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("ast.json");
        let value = json!({"nodeType": "Stmt_Nop", "attributes": {"startLine": 1}, "a": 1});

        write_json_file(&path, &value).expect("写入失败");
        let back = read_json_file(&path).expect("读取失败");
        let keys: Vec<&String> = back.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["nodeType", "attributes", "a"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.php");
        assert!(matches!(read_text_file(&missing), Err(ViewerError::Io(_))));
        assert!(matches!(read_json_file(&missing), Err(ViewerError::Io(_))));
    }
}
