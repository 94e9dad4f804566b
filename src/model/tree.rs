//! AstTree：持有一次解析得到的根节点数组及其影子树索引

use serde_json::Value;

use crate::model::classifier::PositionSchema;
use crate::model::locator::CursorQuery;
use crate::model::path::{find_path, resolve_path, NodePath, PathError};
use crate::model::shadow_tree::{AstIndex, NodeId};

#[derive(Debug)]
pub struct AstTree {
    /// 根节点数组，即路径中的 `root`
    root: Value,
    schema: PositionSchema,
    index: AstIndex,
}

impl AstTree {
    pub fn new(roots: Vec<Value>, schema: PositionSchema) -> Self {
        let root = Value::Array(roots);
        // 索引记录的是数组元素（堆上）的地址，移动外层 Value 不影响它们
        let index = AstIndex::build(&root, &schema);
        Self { root, schema, index }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn roots(&self) -> &[Value] {
        self.root.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn schema(&self) -> &PositionSchema {
        &self.schema
    }

    pub fn index(&self) -> &AstIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut AstIndex {
        &mut self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 按 id 取节点内容
    pub fn node(&self, id: NodeId) -> Option<&Value> {
        let entry = self.index.get(id)?;
        resolve_path(&self.root, &entry.path).ok()
    }

    pub fn locate(&self, query: &CursorQuery) -> Option<NodeId> {
        self.index.locate(query)
    }

    pub fn path_of(&self, id: NodeId) -> Option<&NodePath> {
        self.index.get(id).map(|n| &n.path)
    }

    /// 节点 id：先按身份，再按位置与类型
    pub fn id_of(&self, target: &Value) -> Option<NodeId> {
        self.index
            .id_of(target)
            .or_else(|| self.index.find_structural(target, &self.schema))
    }

    /// 正向查找路径；索引命中时为 O(1)，否则退回整树遍历
    pub fn find_path(&self, target: &Value) -> Option<NodePath> {
        match self.id_of(target) {
            Some(id) => self.path_of(id).cloned(),
            None => find_path(&self.root, target, &self.schema),
        }
    }

    pub fn resolve(&self, path: &NodePath) -> Result<&Value, PathError> {
        resolve_path(&self.root, path)
    }

    /// 路径所指的节点 id；路径指向非节点值时为 None
    pub fn id_at(&self, path: &NodePath) -> Result<Option<NodeId>, PathError> {
        let value = self.resolve(path)?;
        Ok(self.index.id_of(value))
    }
}
