//! Graph query facade
//!
//! Everything the engine knows about storage goes through [`GraphStore`]:
//! one parameterized query in, a list of positional [`Record`]s out.

mod neo4j;

pub use neo4j::Neo4jHttpStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Named query parameters
pub type Params = serde_json::Map<String, Value>;

/// A graph store able to run read queries
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run `query` with `params` and return one record per result row.
    async fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>>;
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    async fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        (**self).query(query, params).await
    }
}

/// One result row. Fields follow the order of the query's RETURN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a record without column names, mostly for tests.
    pub fn from_values(values: Vec<Value>) -> Self {
        let columns = (0..values.len()).map(|i| i.to_string()).collect();
        Self::new(Arc::new(columns), values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    fn field(&self, index: usize) -> std::result::Result<&Value, String> {
        self.values
            .get(index)
            .ok_or_else(|| format!("expected at least {} fields, got {}", index + 1, self.len()))
    }

    pub fn str_at(&self, index: usize) -> std::result::Result<&str, String> {
        match self.field(index)? {
            Value::String(s) => Ok(s),
            other => Err(format!("field {} is not a string: {}", index, other)),
        }
    }

    /// A string field that may be null
    pub fn opt_str_at(&self, index: usize) -> std::result::Result<Option<&str>, String> {
        match self.field(index)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(format!("field {} is not a string: {}", index, other)),
        }
    }

    pub fn strings_at(&self, index: usize) -> std::result::Result<Vec<&str>, String> {
        match self.field(index)? {
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .ok_or_else(|| format!("field {} has a non-string element: {}", index, v))
                })
                .collect(),
            other => Err(format!("field {} is not a list: {}", index, other)),
        }
    }

    pub fn i64_at(&self, index: usize) -> std::result::Result<i64, String> {
        let value = self.field(index)?;
        value
            .as_i64()
            .ok_or_else(|| format!("field {} is not an integer: {}", index, value))
    }

    /// A numeric field; null reads as `None`
    pub fn opt_f64_at(&self, index: usize) -> std::result::Result<Option<f64>, String> {
        match self.field(index)? {
            Value::Null => Ok(None),
            value => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("field {} is not a number: {}", index, value)),
        }
    }
}
