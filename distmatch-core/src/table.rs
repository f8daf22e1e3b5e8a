use serde::{Deserialize, Serialize};

use crate::value::RawValue;

/// A column as handed over by an ingestion adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    pub unique_identifier: String,
    pub data_type: String, // advisory only
    pub data: Vec<RawValue>,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, data: Vec<RawValue>) -> Self {
        let name = name.into();
        Self {
            unique_identifier: name.clone(),
            name,
            data_type: "varchar".into(),
            data,
        }
    }

    /// Builds a column from anything convertible into cells, e.g. `&str`, `i64`, `Option<f64>`.
    pub fn from_values<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        Self::new(name, values.into_iter().map(Into::into).collect())
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.unique_identifier = id.into();
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub unique_identifier: String,
    pub columns: Vec<SourceColumn>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<SourceColumn>) -> Self {
        let name = name.into();
        Self {
            unique_identifier: name.clone(),
            name,
            columns,
        }
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.unique_identifier = id.into();
        self
    }

    pub fn get_columns(&self) -> &[SourceColumn] {
        &self.columns
    }
}
