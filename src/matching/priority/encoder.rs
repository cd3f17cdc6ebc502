use serde::{Deserialize, Serialize};

use crate::matching::errors::ModelError;

/// One-hot encoder over string categories; unknown values encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Returns `None` when the column and category lists disagree in length.
    pub fn new(columns: Vec<String>, categories: Vec<Vec<String>>) -> Option<Self> {
        (columns.len() == categories.len()).then_some(Self {
            columns,
            categories,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform<'a, F>(&self, lookup: F) -> Result<Vec<f64>, ModelError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut encoded = Vec::with_capacity(self.width());
        for (column, categories) in self.columns.iter().zip(&self.categories) {
            let value = lookup(column).ok_or_else(|| ModelError::MissingColumn(column.clone()))?;
            encoded.extend(
                categories
                    .iter()
                    .map(|category| if category == value { 1.0 } else { 0.0 }),
            );
        }
        Ok(encoded)
    }
}
