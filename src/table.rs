use crate::rows::Tabular;
use std::collections::BTreeMap;

/// Rows of one kind under their fixed column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    columns: &'static [&'static str],
    rows: Vec<R>,
}

impl<R: Tabular> Table<R> {
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self {
            columns: R::COLUMNS,
            rows,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row rendered as cells, in column order.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| row.cells())
    }

    /// Groups rows by a composite key. Rows sharing a key keep their table order.
    pub fn index_by<K, F>(&self, key: F) -> BTreeMap<K, Vec<&R>>
    where
        K: Ord,
        F: Fn(&R) -> K,
    {
        let mut index: BTreeMap<K, Vec<&R>> = BTreeMap::new();
        for row in &self.rows {
            index.entry(key(row)).or_default().push(row);
        }
        index
    }
}

impl<R: Tabular> Default for Table<R> {
    fn default() -> Self {
        Self::from_rows(Vec::new())
    }
}
