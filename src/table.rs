/*
 * Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
 *
 * This program is free software: you can redistribute it and/or
 * modify it under the terms of the GNU General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful, but
 * WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see  <http://www.gnu.org/licenses/>
 */

//! In-memory relational tables.
//!
//! A [`Table`] maps primary keys to records of payload values. Rows are
//! kept in insertion order and a primary key occurs at most once. A
//! [`DataSet`] is a named collection of tables, usually created from a
//! [`Schema`](crate::schema::Schema).

use crate::value::{Key, Value};
use indexmap::IndexMap;

/// A table with unique primary keys and insertion-ordered rows.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    primary_key: Vec<String>,
    fields: Vec<String>,
    defaults: Vec<Value>,
    rows: IndexMap<Key, Vec<Value>>,
}

/// A read-only view of one row of a table.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    key: &'a Key,
    values: &'a [Value],
}

impl Table {
    /// Create an empty table.
    ///
    /// `fields` are the payload fields together with their default values.
    pub fn new<S>(name: &str, primary_key: &[S], fields: Vec<(String, Value)>) -> Table
    where
        S: AsRef<str>,
    {
        let (fields, defaults) = fields.into_iter().unzip();
        Table {
            name: name.to_string(),
            primary_key: primary_key.iter().map(|f| f.as_ref().to_string()).collect(),
            fields,
            defaults,
            rows: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The names of the primary key fields.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The names of the payload fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The position of a payload field.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// The default value of a payload field.
    pub fn default_value(&self, field: &str) -> Option<&Value> {
        self.field_index(field).map(|i| &self.defaults[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row.
    ///
    /// If `values` has fewer entries than the table has payload fields the
    /// missing trailing fields take their default values. If the key is
    /// already present, its record is replaced (keeping the row position)
    /// and the old record is returned.
    pub fn insert(&mut self, key: Key, mut values: Vec<Value>) -> Option<Vec<Value>> {
        if values.len() < self.defaults.len() {
            values.extend_from_slice(&self.defaults[values.len()..]);
        }
        self.rows.insert(key, values)
    }

    /// Insert a row with all payload fields set to their defaults.
    pub fn insert_default(&mut self, key: Key) -> Option<Vec<Value>> {
        self.insert(key, vec![])
    }

    /// Remove the row with the given key and return its record.
    ///
    /// The remaining rows keep their order.
    pub fn remove(&mut self, key: &[Value]) -> Option<Vec<Value>> {
        self.rows.shift_remove(key)
    }

    pub fn contains_key(&self, key: &[Value]) -> bool {
        self.rows.contains_key(key)
    }

    pub fn get(&self, key: &[Value]) -> Option<Row> {
        self.rows.get_key_value(key).map(|(key, values)| self.row(key, values))
    }

    /// Iterate over all rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().map(move |(key, values)| self.row(key, values))
    }

    /// Iterate over all primary keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.rows.keys()
    }

    fn row<'a>(&'a self, key: &'a Key, values: &'a [Value]) -> Row<'a> {
        Row {
            table: self,
            key,
            values,
        }
    }
}

impl<'a> Row<'a> {
    pub fn key(&self) -> &'a Key {
        self.key
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// The value of a payload field.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.table.field_index(field).and_then(|i| self.values.get(i))
    }

    /// The numeric value of a payload field.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_number)
    }
}

/// A collection of named tables.
#[derive(Clone, Debug, Default)]
pub struct DataSet {
    tables: Vec<Table>,
}

impl DataSet {
    pub fn new() -> DataSet {
        DataSet::default()
    }

    /// Add a table, replacing (and returning) a table with the same name.
    pub fn add_table(&mut self, table: Table) -> Option<Table> {
        if let Some(t) = self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(std::mem::replace(t, table))
        } else {
            self.tables.push(table);
            None
        }
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        let i = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(i))
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.tables.iter()
    }

    /// Iterate over the rows of a table.
    ///
    /// A missing table has no rows.
    pub fn rows(&self, name: &str) -> impl Iterator<Item = Row> + '_ {
        self.table(name).into_iter().flat_map(|t| t.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, Table};
    use crate::key;
    use crate::value::Value;

    fn arcs() -> Table {
        Table::new(
            "arcs",
            &["Source", "Destination"],
            vec![
                ("Cost".to_string(), Value::from(0)),
                ("Capacity".to_string(), Value::from(f64::INFINITY)),
            ],
        )
    }

    #[test]
    fn insert_with_defaults() {
        let mut t = arcs();
        assert!(t.insert(key![1, 2], vec![Value::from(3)]).is_none());
        t.insert_default(key![2, 3]);

        let r = t.get(&key![1, 2]).unwrap();
        assert_eq!(r.number("Cost"), Some(3.0));
        assert_eq!(r.number("Capacity"), Some(f64::INFINITY));
        assert_eq!(t.get(&key![2, 3]).unwrap().number("Cost"), Some(0.0));
        assert_eq!(t.get(&key![2, 3]).unwrap().get("Volume"), None);
    }

    #[test]
    fn replace_keeps_order() {
        let mut t = arcs();
        t.insert(key![1, 2], vec![Value::from(1)]);
        t.insert(key![2, 3], vec![Value::from(2)]);
        let old = t.insert(key![1, 2], vec![Value::from(5)]);
        assert_eq!(old.unwrap()[0], Value::from(1));
        assert_eq!(t.len(), 2);
        let keys = t.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec![key![1, 2], key![2, 3]]);
        assert_eq!(t.get(&key![1, 2]).unwrap().number("Cost"), Some(5.0));
    }

    #[test]
    fn remove_keeps_order() {
        let mut t = arcs();
        for i in 0..4 {
            t.insert(key![i, i + 1], vec![Value::from(i)]);
        }
        assert!(t.remove(&key![1, 2]).is_some());
        assert!(t.remove(&key![1, 2]).is_none());
        assert_eq!(t.len(), 3);
        assert!(!t.contains_key(&key![1, 2]));
        assert_eq!(t.get(&key![3, 4]).unwrap().number("Cost"), Some(3.0));
        assert_eq!(t.get(&key![2, 3]).unwrap().number("Cost"), Some(2.0));
        let keys = t.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec![key![0, 1], key![2, 3], key![3, 4]]);

        // a re-inserted key goes to the end
        t.insert(key![1, 2], vec![Value::from(7)]);
        assert_eq!(t.keys().last(), Some(&key![1, 2]));
    }

    #[test]
    fn dataset_tables() {
        let mut dat = DataSet::new();
        assert!(dat.add_table(arcs()).is_none());
        dat.table_mut("arcs").unwrap().insert_default(key!["a", "b"]);
        assert_eq!(dat.rows("arcs").count(), 1);
        assert_eq!(dat.rows("nodes").count(), 0);
        assert!(dat.add_table(arcs()).is_some());
        assert_eq!(dat.rows("arcs").count(), 0);
    }
}
