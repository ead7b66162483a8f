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

//! Table schemas and their validation.
//!
//! A [`Schema`] is plain metadata: a list of [`TableSpec`]s (primary key
//! fields, payload fields with data types and defaults) and a list of
//! [`ForeignKey`] declarations. One generic routine checks a
//! [`DataSet`] against it. The checks fall into three independent
//! categories:
//!
//! 1. structure: all tables present, headers as declared, rows of the
//!    right arity,
//! 2. foreign keys: referenced field combinations exist in the parent
//!    table,
//! 3. data types: payload values within their declared domain.
//!
//! All categories are always checked, see [`Schema::validate`].
//!
//! # Example
//!
//! ```
//! use rs_netflow::schema::{DataType, Schema};
//! use rs_netflow::{key, Value};
//!
//! let mut schema = Schema::new();
//! schema
//!     .add_table("nodes", &["Name"], &[])
//!     .add_table("arcs", &["Source", "Destination"], &["Capacity"])
//!     .add_foreign_key("arcs", "nodes", &[("Source", "Name")])
//!     .add_foreign_key("arcs", "nodes", &[("Destination", "Name")])
//!     .set_data_type("arcs", "Capacity", DataType::number(0.0, f64::INFINITY, true, true));
//!
//! let mut dat = schema.new_data();
//! dat.table_mut("nodes").unwrap().insert_default(key!["a"]);
//! dat.table_mut("arcs").unwrap().insert(key!["a", "b"], vec![Value::from(-1)]);
//!
//! let report = schema.validate(&dat);
//! assert!(report.structure.is_empty());
//! assert_eq!(report.foreign_keys.len(), 1);
//! assert_eq!(report.data_types.len(), 1);
//! ```

use crate::error::Error;
use crate::table::{DataSet, Row, Table};
use crate::value::{DisplayKey, Key, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// The domain of a payload field.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    /// A number in a (possibly half-open) interval.
    Number {
        min: f64,
        max: f64,
        inclusive_min: bool,
        inclusive_max: bool,
        must_be_int: bool,
    },
    /// A string.
    Text { allow_empty: bool },
}

impl DataType {
    /// A real number in the interval between `min` and `max`.
    ///
    /// Infinite values are only accepted if the corresponding bound is
    /// infinite and inclusive.
    pub fn number(min: f64, max: f64, inclusive_min: bool, inclusive_max: bool) -> DataType {
        DataType::Number {
            min,
            max,
            inclusive_min,
            inclusive_max,
            must_be_int: false,
        }
    }

    /// An integral number in the interval between `min` and `max`.
    pub fn integer(min: f64, max: f64, inclusive_min: bool, inclusive_max: bool) -> DataType {
        DataType::Number {
            min,
            max,
            inclusive_min,
            inclusive_max,
            must_be_int: true,
        }
    }

    /// A non-empty string.
    pub fn text() -> DataType {
        DataType::Text { allow_empty: false }
    }

    /// Return `true` if `value` belongs to this domain.
    pub fn valid(&self, value: &Value) -> bool {
        match *self {
            DataType::Number {
                min,
                max,
                inclusive_min,
                inclusive_max,
                must_be_int,
            } => {
                let x = match value.as_number() {
                    Some(x) if !x.is_nan() => x,
                    _ => return false,
                };
                let above = if inclusive_min { x >= min } else { x > min };
                let below = if inclusive_max { x <= max } else { x < max };
                above && below && (!must_be_int || x.is_infinite() || x.fract() == 0.0)
            }
            DataType::Text { allow_empty } => match value {
                Value::Text(s) => allow_empty || !s.is_empty(),
                Value::Number(_) => false,
            },
        }
    }
}

/// A payload field of a table.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    /// The domain of the field, unchecked if `None`.
    pub data_type: Option<DataType>,
    /// The value of this field if not given explicitly.
    pub default: Value,
}

/// The declaration of a table.
#[derive(Clone, Debug)]
pub struct TableSpec {
    pub name: String,
    pub primary_key: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.primary_key.iter().any(|f| f == name) || self.field(name).is_some()
    }

    /// Return the value of a primary key or payload field of a row.
    fn value_of<'a>(&self, row: &Row<'a>, field: &str) -> Option<&'a Value> {
        match self.primary_key.iter().position(|f| f == field) {
            Some(i) => row.key().get(i),
            None => row.get(field),
        }
    }
}

/// A foreign key declaration.
///
/// Each row of the `child` table must agree on the mapped fields with
/// some row of the `parent` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub child: String,
    pub parent: String,
    /// Pairs `(child field, parent field)`.
    pub mappings: Vec<(String, String)>,
}

/// A violation of the declared table structure.
#[derive(Clone, Debug, PartialEq)]
pub enum StructureFailure {
    /// A declared table is missing.
    MissingTable { table: String },
    /// A table that has not been declared.
    UnknownTable { table: String },
    /// Primary key or payload field names differ from the declaration.
    Header {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// A primary key with the wrong number of fields.
    KeyArity { table: String, key: Key, expected: usize },
    /// A record with the wrong number of payload fields.
    RecordArity {
        table: String,
        key: Key,
        expected: usize,
        found: usize,
    },
    /// A primary key occurring more than once in the input.
    DuplicateKey { table: String, key: Key },
    /// A row that could not be interpreted at all.
    MalformedRow { table: String, row: usize, msg: String },
}

impl fmt::Display for StructureFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::StructureFailure::*;
        match self {
            MissingTable { table } => write!(fmt, "missing table '{}'", table),
            UnknownTable { table } => write!(fmt, "unknown table '{}'", table),
            Header { table, expected, found } => write!(
                fmt,
                "table '{}' has fields [{}], expected [{}]",
                table,
                found.join(", "),
                expected.join(", ")
            ),
            KeyArity { table, key, expected } => write!(
                fmt,
                "key {} of table '{}' has {} fields, expected {}",
                DisplayKey(key),
                table,
                key.len(),
                expected
            ),
            RecordArity {
                table,
                key,
                expected,
                found,
            } => write!(
                fmt,
                "row {} of table '{}' has {} payload fields, expected {}",
                DisplayKey(key),
                table,
                found,
                expected
            ),
            DuplicateKey { table, key } => {
                write!(fmt, "duplicate primary key {} in table '{}'", DisplayKey(key), table)
            }
            MalformedRow { table, row, msg } => write!(fmt, "row {} of table '{}': {}", row, table, msg),
        }
    }
}

/// Child rows referencing a missing parent row.
///
/// All child rows sharing the same offending `values` are reported
/// together.
#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKeyFailure {
    pub child: String,
    pub parent: String,
    pub mappings: Vec<(String, String)>,
    /// The values of the child fields that have no match in the parent.
    pub values: Vec<Value>,
    /// The primary keys of the failing child rows.
    pub rows: Vec<Key>,
}

impl fmt::Display for ForeignKeyFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let fields = self.mappings.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>();
        write!(
            fmt,
            "{}.({}) = {} not found in table '{}' (rows",
            self.child,
            fields.join(", "),
            DisplayKey(&self.values),
            self.parent
        )?;
        for key in &self.rows {
            write!(fmt, " {}", DisplayKey(key))?;
        }
        write!(fmt, ")")
    }
}

/// A payload value outside its declared domain.
#[derive(Clone, Debug, PartialEq)]
pub struct DataTypeFailure {
    pub table: String,
    pub field: String,
    pub key: Key,
    pub value: Value,
}

impl fmt::Display for DataTypeFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}.{} of row {} has invalid value {}",
            self.table,
            self.field,
            DisplayKey(&self.key),
            self.value
        )
    }
}

/// The result of [`Schema::validate`].
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub structure: Vec<StructureFailure>,
    pub foreign_keys: Vec<ForeignKeyFailure>,
    pub data_types: Vec<DataTypeFailure>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.structure.is_empty() && self.foreign_keys.is_empty() && self.data_types.is_empty()
    }

    /// Turn the report into an error.
    ///
    /// The first non-empty category in the order structure, foreign keys,
    /// data types determines the error.
    pub fn into_result(self) -> Result<(), Error> {
        if !self.structure.is_empty() {
            Err(Error::Structure(self.structure))
        } else if !self.foreign_keys.is_empty() {
            Err(Error::ForeignKey(self.foreign_keys))
        } else if !self.data_types.is_empty() {
            Err(Error::DataType(self.data_types))
        } else {
            Ok(())
        }
    }
}

/// Declarations of tables and their relations.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    tables: Vec<TableSpec>,
    foreign_keys: Vec<ForeignKey>,
    tooltips: Vec<(String, String, String)>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema::default()
    }

    /// Declare a table.
    ///
    /// Payload fields are unchecked and default to `0` until
    /// [`set_data_type`](Self::set_data_type) and
    /// [`set_default_value`](Self::set_default_value) say otherwise.
    ///
    /// # Panics
    ///
    /// If a table of that name has already been declared.
    pub fn add_table(&mut self, name: &str, primary_key: &[&str], fields: &[&str]) -> &mut Self {
        assert!(self.table(name).is_none(), "Table '{}' declared twice", name);
        self.tables.push(TableSpec {
            name: name.to_string(),
            primary_key: primary_key.iter().map(|f| f.to_string()).collect(),
            fields: fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.to_string(),
                    data_type: None,
                    default: Value::from(0),
                })
                .collect(),
        });
        self
    }

    /// Declare a foreign key from `child` to `parent`.
    ///
    /// # Panics
    ///
    /// If one of the tables or fields has not been declared.
    pub fn add_foreign_key(&mut self, child: &str, parent: &str, mappings: &[(&str, &str)]) -> &mut Self {
        let (cspec, pspec) = (self.expect_table(child), self.expect_table(parent));
        for &(cf, pf) in mappings {
            assert!(cspec.has_field(cf), "Unknown field '{}' in table '{}'", cf, child);
            assert!(pspec.has_field(pf), "Unknown field '{}' in table '{}'", pf, parent);
        }
        self.foreign_keys.push(ForeignKey {
            child: child.to_string(),
            parent: parent.to_string(),
            mappings: mappings.iter().map(|&(c, p)| (c.to_string(), p.to_string())).collect(),
        });
        self
    }

    /// Set the domain of a payload field.
    ///
    /// # Panics
    ///
    /// If the field has not been declared.
    pub fn set_data_type(&mut self, table: &str, field: &str, data_type: DataType) -> &mut Self {
        self.expect_field(table, field).data_type = Some(data_type);
        self
    }

    /// Set the default value of a payload field.
    ///
    /// # Panics
    ///
    /// If the field has not been declared.
    pub fn set_default_value(&mut self, table: &str, field: &str, value: Value) -> &mut Self {
        self.expect_field(table, field).default = value;
        self
    }

    /// Attach a human readable description to a table (`field == ""`) or
    /// one of its fields.
    ///
    /// # Panics
    ///
    /// If the table or field has not been declared.
    pub fn set_tooltip(&mut self, table: &str, field: &str, text: &str) -> &mut Self {
        let spec = self.expect_table(table);
        assert!(
            field.is_empty() || spec.has_field(field),
            "Unknown field '{}' in table '{}'",
            field,
            table
        );
        match self.tooltips.iter_mut().find(|(t, f, _)| t == table && f == field) {
            Some(tip) => tip.2 = text.to_string(),
            None => self.tooltips.push((table.to_string(), field.to_string(), text.to_string())),
        }
        self
    }

    pub fn tooltip(&self, table: &str, field: &str) -> Option<&str> {
        self.tooltips
            .iter()
            .find(|(t, f, _)| t == table && f == field)
            .map(|(_, _, text)| text.as_str())
    }

    /// Iterate over all descriptions as `(table, field, text)`.
    pub fn tooltips(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.tooltips.iter().map(|(t, f, s)| (t.as_str(), f.as_str(), s.as_str()))
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Create an empty table as declared.
    pub fn new_table(&self, name: &str) -> Option<Table> {
        self.table(name).map(|spec| {
            Table::new(
                &spec.name,
                &spec.primary_key,
                spec.fields.iter().map(|f| (f.name.clone(), f.default.clone())).collect(),
            )
        })
    }

    /// Create a data set with an empty table for each declared table.
    pub fn new_data(&self) -> DataSet {
        let mut dat = DataSet::new();
        for spec in &self.tables {
            if let Some(table) = self.new_table(&spec.name) {
                dat.add_table(table);
            }
        }
        dat
    }

    /// Run all checks.
    pub fn validate(&self, dat: &DataSet) -> ValidationReport {
        let report = ValidationReport {
            structure: self.find_structure_failures(dat),
            foreign_keys: self.find_foreign_key_failures(dat),
            data_types: self.find_data_type_failures(dat),
        };
        if report.is_ok() {
            debug!(tables = self.tables.len(), "data set is valid");
        } else {
            warn!(
                structure = report.structure.len(),
                foreign_keys = report.foreign_keys.len(),
                data_types = report.data_types.len(),
                "data set failed validation"
            );
        }
        report
    }

    pub fn find_structure_failures(&self, dat: &DataSet) -> Vec<StructureFailure> {
        let mut failures = vec![];

        for spec in &self.tables {
            let table = match dat.table(&spec.name) {
                Some(table) => table,
                None => {
                    failures.push(StructureFailure::MissingTable {
                        table: spec.name.clone(),
                    });
                    continue;
                }
            };

            failures.extend(table_structure_failures(spec, table));
        }

        for table in dat.tables() {
            if self.table(table.name()).is_none() {
                failures.push(StructureFailure::UnknownTable {
                    table: table.name().to_string(),
                });
            }
        }

        failures
    }

    pub fn find_foreign_key_failures(&self, dat: &DataSet) -> Vec<ForeignKeyFailure> {
        let mut failures = vec![];

        for fk in &self.foreign_keys {
            let (cspec, pspec) = match (self.table(&fk.child), self.table(&fk.parent)) {
                (Some(c), Some(p)) => (c, p),
                _ => continue,
            };
            let (child, parent) = match (sound_table(cspec, dat), sound_table(pspec, dat)) {
                (Some(c), Some(p)) => (c, p),
                // reported as structure failure
                _ => continue,
            };

            let present = parent
                .rows()
                .filter_map(|row| project(pspec, &row, fk.mappings.iter().map(|(_, p)| p)))
                .collect::<HashSet<_>>();

            let mut missing: Vec<ForeignKeyFailure> = vec![];
            let mut groups: HashMap<Vec<Value>, usize> = HashMap::new();
            for row in child.rows() {
                let values = match project(cspec, &row, fk.mappings.iter().map(|(c, _)| c)) {
                    Some(values) => values,
                    None => continue,
                };
                if present.contains(&values) {
                    continue;
                }
                let i = *groups.entry(values.clone()).or_insert_with(|| {
                    missing.push(ForeignKeyFailure {
                        child: fk.child.clone(),
                        parent: fk.parent.clone(),
                        mappings: fk.mappings.clone(),
                        values,
                        rows: vec![],
                    });
                    missing.len() - 1
                });
                missing[i].rows.push(row.key().clone());
            }
            failures.extend(missing);
        }

        failures
    }

    pub fn find_data_type_failures(&self, dat: &DataSet) -> Vec<DataTypeFailure> {
        let mut failures = vec![];

        for spec in &self.tables {
            let table = match sound_table(spec, dat) {
                Some(table) => table,
                None => continue,
            };
            for field in &spec.fields {
                let data_type = match &field.data_type {
                    Some(data_type) => data_type,
                    None => continue,
                };
                for row in table.rows() {
                    if let Some(value) = row.get(&field.name) {
                        if !data_type.valid(value) {
                            failures.push(DataTypeFailure {
                                table: spec.name.clone(),
                                field: field.name.clone(),
                                key: row.key().clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }

        failures
    }

    fn expect_table(&self, name: &str) -> &TableSpec {
        match self.table(name) {
            Some(spec) => spec,
            None => panic!("Unknown table '{}'", name),
        }
    }

    fn expect_field(&mut self, table: &str, field: &str) -> &mut FieldSpec {
        let spec = match self.tables.iter_mut().find(|t| t.name == table) {
            Some(spec) => spec,
            None => panic!("Unknown table '{}'", table),
        };
        match spec.fields.iter_mut().find(|f| f.name == field) {
            Some(f) => f,
            None => panic!("Unknown field '{}' in table '{}'", field, table),
        }
    }
}

/// The structure failures of a present, declared table.
fn table_structure_failures(spec: &TableSpec, table: &Table) -> Vec<StructureFailure> {
    let expected = header(spec.primary_key.iter(), spec.fields.iter().map(|f| &f.name));
    let found = header(table.primary_key().iter(), table.fields().iter());
    if expected != found {
        return vec![StructureFailure::Header {
            table: spec.name.clone(),
            expected,
            found,
        }];
    }

    let mut failures = vec![];
    for row in table.rows() {
        if row.key().len() != spec.primary_key.len() {
            failures.push(StructureFailure::KeyArity {
                table: spec.name.clone(),
                key: row.key().clone(),
                expected: spec.primary_key.len(),
            });
        }
        if row.values().len() != spec.fields.len() {
            failures.push(StructureFailure::RecordArity {
                table: spec.name.clone(),
                key: row.key().clone(),
                expected: spec.fields.len(),
                found: row.values().len(),
            });
        }
    }
    failures
}

/// The table of `spec` if it is present and has no structure failures.
fn sound_table<'a>(spec: &TableSpec, dat: &'a DataSet) -> Option<&'a Table> {
    dat.table(&spec.name)
        .filter(|table| table_structure_failures(spec, table).is_empty())
}

fn header<'a, K, F>(key: K, fields: F) -> Vec<String>
where
    K: Iterator<Item = &'a String>,
    F: Iterator<Item = &'a String>,
{
    key.chain(fields).cloned().collect()
}

/// The values of the given fields of a row, `None` if one is missing.
fn project<'a, I>(spec: &TableSpec, row: &Row, fields: I) -> Option<Vec<Value>>
where
    I: Iterator<Item = &'a String>,
{
    fields.map(|f| spec.value_of(row, f).cloned()).collect()
}
