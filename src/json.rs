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

//! Reading and writing data sets as JSON documents.
//!
//! A document is an object mapping table names to lists of rows. A row
//! is either
//!
//! - a list of the primary key values followed by the payload values
//!   (trailing payload values may be omitted), or
//! - an object mapping field names to values (missing payload fields and
//!   `null` values take their defaults).
//!
//! Since JSON cannot express infinities, they are written as the strings
//! `"inf"` and `"-inf"`.
//!
//! # Example
//!
//! ```
//! use rs_netflow::netflow::single;
//! use rs_netflow::{json, key};
//!
//! let dat = json::read_str(&single::input_schema(), r#"{
//!     "nodes": [["s", 3], ["t", -3]],
//!     "arcs": [{"Source": "s", "Destination": "t", "Cost": 2}]
//! }"#).unwrap();
//!
//! let arc = dat.table("arcs").unwrap().get(&key!["s", "t"]).unwrap();
//! assert_eq!(arc.number("Capacity"), Some(f64::INFINITY));
//! ```

use crate::error::{Error, Result};
use crate::schema::{Schema, StructureFailure, TableSpec};
use crate::table::{DataSet, Table};
use crate::value::{Key, Value};

use serde_json::{Map, Value as Json};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Read a data set of `schema` from a JSON document.
///
/// Tables missing from the document are empty. Unknown tables, rows that
/// do not fit their table and duplicate primary keys are reported as
/// [`Error::Structure`].
pub fn read<R: Read>(schema: &Schema, reader: R) -> Result<DataSet> {
    let doc: Json = serde_json::from_reader(reader)?;
    from_json(schema, &doc)
}

/// Read a data set of `schema` from a string.
pub fn read_str(schema: &Schema, s: &str) -> Result<DataSet> {
    let doc: Json = serde_json::from_str(s)?;
    from_json(schema, &doc)
}

/// Read a data set of `schema` from a file.
pub fn read_from_file<P: AsRef<Path>>(schema: &Schema, path: P) -> Result<DataSet> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading data set");
    read(schema, BufReader::new(File::open(path)?))
}

/// Convert a parsed JSON document to a data set of `schema`.
pub fn from_json(schema: &Schema, doc: &Json) -> Result<DataSet> {
    let mut dat = schema.new_data();
    let mut failures = vec![];

    let tables = match doc.as_object() {
        Some(tables) => tables,
        None => {
            return Err(Error::Structure(vec![StructureFailure::MalformedRow {
                table: String::new(),
                row: 0,
                msg: "the document must be an object of tables".to_string(),
            }]))
        }
    };

    for (name, rows) in tables {
        let (spec, table) = match (schema.table(name), dat.table_mut(name)) {
            (Some(spec), Some(table)) => (spec, table),
            _ => {
                failures.push(StructureFailure::UnknownTable { table: name.clone() });
                continue;
            }
        };
        let rows = match rows.as_array() {
            Some(rows) => rows,
            None => {
                failures.push(malformed(name, 0, "expected a list of rows"));
                continue;
            }
        };
        for (i, row) in rows.iter().enumerate() {
            match read_row(spec, table, row) {
                Ok((key, values)) => {
                    if table.contains_key(&key) {
                        failures.push(StructureFailure::DuplicateKey {
                            table: name.clone(),
                            key,
                        });
                    } else {
                        table.insert(key, values);
                    }
                }
                Err(msg) => failures.push(malformed(name, i, &msg)),
            }
        }
    }

    if failures.is_empty() {
        Ok(dat)
    } else {
        warn!(failures = failures.len(), "invalid JSON data set");
        Err(Error::Structure(failures))
    }
}

fn malformed(table: &str, row: usize, msg: &str) -> StructureFailure {
    StructureFailure::MalformedRow {
        table: table.to_string(),
        row,
        msg: msg.to_string(),
    }
}

/// Split a JSON row into primary key and payload.
fn read_row(spec: &TableSpec, table: &Table, row: &Json) -> std::result::Result<(Key, Vec<Value>), String> {
    let nkey = spec.primary_key.len();
    let nfields = spec.fields.len();

    match row {
        Json::Array(entries) => {
            if entries.len() < nkey || entries.len() > nkey + nfields {
                return Err(format!(
                    "expected between {} and {} entries, found {}",
                    nkey,
                    nkey + nfields,
                    entries.len()
                ));
            }
            let key = entries[..nkey].iter().map(key_value).collect::<std::result::Result<Key, _>>()?;
            let mut values = Vec::with_capacity(nfields);
            for (j, field) in spec.fields.iter().enumerate() {
                match entries.get(nkey + j) {
                    Some(v) => values.push(field_value(table, &field.name, v)?),
                    None => values.push(default_value(table, &field.name)),
                }
            }
            Ok((key, values))
        }
        Json::Object(entries) => {
            if let Some(unknown) = entries
                .keys()
                .find(|f| !spec.primary_key.contains(*f) && !spec.fields.iter().any(|g| &g.name == *f))
            {
                return Err(format!("unknown field '{}'", unknown));
            }
            let key = spec
                .primary_key
                .iter()
                .map(|f| match entries.get(f) {
                    Some(v) => key_value(v),
                    None => Err(format!("missing primary key field '{}'", f)),
                })
                .collect::<std::result::Result<Key, _>>()?;
            let values = spec
                .fields
                .iter()
                .map(|f| match entries.get(&f.name) {
                    Some(v) => field_value(table, &f.name, v),
                    None => Ok(default_value(table, &f.name)),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((key, values))
        }
        _ => Err("a row must be a list or an object".to_string()),
    }
}

fn key_value(v: &Json) -> std::result::Result<Value, String> {
    match v {
        Json::Null => Err("primary key values must not be null".to_string()),
        _ => to_value(v),
    }
}

fn field_value(table: &Table, field: &str, v: &Json) -> std::result::Result<Value, String> {
    match v {
        Json::Null => Ok(default_value(table, field)),
        _ => to_value(v),
    }
}

fn default_value(table: &Table, field: &str) -> Value {
    table.default_value(field).cloned().unwrap_or_else(|| Value::from(0))
}

fn to_value(v: &Json) -> std::result::Result<Value, String> {
    match v {
        Json::Number(x) => x
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("unsupported number {}", x)),
        Json::String(s) => Ok(Value::from(s.as_str())),
        _ => Err(format!("unsupported value {}", v)),
    }
}

fn from_value(v: &Value) -> Json {
    match v {
        Value::Text(s) => Json::from(s.as_str()),
        Value::Number(x) => {
            let x = x.into_inner();
            if x.is_infinite() {
                Json::from(if x > 0.0 { "inf" } else { "-inf" })
            } else if x.fract() == 0.0 && x.abs() < 9.0e15 {
                Json::from(x as i64)
            } else {
                // NaN becomes null
                Json::from(x)
            }
        }
    }
}

/// Convert a data set to a JSON document of row lists.
pub fn to_json(dat: &DataSet) -> Json {
    let mut tables = Map::new();
    for table in dat.tables() {
        let rows = table
            .rows()
            .map(|row| Json::Array(row.key().iter().chain(row.values()).map(from_value).collect()))
            .collect();
        tables.insert(table.name().to_string(), Json::Array(rows));
    }
    Json::Object(tables)
}

/// Write a data set as JSON document.
pub fn write<W: Write>(dat: &DataSet, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &to_json(dat))?;
    Ok(())
}

/// Write a data set to a file.
pub fn write_to_file<P: AsRef<Path>>(dat: &DataSet, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write(dat, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Return the data set as JSON string.
pub fn to_string(dat: &DataSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_json(dat))?)
}

#[cfg(test)]
mod tests {
    use super::{read_str, to_json, to_string};
    use crate::error::Error;
    use crate::key;
    use crate::netflow::multi;
    use crate::schema::StructureFailure;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn list_and_object_rows() {
        let dat = read_str(
            &multi::input_schema(),
            r#"{
                "commodities": [["Pens"], ["Pencils", 2.5]],
                "nodes": [["A"], {"Name": "B"}, [3]],
                "arcs": [["A", "B", "inf"], {"Source": "B", "Destination": 3, "Capacity": 7}],
                "cost": [{"Commodity": "Pens", "Source": "A", "Destination": "B", "Cost": null}]
            }"#,
        )
        .unwrap();

        let commodities = dat.table("commodities").unwrap();
        assert_eq!(commodities.get(&key!["Pens"]).unwrap().number("Volume"), Some(1.0));
        assert_eq!(commodities.get(&key!["Pencils"]).unwrap().number("Volume"), Some(2.5));
        assert!(dat.table("nodes").unwrap().contains_key(&key![3]));
        assert!(!dat.table("nodes").unwrap().contains_key(&key!["3"]));

        let arcs = dat.table("arcs").unwrap();
        assert_eq!(arcs.get(&key!["A", "B"]).unwrap().number("Capacity"), Some(f64::INFINITY));
        assert_eq!(arcs.get(&key!["B", 3]).unwrap().number("Capacity"), Some(7.0));

        let cost = dat.table("cost").unwrap();
        assert_eq!(cost.get(&key!["Pens", "A", "B"]).unwrap().number("Cost"), Some(0.0));
        assert!(dat.table("inflow").unwrap().is_empty());
        assert!(multi::input_schema().validate(&dat).is_ok());
    }

    #[test]
    fn structure_errors() {
        let err = read_str(
            &multi::input_schema(),
            r#"{
                "nodes": [["A"], ["A"], ["B", 1], [true], {"Label": "C"}],
                "routes": []
            }"#,
        )
        .unwrap_err();
        let failures = match err {
            Error::Structure(failures) => failures,
            e => panic!("unexpected error {}", e),
        };
        assert_eq!(failures.len(), 5);
        assert!(failures.contains(&StructureFailure::DuplicateKey {
            table: "nodes".into(),
            key: key!["A"],
        }));
        assert!(failures.contains(&StructureFailure::UnknownTable { table: "routes".into() }));
        let malformed = failures
            .iter()
            .filter_map(|f| match f {
                StructureFailure::MalformedRow { row, .. } => Some(*row),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(malformed, vec![2, 3, 4]);

        assert!(matches!(read_str(&multi::input_schema(), "[1, 2]"), Err(Error::Structure(_))));
        assert!(matches!(read_str(&multi::input_schema(), "{"), Err(Error::Json(_))));
    }

    #[test]
    fn writes_lists() {
        let mut dat = multi::solution_schema().new_data();
        dat.table_mut("flow")
            .unwrap()
            .insert(key!["Pens", "A", "B"], vec![Value::from(2.5)]);
        dat.table_mut("parameters")
            .unwrap()
            .insert(key!["Total Cost"], vec![Value::from(f64::INFINITY)]);
        assert_eq!(
            to_json(&dat),
            json!({
                "flow": [["Pens", "A", "B", 2.5]],
                "parameters": [["Total Cost", "inf"]],
            })
        );

        let text = to_string(&dat).unwrap();
        let back = read_str(&multi::solution_schema(), &text).unwrap();
        assert_eq!(back.table("flow").unwrap().len(), 1);
    }
}
