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

//! Cell values and primary keys of relational tables.

use ordered_float::OrderedFloat;
use std::fmt;

/// The value of a single table cell.
///
/// Numbers and strings are distinct values, i.e. the node `1` and the
/// node `"1"` are different nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Number(OrderedFloat<f64>),
    Text(String),
}

/// A primary key, i.e. the ordered tuple of primary key values of a row.
pub type Key = Vec<Value>;

/// Create a [`Key`] from a list of values convertible to [`Value`].
///
/// # Example
///
/// ```
/// use rs_netflow::{key, Value};
///
/// let k = key!["Pencils", "Detroit", 3];
/// assert_eq!(k, vec![Value::from("Pencils"), Value::from("Detroit"), Value::from(3)]);
/// ```
#[macro_export]
macro_rules! key {
    ($($v:expr),* $(,)?) => {
        vec![$($crate::Value::from($v)),*]
    };
}

impl Value {
    /// Return the numeric value of this cell.
    ///
    /// Strings spelling an infinity (`inf`, `-inf`, `infinity`, ...) are
    /// accepted, because JSON has no literal for them.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(x.into_inner()),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                _ => None,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Number(OrderedFloat(x))
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Value {
        Value::from(f64::from(x))
    }
}

impl From<u32> for Value {
    fn from(x: u32) -> Value {
        Value::from(f64::from(x))
    }
}

impl From<usize> for Value {
    fn from(x: usize) -> Value {
        Value::from(x as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Value {
        v.clone()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(x) => write!(fmt, "{}", x.into_inner()),
            Value::Text(s) => write!(fmt, "{}", s),
        }
    }
}

/// Displays a key as `(v1, v2, ...)`.
pub struct DisplayKey<'a>(pub &'a [Value]);

impl<'a> fmt::Display for DisplayKey<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(fmt, ", ")?;
            }
            match v {
                Value::Text(s) => write!(fmt, "{:?}", s)?,
                Value::Number(_) => write!(fmt, "{}", v)?,
            }
        }
        write!(fmt, ")")
    }
}
