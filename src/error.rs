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

use crate::schema::{DataTypeFailure, ForeignKeyFailure, StructureFailure};
use std::fmt::Display;
use std::io;
use thiserror::Error;

/// Error of a solve call or of reading input data.
///
/// Failing to find an optimal solution is *not* an error, solve
/// functions return `Ok(None)` in this case.
#[derive(Debug, Error)]
pub enum Error {
    /// The data set does not have the declared tables and fields.
    #[error("{} structure failure(s): {}", .0.len(), listing(.0))]
    Structure(Vec<StructureFailure>),

    /// Some rows reference non-existing rows of another table.
    #[error("{} foreign key failure(s): {}", .0.len(), listing(.0))]
    ForeignKey(Vec<ForeignKeyFailure>),

    /// Some values are outside their declared domain.
    #[error("{} data type failure(s): {}", .0.len(), listing(.0))]
    DataType(Vec<DataTypeFailure>),

    /// The requested LP solver has not been compiled in.
    #[error("LP solver '{0}' is not available")]
    SolverUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

const MAX_LISTED: usize = 5;

fn listing<T: Display>(items: &[T]) -> String {
    let mut s = items
        .iter()
        .take(MAX_LISTED)
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    if items.len() > MAX_LISTED {
        s.push_str(&format!("; ... ({} more)", items.len() - MAX_LISTED));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::key;
    use crate::schema::{DataTypeFailure, StructureFailure};
    use crate::value::Value;

    #[test]
    fn messages() {
        let err = Error::DataType(vec![DataTypeFailure {
            table: "arcs".into(),
            field: "Capacity".into(),
            key: key![1, 2],
            value: Value::from(-3),
        }]);
        assert_eq!(
            err.to_string(),
            "1 data type failure(s): arcs.Capacity of row (1, 2) has invalid value -3"
        );

        let err = Error::Structure(
            (0..7)
                .map(|i| StructureFailure::MissingTable {
                    table: format!("t{}", i),
                })
                .collect(),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("7 structure failure(s): missing table 't0'; missing table 't1'"));
        assert!(msg.ends_with("; ... (2 more)"));
    }
}
