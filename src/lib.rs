// Copyright (c) 2015-2022 Frank Fischer <frank-fischer@shadow-soft.de>
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see  <http://www.gnu.org/licenses/>
//

#![forbid(unsafe_code)]

//! Validation and LP formulation of minimum cost network flow problems.
//!
//! Input data is given as a [`DataSet`] of relational tables. A
//! [`Schema`] declares the tables, their primary keys, foreign keys and
//! the domains of their fields, and checks a data set against these
//! declarations. The [`netflow`] module formulates validated data as a
//! linear program, solves it with an LP solver behind the [`solver`]
//! traits and returns the optimal flow as another data set.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "minilp")]
//! # {
//! use rs_netflow::netflow::multi;
//! use rs_netflow::{json, key};
//!
//! let dat = json::read_str(&multi::input_schema(), r#"{
//!     "commodities": [["Pens"]],
//!     "nodes": [["Detroit"], ["Boston"]],
//!     "arcs": [["Detroit", "Boston", 100]],
//!     "cost": [["Pens", "Detroit", "Boston", 20]],
//!     "inflow": [["Pens", "Detroit", 40], ["Pens", "Boston", -40]]
//! }"#).unwrap();
//!
//! let sol = multi::solve(&dat).unwrap().expect("feasible");
//! let flow = sol.table("flow").unwrap().get(&key!["Pens", "Detroit", "Boston"]).unwrap();
//! assert!((flow.number("Quantity").unwrap() - 40.0).abs() < 1e-6);
//! # }
//! ```

// # Data

pub mod value;
pub use self::value::{Key, Value};

pub mod table;
pub use self::table::{DataSet, Row, Table};

pub mod schema;
pub use self::schema::{DataType, Schema, ValidationReport};

pub mod error;
pub use self::error::{Error, Result};

// # Models

pub mod slicer;
pub mod solver;

pub mod netflow;
pub use self::netflow::{CostReferences, Options};

// # File formats

pub mod json;

#[cfg(feature = "dimacs")]
pub mod dimacs;
