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

//! This module implements a read function for the DIMACS min cost
//! flow format. A DIMACS file must look as follows.
//!
//! 1. empty lines are allowed and ignored
//! 2. a line starting with `c` is a comment line and is ignored
//! 3. the first non-comment line must have the form `p min <n> <m>`,
//!    where `<n>` is an integer > 0 denoting the number of nodes and
//!    `<m>` an integer denoting the number of arcs.
//! 4. after the problem line there must follow node lines of the form
//!    `n <node> <balance>` where `<node>` is the node number between
//!    `1..n` and `<balance>` is node's supply (if positive) or demand
//!    (if negative). Nodes that have balance 0 do not need to be
//!    specified.
//! 5. after the node lines there must be exactly `m` arc lines `a <u>
//!    <v> <lb> <ub> <c>` denoting the source and sink nodes of an arc
//!    as well as the arcs lower bound `<lb>`, upper bound `<ub>` and
//!    cost `<c>`.
//!
//! The instance is read into a data set of the single-commodity input
//! schema ([`crate::netflow::single::input_schema`]). The nodes are named
//! by their numbers. Because the data set has no lower bounds, all lower
//! bounds must be 0. Loops and parallel arcs are not allowed.

use super::{DimacsReader, Error, Result};
use crate::netflow::single;
use crate::table::DataSet;
use crate::value::{Key, Value};

use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Read a min-cost-flow instance.
pub fn read<R: Read>(r: R) -> Result<DataSet> {
    let mut reader = DimacsReader::new(r);

    // Read the problem line.
    let mut pline = reader.expect_line("p")?;
    pline.expect("min")?;
    let nnodes: usize = pline.number()?;
    let narcs: usize = pline.number()?;
    pline.end()?;
    let pline_number = pline.line;

    if nnodes == 0 {
        return Err(Error::Data {
            line: pline_number,
            msg: "the number of nodes must be positive".to_string(),
        });
    }

    let mut balances = vec![0.0; nnodes];
    let mut arcs: Vec<(Key, Vec<Value>)> = Vec::with_capacity(narcs);
    let mut seen = std::collections::HashSet::new();

    while let Some((d, mut toks)) = reader.read_one_line_of(&["n", "a"])? {
        if d == "n" {
            if !arcs.is_empty() {
                return Err(Error::Format {
                    line: toks.line,
                    msg: "node lines must precede arc lines".to_string(),
                });
            }
            let u: usize = toks.number()?;
            if u < 1 || u > nnodes {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("invalid node id {} (must be in 1..{})", u, nnodes),
                });
            }
            balances[u - 1] = toks.number()?;
        } else {
            let u: usize = toks.number()?;
            let v: usize = toks.number()?;
            let lb: f64 = toks.number()?;
            let ub: f64 = toks.number()?;
            let c: f64 = toks.number()?;

            if u < 1 || u > nnodes {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("invalid source node id {} (must be in 1..{})", u, nnodes),
                });
            }

            if v < 1 || v > nnodes {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("invalid sink node id {} (must be in 1..{})", v, nnodes),
                });
            }

            if u == v {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("invalid loop ({},{}) in arc", u, u),
                });
            }

            if lb != 0.0 {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("unsupported nonzero lower bound {} of arc ({},{})", lb, u, v),
                });
            }

            if !seen.insert((u, v)) {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("parallel arc ({},{})", u, v),
                });
            }

            if arcs.len() == narcs {
                return Err(Error::Data {
                    line: toks.line,
                    msg: format!("unexpected 'a' line (expected exactly {} arcs)", narcs),
                });
            }

            arcs.push((vec![Value::from(u), Value::from(v)], vec![Value::from(c), Value::from(ub)]));
        }

        toks.end()?;
    }

    if arcs.len() != narcs {
        return Err(Error::Data {
            line: reader.line_number(),
            msg: format!("expected {} arcs, found {}", narcs, arcs.len()),
        });
    }

    let mut dat = single::input_schema().new_data();
    if let Some(nodes) = dat.table_mut("nodes") {
        for (i, &b) in balances.iter().enumerate() {
            nodes.insert(vec![Value::from(i + 1)], vec![Value::from(b)]);
        }
    }
    if let Some(table) = dat.table_mut("arcs") {
        for (key, values) in arcs {
            table.insert(key, values);
        }
    }
    debug!(nodes = nnodes, arcs = narcs, "read DIMACS min-cost-flow instance");

    Ok(dat)
}

/// Read a min-cost-flow instance from a named file.
pub fn read_from_file<P: AsRef<Path>>(filename: P) -> Result<DataSet> {
    read(std::fs::File::open(filename)?)
}

/// Write a solution of a single-commodity min-cost-flow problem.
///
/// The solution value is the `"Total Cost"` parameter, the flows are the
/// rows of the `flow` table.
pub fn write_solution<W: Write>(mut w: W, solution: &DataSet) -> std::io::Result<()> {
    let value = solution
        .table("parameters")
        .and_then(|t| t.get(&[Value::from("Total Cost")]))
        .and_then(|row| row.number("Value"))
        .unwrap_or(0.0);
    writeln!(w, "s {}", value)?;
    for row in solution.rows("flow") {
        if let ([u, v], Some(x)) = (&row.key()[..], row.number("Quantity")) {
            writeln!(w, "f {} {} {}", u, v, x)?;
        }
    }

    Ok(())
}

/// Write a solution of a min-cost-flow problem to a named file.
pub fn write_solution_to_file<P: AsRef<Path>>(filename: P, solution: &DataSet) -> std::io::Result<()> {
    write_solution(&mut std::fs::File::create(filename)?, solution)
}

/// Read a solution of a min-cost-flow problem.
///
/// Returns the solution value and the list of flows `(u, v, flow)`.
pub fn read_solution<R: Read>(r: R) -> Result<(f64, Vec<(usize, usize, f64)>)> {
    let mut reader = DimacsReader::new(r);
    let mut flows = vec![];
    let mut sol = None;

    // Read the solution value line.
    while let Some((d, mut toks)) = reader.read_one_line_of(&["f", "s"])? {
        if d == "f" {
            flows.push((toks.number()?, toks.number()?, toks.number()?));
        } else {
            if sol.is_some() {
                return Err(Error::Format {
                    line: toks.line,
                    msg: "The solution value must be specified exactly once".to_string(),
                });
            }
            sol = Some(toks.number()?);
        }
        toks.end()?;
    }

    Ok((
        sol.ok_or_else(|| Error::Format {
            line: 0,
            msg: "Missing solution value".to_string(),
        })?,
        flows,
    ))
}

/// Read a solution of a min-cost-flow problem from a named file.
pub fn read_solution_from_file<P: AsRef<Path>>(filename: P) -> Result<(f64, Vec<(usize, usize, f64)>)> {
    read_solution(std::fs::File::open(filename)?)
}
