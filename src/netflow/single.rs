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

//! Single-commodity minimum cost flow.
//!
//! The classical minimum cost flow problem: the `nodes` table holds the
//! supply (positive `Inflow`) or demand (negative `Inflow`) of each node,
//! the `arcs` table the cost per unit and the capacity of each arc. The
//! solution consists of the `flow` table keyed by `(Source, Destination)`
//! and the `parameters` table with the total cost.

use super::{add_parameters, finite, run, Flow, FlowModel, Options};
use crate::error::Result;
use crate::schema::{DataType, Schema};
use crate::slicer::Slicer;
use crate::solver::LpSolver;
use crate::table::DataSet;
use crate::value::{DisplayKey, Value};

use tracing::debug;

/// The input schema.
pub fn input_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_table("nodes", &["Name"], &["Inflow"])
        .add_table("arcs", &["Source", "Destination"], &["Cost", "Capacity"])
        .add_foreign_key("arcs", "nodes", &[("Source", "Name")])
        .add_foreign_key("arcs", "nodes", &[("Destination", "Name")])
        .set_data_type("nodes", "Inflow", finite())
        .set_data_type("arcs", "Cost", DataType::number(0.0, f64::INFINITY, true, false))
        .set_data_type("arcs", "Capacity", DataType::number(0.0, f64::INFINITY, true, true))
        .set_default_value("arcs", "Capacity", Value::from(f64::INFINITY));

    schema
        .set_tooltip("nodes", "", "Define the nodes and their supply or demand.")
        .set_tooltip("nodes", "Name", "The name of the node.")
        .set_tooltip(
            "nodes",
            "Inflow",
            "The number of units supplied (positive) or consumed (negative) by this node.",
        )
        .set_tooltip("arcs", "", "Define the arcs flow may be shipped over.")
        .set_tooltip("arcs", "Source", "The source node for the arc.")
        .set_tooltip("arcs", "Destination", "The destination node for the arc.")
        .set_tooltip("arcs", "Cost", "The cost of shipping one unit over the arc.")
        .set_tooltip("arcs", "Capacity", "The number of units that can be shipped over the arc.");

    schema
}

/// The solution schema.
pub fn solution_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_table("flow", &["Source", "Destination"], &["Quantity"])
        .set_tooltip("flow", "", "This report defines the specific shipments.")
        .set_tooltip("flow", "Source", "The source for the shipment.")
        .set_tooltip("flow", "Destination", "The destination for the shipment.")
        .set_tooltip("flow", "Quantity", "The number of units being shipped.");
    add_parameters(&mut schema);
    schema
}

/// Build the LP model of a validated input data set.
///
/// There is a variable for each arc, bounded by its capacity, and a
/// flow conservation constraint for each node.
pub fn build(dat: &DataSet, solver: &dyn LpSolver, opts: &Options) -> FlowModel {
    let mut model = solver.new_model("single-commodity flow");
    let flows = dat
        .rows("arcs")
        .map(|row| {
            let key = row.key().clone();
            let capacity = row.number("Capacity").unwrap_or(f64::INFINITY);
            let upper = if capacity.is_finite() { Some(capacity) } else { None };
            let var = model.add_variable(&format!("flow{}", DisplayKey(&key)), 0.0, upper);
            let cost = row.number("Cost").unwrap_or(0.0);
            (key, Flow { var, cost })
        })
        .collect::<Vec<_>>();
    let mut fm = FlowModel::new(model, Slicer::new(2, flows));

    let mut nconservations = 0;
    for row in dat.rows("nodes") {
        let node = match row.key().first() {
            Some(node) => node,
            None => continue,
        };
        let inflow = row.number("Inflow").unwrap_or(0.0);
        if fm.add_conservation(&[], node, inflow, opts.prune_vacuous) {
            nconservations += 1;
        }
    }

    debug!(
        variables = fm.flows().len(),
        conservations = nconservations,
        "single-commodity model"
    );
    fm
}

/// Solve with default options.
pub fn solve(dat: &DataSet) -> Result<Option<DataSet>> {
    solve_with(dat, &Options::default())
}

/// Solve a single-commodity flow problem.
///
/// Returns an error if the data set does not satisfy the input schema
/// or the selected solver is not available, and `Ok(None)` if there is
/// no optimal solution.
pub fn solve_with(dat: &DataSet, opts: &Options) -> Result<Option<DataSet>> {
    run(&input_schema(), &solution_schema(), dat, opts, build)
}

#[cfg(test)]
mod tests {
    use super::{build, input_schema, solve};
    use crate::error::Error;
    use crate::key;
    use crate::netflow::tests::Recorder;
    use crate::netflow::Options;
    use crate::solver::Status;
    use crate::table::DataSet;
    use crate::value::Value;

    fn data() -> DataSet {
        let mut dat = input_schema().new_data();
        let nodes = dat.table_mut("nodes").unwrap();
        nodes.insert(key![1], vec![Value::from(2)]);
        nodes.insert_default(key![2]);
        nodes.insert(key![3], vec![Value::from(-2)]);
        nodes.insert_default(key![4]);
        let arcs = dat.table_mut("arcs").unwrap();
        arcs.insert(key![1, 2], vec![Value::from(1), Value::from(5)]);
        arcs.insert(key![2, 3], vec![Value::from(1)]);
        arcs.insert(key![1, 3], vec![Value::from(3), Value::from(1)]);
        dat
    }

    #[test]
    fn variables_and_constraints() {
        let recorder = Recorder::new(Status::Optimal, vec![]);
        let fm = build(&data(), &recorder, &Options::default());
        assert_eq!(fm.model().num_variables(), 3);

        let log = recorder.log.borrow();
        assert_eq!(log.variables[0], ("flow(1, 2)".to_string(), 0.0, Some(5.0)));
        assert_eq!(log.variables[1].2, None);
        assert_eq!(log.variables[2].2, Some(1.0));
        // node 4 is isolated
        assert_eq!(log.constraints.len(), 3);
        assert!(log.constraint("conservation(4)").is_none());
        assert_eq!(log.constraint("conservation(1)").unwrap().3, -2.0);
    }

    #[test]
    fn invalid_data() {
        let mut dat = data();
        dat.table_mut("arcs")
            .unwrap()
            .insert(key![3, 5], vec![Value::from(-1)]);
        match solve(&dat) {
            Err(Error::ForeignKey(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].values, key![5]);
                assert_eq!(failures[0].rows, vec![key![3, 5]]);
            }
            r => panic!("unexpected result {:?}", r),
        }

        dat.table_mut("arcs").unwrap().remove(&key![3, 5]);
        dat.table_mut("nodes")
            .unwrap()
            .insert(key![2], vec![Value::from(f64::INFINITY)]);
        assert!(matches!(solve(&dat), Err(Error::DataType(_))));
    }

    #[cfg(feature = "minilp")]
    #[test]
    fn solves() {
        let sol = solve(&data()).unwrap().unwrap();
        let flow = sol.table("flow").unwrap();
        // cheapest path 1 -> 2 -> 3
        assert_eq!(flow.len(), 2);
        assert!((flow.get(&key![1, 2]).unwrap().number("Quantity").unwrap() - 2.0).abs() < 1e-9);
        assert!((flow.get(&key![2, 3]).unwrap().number("Quantity").unwrap() - 2.0).abs() < 1e-9);
        let total = sol.table("parameters").unwrap().get(&key!["Total Cost"]).unwrap();
        assert!((total.number("Value").unwrap() - 4.0).abs() < 1e-9);
    }

    #[cfg(feature = "minilp")]
    #[test]
    fn infeasible() {
        let mut dat = data();
        dat.table_mut("arcs")
            .unwrap()
            .insert(key![2, 3], vec![Value::from(1), Value::from(0.5)]);
        // at most 0.5 + 1 units reach node 3
        assert!(solve(&dat).unwrap().is_none());
    }
}
