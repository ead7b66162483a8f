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

//! Multi-commodity minimum cost flow.
//!
//! Several commodities are shipped over a common network. Each commodity
//! has a volume per unit and the total volume shipped over an arc is
//! bounded by the arc's capacity. A commodity may only be shipped over an
//! arc if the `cost` table has a row for it.
//!
//! Input tables:
//!
//! | table         | primary key                         | fields     |
//! |---------------|-------------------------------------|------------|
//! | `commodities` | `Name`                              | `Volume`   |
//! | `nodes`       | `Name`                              |            |
//! | `arcs`        | `Source`, `Destination`             | `Capacity` |
//! | `cost`        | `Commodity`, `Source`, `Destination`| `Cost`     |
//! | `inflow`      | `Commodity`, `Node`                 | `Quantity` |
//!
//! The solution consists of the `flow` table keyed by
//! `(Commodity, Source, Destination)` and the `parameters` table with the
//! total cost.

use super::{add_parameters, finite, run, CostReferences, Flow, FlowModel, Options};
use crate::error::Result;
use crate::schema::{DataType, Schema};
use crate::slicer::{Pattern, Slicer};
use crate::solver::{Expression, LpSolver, Relation};
use crate::table::DataSet;
use crate::value::{DisplayKey, Value};

use std::collections::HashMap;
use tracing::debug;

/// The input schema with the default foreign keys of the `cost` table.
pub fn input_schema() -> Schema {
    input_schema_with(CostReferences::default())
}

/// The input schema with the given foreign keys of the `cost` table.
pub fn input_schema_with(cost_references: CostReferences) -> Schema {
    let mut schema = Schema::new();
    schema
        .add_table("commodities", &["Name"], &["Volume"])
        .add_table("nodes", &["Name"], &[])
        .add_table("arcs", &["Source", "Destination"], &["Capacity"])
        .add_table("cost", &["Commodity", "Source", "Destination"], &["Cost"])
        .add_table("inflow", &["Commodity", "Node"], &["Quantity"]);

    schema
        .add_foreign_key("arcs", "nodes", &[("Source", "Name")])
        .add_foreign_key("arcs", "nodes", &[("Destination", "Name")])
        .add_foreign_key("cost", "commodities", &[("Commodity", "Name")])
        .add_foreign_key("inflow", "commodities", &[("Commodity", "Name")])
        .add_foreign_key("inflow", "nodes", &[("Node", "Name")]);
    match cost_references {
        CostReferences::Arcs => {
            schema.add_foreign_key(
                "cost",
                "arcs",
                &[("Source", "Source"), ("Destination", "Destination")],
            );
        }
        CostReferences::Nodes => {
            schema
                .add_foreign_key("cost", "nodes", &[("Source", "Name")])
                .add_foreign_key("cost", "nodes", &[("Destination", "Name")]);
        }
    }

    schema
        .set_data_type(
            "commodities",
            "Volume",
            DataType::number(0.0, f64::INFINITY, false, false),
        )
        .set_default_value("commodities", "Volume", Value::from(1))
        .set_data_type("arcs", "Capacity", DataType::number(0.0, f64::INFINITY, true, true))
        .set_default_value("arcs", "Capacity", Value::from(f64::INFINITY))
        .set_data_type("cost", "Cost", DataType::number(0.0, f64::INFINITY, true, false))
        .set_data_type("inflow", "Quantity", finite());

    schema
        .set_tooltip("commodities", "", "Define the commodities.")
        .set_tooltip("commodities", "Name", "The name of the commodity.")
        .set_tooltip("commodities", "Volume", "The volume for one unit of this commodity.")
        .set_tooltip("nodes", "", "Define the nodes.")
        .set_tooltip("nodes", "Name", "The name of the node.")
        .set_tooltip(
            "arcs",
            "",
            "Populate the arcs table as a pre-requisite to populating the cost table.",
        )
        .set_tooltip("arcs", "Source", "The source node for the arc.")
        .set_tooltip("arcs", "Destination", "The destination node for the arc.")
        .set_tooltip(
            "arcs",
            "Capacity",
            "The total volume, summed across all commodities, that can be shipped over the arc.",
        )
        .set_tooltip(
            "cost",
            "",
            "Populate the cost table to allow a commodity to be shipped between two nodes.",
        )
        .set_tooltip("cost", "Commodity", "The commodity that can be shipped.")
        .set_tooltip("cost", "Source", "The node to serve as the source for the shipment.")
        .set_tooltip("cost", "Destination", "The node to serve as the destination for the shipment.")
        .set_tooltip("cost", "Cost", "The cost of shipping one unit of the commodity over the arc.")
        .set_tooltip(
            "inflow",
            "",
            "Populate the inflow table to allow a commodity to be supplied or consumed by a node.",
        )
        .set_tooltip("inflow", "Commodity", "The commodity to be supplied or consumed.")
        .set_tooltip("inflow", "Node", "The node to serve as a supplier or consumer.")
        .set_tooltip(
            "inflow",
            "Quantity",
            "The number of units supplied (positive) or consumed (negative) by this node.",
        );

    schema
}

/// The solution schema.
pub fn solution_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_table("flow", &["Commodity", "Source", "Destination"], &["Quantity"])
        .set_tooltip("flow", "", "This report defines the specific shipments.")
        .set_tooltip("flow", "Commodity", "The commodity being shipped.")
        .set_tooltip("flow", "Source", "The source for the shipment.")
        .set_tooltip("flow", "Destination", "The destination for the shipment.")
        .set_tooltip("flow", "Quantity", "The number of units being shipped.");
    add_parameters(&mut schema);
    schema
}

/// Build the LP model of a validated input data set.
///
/// The model has a variable for each row of `cost`, a capacity
/// constraint for each arc with finite capacity and at least one
/// variable, and a flow conservation constraint for each pair of
/// commodity and node.
pub fn build(dat: &DataSet, solver: &dyn LpSolver, opts: &Options) -> FlowModel {
    let mut model = solver.new_model("multi-commodity flow");
    let flows = dat
        .rows("cost")
        .map(|row| {
            let key = row.key().clone();
            let var = model.add_variable(&format!("flow{}", DisplayKey(&key)), 0.0, None);
            let cost = row.number("Cost").unwrap_or(0.0);
            (key, Flow { var, cost })
        })
        .collect::<Vec<_>>();
    let mut fm = FlowModel::new(model, Slicer::new(3, flows));

    let volumes = dat
        .rows("commodities")
        .filter_map(|row| Some((row.key().first()?, row.number("Volume").unwrap_or(1.0))))
        .collect::<HashMap<_, _>>();

    let mut ncapacities = 0;
    for row in dat.rows("arcs") {
        let capacity = row.number("Capacity").unwrap_or(f64::INFINITY);
        if capacity.is_infinite() {
            continue;
        }
        let (source, dest) = match &row.key()[..] {
            [source, dest] => (source, dest),
            _ => continue,
        };
        let mut expr = Expression::default();
        let mut nterms = 0;
        for (key, f) in fm.flows().slice(&[Pattern::Any, Pattern::Is(source), Pattern::Is(dest)]) {
            expr.add_mul(volumes.get(&key[0]).copied().unwrap_or(1.0), f.var);
            nterms += 1;
        }
        if nterms == 0 {
            continue;
        }
        let name = format!("capacity{}", DisplayKey(row.key()));
        fm.model_mut().add_constraint(expr, Relation::Le, capacity, &name);
        ncapacities += 1;
    }

    let inflow = dat.table("inflow");
    let mut nconservations = 0;
    for commodity in dat.rows("commodities") {
        let commodity = commodity.key();
        for node in dat.rows("nodes") {
            let node = match node.key().first() {
                Some(node) => node,
                None => continue,
            };
            let mut key = commodity.clone();
            key.push(node.clone());
            let quantity = inflow
                .and_then(|t| t.get(&key))
                .and_then(|row| row.number("Quantity"))
                .unwrap_or(0.0);
            if fm.add_conservation(commodity, node, quantity, opts.prune_vacuous) {
                nconservations += 1;
            }
        }
    }

    debug!(
        variables = fm.flows().len(),
        capacities = ncapacities,
        conservations = nconservations,
        "multi-commodity model"
    );
    fm
}

/// Solve with default options.
pub fn solve(dat: &DataSet) -> Result<Option<DataSet>> {
    solve_with(dat, &Options::default())
}

/// Solve a multi-commodity flow problem.
///
/// Returns an error if the data set does not satisfy the input schema
/// (with the foreign keys selected by `opts.cost_references`) or the
/// selected solver is not available, and `Ok(None)` if there is no
/// optimal solution.
pub fn solve_with(dat: &DataSet, opts: &Options) -> Result<Option<DataSet>> {
    run(
        &input_schema_with(opts.cost_references),
        &solution_schema(),
        dat,
        opts,
        build,
    )
}
