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

//! Minimum cost network flow models.
//!
//! Both variants share the same pipeline: the input data set is
//! validated against the input schema, a [`FlowModel`] is built (one
//! flow variable per allowed shipment, capacity and flow conservation
//! constraints, linear cost objective), the model is optimized by an
//! [`LpSolver`] and the optimal flow is extracted into a data set of the
//! solution schema.
//!
//! - [`multi`]: several commodities sharing arc capacities,
//! - [`single`]: one commodity with capacities and costs on the arcs.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "minilp")]
//! # {
//! use rs_netflow::netflow::single;
//! use rs_netflow::{key, Value};
//!
//! let mut dat = single::input_schema().new_data();
//! let nodes = dat.table_mut("nodes").unwrap();
//! nodes.insert(key!["s"], vec![Value::from(3)]);
//! nodes.insert(key!["t"], vec![Value::from(-3)]);
//! dat.table_mut("arcs")
//!     .unwrap()
//!     .insert(key!["s", "t"], vec![Value::from(2), Value::from(10)]);
//!
//! let sol = single::solve(&dat).unwrap().unwrap();
//! let total = sol.table("parameters").unwrap().get(&key!["Total Cost"]).unwrap();
//! assert!((total.number("Value").unwrap() - 6.0).abs() < 1e-9);
//! # }
//! ```

pub mod multi;
pub mod single;

use crate::error::{Error, Result};
use crate::schema::{DataType, Schema};
use crate::slicer::{Pattern, Slicer};
use crate::solver::{self, Backend, Expression, LpModel, LpSolver, Relation, Sense, Status, Variable};
use crate::table::DataSet;
use crate::value::{DisplayKey, Value};

use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// The foreign key declarations of the `(Source, Destination)` fields of
/// the multi-commodity `cost` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostReferences {
    /// The pair `(Source, Destination)` must be a row of `arcs`.
    #[default]
    Arcs,
    /// `Source` and `Destination` must be rows of `nodes`, each on its own.
    Nodes,
}

/// Options of a solve call.
///
/// # Example
///
/// ```
/// use rs_netflow::netflow::{CostReferences, Options};
///
/// let opts = Options::from_toml_str(r#"
///     prune_vacuous = false
///     cost_references = "nodes"
/// "#).unwrap();
///
/// assert!(!opts.prune_vacuous);
/// assert_eq!(opts.cost_references, CostReferences::Nodes);
/// assert_eq!(opts.zero_tolerance, 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// The LP solver.
    pub backend: Backend,

    /// Skip conservation constraints of nodes without inflow and without
    /// adjacent flow variables.
    pub prune_vacuous: bool,

    /// Flows not larger than this are not reported.
    pub zero_tolerance: f64,

    /// The foreign keys of the multi-commodity `cost` table.
    pub cost_references: CostReferences,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            backend: Backend::default(),
            prune_vacuous: true,
            zero_tolerance: 1e-9,
            cost_references: CostReferences::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_file(path)
    }

    /// Loads options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses options from a TOML string.
    ///
    /// Missing entries take their default values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let opts: Options = toml::from_str(s)?;
        opts.check()?;
        Ok(opts)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_prune_vacuous(mut self, prune: bool) -> Self {
        self.prune_vacuous = prune;
        self
    }

    pub fn with_zero_tolerance(mut self, tolerance: f64) -> Self {
        self.zero_tolerance = tolerance;
        self
    }

    pub fn with_cost_references(mut self, refs: CostReferences) -> Self {
        self.cost_references = refs;
        self
    }

    /// Check the values of the options.
    pub fn check(&self) -> Result<()> {
        if !(self.zero_tolerance >= 0.0 && self.zero_tolerance.is_finite()) {
            return Err(Error::Config(format!(
                "zero_tolerance must be a finite non-negative number, got {}",
                self.zero_tolerance
            )));
        }
        Ok(())
    }
}

/// A flow variable together with its cost per unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flow {
    pub var: Variable,
    pub cost: f64,
}

/// An LP model of a network flow problem.
///
/// The flow variables are indexed by the keys of their rows, i.e.
/// `(Commodity, Source, Destination)` or `(Source, Destination)`.
pub struct FlowModel {
    model: Box<dyn LpModel>,
    flows: Slicer<Flow>,
}

impl FlowModel {
    /// Create the model and set the objective `min sum(cost * flow)`.
    pub fn new(mut model: Box<dyn LpModel>, flows: Slicer<Flow>) -> FlowModel {
        let mut objective = Expression::with_capacity(flows.len());
        for (_, f) in flows.entries() {
            objective.add_mul(f.cost, f.var);
        }
        model.set_objective(objective, Sense::Minimize);
        FlowModel { model, flows }
    }

    pub fn model(&self) -> &dyn LpModel {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn LpModel {
        self.model.as_mut()
    }

    pub fn flows(&self) -> &Slicer<Flow> {
        &self.flows
    }

    pub fn optimize(&mut self) -> Status {
        self.model.optimize()
    }

    /// Add the flow conservation constraint of one node.
    ///
    /// `prefix` are the leading key fields selecting the flows of one
    /// commodity (empty for single commodity models). The constraint is
    /// `sum(inbound) + inflow == sum(outbound)`.
    ///
    /// Returns `false` if the constraint has been skipped because it is
    /// vacuous and `prune` is set.
    pub fn add_conservation(&mut self, prefix: &[Value], node: &Value, inflow: f64, prune: bool) -> bool {
        let mut pattern = prefix.iter().map(Pattern::Is).collect::<Vec<_>>();
        let n = pattern.len();
        pattern.extend([Pattern::Any, Pattern::Is(node)]);

        let mut expr = Expression::default();
        let mut nterms = 0;
        for (_, f) in self.flows.slice(&pattern) {
            expr.add_mul(1.0, f.var);
            nterms += 1;
        }
        pattern[n] = Pattern::Is(node);
        pattern[n + 1] = Pattern::Any;
        for (_, f) in self.flows.slice(&pattern) {
            expr.add_mul(-1.0, f.var);
            nterms += 1;
        }

        if prune && nterms == 0 && inflow == 0.0 {
            return false;
        }

        let mut key = prefix.to_vec();
        key.push(node.clone());
        let name = format!("conservation{}", DisplayKey(&key));
        self.model.add_constraint(expr, Relation::Eq, -inflow, &name);
        true
    }
}

/// Add the `parameters` table of the solution schemas.
fn add_parameters(schema: &mut Schema) {
    schema
        .add_table("parameters", &["Parameter"], &["Value"])
        .set_tooltip(
            "parameters",
            "",
            "This report lists the Key Performance Indicators for the solution.",
        )
        .set_tooltip("parameters", "Parameter", "The name of the Key Performance Indicator.")
        .set_tooltip("parameters", "Value", "The value of the Key Performance Indicator.");
}

/// The domain of finite real numbers.
fn finite() -> DataType {
    DataType::number(f64::NEG_INFINITY, f64::INFINITY, false, false)
}

/// Read the solution of a solved model.
///
/// Returns `None` if the model has not been solved to optimality.
/// Otherwise the returned data set (of `solution_schema`) contains a
/// `flow` row for each flow variable with value larger than
/// `opts.zero_tolerance` and the `parameters` row `"Total Cost"`, the
/// cost of the reported flow.
pub fn extract(solution_schema: &Schema, flow_model: &FlowModel, opts: &Options) -> Option<DataSet> {
    let status = flow_model.model.status();
    if status != Status::Optimal {
        warn!(?status, "no optimal solution");
        return None;
    }

    let mut sol = solution_schema.new_data();
    let mut total_cost = 0.0;
    let mut nflows = 0;
    {
        let flow = sol.table_mut("flow")?;
        for (key, f) in flow_model.flows.entries() {
            let x = flow_model.model.value(f.var);
            if x > opts.zero_tolerance {
                flow.insert(key.clone(), vec![Value::from(x)]);
                total_cost += f.cost * x;
                nflows += 1;
            }
        }
    }
    sol.table_mut("parameters")?
        .insert(vec![Value::from("Total Cost")], vec![Value::from(total_cost)]);

    info!(flows = nflows, total_cost, "optimal solution");
    Some(sol)
}

/// The common solve pipeline: validate, build, optimize, extract.
fn run<F>(input_schema: &Schema, solution_schema: &Schema, dat: &DataSet, opts: &Options, build: F) -> Result<Option<DataSet>>
where
    F: FnOnce(&DataSet, &dyn LpSolver, &Options) -> FlowModel,
{
    opts.check()?;
    input_schema.validate(dat).into_result()?;
    let solver = solver::backend(opts.backend)?;

    let mut flow_model = build(dat, solver.as_ref(), opts);
    debug!(
        solver = solver.name(),
        variables = flow_model.model.num_variables(),
        constraints = flow_model.model.num_constraints(),
        "model built"
    );
    flow_model.optimize();
    Ok(extract(solution_schema, &flow_model, opts))
}
