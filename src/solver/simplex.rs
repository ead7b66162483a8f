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

//! LP models solved by the simplex implementation of the `minilp` crate,
//! driven through `good_lp`.
//!
//! `good_lp` wants the objective before the first constraint, so the
//! constraints are collected and handed over by [`LpModel::optimize`].

use super::{Expression, LpModel, LpSolver, Relation, Sense, Status, Variable};
use good_lp::solvers::minilp::minilp;
use good_lp::{constraint, variable, Constraint, IntoAffineExpression, ProblemVariables, ResolutionError};
use good_lp::{Solution, SolverModel};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Creates [`MinilpModel`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinilpSolver;

impl LpSolver for MinilpSolver {
    fn name(&self) -> &str {
        "minilp"
    }

    fn new_model(&self, name: &str) -> Box<dyn LpModel> {
        Box::new(MinilpModel::new(name))
    }
}

/// An LP model solved by `minilp`.
pub struct MinilpModel {
    name: String,
    problem: ProblemVariables,
    vars: Vec<Variable>,
    constraints: Vec<Constraint>,
    nconstraints: usize,
    /// The first constraint without variables that does not hold.
    violated: Option<String>,
    objective: Expression,
    sense: Sense,
    status: Status,
    values: HashMap<Variable, f64>,
}

impl MinilpModel {
    pub fn new(name: &str) -> Self {
        MinilpModel {
            name: name.to_string(),
            problem: ProblemVariables::new(),
            vars: vec![],
            constraints: vec![],
            nconstraints: 0,
            violated: None,
            objective: Expression::default(),
            sense: Sense::Minimize,
            status: Status::Unknown,
            values: HashMap::new(),
        }
    }

    /// The objective value of the latest solution.
    pub fn objective_value(&self) -> Option<f64> {
        if self.status == Status::Optimal {
            Some(
                self.objective
                    .clone()
                    .linear_coefficients()
                    .into_iter()
                    .map(|(v, c)| c * self.value(v))
                    .sum(),
            )
        } else {
            None
        }
    }

    fn solve(&mut self) -> Result<HashMap<Variable, f64>, Status> {
        if let Some(row) = &self.violated {
            debug!(model = %self.name, %row, "constraint without variables is violated");
            return Err(Status::Infeasible);
        }

        let problem = std::mem::replace(&mut self.problem, ProblemVariables::new());
        let objective = self.objective.clone();
        let unsolved = match self.sense {
            Sense::Minimize => problem.minimise(objective),
            Sense::Maximize => problem.maximise(objective),
        };
        let mut lp = unsolved.using(minilp);
        for c in self.constraints.drain(..) {
            lp = lp.with(c);
        }

        match lp.solve() {
            Ok(solution) => {
                let values = self
                    .vars
                    .iter()
                    .map(|&v| (v, solution.value(v)))
                    .collect::<HashMap<_, _>>();
                if values.values().all(|x| x.is_finite()) {
                    Ok(values)
                } else {
                    Err(Status::Unbounded)
                }
            }
            Err(ResolutionError::Infeasible) => Err(Status::Infeasible),
            Err(ResolutionError::Unbounded) => Err(Status::Unbounded),
            Err(err) => {
                warn!(model = %self.name, error = %err, "minilp failed");
                Err(Status::Other)
            }
        }
    }
}

impl LpModel for MinilpModel {
    fn add_variable(&mut self, name: &str, lower: f64, upper: Option<f64>) -> Variable {
        let mut def = variable().name(name).min(lower);
        if let Some(upper) = upper {
            def = def.max(upper);
        }
        let var = self.problem.add(def);
        self.vars.push(var);
        var
    }

    fn add_constraint(&mut self, expr: Expression, relation: Relation, rhs: f64, name: &str) {
        self.nconstraints += 1;
        let constant = expr.clone().linear_coefficients().into_iter().all(|(_, c)| c == 0.0);
        if constant {
            // 0 <relation> rhs, nothing to tell the solver
            if self.violated.is_none() && !relation.holds(0.0, rhs) {
                self.violated = Some(name.to_string());
            }
            return;
        }
        self.constraints.push(match relation {
            Relation::Le => constraint::leq(expr, rhs),
            Relation::Eq => constraint::eq(expr, rhs),
            Relation::Ge => constraint::geq(expr, rhs),
        });
    }

    fn set_objective(&mut self, expr: Expression, sense: Sense) {
        self.objective = expr;
        self.sense = sense;
    }

    fn optimize(&mut self) -> Status {
        if self.status != Status::Unknown {
            warn!(model = %self.name, status = ?self.status, "model has already been optimized");
            return self.status;
        }
        debug!(
            model = %self.name,
            variables = self.vars.len(),
            constraints = self.nconstraints,
            "optimizing with minilp"
        );
        match self.solve() {
            Ok(values) => {
                self.values = values;
                self.status = Status::Optimal;
            }
            Err(status) => self.status = status,
        }
        debug!(model = %self.name, status = ?self.status, "minilp finished");
        self.status
    }

    fn status(&self) -> Status {
        self.status
    }

    fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(f64::NAN)
    }

    fn num_variables(&self) -> usize {
        self.vars.len()
    }

    fn num_constraints(&self) -> usize {
        self.nconstraints
    }
}
