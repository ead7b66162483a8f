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

//! Interface to external LP solvers.
//!
//! The model builders only create continuous variables and linear
//! constraints, set a linear objective, optimize and read back the
//! solution. This is captured by the [`LpModel`] trait, an [`LpSolver`]
//! creates fresh models. Which solver is used is decided at runtime by
//! [`backend`].
//!
//! Variables and linear expressions are those of `good_lp`.

#[cfg(feature = "minilp")]
pub mod simplex;
#[cfg(feature = "minilp")]
pub use self::simplex::{MinilpModel, MinilpSolver};

pub use good_lp::{Expression, Variable};

use crate::error::Result;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The relational operator of a linear constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

impl Relation {
    /// Return `true` if `lhs <relation> rhs` holds.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Relation::Le => lhs <= rhs,
            Relation::Eq => lhs == rhs,
            Relation::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Relation::Le => write!(fmt, "<="),
            Relation::Eq => write!(fmt, "=="),
            Relation::Ge => write!(fmt, ">="),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// The state of an [`LpModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The model has not been optimized, yet.
    Unknown,
    /// The model has been solved to optimality.
    Optimal,
    /// The model is infeasible.
    Infeasible,
    /// The model is unbounded.
    Unbounded,
    /// The solver stopped for some other reason.
    Other,
}

/// A linear program under construction or solved.
pub trait LpModel {
    /// Add a continuous variable with bounds `lower <= x <= upper`.
    ///
    /// A missing upper bound means `+infinity`.
    fn add_variable(&mut self, name: &str, lower: f64, upper: Option<f64>) -> Variable;

    /// Add the constraint `expr <relation> rhs`.
    fn add_constraint(&mut self, expr: Expression, relation: Relation, rhs: f64, name: &str);

    /// Set the objective function.
    fn set_objective(&mut self, expr: Expression, sense: Sense);

    /// Solve the model.
    ///
    /// A model is solved once, later calls return the status of the
    /// first one.
    fn optimize(&mut self) -> Status;

    /// The state after the latest call to [`optimize`](Self::optimize).
    fn status(&self) -> Status;

    /// The value of a variable in the latest solution.
    ///
    /// Returns NaN if there is no solution.
    fn value(&self, var: Variable) -> f64;

    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;
}

/// A factory of [`LpModel`]s.
pub trait LpSolver {
    fn name(&self) -> &str;

    /// Create a new, empty model.
    fn new_model(&self, name: &str) -> Box<dyn LpModel>;
}

/// The available LP solvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// The pure Rust dense simplex solver of the `minilp` crate.
    #[default]
    Minilp,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Minilp => "minilp",
        }
    }
}

/// Return the solver for `backend`.
///
/// Fails with [`Error::SolverUnavailable`](crate::Error::SolverUnavailable) if the solver has not been
/// compiled in.
pub fn backend(backend: Backend) -> Result<Box<dyn LpSolver>> {
    match backend {
        Backend::Minilp => minilp_solver(),
    }
}

#[cfg(feature = "minilp")]
fn minilp_solver() -> Result<Box<dyn LpSolver>> {
    Ok(Box::new(MinilpSolver))
}

#[cfg(not(feature = "minilp"))]
fn minilp_solver() -> Result<Box<dyn LpSolver>> {
    Err(crate::error::Error::SolverUnavailable(Backend::Minilp.name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::{backend, Backend, Relation};

    #[test]
    fn relations() {
        assert!(Relation::Le.holds(0.0, 0.0));
        assert!(!Relation::Eq.holds(0.0, -2.0));
        assert!(Relation::Ge.holds(1.0, -2.0));
        assert_eq!(Relation::Le.to_string(), "<=");
    }

    #[cfg(feature = "minilp")]
    #[test]
    fn minilp_backend() {
        let solver = backend(Backend::Minilp).unwrap();
        assert_eq!(solver.name(), "minilp");
        assert_eq!(solver.new_model("empty").num_variables(), 0);
    }

    #[cfg(not(feature = "minilp"))]
    #[test]
    fn missing_backend() {
        assert!(matches!(
            backend(Backend::Minilp),
            Err(crate::error::Error::SolverUnavailable(_))
        ));
    }
}
