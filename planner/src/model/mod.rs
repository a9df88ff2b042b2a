//! Solver-independent mixed-integer linear model.
//!
//! An [`OptimizationModel`] is a list of declared integer variables,
//!  linear constraints tagged with the [`ConstraintFamily`] that produced
//!  them, and a linear objective. [`builder`] fills one in from an
//!  [`crate::instance::InstanceData`].

#[macro_use]
pub mod macros;
pub mod builder;
pub mod keys;

pub use builder::{build_model, MissingLegPolicy, ModelBuilder, ModelOptions};
pub use keys::*;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Handle to a declared variable, its position in [`OptimizationModel::variables`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in the model
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a declared variable
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VarDomain {
    /// 0 or 1
    Binary,

    /// Integer in `[lower, upper]`
    Integer {
        /// Inclusive lower bound
        lower: i64,
        /// Inclusive upper bound
        upper: i64,
    },
}

impl VarDomain {
    /// Inclusive bounds of the domain
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            VarDomain::Binary => (0.0, 1.0),
            VarDomain::Integer { lower, upper } => (*lower as f64, *upper as f64),
        }
    }
}

/// A declared variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// Readable name, e.g. `x[V1,V2,0,3]`
    pub name: String,

    /// Domain
    pub domain: VarDomain,
}

/// `Σ coefficient * variable`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    /// Empty expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of variables with unit coefficients
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|var| (var, 1.0)).collect(),
        }
    }

    /// Append `coefficient * var`
    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Append `coefficient * var` for every var
    pub fn add_terms(&mut self, vars: impl IntoIterator<Item = VarId>, coefficient: f64) {
        self.terms
            .extend(vars.into_iter().map(|var| (var, coefficient)));
    }

    /// Builder form of [`LinearExpr::add_term`]
    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    /// Terms in insertion order; a variable may appear more than once
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// True when the expression has no variable terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value of the expression under an assignment
    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * assignment.value(*var))
            .sum::<f64>()
    }
}

/// Comparison of a constraint's expression against its right-hand side
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sense {
    /// `expr <= rhs`
    LessEq,
    /// `expr == rhs`
    Equal,
}

impl Display for Sense {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Sense::LessEq => write!(f, "<="),
            Sense::Equal => write!(f, "=="),
        }
    }
}

/// The rule a constraint encodes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintFamily {
    /// `y[i,t] <= gates(i)`
    GateCapacity,
    /// `y[i,t+1] = y[i,t] + arrivals - departures`
    FlowConservation,
    /// Departures on the last instant need aircraft present
    HorizonClosure,
    /// `Σ y[i,0] = A`
    FleetSize,
    /// At most S passengers per (origin, destination, instant)
    SeatCapacity,
    /// A served passenger has a matching departure
    ServiceWindow,
    /// No reverse leg before flight and charging time elapse
    Turnaround,
    /// `p[i,k,t+1] = p[i,k,t] + arrivals_k - departures_k`
    AircraftPresence,
    /// `x[i,i,k,t] = 0`
    NoSelfLoop,
    /// `x[i,j,k,t] = 0` for legs without a travel time
    UnreachableLeg,
}

impl Display for ConstraintFamily {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            ConstraintFamily::GateCapacity => write!(f, "gate capacity"),
            ConstraintFamily::FlowConservation => write!(f, "flow conservation"),
            ConstraintFamily::HorizonClosure => write!(f, "horizon closure"),
            ConstraintFamily::FleetSize => write!(f, "fleet size"),
            ConstraintFamily::SeatCapacity => write!(f, "seat capacity"),
            ConstraintFamily::ServiceWindow => write!(f, "service window"),
            ConstraintFamily::Turnaround => write!(f, "turnaround"),
            ConstraintFamily::AircraftPresence => write!(f, "aircraft presence"),
            ConstraintFamily::NoSelfLoop => write!(f, "no self loop"),
            ConstraintFamily::UnreachableLeg => write!(f, "unreachable leg"),
        }
    }
}

/// `expr sense rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Rule this constraint belongs to
    pub family: ConstraintFamily,

    /// Readable name, e.g. `flow[V1,t=3]`
    pub name: String,

    /// Left-hand side
    pub expr: LinearExpr,

    /// Comparison
    pub sense: Sense,

    /// Right-hand side
    pub rhs: f64,
}

impl Constraint {
    /// Whether the assignment satisfies the constraint within `tolerance`
    pub fn is_satisfied_by(&self, assignment: &Assignment, tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(assignment);
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + tolerance,
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Linear objective, always maximized
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Expression to maximize
    pub expr: LinearExpr,
}

/// Value of every declared variable, indexed by [`VarId`]
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    /// Wrap solver values given in declaration order
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of a variable; NaN if the assignment doesn't cover it
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(f64::NAN)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no values are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A way in which an assignment fails the model
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// The assignment doesn't have one value per variable
    AssignmentSize {
        /// Declared variables
        expected: usize,
        /// Values present
        actual: usize,
    },

    /// A value lies outside its domain bounds
    OutOfBounds {
        /// Variable name
        variable: String,
        /// Offending value
        value: f64,
    },

    /// A value isn't integral
    NotIntegral {
        /// Variable name
        variable: String,
        /// Offending value
        value: f64,
    },

    /// A constraint doesn't hold
    Constraint {
        /// Rule of the constraint
        family: ConstraintFamily,
        /// Constraint name
        name: String,
        /// Evaluated left-hand side
        lhs: f64,
        /// Comparison
        sense: Sense,
        /// Right-hand side
        rhs: f64,
    },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Violation::AssignmentSize { expected, actual } => write!(
                f,
                "Assignment has {} values, model declares {} variables.",
                actual, expected
            ),
            Violation::OutOfBounds { variable, value } => {
                write!(f, "{} = {} is out of bounds.", variable, value)
            }
            Violation::NotIntegral { variable, value } => {
                write!(f, "{} = {} is not integral.", variable, value)
            }
            Violation::Constraint {
                family,
                name,
                lhs,
                sense,
                rhs,
            } => write!(
                f,
                "{} constraint {} violated: {} {} {} does not hold.",
                family, name, lhs, sense, rhs
            ),
        }
    }
}

/// Size of a model per variable family and per constraint family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelStats {
    /// Number of `x` variables
    pub flight_variables: usize,
    /// Number of `y` variables
    pub presence_variables: usize,
    /// Number of `p` variables
    pub aircraft_presence_variables: usize,
    /// Number of `z` variables
    pub passenger_variables: usize,
    /// Number of constraints per family
    pub constraints: BTreeMap<ConstraintFamily, usize>,
}

/// A complete model, ready to be handed to a [`crate::solver::MilpSolver`]
#[derive(Debug, Clone)]
pub struct OptimizationModel {
    name: String,
    variables: Vec<VariableDecl>,
    constraints: Vec<Constraint>,
    objective: Objective,
    vars: ModelVariables,
}

impl OptimizationModel {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: vec![],
            constraints: vec![],
            objective: Objective {
                expr: LinearExpr::new(),
            },
            vars: ModelVariables::default(),
        }
    }

    fn add_variable(&mut self, name: String, domain: VarDomain) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VariableDecl { name, domain });
        id
    }

    fn add_constraint(
        &mut self,
        family: ConstraintFamily,
        name: String,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            family,
            name,
            expr,
            sense,
            rhs,
        });
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared variables, indexed by [`VarId::index`]
    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    /// Declaration of a single variable
    pub fn variable(&self, var: VarId) -> Option<&VariableDecl> {
        self.variables.get(var.0)
    }

    /// All constraints
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints of one family
    pub fn constraints_of(&self, family: ConstraintFamily) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(move |constraint| constraint.family == family)
    }

    /// Objective
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Typed variable maps
    pub fn vars(&self) -> &ModelVariables {
        &self.vars
    }

    /// Variable and constraint counts
    pub fn stats(&self) -> ModelStats {
        let mut constraints = BTreeMap::new();
        for constraint in &self.constraints {
            *constraints.entry(constraint.family).or_insert(0) += 1;
        }

        ModelStats {
            flight_variables: self.vars.flights.len(),
            presence_variables: self.vars.presence.len(),
            aircraft_presence_variables: self.vars.aircraft_presence.len(),
            passenger_variables: self.vars.passengers.len(),
            constraints,
        }
    }

    /// Every bound, integrality requirement and constraint the assignment
    ///  breaks by more than `tolerance`
    pub fn violations(&self, assignment: &Assignment, tolerance: f64) -> Vec<Violation> {
        if assignment.len() != self.variables.len() {
            return vec![Violation::AssignmentSize {
                expected: self.variables.len(),
                actual: assignment.len(),
            }];
        }

        let mut violations = vec![];
        for (index, decl) in self.variables.iter().enumerate() {
            let value = assignment.value(VarId(index));
            let (lower, upper) = decl.domain.bounds();
            if !(value >= lower - tolerance && value <= upper + tolerance) {
                violations.push(Violation::OutOfBounds {
                    variable: decl.name.clone(),
                    value,
                });
            } else if (value - value.round()).abs() > tolerance {
                violations.push(Violation::NotIntegral {
                    variable: decl.name.clone(),
                    value,
                });
            }
        }

        violations.extend(
            self.constraints
                .iter()
                .filter(|constraint| !constraint.is_satisfied_by(assignment, tolerance))
                .map(|constraint| Violation::Constraint {
                    family: constraint.family,
                    name: constraint.name.clone(),
                    lhs: constraint.expr.evaluate(assignment),
                    sense: constraint.sense,
                    rhs: constraint.rhs,
                }),
        );

        violations
    }
}
