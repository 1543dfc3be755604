use std::fmt;

/// An ODE right-hand-side expression over state variables and parameters.
///
/// Rates are plain expression trees evaluated by tree walking; nothing is
/// compiled from strings. `State(i)` reads the i-th species concentration
/// and `Param(j)` reads the j-th entry of the parameter buffer supplied at
/// evaluation time, so the same tree serves every sampled parameter set.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    State(usize),
    Param(usize),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn state(index: usize) -> Self {
        Expr::State(index)
    }

    pub fn param(index: usize) -> Self {
        Expr::Param(index)
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Self {
        Expr::Div(Box::new(self), Box::new(rhs))
    }

    pub fn pow(self, rhs: Expr) -> Self {
        Expr::Pow(Box::new(self), Box::new(rhs))
    }

    /// Evaluates the expression against a state vector and parameter buffer.
    ///
    /// Indices are assumed valid; [`ExprModel`](crate::ExprModel) checks them
    /// once at construction so the hot path stays unchecked-free of its own
    /// bookkeeping but still panics on a malformed hand-built tree.
    pub fn eval(&self, y: &[f64], p: &[f64]) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::State(i) => y[*i],
            Expr::Param(j) => p[*j],
            Expr::Neg(e) => -e.eval(y, p),
            Expr::Add(a, b) => a.eval(y, p) + b.eval(y, p),
            Expr::Sub(a, b) => a.eval(y, p) - b.eval(y, p),
            Expr::Mul(a, b) => a.eval(y, p) * b.eval(y, p),
            Expr::Div(a, b) => a.eval(y, p) / b.eval(y, p),
            Expr::Pow(a, b) => a.eval(y, p).powf(b.eval(y, p)),
        }
    }

    /// Largest state index referenced, if any state is referenced at all.
    pub fn max_state_index(&self) -> Option<usize> {
        self.fold_indices(&|e| match e {
            Expr::State(i) => Some(*i),
            _ => None,
        })
    }

    /// Largest parameter index referenced, if any parameter is referenced.
    pub fn max_param_index(&self) -> Option<usize> {
        self.fold_indices(&|e| match e {
            Expr::Param(j) => Some(*j),
            _ => None,
        })
    }

    fn fold_indices(&self, pick: &impl Fn(&Expr) -> Option<usize>) -> Option<usize> {
        let own = pick(self);
        let children = match self {
            Expr::Const(_) | Expr::State(_) | Expr::Param(_) => None,
            Expr::Neg(e) => e.fold_indices(pick),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => match (a.fold_indices(pick), b.fold_indices(pick)) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, y) => x.or(y),
            },
        };
        match (own, children) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{c}"),
            Expr::State(i) => write!(f, "y[{i}]"),
            Expr::Param(j) => write!(f, "p[{j}]"),
            Expr::Neg(e) => write!(f, "-({e})"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Div(a, b) => write!(f, "({a} / {b})"),
            Expr::Pow(a, b) => write!(f, "({a} ^ {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn evaluates_mass_action_rate() {
        // -k * A * B
        let rate = Expr::param(0).mul(Expr::state(0)).mul(Expr::state(1)).neg();
        let y = [2.0, 3.0];
        let p = [0.5];
        assert_relative_eq!(rate.eval(&y, &p), -3.0);
    }

    #[test]
    fn evaluates_hill_term() {
        // x^n / (k^n + x^n)
        let x = || Expr::state(0);
        let n = || Expr::param(0);
        let k = || Expr::param(1);
        let hill = x()
            .pow(n())
            .div(k().pow(n()).add(x().pow(n())));
        let value = hill.eval(&[2.0], &[2.0, 1.0]);
        assert_relative_eq!(value, 4.0 / 5.0);
    }

    #[test]
    fn reports_largest_indices() {
        let e = Expr::state(3)
            .mul(Expr::param(1))
            .add(Expr::state(0).div(Expr::param(4)));
        assert_eq!(e.max_state_index(), Some(3));
        assert_eq!(e.max_param_index(), Some(4));
        assert_eq!(Expr::constant(1.0).max_state_index(), None);
    }

    #[test]
    fn displays_readably() {
        let e = Expr::param(0).mul(Expr::state(1));
        assert_eq!(e.to_string(), "(p[0] * y[1])");
    }
}
