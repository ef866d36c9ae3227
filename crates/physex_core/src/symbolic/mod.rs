//! Computer algebra for the exercises. Expression trees, differentiation,
//! simplification and parsing come from `symb_anafis`; this module adds
//! the helpers the exercises share, symbolic matrices and a 2D printer.

mod matrix;
mod pretty;

pub use matrix::Matrix;
pub use pretty::{pretty, pretty_matrix};
pub use symb_anafis::{DiffError, Expr, ExprKind};

use serde::Serializer;
use std::collections::{BTreeSet, HashSet};
use symb_anafis::{symb, Diff, Simplify};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolicError {
    #[error(transparent)]
    Algebra(#[from] DiffError),
    #[error("unknown variable or parameter: {0}")]
    UnknownSymbol(String),
    #[error("cannot evaluate undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("cannot evaluate unevaluated derivative of '{0}'")]
    UnevaluatedDerivative(String),
    #[error("ragged matrix: expected rows of length {expected}, found {found}")]
    RaggedMatrix { expected: usize, found: usize },
}

/// Builds several symbols at once: `let [x, y] = symbols(["x", "y"]);`
pub fn symbols<const N: usize>(names: [&str; N]) -> [Expr; N] {
    names.map(Expr::symbol)
}

/// Applies a function with no known definition, e.g. `f(r, theta, phi)`.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::func_multi(name, args)
}

pub fn powi(base: Expr, exponent: i32) -> Expr {
    Expr::pow(base, Expr::number(f64::from(exponent)))
}

pub fn recip(expr: Expr) -> Expr {
    Expr::div_expr(Expr::number(1.0), expr)
}

/// First derivative, simplified.
pub fn diff(expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
    Ok(Diff::new().differentiate(expr.clone(), &symb(var))?)
}

/// `order`-th derivative with respect to a single variable.
pub fn diff_n(expr: &Expr, var: &str, order: usize) -> Result<Expr, SymbolicError> {
    (0..order).try_fold(expr.clone(), |acc, _| diff(&acc, var))
}

pub fn simplify(expr: &Expr) -> Result<Expr, SymbolicError> {
    Ok(Simplify::new().simplify(expr.clone())?)
}

/// Parses `input`. Names longer than one letter must be listed in `symbols`
/// or `functions`, otherwise they read as implicit products.
pub fn parse_with(input: &str, symbols: &[&str], functions: &[&str]) -> Result<Expr, SymbolicError> {
    let known: HashSet<String> = symbols.iter().map(|s| s.to_string()).collect();
    let custom: HashSet<String> = functions.iter().map(|s| s.to_string()).collect();
    Ok(symb_anafis::parse(input, &known, &custom)?)
}

pub fn parse(input: &str) -> Result<Expr, SymbolicError> {
    parse_with(input, &[], &[])
}

/// Names of all symbols in the tree, sorted.
pub fn free_symbols(expr: &Expr) -> BTreeSet<String> {
    expr.variables().into_iter().collect()
}

/// Serializes an expression as its one-line printed form.
pub fn serialize_expr<S: Serializer>(expr: &Expr, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(expr)
}

pub fn serialize_exprs<S: Serializer>(exprs: &[Expr], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(exprs.iter().map(Expr::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::evaluate;
    use approx::assert_abs_diff_eq;

    #[test]
    fn second_derivative_of_a_product() {
        let [x, y] = symbols(["x", "y"]);
        let e = powi(x, 3) * y.sin();
        let d2 = diff_n(&e, "x", 2).expect("differentiates");
        let value = evaluate(&d2, &[("x", 2.0), ("y", 0.5)]).expect("evaluates");
        assert_abs_diff_eq!(value, 12.0 * 0.5f64.sin(), epsilon = 1e-12);
        assert_eq!(diff_n(&e, "x", 0).expect("no-op"), e);
    }

    #[test]
    fn free_symbols_are_sorted() {
        let e = parse("z*y + x^2").expect("valid input");
        assert_eq!(
            free_symbols(&e).into_iter().collect::<Vec<_>>(),
            vec!["x", "y", "z"]
        );
    }

    #[test]
    fn multi_letter_names_need_to_be_declared() {
        let e = parse_with("h_r*theta", &["h_r", "theta"], &[]).expect("valid input");
        assert!(free_symbols(&e).contains("theta"));
        assert!(parse("2*(x").is_err());
    }
}
