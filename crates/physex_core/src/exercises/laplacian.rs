use crate::bytecode::evaluate;
use crate::solve::{solve_parameters, Solution, SolveSettings};
use crate::symbolic::{
    diff, diff_n, free_symbols, powi, recip, serialize_expr, serialize_exprs, simplify, symbols,
    Expr,
};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

pub const COORDINATES: [&str; 3] = ["x", "y", "z"];
pub const PARAMETERS: [&str; 2] = ["a", "b"];

/// Absolute bound below which a sampled coefficient counts as zero.
const ZERO_TOLERANCE: f64 = 1e-9;

/// `u = a·x² + b²·y² + z²`.
pub fn quadratic_form() -> Expr {
    let [x, y, z, a, b] = symbols(["x", "y", "z", "a", "b"]);
    a * powi(x, 2) + powi(b, 2) * powi(y, 2) + powi(z, 2)
}

/// `f = 1/sqrt(u)`.
pub fn potential() -> Expr {
    recip(quadratic_form().sqrt())
}

/// Sum of the unmixed second partials of `field` along `coordinates`.
pub fn laplacian(field: &Expr, coordinates: &[&str]) -> Result<Expr> {
    let sum = coordinates.iter().try_fold(Expr::number(0.0), |acc, c| {
        diff_n(field, c, 2).map(|term| acc + term)
    })?;
    Ok(simplify(&sum)?)
}

/// Roots of a numerator read as a polynomial in one unknown; the other
/// unknowns stay free.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub unknowns: Vec<String>,
    pub solved_for: String,
    #[serde(serialize_with = "serialize_exprs")]
    pub branches: Vec<Expr>,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tuples: Vec<String> = self
            .branches
            .iter()
            .map(|branch| {
                let slots: Vec<String> = self
                    .unknowns
                    .iter()
                    .map(|u| {
                        if *u == self.solved_for {
                            format!("({branch})")
                        } else {
                            u.clone()
                        }
                    })
                    .collect();
                format!("({})", slots.join(", "))
            })
            .collect();
        write!(f, "[{}]", tuples.join(", "))
    }
}

/// True if `expr` is zero at a handful of fixed sample points.
fn vanishes(expr: &Expr) -> Result<bool> {
    if expr.as_number() == Some(0.0) {
        return Ok(true);
    }
    let names: Vec<String> = free_symbols(expr).into_iter().collect();
    for sample in 0..3 {
        let bindings: Vec<(&str, f64)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), 0.45 + 0.31 * ((i + 2 * sample) % 5) as f64))
            .collect();
        if evaluate(expr, &bindings)?.abs() > ZERO_TOLERANCE {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Solves `numerator = 0` for `unknowns[0]` when the numerator is at most
/// quadratic in it. Coefficients are read off as Taylor coefficients at 0.
/// `None` if the numerator is of higher degree or does not involve the unknown.
pub fn quadratic_relationship(numerator: &Expr, unknowns: &[&str]) -> Result<Option<Relationship>> {
    let Some(&unknown) = unknowns.first() else {
        return Ok(None);
    };
    let zero = Expr::number(0.0);
    let d1 = diff(numerator, unknown)?;
    let d2 = diff(&d1, unknown)?;
    if !vanishes(&diff(&d2, unknown)?)? {
        debug!("Numerator is not quadratic in {unknown}");
        return Ok(None);
    }
    let c0 = simplify(&numerator.substitute(unknown, &zero))?;
    let c1 = simplify(&d1.substitute(unknown, &zero))?;
    let c2 = simplify(&(d2.substitute(unknown, &zero) / 2.0))?;

    let branches = if !vanishes(&c2)? {
        let root = (powi(c1.clone(), 2) - 4.0 * c2.clone() * c0).sqrt();
        let twice_leading = 2.0 * c2;
        vec![
            simplify(&((-c1.clone() - root.clone()) / twice_leading.clone()))?,
            simplify(&((-c1 + root) / twice_leading))?,
        ]
    } else if !vanishes(&c1)? {
        vec![simplify(&(-c0 / c1))?]
    } else {
        return Ok(None);
    };
    Ok(Some(Relationship {
        unknowns: unknowns.iter().map(|u| u.to_string()).collect(),
        solved_for: unknown.to_string(),
        branches,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct LaplacianReport {
    #[serde(serialize_with = "serialize_expr")]
    pub field: Expr,
    #[serde(serialize_with = "serialize_expr")]
    pub laplacian: Expr,
    pub unknowns: Vec<String>,
    /// Pointwise solution of `∇²f = 0` for the first unknown, if one was derived.
    pub relationship: Option<Relationship>,
    /// Parameter values for which the Laplacian vanishes at every point.
    pub solutions: Vec<Solution>,
}

impl fmt::Display for LaplacianReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let solutions: Vec<String> = self.solutions.iter().map(Solution::to_string).collect();
        writeln!(f, "The Laplacian of the function is:")?;
        writeln!(f, "{}", self.laplacian)?;
        writeln!(f, "The solutions for {} are:", self.unknowns.join(" and "))?;
        if let Some(relationship) = &self.relationship {
            writeln!(f, "{relationship}")?;
            writeln!(f, "Values for which the Laplacian vanishes identically:")?;
        }
        write!(f, "[{}]", solutions.join(", "))
    }
}

/// Laplacian of `field` and the parameter values for which it vanishes identically.
pub fn solve_harmonic(
    field: &Expr,
    unknowns: &[&str],
    coordinates: &[&str],
    settings: SolveSettings,
) -> Result<LaplacianReport> {
    let lap = laplacian(field, coordinates)?;
    info!("Laplacian has {} symbols", free_symbols(&lap).len());
    let solutions = solve_parameters(&lap, unknowns, coordinates, settings)
        .context("Failed to solve for a vanishing Laplacian.")?;
    Ok(LaplacianReport {
        field: field.clone(),
        laplacian: lap,
        unknowns: unknowns.iter().map(|u| u.to_string()).collect(),
        relationship: None,
        solutions,
    })
}

/// The exercise: `∇²f = 0` for `f = 1/sqrt(a·x² + b²·y² + z²)`, solved for `(a, b)`.
///
/// `∇²f = N/u^(5/2)` with `N` quadratic in `a`, so both roots of `N` are
/// reported alongside the identically harmonic parameter values.
pub fn laplacian_and_solve(settings: SolveSettings) -> Result<LaplacianReport> {
    let mut report = solve_harmonic(&potential(), &PARAMETERS, &COORDINATES, settings)?;
    let scale = Expr::pow(quadratic_form(), Expr::number(2.5));
    let numerator = simplify(&(report.laplacian.clone() * scale))?;
    report.relationship = quadratic_relationship(&numerator, &PARAMETERS)
        .context("Failed to solve the Laplacian's numerator.")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn closed_form(x: f64, y: f64, z: f64, a: f64, b: f64) -> f64 {
        let b2 = b * b;
        let u = a * x * x + b2 * y * y + z * z;
        u.powf(-2.5)
            * (a * (2.0 * a - b2 - 1.0) * x * x
                + b2 * (2.0 * b2 - a - 1.0) * y * y
                + (2.0 - a - b2) * z * z)
    }

    #[test]
    fn laplacian_matches_closed_form() {
        let lap = laplacian(&potential(), &COORDINATES).expect("differentiates");
        for &(x, y, z, a, b) in &[
            (0.7, -0.4, 1.1, 1.3, 0.7),
            (1.5, 0.2, -0.3, 0.5, -1.4),
            (-0.9, 1.2, 0.6, 2.0, 1.0),
        ] {
            let value = evaluate(
                &lap,
                &[("x", x), ("y", y), ("z", z), ("a", a), ("b", b)],
            )
            .expect("laplacian evaluates");
            assert_relative_eq!(value, closed_form(x, y, z, a, b), max_relative = 1e-9);
        }
    }

    #[test]
    fn solves_for_the_harmonic_parameters() {
        let report = laplacian_and_solve(SolveSettings::default()).expect("solve runs");
        let values: Vec<Vec<f64>> = report.solutions.iter().map(|s| s.values.clone()).collect();
        assert_eq!(values, vec![vec![1.0, -1.0], vec![1.0, 1.0]]);
        let printed = report.to_string();
        assert!(printed.starts_with("The Laplacian of the function is:\n"));
        assert!(printed.contains("The solutions for a and b are:\n[(("));
        assert!(printed.ends_with(
            "Values for which the Laplacian vanishes identically:\n[(1, -1), (1, 1)]"
        ));
    }

    #[test]
    fn both_branches_of_the_relationship_zero_the_laplacian() {
        let report = laplacian_and_solve(SolveSettings::default()).expect("solve runs");
        let relationship = report.relationship.expect("numerator is quadratic in a");
        assert_eq!(relationship.solved_for, "a");
        assert_eq!(relationship.branches.len(), 2);
        assert_eq!(relationship.to_string().matches(", b)").count(), 2);

        for &(x, y, z, b) in &[(0.7, 0.4, 1.1, 1.0), (1.2, 0.3, 0.4, 0.5)] {
            let mut roots = Vec::new();
            for branch in &relationship.branches {
                let a = evaluate(branch, &[("x", x), ("y", y), ("z", z), ("b", b)])
                    .expect("branch evaluates");
                assert!(a.is_finite() && a > 0.0, "a = {a}");
                assert_abs_diff_eq!(closed_form(x, y, z, a, b), 0.0, epsilon = 1e-8);
                let lap = evaluate(
                    &report.laplacian,
                    &[("x", x), ("y", y), ("z", z), ("a", a), ("b", b)],
                )
                .expect("laplacian evaluates");
                assert_abs_diff_eq!(lap, 0.0, epsilon = 1e-8);
                roots.push(a);
            }
            assert!(roots[0] < roots[1], "branches are distinct: {roots:?}");
        }
    }

    #[test]
    fn linear_numerator_has_a_single_branch() {
        let numerator = parse("a*x - y").expect("valid input");
        let relationship = quadratic_relationship(&numerator, &["a"])
            .expect("coefficients evaluate")
            .expect("linear in a");
        assert_eq!(relationship.branches.len(), 1);
        let a = evaluate(&relationship.branches[0], &[("x", 2.0), ("y", 3.0)]).expect("evaluates");
        assert_abs_diff_eq!(a, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn cubic_numerator_is_not_solved() {
        let numerator = parse("a^3 - x").expect("valid input");
        assert!(quadratic_relationship(&numerator, &["a"]).expect("runs").is_none());
    }

    #[test]
    fn potential_without_harmonic_parameters_gives_empty_set() {
        let field = parse("1/(a*x^2 + y^2 + z^2)").expect("valid input");
        let report =
            solve_harmonic(&field, &["a"], &COORDINATES, SolveSettings::default()).expect("solve runs");
        assert!(report.solutions.is_empty());
        assert!(report.relationship.is_none());
        assert!(report.to_string().ends_with("The solutions for a are:\n[]"));
    }

    #[test]
    fn report_serializes_expressions_as_strings() {
        let report = laplacian_and_solve(SolveSettings::default()).expect("solve runs");
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["field"], report.field.to_string());
        assert_eq!(json["solutions"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            json["relationship"]["branches"].as_array().map(Vec::len),
            Some(2)
        );
    }
}
