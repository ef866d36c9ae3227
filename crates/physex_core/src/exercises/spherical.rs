use crate::symbolic::{
    diff, func, powi, pretty, pretty_matrix, recip, simplify, symbols, Expr, Matrix, SymbolicError,
};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Divergence, curl, Laplacian and gradient in spherical coordinates with
/// scale factors `h_r, h_theta, h_phi`.
#[derive(Debug, Clone, Serialize)]
pub struct SphericalReport {
    #[serde(serialize_with = "crate::symbolic::serialize_expr")]
    pub divergence: Expr,
    pub curl: Matrix,
    #[serde(serialize_with = "crate::symbolic::serialize_expr")]
    pub laplacian: Expr,
    pub gradient: Matrix,
}

impl fmt::Display for SphericalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Divergence:")?;
        writeln!(f, "{}", pretty(&self.divergence))?;
        writeln!(f, "\nCurl:")?;
        writeln!(f, "{}", pretty_matrix(&self.curl))?;
        writeln!(f, "\nLaplacian:")?;
        writeln!(f, "{}", pretty(&self.laplacian))?;
        writeln!(f, "\nGradient:")?;
        write!(f, "{}", pretty_matrix(&self.gradient))
    }
}

pub struct Coordinates {
    r: Expr,
    theta: Expr,
    h_r: Expr,
    h_theta: Expr,
    h_phi: Expr,
    args: Vec<Expr>,
}

impl Default for Coordinates {
    fn default() -> Self {
        let [r, theta, phi, h_r, h_theta, h_phi] =
            symbols(["r", "theta", "phi", "h_r", "h_theta", "h_phi"]);
        Self {
            args: vec![r.clone(), theta.clone(), phi],
            r,
            theta,
            h_r,
            h_theta,
            h_phi,
        }
    }
}

impl Coordinates {
    /// `name(r, theta, phi)`.
    pub fn field(&self, name: &str) -> Expr {
        func(name, self.args.clone())
    }

    fn volume(&self) -> Expr {
        self.h_r.clone() * self.h_theta.clone() * self.h_phi.clone()
    }

    /// `1 / (h_r·h_theta·h_phi)`.
    fn inverse_volume(&self) -> Expr {
        recip(self.volume())
    }

    fn sin_theta(&self) -> Expr {
        self.theta.clone().sin()
    }
}

pub fn divergence(c: &Coordinates, f: &Expr) -> Result<Expr, SymbolicError> {
    let radial = diff(
        &(c.h_theta.clone() * c.h_phi.clone() * diff(&(f.clone() * powi(c.r.clone(), 2)), "r")?),
        "r",
    )?;
    let polar = diff(
        &(c.h_r.clone() * c.h_phi.clone() * diff(&(f.clone() * c.sin_theta()), "theta")?),
        "theta",
    )?;
    let azimuthal = diff(&(c.h_r.clone() * c.h_theta.clone() * diff(f, "phi")?), "phi")?;
    simplify(&(c.inverse_volume() * (radial + polar + azimuthal)))
}

/// Curl of the vector field with components `a, b, c`.
pub fn curl(c: &Coordinates) -> Result<Matrix, SymbolicError> {
    let a = c.field("a");
    let b = c.field("b");
    let cc = c.field("c");
    let first = recip(c.r.clone() * c.sin_theta()) * diff(&(c.h_phi.clone() * cc.clone()), "theta")?
        - diff(&(c.h_theta.clone() * cc.clone()), "phi")?;
    let second = diff(&(c.h_r.clone() * cc), "phi")? - diff(&(c.h_phi.clone() * a), "r")?;
    let third = recip(c.r.clone())
        * (diff(&(c.r.clone() * c.h_theta.clone() * b.clone()), "r")?
            - diff(&(c.h_r.clone() * b), "theta")?);
    Matrix::column(vec![first, second, third])
        .scale(&c.inverse_volume())
        .simplify()
}

pub fn laplacian(c: &Coordinates, f: &Expr) -> Result<Expr, SymbolicError> {
    let denominator = powi(c.r.clone(), 2) * c.sin_theta();
    let radial = diff(&(c.volume() * diff(f, "r")?), "r")? / denominator.clone();
    let polar = diff(
        &(c.volume() * diff(&(c.sin_theta() * diff(f, "theta")?), "theta")?),
        "theta",
    )? / denominator.clone();
    let azimuthal = diff(&(c.volume() * diff(f, "phi")?), "phi")? / denominator;
    simplify(&(c.inverse_volume() * (radial + polar + azimuthal)))
}

pub fn gradient(c: &Coordinates, f: &Expr) -> Result<Matrix, SymbolicError> {
    Matrix::column(vec![
        recip(c.h_r.clone()) * diff(f, "r")?,
        recip(c.h_theta.clone() * c.r.clone()) * diff(f, "theta")?,
        recip(c.h_phi.clone() * c.r.clone() * c.sin_theta()) * diff(f, "phi")?,
    ])
    .simplify()
}

/// Builds the four operators for the scalar field `f(r, theta, phi)` and the
/// vector field with components `a, b, c`.
pub fn spherical_operators() -> Result<SphericalReport, SymbolicError> {
    let coords = Coordinates::default();
    let f = coords.field("f");
    let report = SphericalReport {
        divergence: divergence(&coords, &f)?,
        curl: curl(&coords)?,
        laplacian: laplacian(&coords, &f)?,
        gradient: gradient(&coords, &f)?,
    };
    debug!("Divergence: {}", report.divergence);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::evaluate;
    use crate::symbolic::{free_symbols, ExprKind};
    use approx::assert_relative_eq;

    /// Replaces undefined functions and their derivatives by plain symbols,
    /// so expressions built from them can be evaluated.
    fn freeze(expr: &Expr) -> Expr {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => expr.clone(),
            ExprKind::FunctionCall { name, .. } if ["a", "b", "c", "f"].contains(&name.as_str()) => {
                Expr::symbol(name.as_str())
            }
            ExprKind::FunctionCall { name, args } => {
                Expr::func_multi(name.as_str(), args.iter().map(freeze).collect())
            }
            ExprKind::Derivative { inner, var, order } => {
                Expr::symbol(format!("d{order}{var}[{}]", freeze(inner)))
            }
            ExprKind::Add(l, r) => Expr::add_expr(freeze(l), freeze(r)),
            ExprKind::Sub(l, r) => Expr::sub_expr(freeze(l), freeze(r)),
            ExprKind::Mul(l, r) => Expr::mul_expr(freeze(l), freeze(r)),
            ExprKind::Div(l, r) => Expr::div_expr(freeze(l), freeze(r)),
            ExprKind::Pow(l, r) => Expr::pow(freeze(l), freeze(r)),
        }
    }

    /// Evaluates both sides with every symbol bound to the same arbitrary value.
    fn assert_same_value(actual: &Expr, expected: &Expr) {
        let (actual, expected) = (freeze(actual), freeze(expected));
        let mut names = free_symbols(&actual);
        names.extend(free_symbols(&expected));
        for seed in [0.0, 0.37] {
            let bindings: Vec<(&str, f64)> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_str(), 0.6 + ((i as f64 + seed) * 0.618).fract()))
                .collect();
            let lhs = evaluate(&actual, &bindings).expect("actual evaluates");
            let rhs = evaluate(&expected, &bindings).expect("expected evaluates");
            assert_relative_eq!(lhs, rhs, max_relative = 1e-10);
        }
    }

    /// `∂ⁿf/∂varⁿ` built directly, without differentiating.
    fn partial(f: &Expr, var: &str, order: u32) -> Expr {
        Expr::derivative(f.clone(), var.to_string(), order)
    }

    #[test]
    fn laplacian_has_the_expanded_polar_terms() {
        let c = Coordinates::default();
        let f = c.field("f");
        let [r, theta] = symbols(["r", "theta"]);
        let polar = partial(&f, "theta", 3) * theta.clone().sin()
            + 2.0 * partial(&f, "theta", 2) * theta.clone().cos()
            - partial(&f, "theta", 1) * theta.clone().sin();
        let numerator = partial(&f, "r", 2) + polar + partial(&f, "phi", 2);
        let expected = numerator / (powi(r, 2) * theta.sin());
        assert_same_value(&laplacian(&c, &f).expect("differentiates"), &expected);
    }

    #[test]
    fn divergence_groups_each_direction_by_its_scale_factor() {
        let c = Coordinates::default();
        let f = c.field("f");
        let [r, theta, h_r, h_theta, h_phi] = symbols(["r", "theta", "h_r", "h_theta", "h_phi"]);
        let radial = 4.0 * r.clone() * partial(&f, "r", 1)
            + powi(r, 2) * partial(&f, "r", 2)
            + 2.0 * f.clone();
        let polar = partial(&f, "theta", 2) * theta.clone().sin()
            + 2.0 * partial(&f, "theta", 1) * theta.clone().cos()
            - f.clone() * theta.sin();
        let expected = radial / h_r + polar / h_theta + partial(&f, "phi", 2) / h_phi;
        assert_same_value(&divergence(&c, &f).expect("differentiates"), &expected);
    }

    #[test]
    fn gradient_entries_are_scaled_partials() {
        let report = spherical_operators().expect("operators build");
        let c = Coordinates::default();
        let f = c.field("f");
        let [r, theta, h_r, h_theta, h_phi] = symbols(["r", "theta", "h_r", "h_theta", "h_phi"]);
        let expected = [
            partial(&f, "r", 1) / h_r,
            partial(&f, "theta", 1) / (h_theta * r.clone()),
            partial(&f, "phi", 1) / (h_phi * r * theta.sin()),
        ];
        assert_eq!((report.gradient.rows(), report.gradient.cols()), (3, 1));
        for (row, expected) in expected.iter().enumerate() {
            let actual = report.gradient.get(row, 0).expect("three rows");
            assert_same_value(actual, expected);
        }
    }

    #[test]
    fn curl_third_component_uses_b() {
        let report = spherical_operators().expect("operators build");
        assert_eq!((report.curl.rows(), report.curl.cols()), (3, 1));
        let c = Coordinates::default();
        let b = c.field("b");
        let [r, h_r, h_theta, h_phi] = symbols(["r", "h_r", "h_theta", "h_phi"]);
        let expected = (h_theta.clone() * b.clone() + r.clone() * h_theta.clone() * partial(&b, "r", 1)
            - h_r.clone() * partial(&b, "theta", 1))
            / (r * h_r * h_theta * h_phi);
        assert_same_value(report.curl.get(2, 0).expect("three rows"), &expected);
    }

    #[test]
    fn printed_report_has_all_headings() {
        let printed = spherical_operators().expect("operators build").to_string();
        for heading in ["Divergence:", "\nCurl:", "\nLaplacian:", "\nGradient:"] {
            assert!(printed.contains(heading), "missing {heading}");
        }
        assert!(printed.contains('θ'));
        assert!(printed.contains('∂'));
        assert!(printed.contains('⎡'));
    }
}
