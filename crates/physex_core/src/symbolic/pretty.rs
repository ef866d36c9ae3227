//! Two-dimensional text rendering: stacked fractions, raised exponents,
//! `√`, `∂` notation and Greek letters.

use super::{Expr, ExprKind, Matrix};

/// Renders an expression over several lines.
pub fn pretty(expr: &Expr) -> String {
    layout(expr).render()
}

/// Renders a matrix with tall brackets.
pub fn pretty_matrix(matrix: &Matrix) -> String {
    layout_matrix(matrix).render()
}

const GREEK: &[(&str, &str)] = &[
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("epsilon", "ε"),
    ("theta", "θ"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("nu", "ν"),
    ("pi", "π"),
    ("rho", "ρ"),
    ("sigma", "σ"),
    ("tau", "τ"),
    ("phi", "φ"),
    ("chi", "χ"),
    ("psi", "ψ"),
    ("omega", "ω"),
];

fn greek(name: &str) -> String {
    name.split('_')
        .map(|part| {
            GREEK
                .iter()
                .find(|(latin, _)| *latin == part)
                .map_or(part, |(_, letter)| *letter)
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn superscript_digits(n: usize) -> String {
    const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
    n.to_string()
        .chars()
        .filter_map(|c| c.to_digit(10).map(|d| DIGITS[d as usize]))
        .collect()
}

fn width_of(s: &str) -> usize {
    s.chars().count()
}

#[derive(Debug, Clone)]
struct Block {
    lines: Vec<String>,
    baseline: usize,
}

impl Block {
    fn text(s: impl Into<String>) -> Block {
        Block {
            lines: vec![s.into()],
            baseline: 0,
        }
    }

    fn width(&self) -> usize {
        self.lines.iter().map(|l| width_of(l)).max().unwrap_or(0)
    }

    fn height(&self) -> usize {
        self.lines.len()
    }

    fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Places blocks left to right, aligned on their baselines.
    fn beside(parts: &[Block]) -> Block {
        let above = parts.iter().map(|b| b.baseline).max().unwrap_or(0);
        let below = parts
            .iter()
            .map(|b| b.height() - b.baseline - 1)
            .max()
            .unwrap_or(0);
        let height = above + below + 1;
        let mut lines = vec![String::new(); height];
        for part in parts {
            let width = part.width();
            let offset = above - part.baseline;
            for (row, line) in lines.iter_mut().enumerate() {
                let content = row
                    .checked_sub(offset)
                    .and_then(|i| part.lines.get(i))
                    .map_or("", String::as_str);
                line.push_str(content);
                line.push_str(&" ".repeat(width - width_of(content)));
            }
        }
        Block {
            lines,
            baseline: above,
        }
    }

    fn centered(&self, width: usize) -> Block {
        let own = self.width();
        let left = (width.saturating_sub(own)) / 2;
        let lines = self
            .lines
            .iter()
            .map(|l| {
                let right = width.saturating_sub(left + width_of(l));
                format!("{}{}{}", " ".repeat(left), l, " ".repeat(right))
            })
            .collect();
        Block {
            lines,
            baseline: self.baseline,
        }
    }

    fn fraction(numerator: Block, denominator: Block) -> Block {
        let width = numerator.width().max(denominator.width());
        let mut lines = numerator.centered(width).lines;
        let baseline = lines.len();
        lines.push("─".repeat(width));
        lines.extend(denominator.centered(width).lines);
        Block { lines, baseline }
    }

    fn superscript(base: Block, exponent: Block) -> Block {
        let offset = " ".repeat(base.width());
        let mut lines: Vec<String> = exponent
            .lines
            .iter()
            .map(|l| format!("{offset}{l}"))
            .collect();
        let baseline = lines.len() + base.baseline;
        lines.extend(base.lines);
        Block { lines, baseline }
    }

    fn parens(inner: Block) -> Block {
        Block::delimited(inner, ('(', ')'), ('⎛', '⎞'), ('⎜', '⎟'), ('⎝', '⎠'))
    }

    fn brackets(inner: Block) -> Block {
        Block::delimited(inner, ('[', ']'), ('⎡', '⎤'), ('⎢', '⎥'), ('⎣', '⎦'))
    }

    fn delimited(
        inner: Block,
        single: (char, char),
        top: (char, char),
        middle: (char, char),
        bottom: (char, char),
    ) -> Block {
        let width = inner.width();
        let height = inner.height();
        let lines = inner
            .lines
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let (open, close) = match i {
                    _ if height == 1 => single,
                    0 => top,
                    _ if i + 1 == height => bottom,
                    _ => middle,
                };
                let pad = " ".repeat(width - width_of(l));
                format!("{open}{l}{pad}{close}")
            })
            .collect();
        Block {
            lines,
            baseline: inner.baseline,
        }
    }
}

fn join(blocks: Vec<Block>, separator: &str) -> Block {
    let mut parts = Vec::with_capacity(blocks.len() * 2);
    for (i, block) in blocks.into_iter().enumerate() {
        if i > 0 {
            parts.push(Block::text(separator));
        }
        parts.push(block);
    }
    Block::beside(&parts)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn negative_exponent(exp: &Expr) -> Option<f64> {
    exp.as_number().filter(|e| *e < 0.0)
}

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Add(..) | ExprKind::Sub(..) => 1,
        ExprKind::Number(n) if *n < 0.0 => 1,
        ExprKind::Mul(..) | ExprKind::Div(..) if split_fraction(expr).negative => 1,
        ExprKind::Mul(..) | ExprKind::Div(..) => 2,
        ExprKind::Pow(_, exp) if negative_exponent(exp).is_some() => 2,
        ExprKind::Pow(..) => 3,
        _ => 4,
    }
}

/// A product split into a sign and the factors above and below the bar.
#[derive(Default)]
struct Fraction {
    negative: bool,
    numerator: Vec<Expr>,
    denominator: Vec<Expr>,
}

fn split_fraction(expr: &Expr) -> Fraction {
    let mut frac = Fraction::default();
    collect_factors(expr, false, &mut frac);
    frac
}

fn collect_factors(expr: &Expr, below: bool, frac: &mut Fraction) {
    let side = |frac: &mut Fraction, e: Expr| {
        if below {
            frac.denominator.push(e)
        } else {
            frac.numerator.push(e)
        }
    };
    match &expr.kind {
        ExprKind::Mul(l, r) => {
            collect_factors(l, below, frac);
            collect_factors(r, below, frac);
        }
        ExprKind::Div(n, d) => {
            collect_factors(n, below, frac);
            collect_factors(d, !below, frac);
        }
        ExprKind::Number(n) if *n < 0.0 => {
            frac.negative = !frac.negative;
            if *n != -1.0 {
                side(frac, Expr::number(-n));
            }
        }
        ExprKind::Number(n) if *n == 1.0 => {}
        ExprKind::Pow(base, exp) => match negative_exponent(exp) {
            Some(e) if e == -1.0 => collect_factors(base, !below, frac),
            Some(e) => side_pow(frac, !below, base, -e),
            None => side(frac, expr.clone()),
        },
        _ => side(frac, expr.clone()),
    }
}

fn side_pow(frac: &mut Fraction, below: bool, base: &Expr, exponent: f64) {
    let e = Expr::pow(base.clone(), Expr::number(exponent));
    if below {
        frac.denominator.push(e);
    } else {
        frac.numerator.push(e);
    }
}

fn layout_wrapped(expr: &Expr, min_prec: u8) -> Block {
    if precedence(expr) < min_prec {
        Block::parens(layout(expr))
    } else {
        layout(expr)
    }
}

fn layout_call(name: &str, args: &[Expr]) -> Block {
    let args = join(args.iter().map(layout).collect(), ", ");
    Block::beside(&[Block::text(name), Block::parens(args)])
}

/// The unsigned body of a product, stacked as a fraction when it has a denominator.
fn layout_fraction(frac: &Fraction) -> Block {
    let join_factors =
        |items: &[Expr]| join(items.iter().map(|e| layout_wrapped(e, 3)).collect(), "⋅");
    let numerator = if frac.numerator.is_empty() {
        Block::text("1")
    } else {
        join_factors(&frac.numerator)
    };
    if frac.denominator.is_empty() {
        numerator
    } else {
        Block::fraction(numerator, join_factors(&frac.denominator))
    }
}

fn layout_sqrt(base: &Expr) -> Block {
    let inner = layout(base);
    if inner.height() == 1 && precedence(base) >= 4 {
        Block::text(format!("√{}", inner.lines[0]))
    } else {
        Block::beside(&[Block::text("√"), Block::parens(inner)])
    }
}

/// `∂ⁿ/∂x ∂y² f(...)`, folding nested derivatives into one operator.
fn layout_derivative(expr: &Expr) -> Block {
    let mut groups: Vec<(String, u32)> = Vec::new();
    let mut target = expr;
    while let ExprKind::Derivative { inner, var, order } = &target.kind {
        groups.push((var.clone(), *order));
        target = &**inner;
    }
    groups.reverse();
    let mut merged: Vec<(String, u32)> = Vec::new();
    for (var, order) in groups {
        match merged.last_mut() {
            Some((last, count)) if *last == var => *count += order,
            _ => merged.push((var, order)),
        }
    }

    let total: u32 = merged.iter().map(|(_, n)| n).sum();
    let numerator = match total {
        1 => "∂".to_string(),
        n => format!("∂{}", superscript_digits(n as usize)),
    };
    let denominator = merged
        .iter()
        .map(|(var, count)| match count {
            1 => format!("∂{}", greek(var)),
            n => format!("∂{}{}", greek(var), superscript_digits(*n as usize)),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Block::beside(&[
        Block::fraction(Block::text(numerator), Block::text(denominator)),
        layout_wrapped(target, 4),
    ])
}

/// Flattens nested sums into signed terms.
fn collect_terms(expr: &Expr, negative: bool, terms: &mut Vec<(bool, Expr)>) {
    match &expr.kind {
        ExprKind::Add(l, r) => {
            collect_terms(l, negative, terms);
            collect_terms(r, negative, terms);
        }
        ExprKind::Sub(l, r) => {
            collect_terms(l, negative, terms);
            collect_terms(r, !negative, terms);
        }
        _ => terms.push((negative, expr.clone())),
    }
}

fn layout_sum(expr: &Expr) -> Block {
    let mut terms = Vec::new();
    collect_terms(expr, false, &mut terms);
    let mut parts = Vec::with_capacity(terms.len() * 2);
    for (i, (negative, term)) in terms.iter().enumerate() {
        let (sign, body) = match &term.kind {
            ExprKind::Number(n) if *n < 0.0 => (true, Block::text(format_number(-n))),
            ExprKind::Mul(..) | ExprKind::Div(..) => {
                let frac = split_fraction(term);
                (frac.negative, layout_fraction(&frac))
            }
            _ => (false, layout_wrapped(term, 2)),
        };
        match (i, sign != *negative) {
            (0, true) => parts.push(Block::text("-")),
            (0, false) => {}
            (_, true) => parts.push(Block::text(" - ")),
            (_, false) => parts.push(Block::text(" + ")),
        }
        parts.push(body);
    }
    Block::beside(&parts)
}

fn layout(expr: &Expr) -> Block {
    match &expr.kind {
        ExprKind::Number(n) => Block::text(format_number(*n)),
        ExprKind::Symbol(s) => Block::text(greek(s.name().unwrap_or("_"))),
        ExprKind::Add(..) | ExprKind::Sub(..) => layout_sum(expr),
        ExprKind::Mul(..) | ExprKind::Div(..) => {
            let frac = split_fraction(expr);
            let body = layout_fraction(&frac);
            if frac.negative {
                Block::beside(&[Block::text("-"), body])
            } else {
                body
            }
        }
        ExprKind::Pow(base, exp) => match exp.as_number() {
            Some(e) if e < 0.0 => {
                let frac = split_fraction(expr);
                layout_fraction(&frac)
            }
            Some(e) if e == 0.5 => layout_sqrt(base),
            _ => Block::superscript(layout_wrapped(base, 4), layout(exp)),
        },
        ExprKind::FunctionCall { name, args } if name == "sqrt" && args.len() == 1 => {
            layout_sqrt(&args[0])
        }
        ExprKind::FunctionCall { name, args } => layout_call(name, args),
        ExprKind::Derivative { .. } => layout_derivative(expr),
    }
}

fn layout_matrix(matrix: &Matrix) -> Block {
    let cells: Vec<Block> = matrix.entries().iter().map(layout).collect();
    let cols = matrix.cols().max(1);
    let col_widths: Vec<usize> = (0..cols)
        .map(|c| {
            cells
                .iter()
                .skip(c)
                .step_by(cols)
                .map(Block::width)
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::new();
    for (r, row) in cells.chunks(cols).enumerate() {
        if r > 0 {
            lines.push(String::new());
        }
        let padded: Vec<Block> = row
            .iter()
            .zip(&col_widths)
            .map(|(cell, &w)| cell.centered(w))
            .collect();
        lines.extend(join(padded, "  ").lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let baseline = lines.len() / 2;
    Block::brackets(Block { lines, baseline })
}

#[cfg(test)]
mod tests {
    use super::pretty;
    use crate::symbolic::{func, powi, recip, symbols, Expr};

    #[test]
    fn fraction_with_raised_exponent() {
        let [x] = symbols(["x"]);
        let e = Expr::div_expr(powi(x, 2), Expr::number(2.0));
        assert_eq!(pretty(&e), " 2\nx\n──\n2");
    }

    #[test]
    fn greek_letters_and_partial_derivatives() {
        let [r, theta] = symbols(["r", "theta"]);
        let f = func("f", vec![r, theta]);
        let rendered = pretty(&Expr::derivative(f, "r".to_string(), 2));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["∂²", "───f(r, θ)", "∂r²"]);
    }

    #[test]
    fn mixed_partials_fold_into_one_operator() {
        let [r, theta] = symbols(["r", "theta"]);
        let f = func("f", vec![r, theta]);
        let inner = Expr::derivative(f, "r".to_string(), 1);
        let rendered = pretty(&Expr::derivative(inner, "theta".to_string(), 1));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec![" ∂²", "─────f(r, θ)", "∂r ∂θ"]);
    }

    #[test]
    fn sqrt_of_a_symbol_and_of_a_sum() {
        let [a, b] = symbols(["a", "b"]);
        assert_eq!(pretty(&a.clone().sqrt()), "√a");
        assert_eq!(pretty(&(a + b).sqrt()), "√(a + b)");
    }

    #[test]
    fn negated_terms_and_reciprocals() {
        let [a, b, h] = symbols(["a", "b", "h"]);
        assert_eq!(pretty(&(a.clone() - b.clone())), "a - b");
        assert_eq!(pretty(&(a + (-2.0) * b)), "a - 2⋅b");
        assert_eq!(pretty(&recip(h)), "1\n─\nh");
    }
}
