use super::{simplify, Expr, SymbolicError};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::fmt;

/// A dense, row-major matrix of expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    entries: Vec<Expr>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> Result<Matrix, SymbolicError> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != cols) {
            return Err(SymbolicError::RaggedMatrix {
                expected: cols,
                found: bad.len(),
            });
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            entries: rows.into_iter().flatten().collect(),
        })
    }

    /// An `n × 1` column vector.
    pub fn column(entries: Vec<Expr>) -> Matrix {
        Matrix {
            rows: entries.len(),
            cols: 1,
            entries,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn entries(&self) -> &[Expr] {
        &self.entries
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        if row < self.rows && col < self.cols {
            self.entries.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            entries: self.entries.iter().map(f).collect(),
        }
    }

    /// Multiplies every entry by `factor`.
    pub fn scale(&self, factor: &Expr) -> Matrix {
        self.map(|e| factor.clone() * e.clone())
    }

    pub fn simplify(&self) -> Result<Matrix, SymbolicError> {
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            entries: self.entries.iter().map(simplify).collect::<Result<_, _>>()?,
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix([")?;
        for (r, row) in self.entries.chunks(self.cols.max(1)).enumerate() {
            if r > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (c, entry) in row.iter().enumerate() {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{entry}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "])")
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for row in self.entries.chunks(self.cols.max(1)) {
            let printed: Vec<String> = row.iter().map(Expr::to_string).collect();
            seq.serialize_element(&printed)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::Matrix;
    use crate::symbolic::{pretty_matrix, recip, symbols, Expr, SymbolicError};

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Matrix::from_rows(vec![
            vec![Expr::number(1.0), Expr::number(2.0)],
            vec![Expr::number(3.0)],
        ])
        .expect_err("ragged rows should fail");
        assert_eq!(
            err,
            SymbolicError::RaggedMatrix {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn scale_then_simplify_cancels() {
        let h = Expr::symbol("h");
        let column = Matrix::column(vec![h.clone(), 2.0 * h.clone()]);
        let scaled = column.scale(&recip(h)).simplify().expect("simplifies");
        assert_eq!(scaled.get(0, 0).and_then(Expr::as_number), Some(1.0));
        assert_eq!(scaled.get(1, 0).and_then(Expr::as_number), Some(2.0));
        assert_eq!(scaled.get(2, 0), None);
    }

    #[test]
    fn serializes_rows_of_printed_entries() {
        let [a, b] = symbols(["a", "b"]);
        let column = Matrix::column(vec![a, b]);
        assert_eq!(column.to_string(), "Matrix([[a], [b]])");
        let json = serde_json::to_value(&column).expect("serializes");
        assert_eq!(json, serde_json::json!([["a"], ["b"]]));
    }

    #[test]
    fn column_pretty_prints_with_brackets() {
        let [a, b] = symbols(["a", "b"]);
        let rendered = pretty_matrix(&Matrix::column(vec![a, b]));
        assert_eq!(rendered, "⎡a⎤\n⎢ ⎥\n⎣b⎦");
    }
}
