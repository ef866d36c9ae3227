use nalgebra::{Matrix3, Vector3};
use serde::Serialize;
use std::fmt;

/// Rotation by `angle` radians about the y axis.
pub fn rotation_about_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c)
}

fn round4(value: f64) -> f64 {
    let rounded = (value * 1e4).round() / 1e4;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplacementReport {
    pub displacement: [f64; 3],
    /// `SᵀS`.
    pub squared_displacement: f64,
    pub rotation: [[f64; 3]; 3],
    /// `(AS)ᵀ(AS)`.
    pub rotated_squared_displacement: f64,
    /// `Aᵀ I A`, rounded to four decimals.
    pub metric_check: [[f64; 3]; 3],
}

fn rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [0, 1, 2].map(|r| [0, 1, 2].map(|c| m[(r, c)]))
}

/// Formats a float the way NumPy prints array elements: `1.` for whole numbers.
fn numpy_element(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value}.")
    } else {
        format!("{value}")
    }
}

fn numpy_matrix(rows: &[[f64; 3]; 3]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|v| numpy_element(*v)).collect())
        .collect();
    let width = cells.iter().flatten().map(String::len).max().unwrap_or(0);
    let lines: Vec<String> = cells
        .iter()
        .map(|row| {
            let padded: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
            format!("[{}]", padded.join(" "))
        })
        .collect();
    format!("[{}]", lines.join("\n "))
}

impl fmt::Display for DisplacementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "a) The squared displacement is: {}",
            self.squared_displacement
        )?;
        writeln!(
            f,
            " b) The squared displacement is: {:?}",
            self.rotated_squared_displacement
        )?;
        write!(f, " C): {}", numpy_matrix(&self.metric_check))
    }
}

/// a) `SᵀS` for `S = (1, 0, 1)`; b) the same after rotating by 45° about y;
/// c) `Aᵀ I A`, which is the identity for a rotation.
pub fn displacement_algebra() -> DisplacementReport {
    let s = Vector3::new(1.0, 0.0, 1.0);
    let a = rotation_about_y(std::f64::consts::FRAC_PI_4);

    let squared = round4(s.dot(&s));
    let rotated = a * s;
    let rotated_squared = round4(rotated.dot(&rotated));
    let metric = (a.transpose() * Matrix3::identity() * a).map(round4);

    DisplacementReport {
        displacement: [s.x, s.y, s.z],
        squared_displacement: squared,
        rotation: rows(&a),
        rotated_squared_displacement: rotated_squared,
        metric_check: rows(&metric),
    }
}
