//! The coursework exercises. Each operation builds its inputs, computes,
//! and returns a report that can be printed or serialized.

pub mod displacement;
pub mod implicit_surface;
pub mod laplacian;
pub mod lorentz;
pub mod spherical;

/// Prints a float with at most nine decimals and no trailing zeros.
pub(crate) fn short(value: f64) -> String {
    let rounded = (value * 1e9).round() / 1e9;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

pub(crate) fn short_tuple(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| short(*v)).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::{short, short_tuple};

    #[test]
    fn short_trims_rounding_noise() {
        assert_eq!(short(-0.7499999999999999), "-0.75");
        assert_eq!(short(-1e-17), "0");
        assert_eq!(short_tuple(&[2.0, 1.0, 1.0]), "(2, 1, 1)");
    }
}
