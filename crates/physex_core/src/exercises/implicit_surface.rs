use super::{short, short_tuple};
use crate::autodiff::{gradient, Dual};
use crate::bytecode::CompiledField;
use crate::isosurface::{extract_isosurface, sample_grid, IsosurfaceSettings, Mesh};
use crate::symbolic::{parse, serialize_expr, simplify, Expr};
use crate::traits::ScalarField;
use anyhow::{bail, Context, Result};
use log::info;
use nalgebra::Vector3;
use serde::Serialize;
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

pub const PHI1: &str = "x^2 + 2*x*y - y^2 + y*z + z^2 - 9";
pub const PHI2: &str = "3*x^2 - x*y + y^2 - 11";
pub const MARKED_POINT: [f64; 3] = [2.0, 1.0, 1.0];
pub const MARKED_VECTOR: [f64; 3] = [0.0, FRAC_1_SQRT_2, -FRAC_1_SQRT_2];
const COORDINATES: [&str; 3] = ["x", "y", "z"];
const ON_SURFACE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceReport {
    pub name: String,
    #[serde(serialize_with = "serialize_expr")]
    pub expression: Expr,
    /// Skipped in JSON output; a full-resolution mesh has tens of thousands of triangles.
    #[serde(skip)]
    pub mesh: Mesh,
    pub triangle_count: usize,
    pub value_at_point: f64,
    pub gradient_at_point: [f64; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplicitSurfaceReport {
    pub settings: IsosurfaceSettings,
    pub surfaces: Vec<SurfaceReport>,
    pub point: [f64; 3],
    pub vector: [f64; 3],
    pub point_on_both: bool,
    /// Unit tangent of the intersection curve at `point`.
    pub tangent: [f64; 3],
}

impl fmt::Display for ImplicitSurfaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for surface in &self.surfaces {
            writeln!(
                f,
                "{} = {}: {} triangles, {}{} = {}",
                surface.name,
                surface.expression,
                surface.triangle_count,
                surface.name,
                short_tuple(&self.point),
                short(surface.value_at_point)
            )?;
        }
        writeln!(
            f,
            "Point {} lies on both surfaces: {}",
            short_tuple(&self.point),
            if self.point_on_both { "yes" } else { "no" }
        )?;
        writeln!(f, "Tangent of the intersection: {}", short_tuple(&self.tangent))?;
        write!(f, "Vector: {}", short_tuple(&self.vector))
    }
}

fn surface(name: &str, source: &str, settings: &IsosurfaceSettings) -> Result<SurfaceReport> {
    let parsed = parse(source).with_context(|| format!("Failed to parse {name}."))?;
    let expression = simplify(&parsed)?;
    let field: CompiledField<f64> = CompiledField::new(&expression, &COORDINATES)?;
    let grid = sample_grid(&field, &settings.axes)?;
    let mesh = extract_isosurface(&grid, settings.level)?;
    info!("{name}: {} triangles", mesh.triangle_count());

    let dual_field: CompiledField<Dual> = CompiledField::new(&expression, &COORDINATES)?;
    let grad = gradient(&dual_field, &MARKED_POINT);
    Ok(SurfaceReport {
        name: name.to_string(),
        triangle_count: mesh.triangle_count(),
        value_at_point: field.value(&MARKED_POINT),
        gradient_at_point: [grad[0], grad[1], grad[2]],
        expression,
        mesh,
    })
}

/// Extracts `φ₁ = 0` and `φ₂ = 0` and checks the marked point and vector.
pub fn implicit_surfaces(settings: &IsosurfaceSettings) -> Result<ImplicitSurfaceReport> {
    let surfaces = vec![
        surface("phi1", PHI1, settings)?,
        surface("phi2", PHI2, settings)?,
    ];

    let normals: Vec<Vector3<f64>> = surfaces
        .iter()
        .map(|s| Vector3::from(s.gradient_at_point))
        .collect();
    let cross = normals[0].cross(&normals[1]);
    if cross.norm() == 0.0 {
        bail!("The surfaces are tangent at the marked point.");
    }
    let tangent = cross.normalize();
    let point_on_both = surfaces
        .iter()
        .all(|s| s.value_at_point.abs() <= ON_SURFACE_TOLERANCE);

    Ok(ImplicitSurfaceReport {
        settings: *settings,
        surfaces,
        point: MARKED_POINT,
        vector: MARKED_VECTOR,
        point_on_both,
        tangent: [tangent.x, tangent.y, tangent.z],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn coarse() -> IsosurfaceSettings {
        IsosurfaceSettings::with_samples(21)
    }

    #[test]
    fn marked_point_lies_on_both_surfaces() {
        let report = implicit_surfaces(&coarse()).expect("surfaces extract");
        assert!(report.point_on_both);
        assert_abs_diff_eq!(
            report.surfaces[0].gradient_at_point[..],
            [6.0, 3.0, 3.0][..],
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            report.surfaces[1].gradient_at_point[..],
            [11.0, 0.0, 0.0][..],
            epsilon = 1e-12
        );
    }

    #[test]
    fn tangent_of_intersection_is_the_marked_vector() {
        let report = implicit_surfaces(&coarse()).expect("surfaces extract");
        assert_abs_diff_eq!(report.tangent[..], MARKED_VECTOR[..], epsilon = 1e-12);
    }

    #[test]
    fn both_meshes_are_non_empty() {
        let report = implicit_surfaces(&coarse()).expect("surfaces extract");
        for surface in &report.surfaces {
            assert!(surface.triangle_count > 0, "{} has no triangles", surface.name);
            assert_eq!(surface.mesh.triangle_count(), surface.triangle_count);
        }
        let printed = report.to_string();
        assert!(printed.contains("Point (2, 1, 1) lies on both surfaces: yes"));
        assert!(printed.contains("phi1(2, 1, 1) = 0"));
    }

    #[test]
    fn json_report_omits_meshes() {
        let report =
            implicit_surfaces(&IsosurfaceSettings::with_samples(8)).expect("surfaces extract");
        let json = serde_json::to_value(&report).expect("serializes");
        assert!(json["surfaces"][0].get("mesh").is_none());
        assert_eq!(json["point"], serde_json::json!([2.0, 1.0, 1.0]));
    }
}
