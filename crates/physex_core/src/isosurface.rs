use crate::traits::ScalarField;
use anyhow::{bail, Result};
use log::debug;
use marching_cubes::tables::{EDGE_TABLE, TRI_TABLE};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of lattice points in one grid.
pub const MAX_GRID_POINTS: usize = 1 << 26;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl AxisSpec {
    pub fn new(min: f64, max: f64, samples: usize) -> Self {
        Self { min, max, samples }
    }

    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.samples.saturating_sub(1).max(1) as f64)
    }

    pub fn coordinate(&self, i: usize) -> f64 {
        self.min + self.step() * i as f64
    }

    fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            bail!("Each axis range must be finite with max > min.");
        }
        if self.samples < 2 {
            bail!("Each axis needs at least 2 samples.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IsosurfaceSettings {
    pub axes: [AxisSpec; 3],
    pub level: f64,
}

impl IsosurfaceSettings {
    /// The default cube with `samples` points per axis.
    pub fn with_samples(samples: usize) -> Self {
        Self {
            axes: [AxisSpec::new(-5.0, 5.0, samples); 3],
            ..Self::default()
        }
    }
}

impl Default for IsosurfaceSettings {
    fn default() -> Self {
        Self {
            axes: [AxisSpec::new(-5.0, 5.0, 100); 3],
            level: 0.0,
        }
    }
}

/// Number of lattice points spanned by `axes`, refusing sizes that overflow
/// or exceed [`MAX_GRID_POINTS`].
fn grid_len(axes: &[AxisSpec; 3]) -> Result<usize> {
    let [ax, ay, az] = axes;
    match ax
        .samples
        .checked_mul(ay.samples)
        .and_then(|n| n.checked_mul(az.samples))
    {
        Some(n) if n <= MAX_GRID_POINTS => Ok(n),
        _ => bail!(
            "A {}x{}x{} grid exceeds the limit of {} points.",
            ax.samples,
            ay.samples,
            az.samples,
            MAX_GRID_POINTS
        ),
    }
}

/// Field values sampled on a regular lattice, x fastest.
#[derive(Debug, Clone)]
pub struct Grid {
    pub axes: [AxisSpec; 3],
    pub values: Vec<f64>,
}

impl Grid {
    fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        let [nx, ny, _] = self.axes.map(|a| a.samples);
        ix + iy * nx + iz * nx * ny
    }

    pub fn value(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.values[self.index(ix, iy, iz)]
    }
}

pub fn sample_grid<F: ScalarField<f64>>(field: &F, axes: &[AxisSpec; 3]) -> Result<Grid> {
    if field.dimension() != 3 {
        bail!(
            "Isosurfaces need a field of 3 variables, got {}.",
            field.dimension()
        );
    }
    for axis in axes {
        axis.validate()?;
    }

    let len = grid_len(axes)?;
    let [ax, ay, az] = axes;
    let mut values = Vec::with_capacity(len);
    for iz in 0..az.samples {
        let z = az.coordinate(iz);
        for iy in 0..ay.samples {
            let y = ay.coordinate(iy);
            for ix in 0..ax.samples {
                values.push(field.value(&[ax.coordinate(ix), y, z]));
            }
        }
    }
    debug!("Sampled {} grid values", values.len());
    Ok(Grid {
        axes: *axes,
        values,
    })
}

/// Triangle soup: `points` holds xyz triples, `triangles` vertex indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub points: Vec<f64>,
    pub triangles: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex(&self, index: u32) -> [f64; 3] {
        let i = index as usize * 3;
        [self.points[i], self.points[i + 1], self.points[i + 2]]
    }

    pub fn vertices(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.points.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    pub fn iter_triangles(&self) -> impl Iterator<Item = [[f64; 3]; 3]> + '_ {
        self.triangles
            .chunks_exact(3)
            .map(|t| [self.vertex(t[0]), self.vertex(t[1]), self.vertex(t[2])])
    }
}

const CUBE_EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

const CUBE_CORNER_OFFSETS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

/// Marching cubes over `grid` at `level`.
pub fn extract_isosurface(grid: &Grid, level: f64) -> Result<Mesh> {
    if !level.is_finite() {
        bail!("Isosurface level must be finite.");
    }
    for axis in &grid.axes {
        axis.validate()?;
    }
    let expected = grid_len(&grid.axes)?;
    let [ax, ay, az] = &grid.axes;
    if grid.values.len() != expected {
        bail!(
            "Grid holds {} values, expected {}.",
            grid.values.len(),
            expected
        );
    }

    let mut mesh = Mesh::default();
    let mut vertex_count = 0u32;
    for iz in 0..az.samples - 1 {
        for iy in 0..ay.samples - 1 {
            for ix in 0..ax.samples - 1 {
                let corner_points = CUBE_CORNER_OFFSETS.map(|(dx, dy, dz)| {
                    [
                        ax.coordinate(ix + dx),
                        ay.coordinate(iy + dy),
                        az.coordinate(iz + dz),
                    ]
                });
                let corner_values = CUBE_CORNER_OFFSETS
                    .map(|(dx, dy, dz)| grid.value(ix + dx, iy + dy, iz + dz) - level);
                if corner_values.iter().any(|v| !v.is_finite()) {
                    continue;
                }

                let mut cube_index = 0usize;
                for (corner, value) in corner_values.iter().enumerate() {
                    if *value < 0.0 {
                        cube_index |= 1 << corner;
                    }
                }
                let edge_mask = EDGE_TABLE[cube_index] as i32;
                if edge_mask == 0 {
                    continue;
                }

                let mut edge_vertices = [[0.0; 3]; 12];
                for (edge, &(ca, cb)) in CUBE_EDGE_CORNERS.iter().enumerate() {
                    if (edge_mask & (1 << edge)) == 0 {
                        continue;
                    }
                    let a = corner_points[ca];
                    let b = corner_points[cb];
                    let t = interpolate_factor(corner_values[ca], corner_values[cb]);
                    edge_vertices[edge] = [0, 1, 2].map(|k| a[k] + (b[k] - a[k]) * t);
                }

                let tri_row = TRI_TABLE[cube_index];
                let mut tri_offset = 0usize;
                while tri_offset + 2 < tri_row.len() && tri_row[tri_offset] != -1 {
                    for k in 0..3 {
                        let edge = tri_row[tri_offset + k] as usize;
                        mesh.points.extend(edge_vertices[edge]);
                    }
                    mesh.triangles
                        .extend([vertex_count, vertex_count + 1, vertex_count + 2]);
                    vertex_count += 3;
                    tri_offset += 3;
                }
            }
        }
    }
    debug!("Extracted {} triangles", mesh.triangle_count());
    Ok(mesh)
}

fn interpolate_factor(v0: f64, v1: f64) -> f64 {
    let denominator = v0 - v1;
    if denominator.abs() <= 1e-12 {
        0.5
    } else {
        (v0 / denominator).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CompiledField;
    use crate::symbolic::parse;

    fn sphere() -> CompiledField<f64> {
        let expr = parse("x^2 + y^2 + z^2 - 1").expect("valid input");
        CompiledField::new(&expr, &["x", "y", "z"]).expect("compiles")
    }

    #[test]
    fn sphere_vertices_lie_on_the_surface() {
        let axes = [AxisSpec::new(-1.5, 1.5, 16); 3];
        let grid = sample_grid(&sphere(), &axes).expect("grid samples");
        let mesh = extract_isosurface(&grid, 0.0).expect("surface extracts");

        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.triangles.len() % 3, 0);
        assert_eq!(mesh.points.len(), mesh.triangles.len() * 3);
        let step = axes[0].step();
        for [x, y, z] in mesh.vertices() {
            let r = (x * x + y * y + z * z).sqrt();
            assert!((r - 1.0).abs() < step, "vertex at radius {r}");
        }
    }

    #[test]
    fn level_outside_the_range_gives_empty_mesh() {
        let axes = [AxisSpec::new(-1.0, 1.0, 8); 3];
        let grid = sample_grid(&sphere(), &axes).expect("grid samples");
        let mesh = extract_isosurface(&grid, 10.0).expect("surface extracts");
        assert!(mesh.is_empty());
        assert_eq!(mesh.iter_triangles().count(), 0);
    }

    #[test]
    fn invalid_axes_are_rejected() {
        let field = sphere();
        let mut axes = [AxisSpec::new(-1.0, 1.0, 8); 3];
        axes[1] = AxisSpec::new(1.0, -1.0, 8);
        assert!(sample_grid(&field, &axes).is_err());
        axes[1] = AxisSpec::new(-1.0, 1.0, 1);
        assert!(sample_grid(&field, &axes).is_err());
        axes[1] = AxisSpec::new(f64::NEG_INFINITY, 1.0, 8);
        assert!(sample_grid(&field, &axes).is_err());
    }

    #[test]
    fn oversized_grids_are_rejected_before_allocating() {
        let field = sphere();
        let err = sample_grid(&field, &[AxisSpec::new(-5.0, 5.0, 3_000_000); 3])
            .expect_err("grid size overflows");
        assert!(err.to_string().contains("exceeds the limit"));
        let err = sample_grid(&field, &[AxisSpec::new(-5.0, 5.0, 1000); 3])
            .expect_err("grid is above the cap");
        assert!(err.to_string().contains("1000x1000x1000"));

        let grid = Grid {
            axes: [AxisSpec::new(-1.0, 1.0, usize::MAX / 2); 3],
            values: Vec::new(),
        };
        assert!(extract_isosurface(&grid, 0.0).is_err());
    }

    #[test]
    fn non_finite_level_is_rejected() {
        let axes = [AxisSpec::new(-1.0, 1.0, 4); 3];
        let grid = sample_grid(&sphere(), &axes).expect("grid samples");
        assert!(extract_isosurface(&grid, f64::NAN).is_err());
    }

    #[test]
    fn fields_of_other_dimensions_are_rejected() {
        let expr = parse("x^2 + y^2").expect("valid input");
        let field: CompiledField<f64> = CompiledField::new(&expr, &["x", "y"]).expect("compiles");
        let axes = [AxisSpec::new(-1.0, 1.0, 4); 3];
        assert!(sample_grid(&field, &axes).is_err());
    }
}
