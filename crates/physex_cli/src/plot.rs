//! SVG figures for the plotting exercises.

use anyhow::{bail, Result};
use log::info;
use physex_core::exercises::implicit_surface::ImplicitSurfaceReport;
use physex_core::exercises::lorentz::{LorentzReport, Series};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::path::Path;

const FIGURE_WIDTH: u32 = 900;
const PURPLE: RGBColor = RGBColor(128, 0, 128);

fn bounds<'a>(series: impl IntoIterator<Item = &'a Series>) -> Option<[f64; 4]> {
    let mut b = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
    for &(x, t) in series.into_iter().flatten() {
        b = [b[0].min(x), b[1].max(x), b[2].min(t), b[3].max(t)];
    }
    b.iter().all(|v| v.is_finite()).then_some(b)
}

/// Draws the Minkowski diagram: both event pairs, the light line, the t' and
/// x' reference lines and the guide from A' to the origin, with equal scales
/// on both axes.
pub fn render_minkowski(report: &LorentzReport, path: &Path) -> Result<()> {
    let d = &report.diagram;
    let all = [
        &d.events,
        &d.transformed_events,
        &d.light_line,
        &d.t_prime_line,
        &d.x_prime_line,
        &d.guide_segment,
    ];
    let Some([x_min, x_max, t_min, t_max]) = bounds(all) else {
        bail!("The diagram has no finite points to draw.");
    };
    let (x_min, x_max, t_min, t_max) = (x_min - 0.5, x_max + 0.5, t_min - 0.5, t_max + 0.5);
    let height = ((FIGURE_WIDTH as f64) * (t_max - t_min) / (x_max - x_min)).round() as u32 + 80;

    let root = SVGBackend::new(path, (FIGURE_WIDTH, height.max(200))).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Minkowski space", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, t_min..t_max)?;

    chart
        .configure_mesh()
        .x_desc("Position (x)")
        .y_desc("Time (t)")
        .light_line_style(TRANSPARENT)
        .bold_line_style(BLACK.mix(0.15).stroke_width(1))
        .draw()?;

    for axis in [vec![(x_min, 0.0), (x_max, 0.0)], vec![(0.0, t_min), (0.0, t_max)]] {
        chart.draw_series(std::iter::once(PathElement::new(axis, BLACK.stroke_width(1))))?;
    }

    chart
        .draw_series(d.events.iter().map(|&p| Circle::new(p, 5, RED.filled())))?
        .label("Events A and B")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));
    chart
        .draw_series(d.transformed_events.iter().map(|&p| Circle::new(p, 5, BLUE.filled())))?
        .label("Events A' and B'")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, BLUE.filled()));

    let dashed = [
        (&d.light_line, BLACK, "Speed of light"),
        (&d.t_prime_line, GREEN, "t' line"),
        (&d.x_prime_line, BLUE, "x' line"),
        (&d.guide_segment, BLUE, "A' to the origin"),
    ];
    for (series, color, label) in dashed {
        chart
            .draw_series(DashedLineSeries::new(
                series.iter().copied(),
                6,
                4,
                color.stroke_width(2),
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Draws both meshes in 3D with the marked point and vector. Coordinates are
/// laid out so that z points up.
pub fn render_implicit_surface(report: &ImplicitSurfaceReport, path: &Path) -> Result<()> {
    let [ax, ay, az] = report.settings.axes;
    let root = SVGBackend::new(path, (FIGURE_WIDTH, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Surfaces, point and vector", ("sans-serif", 22))
        .margin(20)
        .build_cartesian_3d(ax.min..ax.max, az.min..az.max, ay.min..ay.max)?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.85;
        pb.into_matrix()
    });
    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()?;

    let colors = [BLUE, RED];
    for (surface, color) in report.surfaces.iter().zip(colors) {
        let style = color.mix(0.25).filled();
        chart
            .draw_series(surface.mesh.iter_triangles().map(move |tri| {
                Polygon::new(tri.iter().map(|&[x, y, z]| (x, z, y)).collect::<Vec<_>>(), style)
            }))?
            .label(format!("{} = 0", surface.name))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    let [px, py, pz] = report.point;
    let [vx, vy, vz] = report.vector;
    chart
        .draw_series(std::iter::once(Circle::new((px, pz, py), 6, GREEN.filled())))?
        .label(format!("Point ({px}, {py}, {pz})"))
        .legend(|(x, y)| Circle::new((x + 7, y), 5, GREEN.filled()));
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(px, pz, py), (px + vx, pz + vz, py + vy)],
            PURPLE.stroke_width(3),
        )))?
        .label("Vector")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PURPLE.stroke_width(3)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("Wrote {}", path.display());
    Ok(())
}
