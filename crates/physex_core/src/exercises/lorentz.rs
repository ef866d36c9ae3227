use super::short;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event in 1+1 Minkowski space, in units where c = 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub t: f64,
    pub x: f64,
}

impl Event {
    pub fn new(t: f64, x: f64) -> Self {
        Self { t, x }
    }

    /// The invariant `t² - x²`.
    pub fn interval(&self) -> f64 {
        self.t * self.t - self.x * self.x
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", short(self.t), short(self.x))
    }
}

/// `1/sqrt(1 - v²)`; only defined for `|v| < 1`.
pub fn lorentz_factor(velocity: f64) -> Result<f64> {
    if !velocity.is_finite() || velocity.abs() >= 1.0 {
        bail!("Velocity must satisfy |v| < 1 (got {velocity}).");
    }
    Ok(1.0 / (1.0 - velocity * velocity).sqrt())
}

/// Coordinates of `event` in the frame moving with `velocity` along x.
pub fn boost(event: Event, velocity: f64) -> Result<Event> {
    let gamma = lorentz_factor(velocity)?;
    Ok(Event {
        t: gamma * (event.t - velocity * event.x),
        x: gamma * (event.x - velocity * event.t),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MinkowskiSettings {
    pub velocity: f64,
    pub events: [Event; 2],
    /// Range and resolution of the reference lines.
    pub x_min: f64,
    pub x_max: f64,
    pub samples: usize,
}

impl Default for MinkowskiSettings {
    fn default() -> Self {
        Self {
            velocity: 0.6,
            events: [Event::new(0.0, 1.0), Event::new(1.0, 5.0)],
            x_min: -5.0,
            x_max: 5.0,
            samples: 100,
        }
    }
}

/// A polyline in the (x, t) plane.
pub type Series = Vec<(f64, f64)>;

/// Everything drawn on the Minkowski diagram, as (x, t) points.
#[derive(Debug, Clone, Serialize)]
pub struct MinkowskiDiagram {
    pub events: Series,
    pub transformed_events: Series,
    /// `t = x`.
    pub light_line: Series,
    /// `t = 0.2·v·x/sqrt(1 - v²)`.
    pub t_prime_line: Series,
    /// `t = x/2`, drawn over twice the sampled range.
    pub x_prime_line: Series,
    /// From the first transformed event to the origin.
    pub guide_segment: Series,
}

#[derive(Debug, Clone, Serialize)]
pub struct LorentzReport {
    pub velocity: f64,
    pub gamma: f64,
    pub events: [Event; 2],
    pub transformed: [Event; 2],
    pub diagram: MinkowskiDiagram,
}

impl fmt::Display for LorentzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "v = {} (gamma = {})",
            short(self.velocity),
            short(self.gamma)
        )?;
        for (i, (event, moved)) in self.events.iter().zip(&self.transformed).enumerate() {
            let label = if i == 0 { "A" } else { "B" };
            write!(f, "{label}: (t, x) = {event} -> (t', x') = {moved}")?;
            if i + 1 < self.events.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn linspace(min: f64, max: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i + 1 == n { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Transforms both events and lays out the diagram.
pub fn lorentz_transform(settings: &MinkowskiSettings) -> Result<LorentzReport> {
    let v = settings.velocity;
    let gamma = lorentz_factor(v)?;
    if !(settings.x_min.is_finite() && settings.x_max.is_finite() && settings.x_max > settings.x_min)
    {
        bail!("The diagram range must be finite with x_max > x_min.");
    }
    if settings.samples < 2 {
        bail!("The diagram needs at least 2 samples.");
    }

    let events = settings.events;
    let transformed = [boost(events[0], v)?, boost(events[1], v)?];
    let xs = linspace(settings.x_min, settings.x_max, settings.samples);

    let diagram = MinkowskiDiagram {
        events: events.iter().map(|e| (e.x, e.t)).collect(),
        transformed_events: transformed.iter().map(|e| (e.x, e.t)).collect(),
        light_line: xs.iter().map(|&x| (x, x)).collect(),
        t_prime_line: xs.iter().map(|&x| (x, 0.2 * x * v * gamma)).collect(),
        x_prime_line: xs.iter().map(|&x| (2.0 * x, x)).collect(),
        guide_segment: vec![(transformed[0].x, transformed[0].t), (0.0, 0.0)],
    };

    Ok(LorentzReport {
        velocity: v,
        gamma,
        events,
        transformed,
        diagram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn boosts_the_worksheet_events() {
        let report = lorentz_transform(&MinkowskiSettings::default()).expect("valid settings");
        assert_abs_diff_eq!(report.gamma, 1.25, epsilon = 1e-12);
        let [a, b] = report.transformed;
        assert_abs_diff_eq!(a.t, -0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(a.x, 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(b.t, -2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(b.x, 5.5, epsilon = 1e-12);
    }

    #[test]
    fn interval_is_invariant() {
        for &v in &[0.6, -0.3, 0.99] {
            for event in [Event::new(0.0, 1.0), Event::new(1.0, 5.0), Event::new(-2.0, 0.5)] {
                let moved = boost(event, v).expect("subluminal");
                assert_abs_diff_eq!(moved.interval(), event.interval(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn superluminal_velocities_are_rejected() {
        assert!(lorentz_factor(1.0).is_err());
        assert!(lorentz_factor(-1.5).is_err());
        assert!(lorentz_factor(f64::NAN).is_err());
        let settings = MinkowskiSettings {
            velocity: 1.0,
            ..MinkowskiSettings::default()
        };
        assert!(lorentz_transform(&settings).is_err());
    }

    #[test]
    fn diagram_reference_lines() {
        let report = lorentz_transform(&MinkowskiSettings::default()).expect("valid settings");
        let diagram = &report.diagram;
        assert_eq!(diagram.light_line.len(), 100);
        assert_eq!(diagram.x_prime_line.first(), Some(&(-10.0, -5.0)));
        assert_eq!(diagram.x_prime_line.last(), Some(&(10.0, 5.0)));
        let (x, t) = diagram.t_prime_line[diagram.t_prime_line.len() - 1];
        assert_abs_diff_eq!(x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t, 0.75, epsilon = 1e-12);
        assert_eq!(diagram.guide_segment[1], (0.0, 0.0));
        assert_abs_diff_eq!(diagram.guide_segment[0].0, 1.25, epsilon = 1e-12);
    }

    #[test]
    fn prints_both_events() {
        let report = lorentz_transform(&MinkowskiSettings::default()).expect("valid settings");
        assert_eq!(
            report.to_string(),
            "v = 0.6 (gamma = 1.25)\n\
             A: (t, x) = (0, 1) -> (t', x') = (-0.75, 1.25)\n\
             B: (t, x) = (1, 5) -> (t', x') = (-2.5, 5.5)"
        );
    }
}
