//! Deterministic SVG rendering of symbol parameters.

use std::f64::consts::{PI, TAU};

use dream_core::{Quadrant, SymbolParams, SymbolRenderer};

const UPPER_PALETTE: [&str; 4] = ["#FFD700", "#FFA500", "#FF69B4", "#00CED1"];
const DOWNER_PALETTE: [&str; 4] = ["#800080", "#4B0082", "#191970", "#2F4F4F"];
const DYNAMIC_PALETTE: [&str; 3] = ["#FF4500", "#DC143C", "#B22222"];
const STATIC_PALETTE: [&str; 3] = ["#4682B4", "#6495ED", "#87CEEB"];

const HALF_EXTENT: f64 = 150.0;
const CORE_RADIUS: f64 = 20.0;
const FIRST_RING: f64 = 40.0;
const RING_SPAN: f64 = 100.0;

pub fn background(palette_bias: f64) -> &'static str {
    if palette_bias > 0.3 {
        "#FFF8DC"
    } else if palette_bias < -0.3 {
        "#2F2F2F"
    } else {
        "#F5F5F5"
    }
}

pub fn core_colour(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::UpperDynamic => "#FFD700",
        Quadrant::UpperStatic => "#00CED1",
        Quadrant::DownerDynamic => "#800080",
        Quadrant::DownerStatic => "#191970",
    }
}

/// Rotational order of every ring: 3 at `symmetry_factor` 0, 12 at 1.
pub fn rotational_order(symmetry_factor: f64) -> u32 {
    3 + (symmetry_factor.clamp(0.0, 1.0) * 9.0).round() as u32
}

/// Renders a square SVG document centred on the origin.
#[derive(Clone, Copy, Debug)]
pub struct SvgRenderer {
    pixels: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self { pixels: 300 }
    }
}

impl SymbolRenderer for SvgRenderer {
    type Artifact = String;

    fn render(&self, params: &SymbolParams) -> String {
        let order = rotational_order(params.symmetry_factor);
        let rings = params.complexity.max(1);
        let spacing = (RING_SPAN / f64::from(rings)).min(8.0);
        let ring_palette: &[&str] = if params.palette_bias >= 0.0 {
            &UPPER_PALETTE
        } else {
            &DOWNER_PALETTE
        };
        // Mean energy back in [-1, 1].
        let energy = params.symmetry_factor * 2.0 - 1.0;
        let accent_palette: &[&str] = if energy >= 0.0 {
            &DYNAMIC_PALETTE
        } else {
            &STATIC_PALETTE
        };

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{px}\" height=\"{px}\" \
             viewBox=\"{min} {min} {size} {size}\">\n",
            px = self.pixels,
            min = num(-HALF_EXTENT),
            size = num(HALF_EXTENT * 2.0),
        );
        svg.push_str(&format!(
            "<rect x=\"{min}\" y=\"{min}\" width=\"{size}\" height=\"{size}\" fill=\"{}\"/>\n",
            background(params.palette_bias),
            min = num(-HALF_EXTENT),
            size = num(HALF_EXTENT * 2.0),
        ));

        for i in 0..rings {
            let radius = FIRST_RING + f64::from(i) * spacing;
            // Alternate rings are offset by half a step.
            let offset = if i % 2 == 0 { 0.0 } else { PI / f64::from(order) };
            let colour = ring_palette[i as usize % ring_palette.len()];
            svg.push_str(&format!(
                "<polygon class=\"ring\" points=\"{}\" fill=\"none\" stroke=\"{colour}\" \
                 stroke-width=\"2.00\"/>\n",
                polygon_points(order, radius, offset),
            ));
        }

        let outer = FIRST_RING + f64::from(rings - 1) * spacing;
        for k in 0..order {
            let (x, y) = polar(outer, vertex_angle(k, order, 0.0));
            svg.push_str(&format!(
                "<circle class=\"node\" cx=\"{}\" cy=\"{}\" r=\"3.00\" fill=\"{}\"/>\n",
                num(x),
                num(y),
                accent_palette[k as usize % accent_palette.len()],
            ));
        }

        svg.push_str(&format!(
            "<circle class=\"core\" cx=\"0.00\" cy=\"0.00\" r=\"{}\" fill=\"{}\"/>\n",
            num(CORE_RADIUS),
            core_colour(params.dominant_quadrant),
        ));

        if params.palette_bias > 0.5 {
            svg.push_str(&format!(
                "<polygon class=\"star\" points=\"{}\" fill=\"#FFFFFF\"/>\n",
                star_points(5, CORE_RADIUS * 0.8, CORE_RADIUS * 0.35),
            ));
        } else if params.palette_bias < -0.5 {
            svg.push_str("<circle class=\"void\" cx=\"0.00\" cy=\"0.00\" r=\"8.00\" fill=\"#000000\"/>\n");
        }

        if energy.abs() > 0.5 {
            for k in 0..order {
                let angle = vertex_angle(k, order, 0.0);
                let (x1, y1) = polar(CORE_RADIUS, angle);
                let (x2, y2) = polar(FIRST_RING - 4.0, angle);
                svg.push_str(&format!(
                    "<line class=\"ray\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" \
                     stroke-width=\"1.50\"/>\n",
                    num(x1),
                    num(y1),
                    num(x2),
                    num(y2),
                    accent_palette[0],
                ));
            }
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn vertex_angle(k: u32, order: u32, offset: f64) -> f64 {
    // First vertex points straight up.
    offset - PI / 2.0 + TAU * f64::from(k) / f64::from(order)
}

fn polar(radius: f64, angle: f64) -> (f64, f64) {
    (radius * angle.cos(), radius * angle.sin())
}

fn polygon_points(order: u32, radius: f64, offset: f64) -> String {
    (0..order)
        .map(|k| {
            let (x, y) = polar(radius, vertex_angle(k, order, offset));
            format!("{},{}", num(x), num(y))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn star_points(tips: u32, outer: f64, inner: f64) -> String {
    (0..tips * 2)
        .map(|k| {
            let radius = if k % 2 == 0 { outer } else { inner };
            let (x, y) = polar(radius, vertex_angle(k, tips * 2, 0.0));
            format!("{},{}", num(x), num(y))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two decimals, never `-0.00`.
fn num(x: f64) -> String {
    let rounded = (x * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(complexity: u32, bias: f64, symmetry: f64, q: Quadrant) -> SymbolParams {
        SymbolParams {
            complexity,
            palette_bias: bias,
            symmetry_factor: symmetry,
            dominant_quadrant: q,
        }
    }

    fn count(svg: &str, class: &str) -> usize {
        svg.matches(&format!("class=\"{class}\"")).count()
    }

    #[test]
    fn test_render_is_deterministic() {
        let p = params(4, 0.37, 0.81, Quadrant::UpperDynamic);
        let r = SvgRenderer::default();
        assert_eq!(r.render(&p), r.render(&p));
    }

    #[test]
    fn test_ring_count_follows_complexity() {
        let r = SvgRenderer::default();
        for c in [1, 2, 5, 12] {
            let svg = r.render(&params(c, 0.0, 0.5, Quadrant::UpperStatic));
            assert_eq!(count(&svg, "ring"), c as usize);
        }
    }

    #[test]
    fn test_rotational_order_bounds() {
        assert_eq!(rotational_order(0.0), 3);
        assert_eq!(rotational_order(0.5), 8);
        assert_eq!(rotational_order(1.0), 12);
        let svg = SvgRenderer::default().render(&params(1, 0.0, 1.0, Quadrant::UpperDynamic));
        assert_eq!(count(&svg, "node"), 12);
    }

    #[test]
    fn test_background_thresholds() {
        assert_eq!(background(0.31), "#FFF8DC");
        assert_eq!(background(0.3), "#F5F5F5");
        assert_eq!(background(-0.3), "#F5F5F5");
        assert_eq!(background(-0.31), "#2F2F2F");
    }

    #[test]
    fn test_core_colour_tracks_dominant_quadrant() {
        let svg = SvgRenderer::default().render(&params(2, -0.2, 0.4, Quadrant::DownerStatic));
        assert!(svg.contains("class=\"core\" cx=\"0.00\" cy=\"0.00\" r=\"20.00\" fill=\"#191970\""));
    }

    #[test]
    fn test_centre_marks() {
        let r = SvgRenderer::default();
        let bright = r.render(&params(3, 0.8, 0.5, Quadrant::UpperDynamic));
        assert_eq!(count(&bright, "star"), 1);
        assert_eq!(count(&bright, "void"), 0);

        let dark = r.render(&params(3, -0.8, 0.5, Quadrant::DownerStatic));
        assert_eq!(count(&dark, "star"), 0);
        assert_eq!(count(&dark, "void"), 1);

        let calm = r.render(&params(3, 0.0, 0.5, Quadrant::UpperStatic));
        assert_eq!(count(&calm, "ray"), 0);
        let wild = r.render(&params(3, 0.0, 0.95, Quadrant::UpperDynamic));
        assert_eq!(count(&wild, "ray"), rotational_order(0.95) as usize);
    }

    #[test]
    fn test_no_negative_zero() {
        let svg = SvgRenderer::default().render(&params(6, 0.0, 0.0, Quadrant::UpperStatic));
        assert!(!svg.contains("-0.00"));
    }

    #[test]
    fn test_size() {
        let svg = SvgRenderer::default().render(&SymbolParams::initial());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"300\" height=\"300\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
