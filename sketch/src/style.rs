//! Render attributes keyed by handle (`spec.md` §3 "Style"). The engine
//! never interprets these beyond carrying them through to the render sink
//! (§6) — colour and line-width are plain data here.

use crate::handle::HStyle;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b, a: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct Style {
    pub id: HStyle,
    pub name: String,
    pub color: Color,
    pub width_px: f32,
}

/// Factory-default styles, fixed handles matching the original's
/// `Style::ACTIVE_GRP`/`CONSTRUCTION`/... constants
/// (`examples/original_source/sketch.h`'s style id block).
pub mod factory {
    use super::*;

    pub const ACTIVE_GROUP: HStyle = HStyle(1);
    pub const CONSTRUCTION: HStyle = HStyle(2);
    pub const INACTIVE_GROUP: HStyle = HStyle(3);
    pub const DATUM: HStyle = HStyle(4);
    pub const SOLID_EDGE: HStyle = HStyle(5);
    pub const SELECTED: HStyle = HStyle(6);
    pub const HOVERED: HStyle = HStyle(7);
    pub const CONTOUR_FILL: HStyle = HStyle(8);

    pub fn defaults() -> Vec<Style> {
        vec![
            Style { id: ACTIVE_GROUP, name: "ActiveGroup".into(), color: Color::rgb(0.0, 1.0, 0.0), width_px: 1.5 },
            Style { id: CONSTRUCTION, name: "Construction".into(), color: Color::rgb(0.0, 0.4, 1.0), width_px: 1.0 },
            Style { id: INACTIVE_GROUP, name: "InactiveGroup".into(), color: Color::rgb(0.5, 0.5, 0.5), width_px: 1.0 },
            Style { id: DATUM, name: "Datum".into(), color: Color::rgb(0.0, 0.8, 0.8), width_px: 1.0 },
            Style { id: SOLID_EDGE, name: "SolidEdge".into(), color: Color::rgb(0.0, 0.0, 0.0), width_px: 1.0 },
            Style { id: SELECTED, name: "Selected".into(), color: Color::rgb(1.0, 0.0, 0.0), width_px: 2.0 },
            Style { id: HOVERED, name: "Hovered".into(), color: Color::rgb(1.0, 1.0, 0.0), width_px: 2.0 },
            Style { id: CONTOUR_FILL, name: "ContourFill".into(), color: Color::rgb(0.8, 0.8, 0.8), width_px: 1.0 },
        ]
    }
}
