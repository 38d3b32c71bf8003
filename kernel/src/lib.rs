//! Facade crate (`spec.md` §6): re-exports every engine sub-crate as a
//! module, the way `examples/nical-lyon`'s own meta-crate re-exports
//! `lyon_tessellation`/`lyon_algorithms`/etc. as `tessellation`/`algorithms`,
//! and hosts the traits surrounding code (an editor, a GUI, a file format)
//! implements to drive the engine: [`RenderSink`], [`FileSink`],
//! [`FontSource`], [`PathLocator`].
//!
//! None of these traits are implemented here — `demos/cli` has minimal
//! stand-ins that print to stdout, purely to exercise the engine end to end
//! without pulling a GUI or file-format dependency into the workspace.

pub use kernel_expr as expr;
pub use kernel_geom as geom;
pub use kernel_mesh as mesh;
pub use kernel_regen as regen;
pub use kernel_sketch as sketch;
pub use kernel_solver as solver;
pub use kernel_undo as undo;

pub use kernel_mesh::Mesh;
pub use kernel_sketch::{Constraint, Entity, HGroup, Sketch};

use std::path::PathBuf;

/// Consumes the solved geometry for display: each Group's running mesh (for
/// shading), the full Entity list (wire overlays) and Constraint list
/// (dimension annotations). The core never renders anything itself.
pub trait RenderSink {
    fn running_mesh(&mut self, group: HGroup, mesh: &Mesh);
    fn entities(&mut self, entities: &[Entity]);
    fn constraints(&mut self, constraints: &[Constraint]);
}

#[derive(thiserror::Error, Debug)]
pub enum FileSinkError {
    #[error("i/o error: {0}")]
    Io(String),
    #[error("malformed sketch file: {0}")]
    Malformed(String),
}

/// Serialises a `Sketch` to and from whatever text key-value format the
/// host application uses. The format itself is explicitly out of scope
/// (`spec.md` §6); this is only the seam the core calls through.
pub trait FileSink {
    fn save(&mut self, sketch: &Sketch) -> Result<(), FileSinkError>;
    fn load(&mut self) -> Result<Sketch, FileSinkError>;
}

/// A single flattenable contour of a glyph outline, in the text entity's
/// own local `(u, v)` — a cubic Bezier's four control points.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphContour {
    pub control_points: Vec<(f64, f64)>,
}

/// Resolves a `TtfText` entity's string into glyph outlines. `spacing` is
/// the advance between characters in sketch units; `origin`/`u`/`v` place
/// the text's baseline and axes on its workplane.
pub trait FontSource {
    fn plot_string(
        &self,
        font_name: &str,
        text: &str,
        spacing: f64,
        origin: (f64, f64),
        u: (f64, f64),
        v: (f64, f64),
    ) -> Vec<GlyphContour>;
}

#[derive(thiserror::Error, Debug)]
#[error("could not locate linked file {relative:?}")]
pub struct PathLocatorError {
    pub relative: String,
}

/// Resolves a `GroupKind::Linked` group's relative path to an absolute one
/// the `FileSink` can then load, the hook the original calls at load time
/// to ask the host where a linked assembly actually lives on disk.
pub trait PathLocator {
    fn locate(&self, relative: &str) -> Result<PathBuf, PathLocatorError>;
}
