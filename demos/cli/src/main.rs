//! Toy driver: builds a small sketch by hand, solves and regenerates it,
//! then hands the result to minimal stand-ins for the engine's external
//! collaborator traits. No GUI, no file format — just enough to prove the
//! pipeline runs end to end.

use std::collections::HashMap;

use anyhow::Result;
use kernel::regen::{regenerate_all, GroupMeshes};
use kernel::solver::{solve, SolverConfig};
use kernel::sketch::handle::offset;
use kernel::sketch::{
    Constraint, ConstraintKind, CopyRange, Entity, EntityKind, Group, GroupKind, HEntity, HGroup, HParam, HRequest,
    Param, Request, RequestKind, Sketch, HGROUP_REFERENCES, HREQUEST_REFERENCE_XY,
};
use kernel::{FileSink, FileSinkError, FontSource, GlyphContour, Mesh, PathLocator, PathLocatorError, RenderSink};

/// Prints whatever the pipeline hands it, instead of shading a viewport.
struct StdoutSink;

impl RenderSink for StdoutSink {
    fn running_mesh(&mut self, group: HGroup, mesh: &Mesh) {
        let bbox = mesh.bbox();
        println!(
            "group {:?}: {} triangles, {} vertices, bbox {:?}..{:?}",
            group,
            mesh.triangles.len(),
            mesh.vertices.len(),
            bbox.min,
            bbox.max
        );
    }

    fn entities(&mut self, entities: &[Entity]) {
        println!("{} entities", entities.len());
    }

    fn constraints(&mut self, constraints: &[Constraint]) {
        println!("{} constraints", constraints.len());
    }
}

/// Keeps the serialised sketch in memory instead of touching disk; a real
/// host would swap this for one backed by its own save format.
#[derive(Default)]
struct MemoryFileSink {
    buffer: Option<String>,
}

impl FileSink for MemoryFileSink {
    fn save(&mut self, sketch: &Sketch) -> Result<(), FileSinkError> {
        self.buffer = Some(format!(
            "params={} entities={} requests={} constraints={} groups={}",
            sketch.params.iter().count(),
            sketch.entities.iter().count(),
            sketch.requests.iter().count(),
            sketch.constraints.iter().count(),
            sketch.groups.iter().count(),
        ));
        Ok(())
    }

    fn load(&mut self) -> Result<Sketch, FileSinkError> {
        match &self.buffer {
            Some(_) => Ok(Sketch::new()),
            None => Err(FileSinkError::Malformed("nothing saved yet".into())),
        }
    }
}

/// No actual font backend; returns a single degenerate "glyph" per call so
/// callers can see the shape of the interface without pulling in a font
/// rasterizer dependency.
struct NoFontSource;

impl FontSource for NoFontSource {
    fn plot_string(
        &self,
        _font_name: &str,
        text: &str,
        spacing: f64,
        origin: (f64, f64),
        _u: (f64, f64),
        _v: (f64, f64),
    ) -> Vec<GlyphContour> {
        text.chars()
            .enumerate()
            .map(|(i, _)| GlyphContour { control_points: vec![(origin.0 + spacing * i as f64, origin.1)] })
            .collect()
    }
}

/// Resolves every linked-file path to itself; there is no filesystem root
/// to resolve against in this toy driver.
struct IdentityLocator;

impl PathLocator for IdentityLocator {
    fn locate(&self, relative: &str) -> Result<std::path::PathBuf, PathLocatorError> {
        Ok(std::path::PathBuf::from(relative))
    }
}

fn xy_workplane() -> HEntity {
    HEntity::of_request(HREQUEST_REFERENCE_XY, offset::PRIMARY_ENTITY)
}

/// Two free 3D points pinned apart by a distance constraint, purely to show
/// the solver converging; unrelated to the mesh built below.
fn run_solver_demo() -> Result<()> {
    let mut sk = Sketch::new();
    let g = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::Drawing3d));
    sk.active_group = g;

    let mut make_point = |sk: &mut Sketch| -> Result<HEntity> {
        let req = sk.requests.add_and_assign_id(|id| Request::new(id, g, RequestKind::DatumPoint, HEntity::NONE));
        let (entities, params) = sk.requests.get(req).unwrap().generate()?;
        let point = entities[0].id;
        for p in params {
            sk.params.insert(p.id, p);
        }
        for e in entities {
            sk.entities.insert(e.id, e);
        }
        Ok(point)
    };

    let p0 = make_point(&mut sk)?;
    let p1 = make_point(&mut sk)?;

    let p0_params = match sk.entities.get(p0).unwrap().kind {
        EntityKind::Point3d { params } => params,
        _ => unreachable!(),
    };
    for &p in &p0_params {
        sk.params.get_mut(p).unwrap().force_to(0.0);
    }
    let p1_params = match sk.entities.get(p1).unwrap().kind {
        EntityKind::Point3d { params } => params,
        _ => unreachable!(),
    };
    sk.params.get_mut(p1_params[0]).unwrap().val = 3.0;
    sk.params.get_mut(p1_params[1]).unwrap().val = 4.0;
    sk.params.get_mut(p1_params[2]).unwrap().val = 0.0;

    let val_a = sk.params.add_and_assign_id(|id| Param::new(id, g, 10.0));
    sk.constraints.add_and_assign_id(|id| Constraint {
        id,
        group: g,
        workplane: HEntity::NONE,
        kind: ConstraintKind::PtPtDistance { a: p0, b: p1, val_a },
    });

    let status = solve(&mut sk, g, &SolverConfig::default());
    tracing::info!(?status, "solver demo converged");
    Ok(())
}

/// A unit square extruded into a box, driven through the full regeneration
/// pipeline and handed to [`StdoutSink`].
fn run_mesh_demo() -> Result<()> {
    let mut sk = Sketch::new();
    let xy = xy_workplane();
    let mut caches: HashMap<HGroup, GroupMeshes> = HashMap::new();

    let profile = sk.groups.add_and_assign_id(|id| Group::new(id, HGROUP_REFERENCES, GroupKind::DrawingWorkplane { workplane: xy }));
    let corners = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
    let mut point_ids = [HEntity::NONE; 4];
    for (i, &(u, v)) in corners.iter().enumerate() {
        let pid = HEntity::of_group(profile, i as u32);
        let up = HParam::of_group(profile, (2 * i) as u32);
        let vp = HParam::of_group(profile, (2 * i + 1) as u32);
        sk.params.insert(up, Param::new(up, profile, u));
        sk.params.insert(vp, Param::new(vp, profile, v));
        sk.entities.insert(
            pid,
            Entity {
                id: pid,
                group: profile,
                request: HRequest::NONE,
                workplane: xy,
                construction: false,
                kind: EntityKind::Point2d { workplane: xy, params: [up, vp] },
            },
        );
        point_ids[i] = pid;
    }
    for i in 0..4 {
        let seg_id = HEntity::of_group(profile, 8 + i as u32);
        sk.entities.insert(
            seg_id,
            Entity {
                id: seg_id,
                group: profile,
                request: HRequest::NONE,
                workplane: xy,
                construction: false,
                kind: EntityKind::LineSegment { point0: point_ids[i], point1: point_ids[(i + 1) % 4] },
            },
        );
    }
    sk.groups.get_mut(profile).unwrap().dirty = false;
    caches.insert(profile, GroupMeshes::default());

    let extrude = sk.groups.add_and_assign_id(|id| {
        Group::new(id, profile, GroupKind::Extrude { source: profile, direction: [HParam::NONE; 3], range: CopyRange::OneSided })
    });
    let dx = HParam::of_group(extrude, 0);
    let dy = HParam::of_group(extrude, 1);
    let dz = HParam::of_group(extrude, 2);
    sk.params.insert(dx, Param::new(dx, extrude, 0.0));
    sk.params.insert(dy, Param::new(dy, extrude, 0.0));
    sk.params.insert(dz, Param::new(dz, extrude, 2.0));
    if let GroupKind::Extrude { direction, .. } = &mut sk.groups.get_mut(extrude).unwrap().kind {
        *direction = [dx, dy, dz];
    }

    regenerate_all(&mut sk, &SolverConfig::default(), &mut caches)?;

    let mut sink = StdoutSink;
    let mesh = &caches.get(&extrude).unwrap().running_mesh;
    sink.running_mesh(extrude, mesh);
    let entities: Vec<Entity> = sk.entities.iter().cloned().collect();
    sink.entities(&entities);
    let constraints: Vec<Constraint> = sk.constraints.iter().cloned().collect();
    sink.constraints(&constraints);

    let mut file_sink = MemoryFileSink::default();
    file_sink.save(&sk)?;
    println!("saved: {:?}", file_sink.buffer);

    let font = NoFontSource;
    let glyphs = font.plot_string("demo-sans", "hi", 1.0, (0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
    println!("{} glyph outlines", glyphs.len());

    let locator = IdentityLocator;
    println!("locate(foo.kernel) -> {:?}", locator.locate("foo.kernel")?);

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run_solver_demo()?;
    run_mesh_demo()?;
    Ok(())
}
