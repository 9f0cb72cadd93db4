use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vcad_kernel_math::{Point3, Transform, Vec2, Vec3};
use vcad_kernel_scene::{Mesh, Object, ObjectData, Scene, View3d};
use vcad_kernel_snap::{SnapMode, SnapObjectContext, SnapObjectParams, RAY_DEPTH_MAX};

const GRID: usize = 200;

/// A GRID x GRID quad grid spanning [-1, 1] in x and y.
fn grid_scene() -> Scene {
    let step = 2.0 / GRID as f64;
    let mut positions = Vec::with_capacity((GRID + 1) * (GRID + 1));
    for j in 0..=GRID {
        for i in 0..=GRID {
            let z = 0.05 * ((i as f64) * 0.3).sin() * ((j as f64) * 0.2).cos();
            positions.push(Point3::new(-1.0 + i as f64 * step, -1.0 + j as f64 * step, z));
        }
    }
    let row = GRID + 1;
    let polygons: Vec<Vec<usize>> = (0..GRID)
        .flat_map(|j| (0..GRID).map(move |i| (i, j)))
        .map(|(i, j)| {
            let a = j * row + i;
            vec![a, a + 1, a + row + 1, a + row]
        })
        .collect();

    let mut scene = Scene::new();
    let mesh = scene.add_mesh(Mesh::from_polygons(positions, &polygons, &[]).unwrap());
    scene.add_object(Object::new("grid", ObjectData::Mesh(mesh), Transform::identity()));
    scene
}

pub fn criterion_benchmark(crit: &mut Criterion) {
    let scene = grid_scene();
    let view = View3d::orthographic(Transform::identity(), 1.2, Vec2::new(800.0, 800.0), 100.0).unwrap();
    let params = SnapObjectParams::default();
    let mut ctx = SnapObjectContext::new_view3d(view);

    crit.bench_function("vertex snap 200x200 grid", |bench| {
        bench.iter(|| {
            let mut dist_px = 15.0;
            let mut ray_depth = RAY_DEPTH_MAX;
            ctx.project_view3d(
                black_box(&scene),
                SnapMode::Vertex,
                &params,
                black_box(&Vec2::new(413.0, 377.0)),
                &mut dist_px,
                &mut ray_depth,
            )
        })
    });

    crit.bench_function("ray cast 200x200 grid", |bench| {
        bench.iter(|| {
            let mut ray_depth = RAY_DEPTH_MAX;
            ctx.project_ray(
                black_box(&scene),
                &params,
                black_box(&Point3::new(0.137, -0.291, 5.0)),
                &-Vec3::z(),
                &mut ray_depth,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
