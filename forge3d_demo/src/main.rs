//! Forge3D demo
//!
//! Opens a window, renders the compute background and a spinning cube.
//! WASD moves the camera, right mouse button looks around, Escape quits.

mod winit_window;

use std::sync::Arc;

use forge_3d_engine::engine_error;
use forge_3d_engine::engine_info;
use forge_3d_engine::forge3d::material::{MaterialConstants, MaterialPass};
use forge_3d_engine::forge3d::resource::{Bounds, GeoSurface, MeshAsset, Vertex};
use forge_3d_engine::forge3d::scene::{LoadedScene, MaterialTextures};
use forge_3d_engine::forge3d::{Engine, EngineConfig, Result};
use forge_3d_engine::glam::{Mat4, Quat, Vec3, Vec4};
use forge_3d_engine_renderer_vulkan::VulkanDevice;

use crate::winit_window::WinitWindowSource;

const CUBE_SCENE: &str = "cube";
const CUBE_NODE: &str = "cube";

/// Unit cube, one quad (4 vertices) per face so every face gets its own normal
fn cube_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let faces = [
        (Vec3::X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up) in faces {
        let right = up.cross(normal);
        let base = vertices.len() as u32;
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let position = (normal + right * (u * 2.0 - 1.0) + up * (v * 2.0 - 1.0)) * 0.5;
            vertices.push(Vertex {
                position,
                uv_x: u,
                normal,
                uv_y: v,
                color: (normal.abs() * 0.5 + Vec3::splat(0.5)).extend(1.0),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

fn build_cube_scene(engine: &Engine) -> Result<LoadedScene> {
    let device = engine.device().clone();
    let defaults = *engine.default_resources();
    let mut builder = engine.scene_builder(CUBE_SCENE, 1)?;

    let textures = MaterialTextures {
        color_image: defaults.white_image,
        color_sampler: defaults.sampler_linear,
        metal_rough_image: defaults.white_image,
        metal_rough_sampler: defaults.sampler_linear,
    };
    let constants = MaterialConstants {
        color_factors: Vec4::ONE,
        metal_rough_factors: Vec4::new(1.0, 0.5, 0.0, 0.0),
        ..MaterialConstants::default()
    };
    let material = builder.add_material(
        &*device,
        "cube",
        engine.metallic_roughness(),
        MaterialPass::MainColor,
        &constants,
        &textures,
    )?;

    let (vertices, indices) = cube_geometry();
    let mesh_buffers = engine.resources().upload_mesh(&*device, &indices, &vertices)?;
    let mesh = builder.add_mesh(MeshAsset {
        name: "cube".to_string(),
        surfaces: vec![GeoSurface {
            start_index: 0,
            count: indices.len() as u32,
            bounds: Bounds::from_positions(vertices.iter().map(|v| v.position)),
            material,
        }],
        mesh_buffers,
    })?;

    builder.add_node(Some(CUBE_NODE), None, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)), Some(mesh))?;
    Ok(builder.build())
}

fn run() -> Result<()> {
    let config = EngineConfig {
        app_name: "Forge3D Demo".to_string(),
        ..EngineConfig::default()
    };

    let mut window = WinitWindowSource::new(&config.app_name, config.width, config.height)?;
    let device = VulkanDevice::new(window.window()?, &config)?;
    let mut engine = Engine::init(Arc::new(device), config)?;

    let scene = build_cube_scene(&engine)?;
    engine.load_scene(scene)?;

    let mut angle = 0.0f32;
    engine.set_update_hook(move |engine, dt| {
        angle = (angle + dt * 0.8) % std::f32::consts::TAU;
        let transform = Mat4::from_rotation_translation(
            Quat::from_rotation_y(angle) * Quat::from_rotation_x(angle * 0.5),
            Vec3::new(0.0, 0.0, -3.0),
        );
        if let Some(scene) = engine.loaded_scene_mut(CUBE_SCENE) {
            if let Some(node) = scene.node_by_name(CUBE_NODE) {
                if let Err(e) = scene.set_node_transform(node, transform) {
                    engine_error!("forge3d::demo", "Failed to move cube: {}", e);
                }
            }
        }
    });

    engine_info!("forge3d::demo", "Entering frame loop");
    let result = engine.run(&mut window);
    engine.shutdown();

    let stats = engine.stats();
    engine_info!(
        "forge3d::demo",
        "Exited after {} frames (last frame {:.2} ms, {} draws)",
        engine.frame_count(), stats.frame_time_ms, stats.drawcall_count
    );
    result
}

fn main() {
    if let Err(e) = run() {
        engine_error!("forge3d::demo", "Fatal: {}", e);
        std::process::exit(1);
    }
}
