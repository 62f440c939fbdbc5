/// A scene produced by the loader: its graph plus every GPU resource it owns.
///
/// The loader fills a `LoadedSceneBuilder` (images, samplers, materials,
/// meshes, nodes) and calls `build`. The engine then only needs `draw` each
/// frame and `destroy` once the GPU is idle.

use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::descriptor::DescriptorAllocatorGrowable;
use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferUsage, DescriptorType, GraphicsDevice, MemoryLocation, PoolSizeRatio, Sampler,
};
use crate::material::{GltfMetallicRoughness, MaterialConstants, MaterialInstance, MaterialPass, MaterialResources};
use crate::resource::{AllocatedBuffer, AllocatedImage, MeshAsset, ResourceManager};
use crate::scene::{DrawContext, MaterialKey, MeshKey, NodeKey, NodeKind, SceneGraph};
use crate::{engine_debug, engine_err, engine_info, engine_warn};

/// Descriptor mix of the per-scene material allocator
const SCENE_POOL_RATIOS: [PoolSizeRatio; 3] = [
    PoolSizeRatio { ty: DescriptorType::CombinedImageSampler, ratio: 3.0 },
    PoolSizeRatio { ty: DescriptorType::UniformBuffer, ratio: 3.0 },
    PoolSizeRatio { ty: DescriptorType::StorageBuffer, ratio: 1.0 },
];

/// Textures a metallic-roughness material samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialTextures {
    pub color_image: AllocatedImage,
    pub color_sampler: Sampler,
    pub metal_rough_image: AllocatedImage,
    pub metal_rough_sampler: Sampler,
}

pub struct LoadedScene {
    pub name: String,
    /// Matrix every node of the scene is drawn under
    pub transform: Mat4,
    graph: SceneGraph,
    meshes: SlotMap<MeshKey, MeshAsset>,
    materials: SlotMap<MaterialKey, MaterialInstance>,
    images: Vec<AllocatedImage>,
    samplers: Vec<Sampler>,
    node_names: FxHashMap<String, NodeKey>,
    mesh_names: FxHashMap<String, MeshKey>,
    material_names: FxHashMap<String, MaterialKey>,
    image_names: FxHashMap<String, usize>,
    descriptor_allocator: DescriptorAllocatorGrowable,
    material_buffer: AllocatedBuffer,
}

impl LoadedScene {
    /// Append this scene's render objects to `ctx`
    pub fn draw(&self, top_matrix: &Mat4, ctx: &mut DrawContext) {
        self.graph.draw(top_matrix, &self.meshes, &self.materials, ctx);
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_names.get(name).copied()
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&MeshAsset> {
        self.mesh_names.get(name).and_then(|&key| self.meshes.get(key))
    }

    pub fn material_by_name(&self, name: &str) -> Option<&MaterialInstance> {
        self.material_names.get(name).and_then(|&key| self.materials.get(key))
    }

    pub fn image_by_name(&self, name: &str) -> Option<&AllocatedImage> {
        self.image_names.get(name).and_then(|&index| self.images.get(index))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Move a node and everything under it
    pub fn set_node_transform(&mut self, key: NodeKey, local_transform: Mat4) -> Result<()> {
        self.graph.set_local_transform(key, local_transform)
    }

    /// Release every GPU resource the scene owns
    ///
    /// The caller guarantees the GPU no longer uses any of them.
    pub fn destroy(mut self, device: &dyn GraphicsDevice, resources: &ResourceManager) {
        self.descriptor_allocator.destroy_pools(device);
        resources.destroy_buffer(device, &self.material_buffer);
        for (_, mesh) in self.meshes.drain() {
            resources.destroy_mesh(device, &mesh.mesh_buffers);
        }
        for image in self.images.drain(..) {
            resources.destroy_image(device, &image);
        }
        for sampler in self.samplers.drain(..) {
            device.destroy_sampler(sampler);
        }
        engine_info!("forge3d::LoadedScene", "Scene '{}' destroyed", self.name);
    }
}

/// Warns when a builder goes away without `build` or `discard`
///
/// Its pools and buffers are then never released.
struct UnfinishedScene {
    name: String,
    armed: bool,
}

impl Drop for UnfinishedScene {
    fn drop(&mut self) {
        if self.armed {
            engine_warn!(
                "forge3d::LoadedScene",
                "Scene builder '{}' dropped without build or discard, its GPU resources leak", self.name
            );
        }
    }
}

/// Incremental construction of a `LoadedScene`
pub struct LoadedSceneBuilder {
    scene: LoadedScene,
    material_capacity: u32,
    unfinished: UnfinishedScene,
}

impl LoadedSceneBuilder {
    /// Start a scene able to hold `material_capacity` materials
    ///
    /// Creates the scene's descriptor allocator and its host-visible material
    /// constants buffer.
    pub fn new(
        device: &dyn GraphicsDevice,
        resources: &ResourceManager,
        name: &str,
        material_capacity: u32,
    ) -> Result<Self> {
        let material_capacity = material_capacity.max(1);
        let mut descriptor_allocator = DescriptorAllocatorGrowable::new();
        descriptor_allocator.init(device, material_capacity, &SCENE_POOL_RATIOS)?;

        let material_buffer = match resources.create_buffer(
            device,
            material_capacity as u64 * std::mem::size_of::<MaterialConstants>() as u64,
            BufferUsage::UNIFORM,
            MemoryLocation::CpuToGpu,
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                descriptor_allocator.destroy_pools(device);
                return Err(e);
            }
        };

        Ok(Self {
            scene: LoadedScene {
                name: name.to_string(),
                transform: Mat4::IDENTITY,
                graph: SceneGraph::new(),
                meshes: SlotMap::with_key(),
                materials: SlotMap::with_key(),
                images: Vec::new(),
                samplers: Vec::new(),
                node_names: FxHashMap::default(),
                mesh_names: FxHashMap::default(),
                material_names: FxHashMap::default(),
                image_names: FxHashMap::default(),
                descriptor_allocator,
                material_buffer,
            },
            material_capacity,
            unfinished: UnfinishedScene { name: name.to_string(), armed: true },
        })
    }

    pub fn transform(mut self, transform: Mat4) -> Self {
        self.scene.transform = transform;
        self
    }

    /// Hand an image over to the scene (destroyed with it)
    pub fn add_image(&mut self, name: &str, image: AllocatedImage) {
        self.scene.image_names.insert(name.to_string(), self.scene.images.len());
        self.scene.images.push(image);
    }

    /// Hand a sampler over to the scene (destroyed with it)
    pub fn add_sampler(&mut self, sampler: Sampler) {
        self.scene.samplers.push(sampler);
    }

    /// Store the material constants and write a material set for them
    pub fn add_material(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        family: &GltfMetallicRoughness,
        pass: MaterialPass,
        constants: &MaterialConstants,
        textures: &MaterialTextures,
    ) -> Result<MaterialKey> {
        let index = self.scene.materials.len() as u32;
        if index >= self.material_capacity {
            return Err(engine_err!(
                "forge3d::LoadedScene",
                "Scene '{}' holds at most {} materials", self.scene.name, self.material_capacity
            ));
        }

        let offset = index as u64 * std::mem::size_of::<MaterialConstants>() as u64;
        device.write_buffer(self.scene.material_buffer.buffer, offset, bytemuck::bytes_of(constants))?;

        let resources = MaterialResources {
            color_image: textures.color_image,
            color_sampler: textures.color_sampler,
            metal_rough_image: textures.metal_rough_image,
            metal_rough_sampler: textures.metal_rough_sampler,
            data_buffer: self.scene.material_buffer.buffer,
            data_buffer_offset: offset,
        };
        let instance = family.write_material(device, pass, &resources, &mut self.scene.descriptor_allocator)?;

        let key = self.scene.materials.insert(instance);
        self.scene.material_names.insert(name.to_string(), key);
        Ok(key)
    }

    /// Hand an uploaded mesh over to the scene
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if a surface references a material the scene
    /// does not hold.
    pub fn add_mesh(&mut self, mesh: MeshAsset) -> Result<MeshKey> {
        if let Some(surface) = mesh.surfaces.iter().find(|s| !self.scene.materials.contains_key(s.material)) {
            return Err(Error::InvalidResource(format!(
                "mesh '{}' surface at index {} uses an unknown material",
                mesh.name, surface.start_index
            )));
        }
        let name = mesh.name.clone();
        let key = self.scene.meshes.insert(mesh);
        self.scene.mesh_names.insert(name, key);
        Ok(key)
    }

    /// Add a node, optionally named, drawing `mesh` if given
    pub fn add_node(
        &mut self,
        name: Option<&str>,
        parent: Option<NodeKey>,
        local_transform: Mat4,
        mesh: Option<MeshKey>,
    ) -> Result<NodeKey> {
        let kind = match mesh {
            Some(mesh_key) if self.scene.meshes.contains_key(mesh_key) => NodeKind::Mesh(mesh_key),
            Some(_) => return Err(Error::InvalidResource("node references an unknown mesh".to_string())),
            None => NodeKind::Plain,
        };
        let key = self.scene.graph.add_node(parent, local_transform, kind)?;
        if let Some(name) = name {
            self.scene.node_names.insert(name.to_string(), key);
        }
        Ok(key)
    }

    /// Finish the scene, propagating every transform from the roots
    pub fn build(mut self) -> LoadedScene {
        self.unfinished.armed = false;
        self.scene.graph.refresh_all();
        engine_debug!(
            "forge3d::LoadedScene",
            "Scene '{}' built: {} nodes, {} meshes, {} materials",
            self.scene.name, self.scene.graph.len(), self.scene.meshes.len(), self.scene.materials.len()
        );
        self.scene
    }

    /// Abandon construction, releasing everything added so far
    pub fn discard(mut self, device: &dyn GraphicsDevice, resources: &ResourceManager) {
        self.unfinished.armed = false;
        self.scene.destroy(device, resources);
    }
}

#[cfg(test)]
#[path = "loaded_scene_tests.rs"]
mod tests;
