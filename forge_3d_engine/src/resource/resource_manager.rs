/// Central resource manager for the engine.
///
/// Creates and destroys GPU buffers and images, uploads data through staging
/// buffers and runs one-shot transfer work with `immediate_submit`, which
/// blocks until the GPU has finished.

use crate::error::{Error, Result};
use crate::graphics_device::{
    BlitRegion, Buffer, BufferCopy, BufferDesc, BufferUsage, CommandBuffer, CommandPool, Extent2D,
    Extent3D, Fence, Format, GraphicsDevice, Image, ImageBarrier, ImageDesc, ImageLayout,
    ImageUsage, ImageView, MemoryLocation, SubmitInfo,
};
use crate::resource::{GpuMeshBuffers, Vertex};
use crate::{engine_debug, engine_error};

/// A buffer together with what it was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedBuffer {
    pub buffer: Buffer,
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

/// An image, its full view and what it was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedImage {
    pub image: Image,
    pub view: ImageView,
    pub extent: Extent3D,
    pub format: Format,
    pub mip_levels: u32,
}

/// Number of levels in a full mip chain for `extent`
pub fn mip_level_count(extent: Extent2D) -> u32 {
    let largest = extent.width.max(extent.height).max(1);
    32 - largest.leading_zeros()
}

/// Record a blit chain filling every mip level from level 0
///
/// Expects the whole image in `TransferDst`; leaves it in `ShaderReadOnly`.
pub fn generate_mipmaps(
    device: &dyn GraphicsDevice,
    cmd: CommandBuffer,
    image: Image,
    extent: Extent2D,
    mip_levels: u32,
) {
    let mut size = extent;
    for mip in 0..mip_levels {
        let half = Extent2D::new((size.width / 2).max(1), (size.height / 2).max(1));

        device.cmd_transition_image(
            cmd,
            &ImageBarrier::level(image, mip, ImageLayout::TransferDst, ImageLayout::TransferSrc),
        );

        if mip + 1 < mip_levels {
            device.cmd_blit_image(
                cmd,
                &BlitRegion {
                    src: image,
                    src_mip: mip,
                    src_extent: size,
                    dst: image,
                    dst_mip: mip + 1,
                    dst_extent: half,
                },
            );
        }
        size = half;
    }

    device.cmd_transition_image(
        cmd,
        &ImageBarrier::whole(image, ImageLayout::TransferSrc, ImageLayout::ShaderReadOnly),
    );
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceManager {
    immediate_pool: CommandPool,
    immediate_cmd: CommandBuffer,
    immediate_fence: Fence,
    immediate_timeout_ns: u64,
}

impl ResourceManager {
    /// Create the immediate-submission command buffer and fence
    pub fn new(device: &dyn GraphicsDevice, immediate_timeout_ns: u64) -> Result<Self> {
        let immediate_pool = device.create_command_pool()?;
        let immediate_cmd = device.allocate_command_buffer(immediate_pool)?;
        let immediate_fence = device.create_fence(true)?;
        Ok(Self {
            immediate_pool,
            immediate_cmd,
            immediate_fence,
            immediate_timeout_ns,
        })
    }

    /// Record commands with `record` and run them on the GPU, blocking until done
    ///
    /// # Errors
    ///
    /// Recording or submission failure, or the fence not signaling in time.
    pub fn immediate_submit<F>(&self, device: &dyn GraphicsDevice, record: F) -> Result<()>
    where
        F: FnOnce(&dyn GraphicsDevice, CommandBuffer),
    {
        device.reset_fence(self.immediate_fence)?;
        device.reset_command_buffer(self.immediate_cmd)?;
        device.begin_command_buffer(self.immediate_cmd)?;

        record(device, self.immediate_cmd);

        device.end_command_buffer(self.immediate_cmd)?;
        device.submit(&SubmitInfo {
            command_buffer: self.immediate_cmd,
            wait: None,
            signal: None,
            fence: Some(self.immediate_fence),
        })?;
        device
            .wait_for_fence(self.immediate_fence, self.immediate_timeout_ns)
            .map_err(|e| {
                engine_error!("forge3d::ResourceManager", "Immediate submission did not complete: {}", e);
                e
            })
    }

    /// Whether resources used by a failed immediate submission can be released
    ///
    /// A timed-out fence means the work may still be running: the device is
    /// drained first, and if that fails too the resources must be leaked.
    fn can_release_after(&self, device: &dyn GraphicsDevice, error: &Error) -> bool {
        if !matches!(error, Error::Timeout(_)) {
            return true;
        }
        match device.wait_idle() {
            Ok(()) => true,
            Err(e) => {
                engine_error!(
                    "forge3d::ResourceManager",
                    "Device did not go idle after a timed-out transfer ({}), leaking its resources", e
                );
                false
            }
        }
    }

    // ===== BUFFERS =====

    pub fn create_buffer(
        &self,
        device: &dyn GraphicsDevice,
        size: u64,
        usage: BufferUsage,
        location: MemoryLocation,
    ) -> Result<AllocatedBuffer> {
        let buffer = device.create_buffer(&BufferDesc { size, usage, location })?;
        Ok(AllocatedBuffer { buffer, size, usage, location })
    }

    pub fn destroy_buffer(&self, device: &dyn GraphicsDevice, buffer: &AllocatedBuffer) {
        device.destroy_buffer(buffer.buffer);
    }

    // ===== IMAGES =====

    /// Create an image; `mipmapped` reserves a full mip chain
    pub fn create_image(
        &self,
        device: &dyn GraphicsDevice,
        extent: Extent3D,
        format: Format,
        usage: ImageUsage,
        mipmapped: bool,
    ) -> Result<AllocatedImage> {
        let mip_levels = if mipmapped { mip_level_count(extent.to_2d()) } else { 1 };
        let (image, view) = device.create_image(&ImageDesc { format, extent, usage, mip_levels })?;
        Ok(AllocatedImage { image, view, extent, format, mip_levels })
    }

    /// Create an image filled with `data` (tightly packed texels of `format`)
    ///
    /// The image ends in `ShaderReadOnly`, with every mip level generated when
    /// `mipmapped` is set.
    pub fn create_image_with_data(
        &self,
        device: &dyn GraphicsDevice,
        data: &[u8],
        extent: Extent3D,
        format: Format,
        usage: ImageUsage,
        mipmapped: bool,
    ) -> Result<AllocatedImage> {
        let data_size =
            extent.width as u64 * extent.height as u64 * extent.depth.max(1) as u64 * format.texel_size();
        if data.len() as u64 != data_size {
            return Err(Error::InvalidResource(format!(
                "image data is {} bytes, a {}x{}x{} {:?} image needs {}",
                data.len(), extent.width, extent.height, extent.depth.max(1), format, data_size
            )));
        }
        let staging = self.create_buffer(device, data_size, BufferUsage::TRANSFER_SRC, MemoryLocation::CpuToGpu)?;
        let upload = device.write_buffer(staging.buffer, 0, data);
        if let Err(e) = upload {
            self.destroy_buffer(device, &staging);
            return Err(e);
        }

        let image = match self.create_image(
            device,
            extent,
            format,
            usage | ImageUsage::TRANSFER_DST | ImageUsage::TRANSFER_SRC,
            mipmapped,
        ) {
            Ok(image) => image,
            Err(e) => {
                self.destroy_buffer(device, &staging);
                return Err(e);
            }
        };

        let submitted = self.immediate_submit(device, |device, cmd| {
            device.cmd_transition_image(
                cmd,
                &ImageBarrier::whole(image.image, ImageLayout::Undefined, ImageLayout::TransferDst),
            );
            device.cmd_copy_buffer_to_image(cmd, staging.buffer, image.image, extent);
            if mipmapped {
                generate_mipmaps(device, cmd, image.image, extent.to_2d(), image.mip_levels);
            } else {
                device.cmd_transition_image(
                    cmd,
                    &ImageBarrier::whole(image.image, ImageLayout::TransferDst, ImageLayout::ShaderReadOnly),
                );
            }
        });

        if let Err(e) = submitted {
            if self.can_release_after(device, &e) {
                self.destroy_buffer(device, &staging);
                self.destroy_image(device, &image);
            }
            return Err(e);
        }
        self.destroy_buffer(device, &staging);
        Ok(image)
    }

    pub fn destroy_image(&self, device: &dyn GraphicsDevice, image: &AllocatedImage) {
        device.destroy_image(image.image, image.view);
    }

    // ===== MESHES =====

    /// Upload indices and vertices into GPU-only buffers through one staging buffer
    pub fn upload_mesh(
        &self,
        device: &dyn GraphicsDevice,
        indices: &[u32],
        vertices: &[Vertex],
    ) -> Result<GpuMeshBuffers> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let vertex_size = vertex_bytes.len() as u64;
        let index_size = index_bytes.len() as u64;

        let vertex_buffer = self.create_buffer(
            device,
            vertex_size,
            BufferUsage::STORAGE | BufferUsage::TRANSFER_DST | BufferUsage::DEVICE_ADDRESS,
            MemoryLocation::GpuOnly,
        )?;
        let vertex_buffer_address = device.buffer_device_address(vertex_buffer.buffer);

        let index_buffer = match self.create_buffer(
            device,
            index_size,
            BufferUsage::INDEX | BufferUsage::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.destroy_buffer(device, &vertex_buffer);
                return Err(e);
            }
        };
        let mesh = GpuMeshBuffers { index_buffer, vertex_buffer, vertex_buffer_address };

        let staging = match self.create_buffer(
            device,
            vertex_size + index_size,
            BufferUsage::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.destroy_mesh(device, &mesh);
                return Err(e);
            }
        };

        let uploaded = self.upload_through_staging(device, &staging, vertex_bytes, index_bytes, &mesh);
        if let Err(e) = uploaded {
            if self.can_release_after(device, &e) {
                self.destroy_buffer(device, &staging);
                self.destroy_mesh(device, &mesh);
            }
            return Err(e);
        }
        self.destroy_buffer(device, &staging);

        engine_debug!(
            "forge3d::ResourceManager",
            "Uploaded mesh: {} vertices, {} indices", vertices.len(), indices.len()
        );
        Ok(mesh)
    }

    fn upload_through_staging(
        &self,
        device: &dyn GraphicsDevice,
        staging: &AllocatedBuffer,
        vertex_bytes: &[u8],
        index_bytes: &[u8],
        mesh: &GpuMeshBuffers,
    ) -> Result<()> {
        let vertex_size = vertex_bytes.len() as u64;
        let index_size = index_bytes.len() as u64;
        device
            .write_buffer(staging.buffer, 0, vertex_bytes)
            .and_then(|_| device.write_buffer(staging.buffer, vertex_size, index_bytes))
            .and_then(|_| {
                self.immediate_submit(device, |device, cmd| {
                    device.cmd_copy_buffer(
                        cmd,
                        staging.buffer,
                        mesh.vertex_buffer.buffer,
                        &[BufferCopy { src_offset: 0, dst_offset: 0, size: vertex_size }],
                    );
                    device.cmd_copy_buffer(
                        cmd,
                        staging.buffer,
                        mesh.index_buffer.buffer,
                        &[BufferCopy { src_offset: vertex_size, dst_offset: 0, size: index_size }],
                    );
                })
            })
    }

    pub fn destroy_mesh(&self, device: &dyn GraphicsDevice, mesh: &GpuMeshBuffers) {
        self.destroy_buffer(device, &mesh.index_buffer);
        self.destroy_buffer(device, &mesh.vertex_buffer);
    }

    /// Release the immediate-submission objects
    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        device.destroy_fence(self.immediate_fence);
        device.destroy_command_pool(self.immediate_pool);
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
