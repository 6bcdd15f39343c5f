use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use anyhow::{Context, Result};
use flowfield_sim::{GridMapping, SimError, StateStore, Texel};

/// Texel format of every state surface: `(x, y, z, aux)` as 32-bit floats.
///
/// Not filterable; every read goes through `textureLoad` on an exact texel.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

const TEXEL_BYTES: u32 = std::mem::size_of::<Texel>() as u32;

struct StateSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl StateSurface {
    fn new(device: &wgpu::Device, size: u32, label: &str, usage: wgpu::TextureUsages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    fn upload(&self, queue: &wgpu::Queue, size: u32, texels: &[Texel]) {
        debug_assert_eq!(texels.len(), (size as usize) * (size as usize));
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * TEXEL_BYTES),
                rows_per_image: Some(size),
            },
            extent(size),
        );
    }
}

fn extent(size: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size,
        height: size,
        depth_or_array_layers: 1,
    }
}

/// GPU mirror of [`StateStore`]: two ping-pong state textures plus the
/// immutable seed texture, all `grid.size()²` texels.
///
/// Exactly one surface is "current" (readable) at a time; the integration
/// pass renders into the other and then calls [`swap`](Self::swap).
pub struct GpuStateStore {
    grid: GridMapping,
    surfaces: [StateSurface; 2],
    base: StateSurface,
    front: usize,
    generation: u64,
}

impl GpuStateStore {
    /// Allocates the textures and uploads `store`'s seed and current surfaces.
    ///
    /// Fails when the grid does not fit the device's 2D texture limit.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, store: &StateStore) -> Result<Self> {
        let grid = store.grid();
        let max = device.limits().max_texture_dimension_2d;
        if grid.size() > max {
            return Err(SimError::GridTooLarge { size: grid.size(), max }.into());
        }

        let state_usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC;
        let base_usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;

        let this = Self {
            grid,
            surfaces: [
                StateSurface::new(device, grid.size(), "flowfield state A", state_usage),
                StateSurface::new(device, grid.size(), "flowfield state B", state_usage),
            ],
            base: StateSurface::new(device, grid.size(), "flowfield state base", base_usage),
            front: 0,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        };

        this.base.upload(queue, grid.size(), store.base_surface());
        this.surfaces[0].upload(queue, grid.size(), store.current_surface());

        log::info!(
            "gpu state store: {} particles, {}x{} {:?} x3",
            grid.count(),
            grid.size(),
            grid.size(),
            STATE_FORMAT
        );

        Ok(this)
    }

    #[inline]
    pub fn grid(&self) -> GridMapping {
        self.grid
    }

    /// Index (0 or 1) of the readable surface.
    #[inline]
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// Identifies this allocation; bind groups built against another store
    /// must be rebuilt.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn view(&self, index: usize) -> &wgpu::TextureView {
        &self.surfaces[index & 1].view
    }

    /// The readable surface: the last completed step, or the seed.
    #[inline]
    pub fn current_view(&self) -> &wgpu::TextureView {
        self.view(self.front)
    }

    /// The surface the next step writes into.
    #[inline]
    pub fn next_view(&self) -> &wgpu::TextureView {
        self.view(self.front ^ 1)
    }

    #[inline]
    pub fn base_view(&self) -> &wgpu::TextureView {
        &self.base.view
    }

    /// Publishes the surface just written as the readable one.
    #[inline]
    pub fn swap(&mut self) {
        self.front ^= 1;
    }

    /// Replaces the readable surface with `store`'s current surface.
    ///
    /// After `store.reset()` this restores the seed.
    pub fn upload_current(&mut self, queue: &wgpu::Queue, store: &StateStore) {
        debug_assert_eq!(store.grid(), self.grid);
        self.front = 0;
        self.surfaces[0].upload(queue, self.grid.size(), store.current_surface());
    }

    /// Copies the readable surface back to the CPU in texel order, padding
    /// included.
    ///
    /// Submits its own copy and blocks until the GPU has drained the queue.
    pub fn read_current(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Texel>> {
        let size = self.grid.size();
        let row_bytes = size * TEXEL_BYTES;
        let padded_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flowfield state readback"),
            size: u64::from(padded_row) * u64::from(size),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("flowfield state readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.surfaces[self.front].texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size),
                },
            },
            extent(size),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("waiting for state readback")?;
        rx.recv()
            .context("state readback was dropped")?
            .context("failed to map state readback")?;

        let mut texels = Vec::with_capacity(self.grid.cell_count());
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded_row as usize) {
                texels.extend_from_slice(bytemuck::cast_slice(&row[..row_bytes as usize]));
            }
        }
        staging.unmap();
        Ok(texels)
    }
}
