/// GPU textures keyed by asset key, each with its ready-to-bind group
use std::sync::Arc;

use wgpu::{BindGroup, BindGroupLayout, Device, Queue, Sampler};

use super::shaders::create_texture_bind_group_layout;
use crate::{
    SkydomeResult,
    assets::{DecodedImage, ResourceCache, TextureSource, decode_texture},
};

pub const DEFAULT_TEXTURE_KEY: &str = "default_white";

pub struct TextureAsset {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: BindGroup,
    pub width: u32,
    pub height: u32,
}

pub struct TextureManager {
    layout: BindGroupLayout,
    sampler: Sampler,
    textures: ResourceCache<TextureAsset>,
    default_texture: Arc<TextureAsset>,
}

impl TextureManager {
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let layout = create_texture_bind_group_layout(device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sky Texture Sampler"),
            // Spheres wrap around in u
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white = DecodedImage {
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        };
        let default_texture = Arc::new(upload_texture(
            device,
            queue,
            &layout,
            &sampler,
            DEFAULT_TEXTURE_KEY,
            &white,
        ));

        Self {
            layout,
            sampler,
            textures: ResourceCache::new(),
            default_texture,
        }
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    /// Decode and upload the texture for `key`, once per key
    pub fn load(
        &mut self,
        device: &Device,
        queue: &Queue,
        key: &str,
        source: &dyn TextureSource,
    ) -> SkydomeResult<Arc<TextureAsset>> {
        let layout = &self.layout;
        let sampler = &self.sampler;
        self.textures.get_or_try_insert_with(key, || {
            let bytes = source.load(key)?;
            let image = decode_texture(key, &bytes)?;
            log::debug!("Uploading texture {} ({}x{})", key, image.width, image.height);
            Ok(upload_texture(device, queue, layout, sampler, key, &image))
        })
    }

    /// Like `load`, but a failure is logged and the white texture stands in
    pub fn load_or_default(
        &mut self,
        device: &Device,
        queue: &Queue,
        key: &str,
        source: &dyn TextureSource,
    ) -> Arc<TextureAsset> {
        match self.load(device, queue, key, source) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("Texture {} unavailable, using default: {}", key, e);
                Arc::clone(&self.default_texture)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<TextureAsset>> {
        self.textures.get(key)
    }

    pub fn default_texture(&self) -> &TextureAsset {
        &self.default_texture
    }

    /// Bind group for `key`, or the default white texture if it never loaded
    pub fn bind_group(&self, key: &str) -> &BindGroup {
        match self.textures.peek(key) {
            Some(texture) => &texture.bind_group,
            None => &self.default_texture.bind_group,
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn release(&mut self) {
        let released = self.textures.release();
        log::info!("Released {} textures", released);
    }
}

fn upload_texture(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &Sampler,
    label: &str,
    image: &DecodedImage,
) -> TextureAsset {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    TextureAsset {
        texture,
        view,
        bind_group,
        width: image.width,
        height: image.height,
    }
}
