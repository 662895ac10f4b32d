/// Native host: owns the window and surface, drives the sky data and the scene renderer
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::Utc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    SkyConfig, SkydomeError, SkydomeResult,
    assets::FileTextureSource,
    catalog::{HorizonsClient, ObserverState},
    input::{InputAction, InputHandler},
    renderer::SceneRenderer,
    scene::SkyScene,
    sky::{RefreshTimer, SkyData, StarLoader},
};

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceState {
    fn new(window: Arc<Window>) -> SkydomeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| SkydomeError::Graphics(format!("Failed to create surface: {}", e)))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| SkydomeError::Graphics(format!("Failed to find GPU adapter: {}", e)))?;

        log::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Skydome Device"),
            ..Default::default()
        }))
        .map_err(|e| SkydomeError::Graphics(format!("Failed to create device: {}", e)))?;

        let size = window.inner_size();
        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or_else(|| {
                SkydomeError::Graphics("Surface is not supported by the adapter".to_string())
            })?;
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }
}

pub struct SkyApp {
    config: SkyConfig,
    window: Option<Arc<Window>>,
    surface: Option<SurfaceState>,
    renderer: SceneRenderer,
    scene: SkyScene,
    sky: SkyData,
    star_loader: Option<StarLoader>,
    input: InputHandler,
    textures: FileTextureSource,
    star_timer: RefreshTimer,
    planet_timer: RefreshTimer,
    last_frame_time: Instant,
}

impl SkyApp {
    pub fn new(config: SkyConfig) -> Result<Self> {
        let ephemeris = HorizonsClient::new(
            &config.ephemeris_url,
            Duration::from_secs(config.ephemeris_timeout_secs),
        )?;

        let scene = SkyScene::new();
        let sky = SkyData::new(&config, Arc::new(ephemeris), scene.clone());
        sky.publish_skybox();

        let star_loader = StarLoader::spawn(&config)?;

        Ok(Self {
            window: None,
            surface: None,
            renderer: SceneRenderer::new(&config),
            scene,
            sky,
            star_loader: Some(star_loader),
            input: InputHandler::new(),
            textures: FileTextureSource::new(&config.asset_dir),
            star_timer: RefreshTimer::new(Duration::from_secs(config.star_refresh_secs)),
            planet_timer: RefreshTimer::new(Duration::from_secs(config.planet_refresh_secs)),
            last_frame_time: Instant::now(),
            config,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn initialize(&mut self, window: Arc<Window>) -> SkydomeResult<()> {
        log::info!("Initializing sky view...");

        let surface = SurfaceState::new(Arc::clone(&window))?;
        self.renderer.on_surface_created(
            &surface.device,
            &surface.queue,
            surface.config.format,
            surface.config.width,
            surface.config.height,
            &self.textures,
        )?;

        self.surface = Some(surface);
        self.window = Some(window);
        self.last_frame_time = Instant::now();
        Ok(())
    }

    fn observer(&self) -> Option<ObserverState> {
        self.config
            .observer
            .map(|location| ObserverState::now(location.latitude_deg, location.longitude_deg))
    }

    fn update(&mut self, delta_time: f32) {
        if let Some(loader) = &mut self.star_loader {
            if let Some(result) = loader.try_take() {
                match result {
                    Ok(catalog) => {
                        let count = self.sky.set_star_catalog(catalog);
                        log::info!("Star catalog ready with {} stars", count);
                        self.star_timer =
                            RefreshTimer::new(Duration::from_secs(self.config.star_refresh_secs));
                    }
                    Err(e) => log::error!("Star catalog unavailable: {}", e),
                }
                self.star_loader = None;
            }
        }

        let now = Instant::now();
        let observer = self.observer();

        if self.star_timer.poll(now) {
            self.sky.update_star_positions(observer.as_ref());
        }
        if self.planet_timer.poll(now) {
            self.sky.update_planets_data(observer.as_ref());
        }
        self.sky.collect_planet_updates(Utc::now().date_naive());

        self.renderer.update(&self.scene, delta_time);
    }

    fn render(&mut self) -> SkydomeResult<()> {
        let Some(surface) = &mut self.surface else {
            return Ok(());
        };

        let frame = match surface.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.surface.configure(&surface.device, &surface.config);
                return Ok(());
            }
            Err(e) => {
                return Err(SkydomeError::Graphics(format!(
                    "Failed to get surface texture: {}",
                    e
                )));
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.renderer.on_draw_frame(&view, &self.scene)?;
        frame.present();
        Ok(())
    }

    fn apply_input(&mut self, action: InputAction) {
        match action {
            InputAction::Look { turn_deg, tilt_deg } => {
                let camera = self.renderer.camera_mut();
                camera.turn(turn_deg);
                camera.tilt(tilt_deg);
            }
            InputAction::Zoom(delta_deg) => self.renderer.camera_mut().zoom(delta_deg),
            InputAction::Pick { x, y } => {
                let Some(surface) = &self.surface else {
                    return;
                };
                let ray = self.renderer.camera().pick_ray(
                    x,
                    y,
                    surface.config.width,
                    surface.config.height,
                );
                match self.scene.pick(&ray) {
                    Some(hit) => log::info!("Picked {} at distance {:.3}", hit.name, hit.distance),
                    None => log::info!("Nothing under the cursor"),
                }
            }
        }
    }

    fn shutdown(&mut self) {
        if self.renderer.dispose() {
            log::info!("Shutting down sky view");
        }
        self.surface = None;
    }
}

impl ApplicationHandler for SkyApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("Skydome")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .with_min_inner_size(PhysicalSize::new(320, 240));

        match event_loop.create_window(window_attributes) {
            Ok(window) => {
                if let Err(e) = self.initialize(Arc::new(window)) {
                    log::error!("Failed to initialize sky view: {e}");
                    event_loop.exit();
                }
            }
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(window) = &self.window {
            if window.id() != window_id {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(surface) = &mut self.surface {
                    surface.resize(size);
                }
                self.renderer.on_surface_changed(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let current_time = Instant::now();
                let delta_time = current_time
                    .duration_since(self.last_frame_time)
                    .as_secs_f32();
                self.last_frame_time = current_time;

                self.update(delta_time);
                if let Err(e) = self.render() {
                    log::error!("Render error: {e}");
                }
            }
            other => {
                if let Some(action) = self.input.handle_event(&other) {
                    self.apply_input(action);
                }
            }
        }
    }
}

impl Drop for SkyApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
