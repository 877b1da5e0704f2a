//! Two-phase model loading
//!
//! A load fetches the MTL asset first, resolves its materials, and only then
//! fetches the OBJ asset that references them. The work runs on a worker
//! thread and is reported back as [`LoadEvent`]s; the viewer drains them
//! between frames through a [`LoadHandle`], which is also where the decoded
//! model enters the scene graph.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};

use cgmath::Point3;
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    FutureExt, StreamExt,
};

use crate::{
    error::LoadError,
    gfx::scene::{Material, Model, NodeId, NodeKind, SceneGraph, TextureImage},
};

use super::fetch::{AssetFetcher, Progress};

/// Height at which loaded models are placed
pub const MODEL_BASE_HEIGHT: f32 = 0.0;

/// Locations of the material and geometry assets of one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub name: String,
    pub base_path: PathBuf,
    pub material_file: String,
    pub geometry_file: String,
}

impl LoadRequest {
    pub fn new(
        name: &str,
        base_path: impl Into<PathBuf>,
        material_file: &str,
        geometry_file: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_path: base_path.into(),
            material_file: material_file.to_string(),
            geometry_file: geometry_file.to_string(),
        }
    }

    /// `model/<name>/<name>.mtl` and `model/<name>/<name>.obj`
    pub fn for_model(name: &str) -> Self {
        Self::new(
            name,
            Path::new("model").join(name),
            &format!("{}.mtl", name),
            &format!("{}.obj", name),
        )
    }

    pub fn material_path(&self) -> PathBuf {
        self.base_path.join(&self.material_file)
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.base_path.join(&self.geometry_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    Idle,
    MaterialLoading,
    MaterialReady,
    GeometryLoading,
    Attached,
    Failed,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Attached | LoadState::Failed)
    }
}

/// Materials parsed from an MTL asset, in file order
#[derive(Debug, Clone)]
pub struct MaterialSet {
    raw: Vec<tobj::Material>,
    names: Vec<(String, usize)>,
    materials: Vec<Material>,
}

impl MaterialSet {
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self, LoadError> {
        let (raw, names) = tobj::load_mtl_buf(&mut Cursor::new(bytes))
            .map_err(|e| LoadError::parse(path, e))?;

        let materials = raw
            .iter()
            .enumerate()
            .map(|(i, m)| Material::from_mtl(m, i))
            .collect();

        Ok(Self {
            raw,
            names: names.into_iter().collect(),
            materials,
        })
    }

    /// Fetches and decodes the diffuse maps referenced by the materials,
    /// resolving their names against `base_path`.
    ///
    /// A map that is missing or cannot be decoded is logged and leaves its
    /// material on the base colour.
    pub fn preload(&mut self, base_path: &Path, fetcher: &dyn AssetFetcher) {
        for (raw, material) in self.raw.iter().zip(self.materials.iter_mut()) {
            let Some(texture) = raw.diffuse_texture.as_deref().filter(|t| !t.is_empty()) else {
                continue;
            };
            let path = base_path.join(texture);
            if !fetcher.exists(&path) {
                log::warn!(
                    "Texture {} of material '{}' not found, using base colour",
                    path.display(),
                    material.name
                );
                continue;
            }

            match load_texture(&path, fetcher) {
                Ok(image) => {
                    log::debug!(
                        "Decoded {} ({}x{}) for material '{}'",
                        path.display(),
                        image.width,
                        image.height,
                        material.name
                    );
                    material.set_diffuse_map(path, image);
                }
                Err(e) => log::warn!("{}, material '{}' uses its base colour", e, material.name),
            }
        }
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

fn load_texture(path: &Path, fetcher: &dyn AssetFetcher) -> Result<TextureImage, LoadError> {
    let bytes = fetcher.fetch(path, &mut |_| {})?;
    TextureImage::decode(&bytes).map_err(|e| LoadError::parse(path, e))
}

/// Progress notifications from a running load
#[derive(Debug)]
pub enum LoadEvent {
    State(LoadState),
    Progress(Progress),
    Loaded(Model),
    Failed(LoadError),
}

/// Runs the two fetch phases for one [`LoadRequest`]
pub struct ModelLoader {
    request: LoadRequest,
    fetcher: Arc<dyn AssetFetcher>,
}

impl ModelLoader {
    pub fn new(request: LoadRequest, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { request, fetcher }
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    /// Starts the load on a worker thread and returns immediately.
    pub fn spawn(self) -> LoadHandle {
        let (sender, receiver) = mpsc::unbounded();
        let name = self.request.name.clone();
        let material_path = self.request.material_path();

        let worker_sender = sender.clone();
        let worker = std::thread::Builder::new()
            .name(format!("model-loader-{}", name))
            .spawn(move || self.run(&worker_sender));

        let worker = match worker {
            Ok(worker) => Some(worker),
            Err(e) => {
                let _ = sender.unbounded_send(LoadEvent::Failed(LoadError::Transport {
                    path: material_path,
                    source: e,
                }));
                None
            }
        };

        LoadHandle::new(name, receiver, worker)
    }

    /// Runs both phases on the current thread, reporting through `events`.
    pub fn run(&self, events: &UnboundedSender<LoadEvent>) {
        let send = |event: LoadEvent| {
            // The handle may already be gone; the load still runs to completion.
            let _ = events.unbounded_send(event);
        };

        send(LoadEvent::State(LoadState::MaterialLoading));
        let mut materials = match self.load_materials() {
            Ok(materials) => materials,
            Err(e) => return send(LoadEvent::Failed(e)),
        };
        send(LoadEvent::State(LoadState::MaterialReady));

        materials.preload(&self.request.base_path, self.fetcher.as_ref());

        send(LoadEvent::State(LoadState::GeometryLoading));
        match self.load_geometry(&materials, &mut |p| send(LoadEvent::Progress(p))) {
            Ok(model) => send(LoadEvent::Loaded(model)),
            Err(e) => send(LoadEvent::Failed(e)),
        }
    }

    fn load_materials(&self) -> Result<MaterialSet, LoadError> {
        let path = self.request.material_path();
        let bytes = self.fetcher.fetch(&path, &mut |_| {})?;
        let set = MaterialSet::parse(&path, &bytes)?;
        log::debug!("Parsed {} materials from {}", set.len(), path.display());
        Ok(set)
    }

    fn load_geometry(
        &self,
        materials: &MaterialSet,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Model, LoadError> {
        let path = self.request.geometry_path();
        let bytes = self.fetcher.fetch(&path, on_progress)?;

        let (models, _) = tobj::load_obj_buf(
            &mut Cursor::new(bytes),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_mtl_path| {
                Ok((
                    materials.raw.clone(),
                    materials.names.iter().cloned().collect(),
                ))
            },
        )
        .map_err(|e| LoadError::parse(&path, e))?;

        if models.iter().all(|m| m.mesh.positions.is_empty()) {
            return Err(LoadError::parse(&path, "no geometry"));
        }

        Ok(Model::from_tobj(
            &self.request.name,
            &models,
            materials.materials().to_vec(),
        ))
    }
}

/// The viewer's side of a running load
pub struct LoadHandle {
    name: String,
    receiver: UnboundedReceiver<LoadEvent>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
    state: LoadState,
    history: Vec<LoadState>,
    progress: Option<Progress>,
    last_logged_percent: Option<u32>,
    node: Option<NodeId>,
    error: Option<LoadError>,
}

impl LoadHandle {
    fn new(
        name: String,
        receiver: UnboundedReceiver<LoadEvent>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            name,
            receiver,
            worker,
            closed: false,
            state: LoadState::Idle,
            history: vec![LoadState::Idle],
            progress: None,
            last_logged_percent: None,
            node: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn history(&self) -> &[LoadState] {
        &self.history
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    /// Scene node of the attached model
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Applies every event that has arrived so far without blocking.
    pub fn pump(&mut self, scene: &mut SceneGraph) -> LoadState {
        while !self.closed {
            match self.receiver.next().now_or_never() {
                Some(Some(event)) => self.apply(event, scene),
                Some(None) => self.close(),
                None => break,
            }
        }
        self.state
    }

    /// Blocks until the load reaches a terminal state.
    pub fn finish(&mut self, scene: &mut SceneGraph) -> LoadState {
        while !self.closed {
            match futures::executor::block_on(self.receiver.next()) {
                Some(event) => self.apply(event, scene),
                None => self.close(),
            }
        }
        self.state
    }

    fn apply(&mut self, event: LoadEvent, scene: &mut SceneGraph) {
        match event {
            LoadEvent::State(state) => self.enter(state),
            LoadEvent::Progress(progress) => {
                self.progress = Some(progress);
                // Skipped silently when the source cannot tell the total.
                if let Some(percent) = progress.percent() {
                    if self.last_logged_percent != Some(percent) {
                        self.last_logged_percent = Some(percent);
                        log::info!("{}% downloaded", percent);
                    }
                }
            }
            LoadEvent::Loaded(model) => self.attach(model, scene),
            LoadEvent::Failed(error) => {
                log::error!("Error on model loading: {}", error);
                self.error = Some(error);
                self.enter(LoadState::Failed);
            }
        }
    }

    fn attach(&mut self, model: Model, scene: &mut SceneGraph) {
        if self.node.is_some() || self.state.is_terminal() {
            log::warn!("Model '{}' already settled, ignoring", self.name);
            return;
        }

        let triangles = model.triangle_count();
        let bounds = model.bounds();
        let id = scene.add(&self.name, NodeKind::Model(model));
        if let Some(node) = scene.node_mut(id) {
            node.position = Point3::new(0.0, MODEL_BASE_HEIGHT, 0.0);
        }
        self.node = Some(id);
        self.enter(LoadState::Attached);
        log::info!("Model '{}' attached ({} triangles)", self.name, triangles);
        if let Some((min, max)) = bounds {
            log::debug!("Model '{}' spans {:?} to {:?}", self.name, min, max);
        }

        let stats = scene.get_statistics();
        log::debug!(
            "Scene: {} nodes, {} lights, {} models, {} triangles, {} vertices",
            stats.node_count,
            stats.light_count,
            stats.model_count,
            stats.total_triangles,
            stats.total_vertices
        );
    }

    fn enter(&mut self, state: LoadState) {
        if self.state == state || self.state.is_terminal() {
            return;
        }
        log::debug!("Load '{}': {:?} -> {:?}", self.name, self.state, state);
        self.state = state;
        self.history.push(state);
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Loader worker for '{}' panicked", self.name);
            }
        }
        if !self.state.is_terminal() {
            let error = LoadError::Transport {
                path: PathBuf::from(&self.name),
                source: std::io::Error::other("loader stopped before completing"),
            };
            log::error!("Error on model loading: {}", error);
            self.error = Some(error);
            self.enter(LoadState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fetch::MemoryFetcher;

    const CUBE_MTL: &str = "newmtl red\nKd 1.0 0.0 0.0\nmap_Kd red.png\n\nnewmtl blue\nKd 0.0 0.0 1.0\nmap_Kd blue.png\n";
    const CUBE_OBJ: &str = "mtllib cube.mtl\no tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nusemtl red\nf 1 2 3\nf 2 4 3\n";

    fn red_png() -> Vec<u8> {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    fn cube_fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_asset("model/cube/cube.mtl", CUBE_MTL)
            .with_asset("model/cube/cube.obj", CUBE_OBJ)
            .with_asset("model/cube/red.png", red_png())
    }

    fn load(fetcher: MemoryFetcher, scene: &mut SceneGraph) -> LoadHandle {
        let mut handle = ModelLoader::new(LoadRequest::for_model("cube"), Arc::new(fetcher)).spawn();
        handle.finish(scene);
        handle
    }

    #[test]
    fn request_follows_model_layout() {
        let request = LoadRequest::for_model("boat");
        assert_eq!(request.material_path(), PathBuf::from("model/boat/boat.mtl"));
        assert_eq!(request.geometry_path(), PathBuf::from("model/boat/boat.obj"));
    }

    #[test]
    fn well_formed_assets_attach_exactly_once() {
        let mut scene = SceneGraph::new();
        scene.add("camera", NodeKind::Camera);
        let before = scene.node_count();

        let mut handle = load(cube_fetcher(), &mut scene);

        assert_eq!(handle.state(), LoadState::Attached);
        assert_eq!(scene.node_count(), before + 1);
        assert_eq!(
            handle.history(),
            &[
                LoadState::Idle,
                LoadState::MaterialLoading,
                LoadState::MaterialReady,
                LoadState::GeometryLoading,
                LoadState::Attached,
            ]
        );

        // Further pumping changes nothing
        handle.pump(&mut scene);
        assert_eq!(scene.node_count(), before + 1);

        let node = scene.node(handle.node().unwrap()).unwrap();
        assert_eq!(node.position.y, MODEL_BASE_HEIGHT);
        let NodeKind::Model(model) = &node.kind else {
            panic!("attached node is not a model");
        };
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.materials.len(), 2);
        let material = model.material_for(&model.meshes[0]).unwrap();
        assert_eq!(material.name, "red");
        assert_eq!(material.base_color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn preload_decodes_existing_textures_only() {
        let mut scene = SceneGraph::new();
        let handle = load(cube_fetcher(), &mut scene);
        let NodeKind::Model(model) = &scene.node(handle.node().unwrap()).unwrap().kind else {
            panic!("attached node is not a model");
        };

        let red = &model.materials[0];
        assert_eq!(red.diffuse_texture, Some(PathBuf::from("model/cube/red.png")));
        let map = red.diffuse_map.as_ref().unwrap();
        assert_eq!((map.width, map.height), (2, 2));
        assert_eq!(&map.rgba[..4], &[255, 0, 0, 255]);

        assert_eq!(model.materials[1].diffuse_texture, None);
        assert!(!model.materials[1].is_textured());
    }

    #[test]
    fn undecodable_texture_falls_back_to_base_colour() {
        let fetcher = cube_fetcher().with_asset("model/cube/red.png", vec![0u8; 4]);
        let mut scene = SceneGraph::new();
        let handle = load(fetcher, &mut scene);

        assert_eq!(handle.state(), LoadState::Attached);
        let NodeKind::Model(model) = &scene.node(handle.node().unwrap()).unwrap().kind else {
            panic!("attached node is not a model");
        };
        assert!(!model.materials[0].is_textured());
        assert_eq!(model.materials[0].base_color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unreachable_material_fails_without_touching_scene() {
        let fetcher = MemoryFetcher::new().with_asset("model/cube/cube.obj", CUBE_OBJ);
        let log = fetcher.clone();
        let mut scene = SceneGraph::new();
        let before = scene.node_count();

        let handle = load(fetcher, &mut scene);

        assert_eq!(handle.state(), LoadState::Failed);
        assert!(handle.error().unwrap().is_transport());
        assert_eq!(scene.node_count(), before);
        assert!(handle.node().is_none());
        // geometry was never requested
        assert_eq!(log.fetched(), vec![PathBuf::from("model/cube/cube.mtl")]);
    }

    #[test]
    fn material_is_fetched_before_geometry() {
        let fetcher = cube_fetcher();
        let log = fetcher.clone();
        let mut scene = SceneGraph::new();

        let handle = load(fetcher, &mut scene);

        let fetched = log.fetched();
        // the diffuse map is preloaded between the two phases
        assert_eq!(
            fetched,
            vec![
                PathBuf::from("model/cube/cube.mtl"),
                PathBuf::from("model/cube/red.png"),
                PathBuf::from("model/cube/cube.obj"),
            ]
        );
        let ready = handle
            .history()
            .iter()
            .position(|s| *s == LoadState::MaterialReady)
            .unwrap();
        let geometry = handle
            .history()
            .iter()
            .position(|s| *s == LoadState::GeometryLoading)
            .unwrap();
        assert!(ready < geometry);
    }

    #[test]
    fn progress_is_reported_when_length_is_known() {
        let mut scene = SceneGraph::new();
        let handle = load(cube_fetcher().with_chunk_size(16), &mut scene);

        let progress = handle.progress().unwrap();
        assert_eq!(progress.loaded, CUBE_OBJ.len() as u64);
        assert_eq!(progress.percent(), Some(100));
    }

    #[test]
    fn progress_without_length_still_attaches() {
        let mut scene = SceneGraph::new();
        let handle = load(cube_fetcher().without_length(), &mut scene);

        assert_eq!(handle.state(), LoadState::Attached);
        assert_eq!(handle.progress().and_then(|p| p.percent()), None);
    }

    #[test]
    fn empty_geometry_is_a_parse_failure() {
        let fetcher = MemoryFetcher::new()
            .with_asset("model/cube/cube.mtl", CUBE_MTL)
            .with_asset("model/cube/cube.obj", "# nothing here\n");
        let mut scene = SceneGraph::new();

        let handle = load(fetcher, &mut scene);

        assert_eq!(handle.state(), LoadState::Failed);
        assert!(handle.error().unwrap().is_parse());
        assert_eq!(scene.node_count(), 0);
        assert!(handle.history().contains(&LoadState::GeometryLoading));
    }

    #[test]
    fn run_reports_events_in_order() {
        let (sender, mut receiver) = mpsc::unbounded();
        ModelLoader::new(LoadRequest::for_model("cube"), Arc::new(cube_fetcher())).run(&sender);
        drop(sender);

        let mut states = Vec::new();
        let mut loaded = false;
        while let Some(Some(event)) = receiver.next().now_or_never() {
            match event {
                LoadEvent::State(state) => states.push(state),
                LoadEvent::Loaded(_) => loaded = true,
                LoadEvent::Progress(_) => assert!(!loaded),
                LoadEvent::Failed(e) => panic!("unexpected failure: {}", e),
            }
        }

        assert!(loaded);
        assert_eq!(
            states,
            vec![
                LoadState::MaterialLoading,
                LoadState::MaterialReady,
                LoadState::GeometryLoading,
            ]
        );
    }

    #[test]
    fn pump_before_any_event_leaves_handle_idle() {
        let (_sender, receiver) = mpsc::unbounded();
        let mut handle = LoadHandle::new("cube".into(), receiver, None);
        let mut scene = SceneGraph::new();

        assert_eq!(handle.pump(&mut scene), LoadState::Idle);
        assert!(!handle.is_finished());
    }
}
