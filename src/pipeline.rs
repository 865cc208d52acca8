use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SceneConfig;
use crate::globe::{assemble, ScanError, ScanStats, SceneBuffers};
use crate::raster::{BoundingBox, Raster, RasterError, RasterSource};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Can't {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("Loading {source_name} failed: {error}")]
    Load { source_name: String, error: RasterError },

    #[error("Building geometry failed: {0}")]
    Build(#[from] ScanError),

    #[error("Attaching the scene failed: {0}")]
    Attach(anyhow::Error),
}

/// Where a [`GlobeLoader`] is in its load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Building,
    Ready,
    Failed(String),
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Building => write!(f, "building"),
            LoadState::Ready => write!(f, "ready"),
            LoadState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Flag telling whoever presents the globe that the geometry is in place.
#[derive(Debug, Clone, Default)]
pub struct ReadySignal(Arc<AtomicBool>);

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns whether the flag was unset before.
    fn set(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lets a torn down consumer abort a load that is still running.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a renderer needs to draw the globe.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub buffers: SceneBuffers,
    pub stats: ScanStats,
    pub bbox: BoundingBox,
    pub raster_size: (usize, usize),
    pub config: SceneConfig,
}

/// The rendering surface a finished scene is handed to.
pub trait SceneSink {
    fn attach(&mut self, scene: &Scene) -> anyhow::Result<()>;
}

/// Drives one raster through `Idle -> Loading -> Building -> Ready`.
///
/// Any failure parks the loader in `Failed`; [`GlobeLoader::reset`] starts over.
pub struct GlobeLoader {
    config: SceneConfig,
    state: LoadState,
    ready: ReadySignal,
    cancel: CancelToken,
}

impl GlobeLoader {
    pub fn new(config: SceneConfig) -> Self {
        GlobeLoader {
            config,
            state: LoadState::Idle,
            ready: ReadySignal::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn expect_state(&self, expected: LoadState, action: &'static str) -> Result<(), PipelineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                action,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        tracing::warn!(error = %err, "globe load failed");
        self.state = LoadState::Failed(err.to_string());
        err
    }

    /// Idle -> Loading
    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.expect_state(LoadState::Idle, "start loading")?;
        self.state = LoadState::Loading;
        Ok(())
    }

    /// Loading -> Building, handing out the decoded raster.
    pub fn load(&mut self, source: &dyn RasterSource) -> Result<Raster, PipelineError> {
        self.expect_state(LoadState::Loading, "load a raster")?;

        let now = Instant::now();
        match source.load() {
            Ok(raster) => {
                tracing::debug!(source = %source.describe(), elapsed_ms = now.elapsed().as_millis() as u64, "raster loaded");
                self.state = LoadState::Building;
                Ok(raster)
            }
            Err(error) => Err(self.fail(PipelineError::Load {
                source_name: source.describe(),
                error,
            })),
        }
    }

    /// Scans the raster into a scene. The loader stays in `Building`.
    pub fn build(&mut self, raster: &Raster) -> Result<Scene, PipelineError> {
        self.expect_state(LoadState::Building, "build geometry")?;

        let (buffers, stats) = match assemble(raster, &self.config, &self.cancel) {
            Ok(res) => res,
            Err(e) => return Err(self.fail(e.into())),
        };

        if let Some(max) = stats.max_value {
            tracing::info!(max, "largest value in raster");
        }

        Ok(Scene {
            buffers,
            stats,
            bbox: *raster.bbox(),
            raster_size: raster.dimensions(),
            config: self.config.clone(),
        })
    }

    /// Building -> Ready: hands the scene to the sink, then raises the ready signal.
    pub fn attach(&mut self, scene: Scene, sink: &mut dyn SceneSink) -> Result<Scene, PipelineError> {
        self.expect_state(LoadState::Building, "attach a scene")?;

        if self.cancel.is_cancelled() {
            return Err(self.fail(ScanError::Cancelled.into()));
        }

        if let Err(e) = sink.attach(&scene) {
            return Err(self.fail(PipelineError::Attach(e)));
        }

        self.state = LoadState::Ready;
        if !self.ready.set() {
            tracing::warn!("ready signal was already raised");
        }

        Ok(scene)
    }

    /// Runs all phases back to back.
    pub fn run(&mut self, source: &dyn RasterSource, sink: &mut dyn SceneSink) -> Result<Scene, PipelineError> {
        self.start()?;
        let raster = self.load(source)?;
        let scene = self.build(&raster)?;
        drop(raster);
        self.attach(scene, sink)
    }

    /// Back to `Idle`, lowering the ready signal and forgetting any cancellation.
    pub fn reset(&mut self) {
        self.state = LoadState::Idle;
        self.ready.clear();
        self.cancel = CancelToken::new();
    }
}
