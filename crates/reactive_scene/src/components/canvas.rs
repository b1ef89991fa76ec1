//! Headless canvas
//!
//! The root of a reactive scene. A canvas owns the runtime, the scene graph,
//! the frame clock and the local executor that drives asset loads, and runs
//! frames in a fixed order:
//!
//! 1. poll pending loads until they stall,
//! 2. refresh world matrices (change detection for static colliders),
//! 3. `Physics`, `Animation` and `BeforeRender` callbacks,
//! 4. refresh world matrices again and push them to the renderer,
//! 5. `AfterRender` callbacks.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use futures::executor::LocalPool;

use crate::config::SceneConfig;
use crate::foundation::time::Timer;
use crate::reactive::{FrameClock, FramePhase, Owner, Runtime};
use crate::scene::{NullRenderer, RenderBackend, SceneContext, SceneGraph, Scope};

use super::MountError;

/// Root of a reactive scene
pub struct Canvas {
    scope: Scope,
    pool: LocalPool,
    timer: Timer,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Canvas with the default configuration and no renderer
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default(), Box::new(NullRenderer::default()))
    }

    /// Canvas reporting to `renderer`
    pub fn with_config(config: SceneConfig, renderer: Box<dyn RenderBackend>) -> Self {
        let pool = LocalPool::new();
        let runtime = Runtime::new();
        let context = SceneContext {
            runtime: runtime.clone(),
            graph: Rc::new(RefCell::new(SceneGraph::new(renderer))),
            clock: FrameClock::new(),
            spawner: pool.spawner(),
            config: Rc::new(config),
        };
        log::info!("Canvas created");
        Self {
            scope: Scope::root(context, Owner::root(&runtime)),
            pool,
            timer: Timer::new(),
        }
    }

    /// Root scope
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Reactive runtime
    pub fn runtime(&self) -> &Runtime {
        self.scope.runtime()
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        self.scope.clock()
    }

    /// Borrow the scene graph
    pub fn graph(&self) -> Ref<'_, SceneGraph> {
        self.scope.graph().borrow()
    }

    /// Mount components at the root
    pub fn mount<R>(&self, mount: impl FnOnce(&Scope) -> Result<R, MountError>) -> Result<R, MountError> {
        self.runtime().batch(|| mount(&self.scope))
    }

    /// Drive pending asynchronous work without running a frame
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Run one frame of `delta_ms` milliseconds
    pub fn frame(&mut self, delta_ms: f32) {
        self.pool.run_until_stalled();

        let graph = Rc::clone(self.scope.graph());
        graph.borrow_mut().refresh_world_matrices();

        let clock = self.scope.clock();
        clock.tick(FramePhase::Physics, delta_ms);
        clock.tick(FramePhase::Animation, delta_ms);
        clock.tick(FramePhase::BeforeRender, delta_ms);

        let changed = graph.borrow_mut().refresh_world_matrices();
        log::trace!("Frame: {delta_ms:.2} ms, {changed} world matrices changed");

        clock.tick(FramePhase::AfterRender, delta_ms);
    }

    /// Run one frame using the wall-clock time since the previous call
    pub fn run_frame(&mut self) -> f32 {
        let delta_ms = self.timer.update();
        self.frame(delta_ms);
        delta_ms
    }

    /// Number of frames run through [`Canvas::run_frame`]
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }

    /// Unmount everything
    pub fn dispose(&mut self) {
        self.scope.owner().dispose();
        self.pool.run_until_stalled();
        log::info!("Canvas disposed");
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.scope.owner().dispose();
    }
}
