// 🔄 Upload Pipeline - collect → encode → submit → render
//
// Idle → FilesSelected → Encoding → Submitting → Rendering → Idle
//                           └──────────┴──→ Failed → Idle
//
// Every run takes a generation ticket when its files are selected. When a
// response lands, only the run holding the latest ticket may touch the
// dashboard. Older runs are left to finish and their results are discarded.

use crate::alerts::AlertSet;
use crate::client::BillProcessor;
use crate::collector::{self, CandidateFile};
use crate::encoder;
use crate::error::PipelineError;
use crate::render::Renderer;
use crate::view::{ChartCanvas, Dashboard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FilesSelected,
    Encoding,
    Submitting,
    Rendering,
    Failed,
}

impl PipelineState {
    pub fn label(&self) -> &str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::FilesSelected => "Files selected",
            PipelineState::Encoding => "Encoding",
            PipelineState::Submitting => "Submitting",
            PipelineState::Rendering => "Rendering",
            PipelineState::Failed => "Failed",
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Empty selection, nothing happened
    Ignored,
    /// Every selected file was rejected, nothing was submitted
    NothingAccepted,
    Rendered(AlertSet),
    Failed(PipelineError),
    /// A newer run started before this one finished; its result was dropped
    Superseded,
}

/// Everything a run draws on
pub struct Surface<D, C: ChartCanvas> {
    pub dashboard: D,
    pub renderer: Renderer<C>,
    pub state: PipelineState,
}

pub struct Pipeline<D, C: ChartCanvas> {
    processor: Arc<dyn BillProcessor>,
    surface: Arc<Mutex<Surface<D, C>>>,
    generation: Arc<AtomicU64>,
}

impl<D, C: ChartCanvas> Clone for Pipeline<D, C> {
    fn clone(&self) -> Self {
        Pipeline {
            processor: Arc::clone(&self.processor),
            surface: Arc::clone(&self.surface),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<D: Dashboard, C: ChartCanvas> Pipeline<D, C> {
    pub fn new(processor: Arc<dyn BillProcessor>, dashboard: D, renderer: Renderer<C>) -> Self {
        Pipeline {
            processor,
            surface: Arc::new(Mutex::new(Surface {
                dashboard,
                renderer,
                state: PipelineState::Idle,
            })),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle to the dashboard and renderer, for drawing
    pub fn surface(&self) -> Arc<Mutex<Surface<D, C>>> {
        Arc::clone(&self.surface)
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// Ticket of the most recent run
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Surface<D, C>> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Move to `state` if this run is still the latest one
    fn advance(&self, generation: u64, state: PipelineState) -> bool {
        let mut surface = self.lock();
        if !self.is_current(generation) {
            return false;
        }
        tracing::debug!("{} → {}", surface.state.label(), state.label());
        surface.state = state;
        true
    }

    /// Run the whole pipeline for one selection of files
    pub async fn submit(&self, files: Vec<CandidateFile>) -> RunOutcome {
        let span = tracing::info_span!("pipeline", run = %Uuid::new_v4());
        self.run(files).instrument(span).await
    }

    async fn run(&self, files: Vec<CandidateFile>) -> RunOutcome {
        // A selection that submits nothing leaves any in-flight run current
        let (batch, generation) = {
            let mut surface = self.lock();
            let Some(collection) = collector::collect(files, &mut surface.dashboard) else {
                return RunOutcome::Ignored;
            };
            if collection.batch.is_empty() {
                tracing::info!("No image files in selection ({} rejected)", collection.rejected.len());
                return RunOutcome::NothingAccepted;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            surface.state = PipelineState::FilesSelected;
            (collection.batch, generation)
        };

        tracing::info!(generation, "Processing {} bill(s)", batch.len());

        {
            let mut surface = self.lock();
            if self.is_current(generation) {
                surface.state = PipelineState::Encoding;
                surface.dashboard.set_loading(true);
            }
        }

        let images = match encoder::encode_batch(&batch).await {
            Ok(images) => images,
            Err(e) => return self.fail(generation, e),
        };
        drop(batch);

        self.advance(generation, PipelineState::Submitting);

        let response = match self.processor.process(images).await {
            Ok(response) => response,
            Err(e) => return self.fail(generation, e),
        };

        let mut guard = self.lock();
        if !self.is_current(generation) {
            tracing::info!(generation, "Discarding stale result");
            return RunOutcome::Superseded;
        }

        let surface = &mut *guard;
        surface.state = PipelineState::Rendering;
        surface.dashboard.set_loading(false);
        let alerts = surface.renderer.render(&response.category_totals, &mut surface.dashboard);
        surface.state = PipelineState::Idle;

        tracing::info!(
            generation,
            total = response.category_totals.total(),
            alerts = alerts.categories.len(),
            "Rendered results"
        );
        RunOutcome::Rendered(alerts)
    }

    fn fail(&self, generation: u64, err: PipelineError) -> RunOutcome {
        let mut surface = self.lock();
        if !self.is_current(generation) {
            tracing::info!(generation, "Stale run failed: {}", err);
            return RunOutcome::Superseded;
        }

        tracing::warn!(generation, "Run failed: {}", err);
        surface.state = PipelineState::Failed;
        surface.dashboard.set_loading(false);
        surface.dashboard.show_alert(&err.alert_text());
        surface.state = PipelineState::Idle;

        RunOutcome::Failed(err)
    }
}
