use async_trait::async_trait;
use bill_tally::{
    AlertPolicy, AlertRow, BillProcessor, CandidateFile, CategoryTotals, DashboardModel, EncodedImage, Pipeline,
    PipelineError, PipelineState, ProcessResponse, Renderer, RunOutcome, SegmentCanvas, NO_ALERTS_NOTICE,
};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::Notify;

type TestPipeline = Pipeline<DashboardModel, SegmentCanvas>;

fn response(pairs: &[(&str, f64)]) -> ProcessResponse {
    ProcessResponse {
        category_totals: CategoryTotals::from_pairs(pairs.iter().copied()).unwrap(),
        raw_expenses: Vec::new(),
        processed_at: None,
    }
}

fn pipeline(processor: Arc<dyn BillProcessor>) -> TestPipeline {
    Pipeline::new(
        processor,
        DashboardModel::default(),
        Renderer::new(SegmentCanvas::default(), AlertPolicy::default()),
    )
}

fn write_image(dir: &Path, name: &str) -> CandidateFile {
    let path = dir.join(name);
    std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]).unwrap();
    CandidateFile::from_path(path)
}

fn dashboard(pipeline: &TestPipeline) -> DashboardModel {
    pipeline.surface().lock().unwrap().dashboard.clone()
}

/// Answers every batch with the same totals and remembers what it was sent
struct FixedProcessor {
    totals: Vec<(&'static str, f64)>,
    received: Mutex<Vec<Vec<EncodedImage>>>,
}

impl FixedProcessor {
    fn new(totals: &[(&'static str, f64)]) -> Arc<Self> {
        Arc::new(FixedProcessor {
            totals: totals.to_vec(),
            received: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BillProcessor for FixedProcessor {
    async fn process(&self, images: Vec<EncodedImage>) -> bill_tally::Result<ProcessResponse> {
        self.received.lock().unwrap().push(images);
        Ok(response(&self.totals))
    }
}

struct FailingProcessor;

#[async_trait]
impl BillProcessor for FailingProcessor {
    async fn process(&self, _images: Vec<EncodedImage>) -> bill_tally::Result<ProcessResponse> {
        Err(PipelineError::request("Failed to process bills"))
    }
}

#[tokio::test]
async fn test_renders_totals_for_image_batch() {
    let dir = tempfile::tempdir().unwrap();
    let processor = FixedProcessor::new(&[("food", 30.0), ("transport", 10.0)]);
    let pipeline = pipeline(processor.clone());

    let files = vec![write_image(dir.path(), "one.png"), write_image(dir.path(), "two.png")];
    let outcome = pipeline.submit(files).await;

    assert!(matches!(outcome, RunOutcome::Rendered(ref alerts) if alerts.is_empty()));
    assert_eq!(pipeline.state(), PipelineState::Idle);

    let view = dashboard(&pipeline);
    assert_eq!(view.files.len(), 2);
    assert_eq!(view.total, "$40.00");
    assert_eq!(view.categories[0].amount, "$30.00");
    assert_eq!(view.categories[1].amount, "$10.00");
    assert!(!view.loading);
    assert!(view.results_visible);

    let received = processor.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].len(), 2);
    assert!(received[0][0].as_str().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_non_image_skipped_rest_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not a bill").unwrap();

    let processor = FixedProcessor::new(&[("groceries", 12.0)]);
    let pipeline = pipeline(processor.clone());

    let files = vec![
        write_image(dir.path(), "a.png"),
        CandidateFile::from_path(&notes),
        write_image(dir.path(), "b.png"),
    ];
    let outcome = pipeline.submit(files).await;

    assert!(matches!(outcome, RunOutcome::Rendered(_)));
    let names: Vec<String> = dashboard(&pipeline).files.into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
    assert_eq!(processor.received.lock().unwrap()[0].len(), 2);
}

#[tokio::test]
async fn test_only_non_images_submits_nothing() {
    let processor = FixedProcessor::new(&[("groceries", 12.0)]);
    let pipeline = pipeline(processor.clone());

    let outcome = pipeline
        .submit(vec![CandidateFile::new("notes.txt", Some("text/plain".to_string()))])
        .await;

    assert!(matches!(outcome, RunOutcome::NothingAccepted));
    assert!(processor.received.lock().unwrap().is_empty());
    let view = dashboard(&pipeline);
    assert!(matches!(&view.alerts[0], AlertRow::Warning(text) if text.contains("Please upload only image files")));
}

#[tokio::test]
async fn test_empty_selection_ignored() {
    let pipeline = pipeline(FixedProcessor::new(&[]));

    assert!(matches!(pipeline.submit(Vec::new()).await, RunOutcome::Ignored));
    assert_eq!(pipeline.generation(), 0);
    assert_eq!(dashboard(&pipeline), DashboardModel::default());
}

#[tokio::test]
async fn test_backend_failure_shows_error_without_results() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(Arc::new(FailingProcessor));

    let outcome = pipeline.submit(vec![write_image(dir.path(), "bill.png")]).await;

    assert!(matches!(outcome, RunOutcome::Failed(PipelineError::RequestFailure(_))));
    let view = dashboard(&pipeline);
    assert!(!view.loading);
    assert!(view.total.is_empty());
    assert!(view.categories.is_empty());
    assert_eq!(
        view.alerts,
        vec![AlertRow::Warning("Error processing bills: Failed to process bills".to_string())]
    );
    assert!(pipeline.surface().lock().unwrap().renderer.chart().is_none());
}

#[tokio::test]
async fn test_unreadable_file_fails_batch() {
    let dir = tempfile::tempdir().unwrap();
    let processor = FixedProcessor::new(&[("food", 1.0)]);
    let pipeline = pipeline(processor.clone());

    let missing = CandidateFile::new(dir.path().join("gone.png"), Some("image/png".to_string()));
    let outcome = pipeline.submit(vec![write_image(dir.path(), "ok.png"), missing]).await;

    assert!(matches!(outcome, RunOutcome::Failed(PipelineError::EncodingFailure { .. })));
    assert!(processor.received.lock().unwrap().is_empty());
    assert!(!dashboard(&pipeline).loading);
}

#[tokio::test]
async fn test_all_zero_totals_render_notice() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(FixedProcessor::new(&[("groceries", 0.0), ("other", 0.0)]));

    pipeline.submit(vec![write_image(dir.path(), "blank.png")]).await;

    let view = dashboard(&pipeline);
    assert_eq!(view.total, "$0.00");
    assert!(view.categories.is_empty());
    assert_eq!(view.alerts, vec![AlertRow::Notice(NO_ALERTS_NOTICE.to_string())]);
    assert!(pipeline.surface().lock().unwrap().renderer.chart().unwrap().is_empty());
}

/// Checks what the dashboard shows while the request is in flight
struct ObservingProcessor {
    surface: OnceLock<TestPipeline>,
    seen: Mutex<Option<(bool, PipelineState)>>,
}

#[async_trait]
impl BillProcessor for ObservingProcessor {
    async fn process(&self, _images: Vec<EncodedImage>) -> bill_tally::Result<ProcessResponse> {
        let pipeline = self.surface.get().unwrap();
        let surface = pipeline.surface();
        let guard = surface.lock().unwrap();
        *self.seen.lock().unwrap() = Some((guard.dashboard.loading, guard.state));
        Ok(response(&[("food", 5.0)]))
    }
}

#[tokio::test]
async fn test_loading_visible_while_submitting() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Arc::new(ObservingProcessor {
        surface: OnceLock::new(),
        seen: Mutex::new(None),
    });
    let pipeline = pipeline(processor.clone());
    let _ = processor.surface.set(pipeline.clone());

    pipeline.submit(vec![write_image(dir.path(), "bill.png")]).await;

    assert_eq!(*processor.seen.lock().unwrap(), Some((true, PipelineState::Submitting)));
    assert!(!dashboard(&pipeline).loading);
}

/// First call blocks until released; later calls answer immediately
struct GatedProcessor {
    gate: Notify,
    entered: Notify,
    calls: Mutex<usize>,
}

#[async_trait]
impl BillProcessor for GatedProcessor {
    async fn process(&self, _images: Vec<EncodedImage>) -> bill_tally::Result<ProcessResponse> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        if call == 1 {
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(response(&[("stale", 999.0)]))
        } else {
            Ok(response(&[("fresh", 1.0)]))
        }
    }
}

#[tokio::test]
async fn test_stale_run_does_not_overwrite_latest() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Arc::new(GatedProcessor {
        gate: Notify::new(),
        entered: Notify::new(),
        calls: Mutex::new(0),
    });
    let pipeline = pipeline(processor.clone());

    let first = {
        let pipeline = pipeline.clone();
        let files = vec![write_image(dir.path(), "first.png")];
        tokio::spawn(async move { pipeline.submit(files).await })
    };
    processor.entered.notified().await;

    let second = pipeline.submit(vec![write_image(dir.path(), "second.png")]).await;
    assert!(matches!(second, RunOutcome::Rendered(_)));

    processor.gate.notify_one();
    let first = first.await.unwrap();
    assert!(matches!(first, RunOutcome::Superseded));

    let view = dashboard(&pipeline);
    assert_eq!(view.total, "$1.00");
    assert_eq!(view.categories[0].label, "Fresh");
    assert_eq!(view.files[0].name, "second.png");
    assert!(!view.loading);
    assert_eq!(pipeline.generation(), 2);
}

#[tokio::test]
async fn test_rejected_selection_leaves_running_batch_current() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Arc::new(GatedProcessor {
        gate: Notify::new(),
        entered: Notify::new(),
        calls: Mutex::new(0),
    });
    let pipeline = pipeline(processor.clone());

    let first = {
        let pipeline = pipeline.clone();
        let files = vec![write_image(dir.path(), "first.png")];
        tokio::spawn(async move { pipeline.submit(files).await })
    };
    processor.entered.notified().await;

    let second = pipeline
        .submit(vec![CandidateFile::new("notes.txt", Some("text/plain".to_string()))])
        .await;
    assert!(matches!(second, RunOutcome::NothingAccepted));
    assert_eq!(pipeline.generation(), 1);
    assert!(dashboard(&pipeline).loading);

    processor.gate.notify_one();
    let first = first.await.unwrap();
    assert!(matches!(first, RunOutcome::Rendered(_)));

    let view = dashboard(&pipeline);
    assert!(!view.loading);
    assert_eq!(view.total, "$999.00");
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(*processor.calls.lock().unwrap(), 1);
}
