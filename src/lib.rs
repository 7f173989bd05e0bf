// Bill Tally - Core Library
// Upload pipeline shared by the CLI, the TUI dashboard and the processing server

pub mod error;
pub mod totals;
pub mod view;
pub mod collector;
pub mod encoder;
pub mod client;
pub mod alerts;
pub mod render;
pub mod dashboard;
pub mod pipeline;
pub mod ledger;
pub mod extractor;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::{PipelineError, Result, PROCESSING_FAILED};
pub use totals::{CategoryTotals, TotalsError};
pub use view::{AlertRow, CategoryRow, ChartCanvas, ChartData, ChartSegment, Dashboard, FileRow};
pub use collector::{collect, parse_dropped_paths, CandidateFile, Collection, UploadBatch};
pub use encoder::{encode_batch, encode_file, DataUrlError, EncodedImage};
pub use client::{BackendClient, BillProcessor, ClientConfig, Expense, ProcessRequest, ProcessResponse};
pub use alerts::{AlertPolicy, AlertSet, NO_ALERTS_NOTICE};
pub use render::{capitalize, format_currency, Renderer, PALETTE};
pub use dashboard::{DashboardModel, SegmentCanvas};
pub use pipeline::{Pipeline, PipelineState, RunOutcome, Surface};
pub use ledger::{tally, ExpenseCategory};
pub use extractor::{ExpenseExtractor, ExtractionError, ExtractorConfig, RemoteExtractor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
