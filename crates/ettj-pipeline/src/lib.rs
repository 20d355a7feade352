//! # ETTJ Pipeline
//!
//! Batch orchestration of the weekly curve load.
//!
//! A [`Pipeline`] walks the business days of a [`BusinessDayWindow`], asks a
//! [`CurveDataSource`] for each one, and reconciles what comes back: sources
//! may answer with an earlier date's data, and rows are always keyed by the
//! date the data refers to. Raw quotes are fitted with the NSS engine;
//! published vertices are stored as given. Each family is merged into the
//! store once per run.
//!
//! Failures while fetching or fitting one date are recorded in the
//! [`RunReport`] and do not stop the run. Store failures do.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ettj_core::prelude::*;
//! use ettj_pipeline::prelude::*;
//! use ettj_storage::prelude::*;
//!
//! let source = JsonReplaySource::from_json_str(
//!     r#"[{"data_referencia": "2025-01-06",
//!          "curvas": [{"vertice_du": 252, "taxa_prefixadas": 10.2}]}]"#,
//! )
//! .unwrap();
//! let store = Arc::new(InMemoryCurveStore::new(TenorUnit::BusinessDays));
//!
//! let today = Date::from_ymd(2025, 1, 15).unwrap();
//! let report = Pipeline::new(Arc::new(source), store.clone())
//!     .run(BusinessDayWindow::previous_week(today))
//!     .unwrap();
//!
//! // Every day of the week resolved to Monday's data.
//! assert_eq!(report.reconciled.len(), 4);
//! assert_eq!(store.load(CurveFamily::Nominal).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod pipeline;
pub mod replay;
pub mod report;
pub mod source;

pub use error::{PipelineError, PipelineResult, SourceError, SourceResult};
pub use pipeline::{Pipeline, PipelineOptions};
pub use replay::JsonReplaySource;
pub use report::{DateFailure, DegradedFit, FailureStage, Reconciliation, RunReport};
pub use source::{CurveDataSource, PayloadContent, SourcePayload, Vertex};

pub use ettj_core::calendars::BusinessDayWindow;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{PipelineError, PipelineResult, SourceError, SourceResult};
    pub use crate::pipeline::{Pipeline, PipelineOptions};
    pub use crate::replay::JsonReplaySource;
    pub use crate::report::{FailureStage, RunReport};
    pub use crate::source::{CurveDataSource, PayloadContent, SourcePayload, Vertex};
}
