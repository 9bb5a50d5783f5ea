//! sweep-coordinator - multi-region AWS inventory and teardown
//!
//! A run flows `Query -> Inspector -> Inventory -> Terminator -> OutcomeReport`.
//! The inspector and terminator only ever talk to [`handlers::ResourceHandler`]
//! implementations, so supporting a new resource type means adding one handler.
//!
//! ```ignore
//! let registry = Arc::new(HandlerRegistry::aws(&ctx, DEFAULT_LIST_RETRIES));
//! let query = Query::new(params, &registry)?;
//! let inspection = Inspector::new(registry.clone(), 8).inspect(&query).await;
//! let report = Terminator::new(registry, TerminatorConfig::default())
//!     .terminate(&inspection.inventory, &Selection::all())
//!     .await;
//! ```

pub mod aws;
pub mod config;
pub mod handlers;
pub mod inspector;
pub mod inventory;
pub mod outcome;
pub mod query;
pub mod report;
pub mod terminator;

pub use handlers::{HandlerRegistry, ResourceHandler, UndatedPolicy};
pub use inspector::{InspectError, Inspection, Inspector, ListError};
pub use inventory::{Inventory, InventoryBuilder, RegionView};
pub use outcome::{DestroyError, DestroyOptions, DestroyOutcome, SkipReason};
pub use query::{Query, QueryError, QueryParams, ScopeDimension};
pub use report::{OutcomeReport, ReportEntry};
pub use terminator::{Selection, Terminator, TerminatorConfig};
