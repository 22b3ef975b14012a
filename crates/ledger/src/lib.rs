//! Treatment-plan ledger.
//!
//! An ordered plan of priced service lines, subtotal markers and free-text
//! comments sharing one dense ordering key. Pure in-memory domain logic: the
//! catalog, persistence and document rendering are collaborators that talk to
//! this crate through [`ServiceTemplate`], [`LedgerRecord`] and
//! [`LedgerSnapshot`].

pub mod config;
pub mod export;
pub mod item;
pub mod ledger;
pub mod record;
pub mod session;
pub mod totals;

pub use config::LedgerConfig;
pub use export::{DocumentLine, LedgerSnapshot, PlanExporter};
pub use item::{
    Comment, ItemKind, LineItem, Service, ServiceOptions, ServiceTemplate, SubtotalMarker,
    ToothId,
};
pub use ledger::{Ledger, DEFAULT_SUBTOTAL_LABEL};
pub use record::{CommentRecord, LedgerRecord, ServiceRecord, SubtotalRecord};
pub use session::LedgerSession;
pub use totals::Section;
