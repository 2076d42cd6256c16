//! SQLite-backed contact storage for Nova.
//!
//! This crate owns the HCP (healthcare professional) contact list: who the
//! sales team can reach out to, where they practice, and whether they have
//! already been contacted. Tool implementations in other crates consult and
//! update this store; it is the one piece of mutable shared state in the
//! system, so every operation goes through a mutex-guarded SQLite connection
//! rather than rewriting a flat file.
//!
//! # Core concepts
//!
//! - [`ContactStore`] — the storage interface: filtered queries, contact
//!   marking, and CSV seed import.
//! - [`HcpRecord`] — one contact: id, name, specialty, city, preferred
//!   channel, contacted flag.
//! - [`HcpFilter`] — exact-match query filter over specialty, city, and
//!   contacted state.
//!
//! # Example
//!
//! ```no_run
//! use storage::{ContactStore, HcpFilter};
//!
//! let store = ContactStore::open("hcps.db")?;
//! store.import_csv("data/hcp_sample.csv")?;
//!
//! let berlin_cardiologists = store.find(
//!     &HcpFilter::default().specialty("Cardiology").city("Berlin"),
//! )?;
//! for hcp in berlin_cardiologists {
//!     println!("{} ({})", hcp.name, hcp.preferred_channel);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod hcp;
mod store;

pub use error::{Error, Result};
pub use hcp::{HcpFilter, HcpRecord};
pub use store::ContactStore;
