//! Domain tools for the outreach agent: practitioner discovery, literature
//! search, outreach generation, and contact-store bindings.
//!
//! [`build_registry`] assembles the fixed tool set over the collaborating
//! clients; everything the model can do goes through it.

mod error;
mod handlers;
pub mod outreach;
pub mod places;
pub mod pubmed;

pub use error::{Error, Result};
pub use handlers::build_registry;
pub use outreach::OutreachWriter;
pub use places::{PlacesClient, Practitioner};
pub use pubmed::{Article, PubMedClient};
