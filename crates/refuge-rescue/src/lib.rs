//! # refuge-rescue
//!
//! Data-layer services behind the non-chat screens: browsing and posting
//! adoptable pets, filing stray reports with GPS location, and the
//! volunteer approval workflow for adoption applications.
//!
//! Every operation is a pass-through call to the backend store traits,
//! with role and state checks applied at this boundary.

pub mod approvals;
pub mod pets;
pub mod reports;

mod error;

pub use approvals::AdoptionDesk;
pub use error::RescueError;
pub use pets::{PetDirectory, PetDraft, PetFilter};
pub use reports::ReportDesk;
