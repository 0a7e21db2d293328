//! pd-search
//!
//! Search & presentation controller: holds the loaded playgrounds, applies the
//! ZIP filter, caches reviews per playground and manages the review draft.

pub mod controller;
pub mod draft;
pub mod state;

pub use controller::{Controller, SubmitOutcome};
pub use draft::{Draft, Submission};
pub use state::{FetchOutcome, LoadStatus, LoadTicket, ReviewsTicket, SearchState};
