//! Account linking
//!
//! Hands out single-use, expiring capability tokens and tracks which
//! subjects have completed the out-of-band linking flow. The token that the
//! chat side issues is redeemed by the linking website through the callback
//! API, so the state here is shared by both request paths.

mod clock;
mod manager;
mod store;
mod sweeper;
mod token;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use clock::{Clock, SystemClock};
#[allow(unused_imports)]
pub use manager::{LinkError, LinkSessionManager};
#[allow(unused_imports)]
pub use store::{LinkStore, MemoryLinkStore};
pub use sweeper::run_sweeper;
#[allow(unused_imports)]
pub use token::{fingerprint, LinkToken, SubjectId};
