//! Work partitioning across live service instances.
//!
//! Every instance builds the same consistent-hash ring from the registry's
//! live set and answers "am I responsible for key K?" locally. There is no
//! global leader election; disagreement during a membership change is
//! transient and bounded by the ring refresh cadence.

mod assignment;
mod ring;

pub use assignment::AssignmentManager;
pub use ring::HashRing;
