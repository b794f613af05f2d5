//! FxFlow Common Types
//!
//! Shared types for the FxFlow rate pipeline: currencies and pairs, the
//! effective-date derivation, storage partition keys, persisted records and
//! the error taxonomy every stage reports through.

pub mod currency;
pub mod error;
pub mod partition;
pub mod records;
pub mod time;

pub use currency::*;
pub use error::*;
pub use partition::*;
pub use records::*;
pub use time::*;
