//! Step-scoped Result Store (§3, §6.3) and the `ToDict` export contract domain
//! result types implement to participate in it.

pub mod domain;
pub mod error;
pub mod json;
pub mod store;

pub use error::{ResultsError, ResultsResult};
pub use json::{safe_number, ToDict};
pub use store::{ResultStore, ScenarioSnapshot};
