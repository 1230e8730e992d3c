//! §4.2 Path Engine: edge-selection policies, SPF, KSP, and path enumeration.

pub mod bundle;
pub mod ksp;
pub mod select;
pub mod spf;

pub use bundle::{Path, PathBundle, PathStep};
pub use ksp::{k_shortest_paths, KspConfig};
pub use select::EdgeSelection;
pub use spf::{spf as shortest_path_first, SpfTree};
