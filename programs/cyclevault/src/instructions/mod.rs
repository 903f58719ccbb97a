// programs/cyclevault/src/instructions/mod.rs

pub mod admin;
pub mod claims;
pub mod cycle;
pub mod initialize;
pub mod requests;

pub use admin::*;
pub use claims::*;
pub use cycle::*;
pub use initialize::*;
pub use requests::*;
