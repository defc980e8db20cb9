//! Glue between the engine and the external payment rails. The engine only ever sees verified outcomes; fetching and
//! checking those outcomes happens here.
pub mod solana;
pub mod stripe;
