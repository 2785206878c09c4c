pub mod blend;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod markets;
pub mod pick;
pub mod predict;
pub mod print;
pub mod rating;
pub mod scoregrid;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
