//! Asset migration planning for keyport.
//!
//! Turns a snapshot of token holdings into the index-aligned batch of
//! contract calls that moves them to a destination address.
//!
//! # Modules
//!
//! - [`inventory`]: holdings snapshot and the inventory collaborator
//! - [`abi`]: Solidity ABI encoding of the transfer calls
//! - [`batch`]: the compiled call batch ([`batch::TransactionDatas`])
//! - [`planner`]: deterministic snapshot → batch compilation

pub mod abi;
pub mod batch;
pub mod inventory;
pub mod planner;
