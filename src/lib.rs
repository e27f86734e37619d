//! Operator console for a remote liquidity-management bot.
//!
//! The bot itself runs elsewhere; this crate polls its REST surface, keeps a
//! consistent local snapshot, and issues start/stop commands.

pub mod common;
pub mod dashboard;
