//! Core business logic for StudyHub.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `subscription` - Token carryover, billing periods, lifecycle states
//! - `referral` - Award decisions and points ledger arithmetic
//! - `selection` - Grade/subject entitlement validation
//! - `ai_model` - Preference → tier → default model cascade
//! - `events` - Domain events published by the lifecycle use cases

pub mod ai_model;
pub mod events;
pub mod referral;
pub mod selection;
pub mod subscription;
