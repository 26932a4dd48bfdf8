// SPDX-License-Identifier: MIT

//! Client library for the AI portal backend.
//!
//! Owns the workflow graph editor state and the request protocols the portal
//! speaks to its remote executor; all execution happens server-side.

pub mod portal;
