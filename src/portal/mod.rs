// SPDX-License-Identifier: MIT

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod graph;
pub mod run;
