//! Markdown text utilities and the default node renderer.
//!
//! Everything here is a pure `&str -> String` transform: cell escaping and
//! tables ([`escape`]), heading anchors ([`anchor`]), normalization passes
//! ([`cleanup`]) and [`render_node`], which turns one node into a
//! self-contained document body.

pub mod anchor;
pub mod cleanup;
pub mod escape;
mod render;

pub use anchor::{AnchorSet, anchor_for};
pub use cleanup::{demote_headings, tidy};
pub use escape::{code_span, escape_cell, table, truncate};
pub use render::render_node;
