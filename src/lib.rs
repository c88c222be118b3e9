//! Spritemapper - group CSS sprite references into spritemaps and rewrite
//! stylesheet declarations against packed sprite positions.
//!
//! This library provides functionality to:
//! - Tokenize stylesheets into a flat lexical event stream
//! - Collect `background` image references into named spritemap groups
//! - Rewrite matched declarations to point at the generated sheet plus a
//!   pixel offset, once an external packer has assigned positions

pub mod cli;
pub mod collector;
pub mod config;
pub mod css;
pub mod finder;
pub mod mapper;
pub mod models;
pub mod replacer;
