pub mod ast_source;
pub mod breadcrumb;
pub mod classifier;
pub mod config;
pub mod data_core;
pub mod json_view;
pub mod locator;
pub mod path;
pub mod performance;
pub mod shadow_tree;
pub mod text;
pub mod tree;
pub mod walk;
