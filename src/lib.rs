pub mod config;
pub mod error;
pub mod llm;
pub mod parsing;
pub mod project;
pub mod runner;
pub mod runtime;
pub mod tree;
pub mod visual;
pub mod workflow;
