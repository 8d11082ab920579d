//! Query layer over the Xerophyta gene database: gene search with per-token
//! accounting, expression retrieval with a DEG filter, cascading gene
//! deletion, tabular ingestion and CSV / FASTA export.

pub mod app;
pub mod config;
pub mod db;
pub mod deletion;
pub mod domain;
pub mod error;
pub mod export;
pub mod expression;
pub mod ingest;
pub mod models;
pub mod output;
pub mod query;
pub mod schema;
pub mod tokens;
