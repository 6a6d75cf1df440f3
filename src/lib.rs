//! Resume and job description match analysis.
//!
//! Uploaded resumes are reduced to text, paired with a job description and
//! scored by a local language model in the background. Callers poll the job
//! until it reaches `completed` or `failed`.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
