#![doc = "oss-deploy-core: core logic library for oss-deploy."]

//! This crate contains the whole deployment decision flow: which branch is
//! deploying, whether anything changed, which credentials apply, and what gets
//! uploaded. External tools (`git`, `ossutil`) sit behind the traits in
//! [`contract`], so everything above them can be tested with mocks.
//!
//! # Usage
//! Build a [`config::DeployConfig`], capture an [`environment::Environment`], and
//! call [`deploy::deploy`] with a [`git::GitCli`] and an [`ossutil::OssUtil`].

pub mod branch;
pub mod change;
pub mod config;
pub mod contract;
pub mod credentials;
pub mod deploy;
pub mod environment;
pub mod error;
pub mod exec;
pub mod git;
pub mod ossutil;
pub mod staging;
