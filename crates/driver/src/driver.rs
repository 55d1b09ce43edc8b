//! The vendor-neutral driver interface.
//!
//! Getters and rollback default to [`CoreError::NotImplemented`] so a
//! platform driver only overrides what the device supports.

use std::path::Path;

use async_trait::async_trait;

use asa_core::error::CoreError;
use asa_core::types::{ConfigRetrieval, ConfigSet, Facts, Interfaces, InterfacesIp};

use crate::error::DriverError;

/// Result of loading a candidate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub loaded: bool,
    pub message: String,
}

impl LoadOutcome {
    pub fn loaded(message: impl Into<String>) -> Self {
        Self {
            loaded: true,
            message: message.into(),
        }
    }
}

/// Where a candidate configuration comes from.
#[derive(Debug, Clone, Copy)]
pub enum CandidateSource<'a> {
    File(&'a Path),
    Text(&'a str),
}

#[async_trait]
pub trait NetworkDriver: Send {
    /// Connect and prepare the device for scripted use.
    async fn open(&mut self) -> Result<(), DriverError>;

    /// Disconnect. Calling it on a closed driver is a no-op.
    async fn close(&mut self) -> Result<(), DriverError>;

    fn is_alive(&self) -> bool;

    async fn get_config(&mut self, retrieve: ConfigRetrieval) -> Result<ConfigSet, DriverError>;

    /// Load a full configuration to replace the running one.
    async fn load_replace_candidate(
        &mut self,
        source: CandidateSource<'_>,
    ) -> Result<LoadOutcome, DriverError>;

    /// Load configuration lines to apply on top of the running one.
    async fn load_merge_candidate(
        &mut self,
        source: CandidateSource<'_>,
    ) -> Result<LoadOutcome, DriverError>;

    /// Diff of running config against the candidate; empty when there
    /// is no candidate or no difference.
    async fn compare_config(&mut self) -> Result<String, DriverError>;

    fn discard_config(&mut self);

    async fn commit_config(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError> {
        Err(CoreError::NotImplemented("rollback").into())
    }

    async fn get_facts(&mut self) -> Result<Facts, DriverError> {
        Err(CoreError::NotImplemented("get_facts").into())
    }

    async fn get_interfaces(&mut self) -> Result<Interfaces, DriverError> {
        Err(CoreError::NotImplemented("get_interfaces").into())
    }

    async fn get_interfaces_ip(&mut self) -> Result<InterfacesIp, DriverError> {
        Err(CoreError::NotImplemented("get_interfaces_ip").into())
    }
}
