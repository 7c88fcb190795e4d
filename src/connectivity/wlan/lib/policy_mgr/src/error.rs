// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::types::Mode, std::fmt, thiserror::Error};

/// A stage of the PCL filter pipeline. Carried by `PolicyError::FilterFailed` so callers can tell
/// which stage could not be evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStage {
    Mandatory,
    Nol,
    Dfs,
    Srd,
    Indoor,
    Passive,
    SixGhz,
    EnabledChannels,
    Dnbs,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterStage::Mandatory => "mandatory",
            FilterStage::Nol => "nol",
            FilterStage::Dfs => "dfs",
            FilterStage::Srd => "srd",
            FilterStage::Indoor => "indoor",
            FilterStage::Passive => "passive",
            FilterStage::SixGhz => "6ghz",
            FilterStage::EnabledChannels => "enabled channels",
            FilterStage::Dnbs => "dnbs",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by the injected collaborators when they are unable to answer a query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("vdev {0} is not present")]
    VdevNotFound(u8),
    #[error("unable to read configuration item {0}")]
    ConfigUnavailable(&'static str),
}

/// Errors surfaced by the policy manager.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy manager context is not initialized")]
    ContextUnavailable,
    #[error("invalid connection mode {0:?}")]
    InvalidMode(Mode),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no pcl table entry for {connections} existing connection(s), requested mode {mode:?}")]
    TableLookupMiss { connections: usize, mode: Mode },
    #[error("no valid channels")]
    NoValidChannels,
    #[error("{stage} filter failed: {source}")]
    FilterFailed {
        stage: FilterStage,
        #[source]
        source: Box<PolicyError>,
    },
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl PolicyError {
    pub(crate) fn filter_failed(stage: FilterStage, source: PolicyError) -> Self {
        PolicyError::FilterFailed { stage, source: Box::new(source) }
    }
}
