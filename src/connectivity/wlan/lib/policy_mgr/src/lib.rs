// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Concurrency policy manager for WLAN interfaces sharing one radio. Given the connections that
//! are already up, it computes the preferred channel list (PCL) for a new or existing
//! connection: an ordered, weighted list of frequencies handed to firmware and to channel
//! selection. See [`PolicyManagerContext`] for the entry points.
//!
//! The computation runs in three steps. The existing connections are classified by
//! [`topology`] into a bucket, the bucket and requested mode pick a [`pcl_tables::PclType`], and
//! the type is expanded into channels and then narrowed by regulatory and mode specific filters.

pub mod channel;
pub mod config;
pub mod connection_table;
pub mod error;
mod filters;
pub mod pcl_tables;
pub mod policy_manager;
pub mod providers;
mod resolver;
#[cfg(test)]
mod test_utils;
pub mod topology;
pub mod types;

pub use {
    channel::{ChannelState, PclEntry, PreferredBand},
    config::PolicyMgrConfig,
    error::{FilterStage, PolicyError, ProviderError},
    policy_manager::{AvoidFreqIndication, PolicyManagerContext, Providers, RegulatoryChannel},
    types::{ChainMask, Connection, Mode, VdevId},
};
