// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        channel::{list_has_24ghz_channel, BandPriority},
        error::{PolicyError, ProviderError},
        providers::{ConfigProvider, MccToSccSwitch},
        types::{Mode, VdevId},
    },
    anyhow::{Context, Error},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Concurrency policy configuration. Loaded from JSON; any field left out takes its default.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PolicyMgrConfig {
    /// 0 favours throughput, 1 power save and 2 latency.
    pub conc_system_pref: u8,
    pub pcl_band_priority: BandPriority,
    /// Whether the driver may start a beaconing interface on a DFS channel.
    pub dfs_master_capable: bool,
    pub indoor_channel_support: bool,
    /// Allow a SAP to share a DFS channel with a connected STA.
    pub sta_sap_scc_on_dfs_chan: bool,
    /// Allow a SAP to share an indoor channel with a connected STA.
    pub sta_sap_scc_on_indoor_chan: bool,
    /// Allow a SAP to share an LTE-coex unsafe channel with a connected STA.
    pub sta_sap_scc_on_lte_coex_chan: bool,
    pub mcc_to_scc_switch: MccToSccSwitch,
    pub srd_master_mode_for_sap: bool,
    pub srd_master_mode_for_go: bool,
    pub same_band_sta_allowed: bool,
    /// Keep STAs off 6 GHz and indoor channels while a SAP is up on single MAC hardware.
    pub skip_6g_and_indoor_freq: bool,
    pub sap_mandatory_channels: Vec<u32>,
    /// Channel the user configured for a SAP, keyed by vdev id.
    pub user_config_sap_freq: HashMap<u8, u32>,
    pub supports_fourth_connection: bool,
    pub supports_mlo: bool,
}

impl PolicyMgrConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_slice(data).context("failed to parse policy manager config")?;
        config.validate().context("invalid policy manager config")?;
        Ok(config)
    }

    /// Rejects values the policy manager cannot act on.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.conc_system_pref > 2 {
            return Err(PolicyError::Config(format!(
                "unknown system preference {}",
                self.conc_system_pref
            )));
        }
        if !self.sap_mandatory_channels.is_empty()
            && !list_has_24ghz_channel(&self.sap_mandatory_channels)
        {
            return Err(PolicyError::Config(
                "mandatory channel list has no 2.4 GHz channel".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).context("failed to serialize policy manager config")
    }
}

impl ConfigProvider for PolicyMgrConfig {
    fn conc_system_pref(&self) -> u8 {
        self.conc_system_pref
    }

    fn pcl_band_priority(&self) -> BandPriority {
        self.pcl_band_priority
    }

    fn dfs_master_capable(&self) -> Result<bool, ProviderError> {
        Ok(self.dfs_master_capable)
    }

    fn indoor_channel_support(&self) -> Result<bool, ProviderError> {
        Ok(self.indoor_channel_support)
    }

    fn sta_sap_scc_on_dfs_chan(&self) -> bool {
        self.sta_sap_scc_on_dfs_chan
    }

    fn sta_sap_scc_on_indoor_chan(&self) -> bool {
        self.sta_sap_scc_on_indoor_chan
    }

    fn sta_sap_scc_on_lte_coex_chan(&self) -> bool {
        self.sta_sap_scc_on_lte_coex_chan
    }

    fn mcc_to_scc_switch(&self) -> MccToSccSwitch {
        self.mcc_to_scc_switch
    }

    fn srd_master_mode(&self, mode: Mode) -> bool {
        match mode {
            Mode::Sap => self.srd_master_mode_for_sap,
            Mode::P2pGo => self.srd_master_mode_for_go,
            _ => false,
        }
    }

    fn same_band_sta_allowed(&self) -> bool {
        self.same_band_sta_allowed
    }

    fn skip_6g_and_indoor_freq(&self) -> bool {
        self.skip_6g_and_indoor_freq
    }

    fn sap_mandatory_channels(&self) -> Vec<u32> {
        self.sap_mandatory_channels.clone()
    }

    fn user_config_sap_freq(&self, vdev_id: VdevId) -> Option<u32> {
        self.user_config_sap_freq.get(&vdev_id.0).copied()
    }

    fn supports_fourth_connection(&self) -> bool {
        self.supports_fourth_connection
    }

    fn supports_mlo(&self) -> bool {
        self.supports_mlo
    }
}
