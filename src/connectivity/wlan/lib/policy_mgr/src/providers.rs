// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Interfaces to the collaborators the policy manager consults. All of them are synchronous,
//! cached lookups; none of them may call back into the policy manager.

use {
    crate::{
        channel::{is_24ghz, ApPowerType, BandPriority, ChannelState, PclEntry},
        connection_table::ConnectionTable,
        error::ProviderError,
        types::{Mode, VdevId},
    },
    serde::{Deserialize, Serialize},
};

/// Hardware capabilities of the radio and the mapping of frequencies onto its MACs.
pub trait RadioCapabilityProvider {
    fn is_hw_dbs_capable(&self) -> bool;
    fn is_hw_sbs_capable(&self) -> bool;
    /// Whether two frequencies would be served by the same physical MAC.
    fn are_freqs_on_same_mac(&self, freq1: u32, freq2: u32) -> bool;
    /// Per-mode policy on whether a DBS hardware mode may be used for this concurrency.
    fn is_dbs_allowed_for_mode(&self, mode: Mode) -> bool;

    /// Two non-2.4 GHz frequencies that land on different MACs of an SBS capable radio.
    fn are_sbs_freqs(&self, freq1: u32, freq2: u32) -> bool {
        self.is_hw_sbs_capable()
            && !is_24ghz(freq1)
            && !is_24ghz(freq2)
            && !self.are_freqs_on_same_mac(freq1, freq2)
    }
}

/// Regulatory channel state. The primary list reflects client rules, the secondary list the
/// rules for beaconing interfaces.
pub trait RegulatoryProvider {
    /// Center frequencies of the current regulatory channel list, in regulatory order.
    fn valid_channel_list(&self) -> Vec<u32>;
    fn channel_state(&self, freq: u32) -> ChannelState;
    fn secondary_channel_state(&self, freq: u32) -> ChannelState;
    fn is_passive(&self, freq: u32) -> bool;
    fn is_indoor(&self, freq: u32) -> bool;
    fn is_indoor_in_secondary_list(&self, freq: u32) -> bool;
    fn is_etsi13_srd(&self, freq: u32) -> bool;
    /// Power type of the 6 GHz AP the given client vdev is associated with.
    fn ap_power_type(&self, vdev_id: VdevId) -> Result<ApPowerType, ProviderError>;

    fn is_dfs(&self, freq: u32) -> bool {
        self.channel_state(freq) == ChannelState::Dfs
    }

    fn is_dfs_in_secondary_list(&self, freq: u32) -> bool {
        self.secondary_channel_state(freq) == ChannelState::Dfs
    }

    fn is_disabled_in_secondary_list(&self, freq: u32) -> bool {
        self.secondary_channel_state(freq) == ChannelState::Disable
    }

    fn is_passive_or_disabled(&self, freq: u32) -> bool {
        self.is_passive(freq) || self.channel_state(freq) == ChannelState::Disable
    }
}

/// Source of the channels currently avoided for coexistence reasons.
pub trait ChannelAvoidanceProvider {
    fn unsafe_channels(&self) -> Vec<u32>;
    fn restriction_mask(&self) -> u32;
}

/// How aggressively a SAP is moved onto a concurrent STA's channel.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum MccToSccSwitch {
    Disable,
    WithoutDisconnection,
    WithDisconnection,
    ForceWithoutDisconnection,
    WithFavoriteChannel,
    ForcePreferredWithoutDisconnection,
    WithPreferredBand,
}

impl MccToSccSwitch {
    pub fn is_force_scc(self) -> bool {
        matches!(
            self,
            MccToSccSwitch::ForceWithoutDisconnection
                | MccToSccSwitch::WithFavoriteChannel
                | MccToSccSwitch::ForcePreferredWithoutDisconnection
                | MccToSccSwitch::WithPreferredBand
        )
    }
}

impl Default for MccToSccSwitch {
    fn default() -> Self {
        MccToSccSwitch::Disable
    }
}

/// Policy configuration consulted while computing a PCL.
pub trait ConfigProvider {
    /// Raw system preference: 0 throughput, 1 powersave, 2 latency.
    fn conc_system_pref(&self) -> u8;
    fn pcl_band_priority(&self) -> BandPriority;
    fn dfs_master_capable(&self) -> Result<bool, ProviderError>;
    fn indoor_channel_support(&self) -> Result<bool, ProviderError>;
    fn sta_sap_scc_on_dfs_chan(&self) -> bool;
    fn sta_sap_scc_on_indoor_chan(&self) -> bool;
    fn sta_sap_scc_on_lte_coex_chan(&self) -> bool;
    fn mcc_to_scc_switch(&self) -> MccToSccSwitch;
    /// Whether SRD channels may be used by a beaconing interface of this mode.
    fn srd_master_mode(&self, mode: Mode) -> bool;
    fn same_band_sta_allowed(&self) -> bool;
    fn skip_6g_and_indoor_freq(&self) -> bool;
    fn sap_mandatory_channels(&self) -> Vec<u32>;
    fn user_config_sap_freq(&self, vdev_id: VdevId) -> Option<u32>;
    fn supports_fourth_connection(&self) -> bool;
    fn supports_mlo(&self) -> bool;

    fn is_force_scc(&self) -> bool {
        self.mcc_to_scc_switch().is_force_scc()
    }
}

/// Per-vdev attributes owned by the interface layer.
pub trait VdevProvider {
    fn is_link_sta_vdev(&self, vdev_id: VdevId) -> Result<bool, ProviderError>;
    fn is_mlo_vdev(&self, vdev_id: VdevId) -> Result<bool, ProviderError>;
    /// Whether the "do not switch channel" flag is set on a beaconing vdev.
    fn is_dnsc_set(&self, vdev_id: VdevId) -> Result<bool, ProviderError>;
    fn is_ap_6ghz_capable(&self, vdev_id: VdevId) -> bool;
}

/// Admission check used to grade channels outside the PCL.
pub trait ConcurrencyCheck {
    /// Whether a new connection of `mode` on `freq` would be admitted given `connections`.
    fn is_concurrency_allowed(&self, connections: &ConnectionTable, mode: Mode, freq: u32) -> bool;
}

/// Consumer of PCLs recomputed for existing STA connections.
pub trait PclConsumer {
    fn set_pcl(&self, vdev_id: VdevId, mode: Mode, pcl: &[PclEntry]);
}
