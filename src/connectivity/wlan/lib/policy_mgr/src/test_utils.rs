// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fake collaborators shared by the unit tests.

use {
    crate::{
        channel::{is_24ghz, ApPowerType, BandPriority, ChannelState, PclEntry},
        config::PolicyMgrConfig,
        connection_table::ConnectionTable,
        error::ProviderError,
        policy_manager::{PolicyManagerContext, PolicyState, Providers},
        providers::{
            ChannelAvoidanceProvider, ConcurrencyCheck, ConfigProvider, MccToSccSwitch,
            PclConsumer, RadioCapabilityProvider, RegulatoryProvider, VdevProvider,
        },
        types::{ChainMask, Connection, Mode, VdevId},
    },
    parking_lot::Mutex,
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
    },
};

/// Frequencies at or above this land on the second 5 GHz MAC of an SBS capable radio.
const SBS_SPLIT_FREQ: u32 = 5500;

pub fn connection(mode: Mode, freq: u32, vdev: u8) -> Connection {
    Connection::new(mode, freq, ChainMask::TwoTwo, VdevId(vdev))
}

#[derive(Clone, Debug)]
pub struct FakeRadio {
    pub dbs: bool,
    pub sbs: bool,
    pub dbs_allowed: bool,
}

impl FakeRadio {
    pub fn single_mac() -> Self {
        FakeRadio { dbs: false, sbs: false, dbs_allowed: false }
    }

    pub fn dbs() -> Self {
        FakeRadio { dbs: true, sbs: false, dbs_allowed: true }
    }

    pub fn dbs_and_sbs() -> Self {
        FakeRadio { dbs: true, sbs: true, dbs_allowed: true }
    }

    fn mac_of(&self, freq: u32) -> u8 {
        if !self.dbs || is_24ghz(freq) {
            0
        } else if self.sbs && freq >= SBS_SPLIT_FREQ {
            2
        } else {
            1
        }
    }
}

impl RadioCapabilityProvider for FakeRadio {
    fn is_hw_dbs_capable(&self) -> bool {
        self.dbs
    }

    fn is_hw_sbs_capable(&self) -> bool {
        self.sbs
    }

    fn are_freqs_on_same_mac(&self, freq1: u32, freq2: u32) -> bool {
        self.mac_of(freq1) == self.mac_of(freq2)
    }

    fn is_dbs_allowed_for_mode(&self, _mode: Mode) -> bool {
        self.dbs_allowed
    }
}

/// Regulatory state keyed by frequency. Channels outside `channels` are invalid.
#[derive(Clone, Debug, Default)]
pub struct FakeRegulatory {
    pub channels: Vec<u32>,
    pub dfs: HashSet<u32>,
    pub secondary_dfs: HashSet<u32>,
    pub disabled: HashSet<u32>,
    pub secondary_disabled: HashSet<u32>,
    pub passive: HashSet<u32>,
    pub indoor: HashSet<u32>,
    pub secondary_indoor: HashSet<u32>,
    pub srd: HashSet<u32>,
    pub ap_power: HashMap<u8, ApPowerType>,
}

impl FakeRegulatory {
    pub fn new(channels: &[u32]) -> Self {
        FakeRegulatory { channels: channels.to_vec(), ..Default::default() }
    }

    /// DFS for both clients and beaconing interfaces.
    pub fn dfs(mut self, freqs: &[u32]) -> Self {
        self.dfs.extend(freqs);
        self.secondary_dfs.extend(freqs);
        self
    }

    pub fn secondary_dfs(mut self, freqs: &[u32]) -> Self {
        self.secondary_dfs.extend(freqs);
        self
    }

    pub fn disabled(mut self, freqs: &[u32]) -> Self {
        self.disabled.extend(freqs);
        self
    }

    pub fn secondary_disabled(mut self, freqs: &[u32]) -> Self {
        self.secondary_disabled.extend(freqs);
        self
    }

    pub fn passive(mut self, freqs: &[u32]) -> Self {
        self.passive.extend(freqs);
        self
    }

    pub fn indoor(mut self, freqs: &[u32]) -> Self {
        self.indoor.extend(freqs);
        self.secondary_indoor.extend(freqs);
        self
    }

    pub fn secondary_indoor(mut self, freqs: &[u32]) -> Self {
        self.secondary_indoor.extend(freqs);
        self
    }

    pub fn srd(mut self, freqs: &[u32]) -> Self {
        self.srd.extend(freqs);
        self
    }

    pub fn ap_power(mut self, vdev: u8, power_type: ApPowerType) -> Self {
        self.ap_power.insert(vdev, power_type);
        self
    }

    fn state_of(&self, freq: u32, disabled: &HashSet<u32>, dfs: &HashSet<u32>) -> ChannelState {
        if !self.channels.contains(&freq) {
            ChannelState::Invalid
        } else if disabled.contains(&freq) {
            ChannelState::Disable
        } else if dfs.contains(&freq) {
            ChannelState::Dfs
        } else {
            ChannelState::Enable
        }
    }
}

impl RegulatoryProvider for FakeRegulatory {
    fn valid_channel_list(&self) -> Vec<u32> {
        self.channels.clone()
    }

    fn channel_state(&self, freq: u32) -> ChannelState {
        self.state_of(freq, &self.disabled, &self.dfs)
    }

    fn secondary_channel_state(&self, freq: u32) -> ChannelState {
        self.state_of(freq, &self.secondary_disabled, &self.secondary_dfs)
    }

    fn is_passive(&self, freq: u32) -> bool {
        self.passive.contains(&freq)
    }

    fn is_indoor(&self, freq: u32) -> bool {
        self.indoor.contains(&freq)
    }

    fn is_indoor_in_secondary_list(&self, freq: u32) -> bool {
        self.secondary_indoor.contains(&freq)
    }

    fn is_etsi13_srd(&self, freq: u32) -> bool {
        self.srd.contains(&freq)
    }

    fn ap_power_type(&self, vdev_id: VdevId) -> Result<ApPowerType, ProviderError> {
        self.ap_power.get(&vdev_id.0).copied().ok_or(ProviderError::VdevNotFound(vdev_id.0))
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakeAvoidance {
    pub unsafe_channels: Vec<u32>,
    pub restriction_mask: u32,
}

impl ChannelAvoidanceProvider for FakeAvoidance {
    fn unsafe_channels(&self) -> Vec<u32> {
        self.unsafe_channels.clone()
    }

    fn restriction_mask(&self) -> u32 {
        self.restriction_mask
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FakeVdev {
    pub link_sta: bool,
    pub mlo: bool,
    pub dnsc: bool,
    pub ap_6ghz_capable: bool,
}

/// Vdevs not listed behave as plain default vdevs; vdevs in `missing` fail every lookup.
#[derive(Clone, Debug, Default)]
pub struct FakeVdevs {
    pub vdevs: HashMap<u8, FakeVdev>,
    pub missing: HashSet<u8>,
}

impl FakeVdevs {
    fn lookup(&self, vdev_id: VdevId) -> Result<FakeVdev, ProviderError> {
        if self.missing.contains(&vdev_id.0) {
            return Err(ProviderError::VdevNotFound(vdev_id.0));
        }
        Ok(self.vdevs.get(&vdev_id.0).copied().unwrap_or_default())
    }
}

impl VdevProvider for FakeVdevs {
    fn is_link_sta_vdev(&self, vdev_id: VdevId) -> Result<bool, ProviderError> {
        Ok(self.lookup(vdev_id)?.link_sta)
    }

    fn is_mlo_vdev(&self, vdev_id: VdevId) -> Result<bool, ProviderError> {
        Ok(self.lookup(vdev_id)?.mlo)
    }

    fn is_dnsc_set(&self, vdev_id: VdevId) -> Result<bool, ProviderError> {
        Ok(self.lookup(vdev_id)?.dnsc)
    }

    fn is_ap_6ghz_capable(&self, vdev_id: VdevId) -> bool {
        self.lookup(vdev_id).map(|vdev| vdev.ap_6ghz_capable).unwrap_or(false)
    }
}

/// Admits exactly the frequencies in `allowed`, recording how many connections it saw.
#[derive(Clone, Debug, Default)]
pub struct FakeConcurrencyCheck {
    pub allowed: HashSet<u32>,
    pub seen_counts: Arc<Mutex<Vec<usize>>>,
}

impl ConcurrencyCheck for FakeConcurrencyCheck {
    fn is_concurrency_allowed(&self, connections: &ConnectionTable, _mode: Mode, freq: u32) -> bool {
        self.seen_counts.lock().push(connections.count());
        self.allowed.contains(&freq)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FakePclConsumer {
    pub calls: Arc<Mutex<Vec<(VdevId, Mode, Vec<PclEntry>)>>>,
}

impl PclConsumer for FakePclConsumer {
    fn set_pcl(&self, vdev_id: VdevId, mode: Mode, pcl: &[PclEntry]) {
        self.calls.lock().push((vdev_id, mode, pcl.to_vec()));
    }
}

/// Items of `FakeConfig` that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigItem {
    DfsMasterCapable,
    IndoorChannelSupport,
}

/// Serves `config`, except that the items in `unavailable` fail to load.
#[derive(Clone, Debug, Default)]
pub struct FakeConfig {
    pub config: PolicyMgrConfig,
    pub unavailable: HashSet<ConfigItem>,
}

impl FakeConfig {
    fn load(&self, item: ConfigItem, name: &'static str) -> Result<(), ProviderError> {
        if self.unavailable.contains(&item) {
            return Err(ProviderError::ConfigUnavailable(name));
        }
        Ok(())
    }
}

impl ConfigProvider for FakeConfig {
    fn conc_system_pref(&self) -> u8 {
        self.config.conc_system_pref()
    }

    fn pcl_band_priority(&self) -> BandPriority {
        self.config.pcl_band_priority()
    }

    fn dfs_master_capable(&self) -> Result<bool, ProviderError> {
        self.load(ConfigItem::DfsMasterCapable, "dfs_master_capable")?;
        self.config.dfs_master_capable()
    }

    fn indoor_channel_support(&self) -> Result<bool, ProviderError> {
        self.load(ConfigItem::IndoorChannelSupport, "indoor_channel_support")?;
        self.config.indoor_channel_support()
    }

    fn sta_sap_scc_on_dfs_chan(&self) -> bool {
        self.config.sta_sap_scc_on_dfs_chan()
    }

    fn sta_sap_scc_on_indoor_chan(&self) -> bool {
        self.config.sta_sap_scc_on_indoor_chan()
    }

    fn sta_sap_scc_on_lte_coex_chan(&self) -> bool {
        self.config.sta_sap_scc_on_lte_coex_chan()
    }

    fn mcc_to_scc_switch(&self) -> MccToSccSwitch {
        self.config.mcc_to_scc_switch()
    }

    fn srd_master_mode(&self, mode: Mode) -> bool {
        self.config.srd_master_mode(mode)
    }

    fn same_band_sta_allowed(&self) -> bool {
        self.config.same_band_sta_allowed()
    }

    fn skip_6g_and_indoor_freq(&self) -> bool {
        self.config.skip_6g_and_indoor_freq()
    }

    fn sap_mandatory_channels(&self) -> Vec<u32> {
        self.config.sap_mandatory_channels()
    }

    fn user_config_sap_freq(&self, vdev_id: VdevId) -> Option<u32> {
        self.config.user_config_sap_freq(vdev_id)
    }

    fn supports_fourth_connection(&self) -> bool {
        self.config.supports_fourth_connection()
    }

    fn supports_mlo(&self) -> bool {
        self.config.supports_mlo()
    }
}

/// Builder for a policy manager wired to fakes. Tests tweak the public fields before calling
/// `state` or `context`.
pub struct TestValues {
    pub radio: FakeRadio,
    pub regulatory: FakeRegulatory,
    pub avoidance: FakeAvoidance,
    pub config: PolicyMgrConfig,
    pub unavailable_config: HashSet<ConfigItem>,
    pub vdevs: FakeVdevs,
    pub concurrency: FakeConcurrencyCheck,
    pub pcl_consumer: FakePclConsumer,
}

impl TestValues {
    pub fn new(channels: &[u32]) -> Self {
        TestValues {
            radio: FakeRadio::dbs_and_sbs(),
            regulatory: FakeRegulatory::new(channels),
            avoidance: FakeAvoidance::default(),
            config: PolicyMgrConfig { dfs_master_capable: true, ..Default::default() },
            unavailable_config: HashSet::new(),
            vdevs: FakeVdevs::default(),
            concurrency: FakeConcurrencyCheck::default(),
            pcl_consumer: FakePclConsumer::default(),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            radio: Box::new(self.radio.clone()),
            regulatory: Box::new(self.regulatory.clone()),
            avoidance: Box::new(self.avoidance.clone()),
            config: Box::new(FakeConfig {
                config: self.config.clone(),
                unavailable: self.unavailable_config.clone(),
            }),
            vdevs: Box::new(self.vdevs.clone()),
            concurrency: Box::new(self.concurrency.clone()),
            pcl_consumer: Box::new(self.pcl_consumer.clone()),
        }
    }

    pub(crate) fn state(&self, connections: &[Connection]) -> (PolicyState, Providers) {
        let providers = self.providers();
        let mut state = PolicyState::new(&providers);
        for c in connections {
            state.connections.add(*c).expect("failed to add connection");
        }
        (state, providers)
    }

    pub fn context(&self) -> PolicyManagerContext {
        PolicyManagerContext::new(self.providers())
    }

    pub fn context_with(&self, connections: &[Connection]) -> PolicyManagerContext {
        let context = self.context();
        for c in connections {
            context.add_connection(*c).expect("failed to add connection");
        }
        context
    }
}
