// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        channel::{
            dump_channel_list, is_24ghz, is_5ghz, is_6ghz, list_has_24ghz_channel, ApPowerType,
            ChannelState, ChannelWidth, PclEntry, PreferredBand, NUM_CHANNELS, PM_24_GHZ_CH_FREQ_6,
            WEIGHT_OF_DISALLOWED_CHANNELS, WEIGHT_OF_GROUP1_PCL_CHANNELS,
            WEIGHT_OF_NON_PCL_CHANNELS,
        },
        connection_table::{
            ConnectionTable, ConnectionTableOwner, StoredConnections,
            DEFAULT_CONC_CONNECTIONS, MAX_NUMBER_OF_CONC_CONNECTIONS,
        },
        error::PolicyError,
        filters::{
            filter_passive_ch, mode_specific_modification,
            modify_pcl_based_on_dnbs, modify_sap_pcl_based_on_mandatory_channel,
        },
        pcl_tables::{
            first_connection_pcl, fourth_connection_pcl, second_connection_pcl,
            third_connection_pcl, PclType,
        },
        providers::{
            ChannelAvoidanceProvider, ConcurrencyCheck, ConfigProvider, PclConsumer,
            RadioCapabilityProvider, RegulatoryProvider, VdevProvider,
        },
        resolver::{self, get_channel_list},
        topology::{fourth_connection_index, second_connection_index, third_connection_index},
        types::{ChainMask, Connection, Mode, SystemPreference, VdevId},
    },
    log::{debug, error, info, warn},
    parking_lot::Mutex,
    static_assertions::assert_impl_all,
};

/// The collaborators a policy manager consults. They are read-only from the policy manager's
/// point of view. Only the `PclConsumer` may call back into it.
pub struct Providers {
    pub radio: Box<dyn RadioCapabilityProvider + Send + Sync>,
    pub regulatory: Box<dyn RegulatoryProvider + Send + Sync>,
    pub avoidance: Box<dyn ChannelAvoidanceProvider + Send + Sync>,
    pub config: Box<dyn ConfigProvider + Send + Sync>,
    pub vdevs: Box<dyn VdevProvider + Send + Sync>,
    pub concurrency: Box<dyn ConcurrencyCheck + Send + Sync>,
    pub pcl_consumer: Box<dyn PclConsumer + Send + Sync>,
}

/// One entry of a regulatory channel list update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegulatoryChannel {
    pub center_freq: u32,
    /// State of the channel for beaconing interfaces.
    pub state: ChannelState,
}

/// Channels to avoid for coexistence, delivered alongside a regulatory update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvoidFreqIndication {
    pub unsafe_channels: Vec<u32>,
    pub restriction_mask: u32,
}

/// Everything guarded by the policy manager lock.
pub(crate) struct PolicyState {
    pub(crate) connections: ConnectionTable,
    /// Cached regulatory channel list usable by beaconing interfaces.
    pub(crate) valid_channels: Vec<u32>,
    pub(crate) unsafe_channels: Vec<u32>,
    pub(crate) restriction_mask: u32,
    pub(crate) sap_mandatory_channels: Vec<u32>,
}

impl PolicyState {
    pub(crate) fn new(providers: &Providers) -> Self {
        let capacity = if providers.config.supports_fourth_connection() {
            MAX_NUMBER_OF_CONC_CONNECTIONS
        } else {
            DEFAULT_CONC_CONNECTIONS
        };
        let regulatory = &providers.regulatory;
        let channels: Vec<RegulatoryChannel> = regulatory
            .valid_channel_list()
            .into_iter()
            .map(|center_freq| RegulatoryChannel {
                center_freq,
                state: regulatory.secondary_channel_state(center_freq),
            })
            .collect();

        let mut state = PolicyState {
            connections: ConnectionTable::new(capacity),
            valid_channels: vec![],
            unsafe_channels: vec![],
            restriction_mask: providers.avoidance.restriction_mask(),
            sap_mandatory_channels: providers.config.sap_mandatory_channels(),
        };
        state.update_valid_channels(&channels);
        state.set_unsafe_channels(&providers.avoidance.unsafe_channels());
        state
    }

    fn update_valid_channels(&mut self, channels: &[RegulatoryChannel]) {
        self.valid_channels = channels
            .iter()
            .take(NUM_CHANNELS)
            .filter(|ch| !matches!(ch.state, ChannelState::Disable | ChannelState::Invalid))
            .map(|ch| ch.center_freq)
            .collect();
    }

    fn set_unsafe_channels(&mut self, channels: &[u32]) {
        self.unsafe_channels = channels.iter().copied().take(NUM_CHANNELS).collect();
    }
}

impl ConnectionTableOwner for PolicyState {
    fn connection_table(&self) -> &ConnectionTable {
        &self.connections
    }

    fn connection_table_mut(&mut self) -> &mut ConnectionTable {
        &mut self.connections
    }
}

fn table_lookup_miss(state: &PolicyState, mode: Mode) -> PolicyError {
    PolicyError::TableLookupMiss { connections: state.connections.count(), mode }
}

/// Picks the PCL type for a new connection of `mode` given the current connections.
fn pcl_type_for(
    state: &PolicyState,
    providers: &Providers,
    mode: Mode,
) -> Result<PclType, PolicyError> {
    let pref = SystemPreference::from_raw(providers.config.conc_system_pref());
    let radio = &*providers.radio;
    let count = state.connections.count();
    debug!("connection count {} requested mode {} pref {:?}", count, mode, pref);

    let pcl = match count {
        0 => first_connection_pcl(mode, pref),
        1 => {
            let bucket = second_connection_index(&state.connections).ok_or_else(|| {
                error!("couldn't find index for 2nd connection pcl table");
                table_lookup_miss(state, mode)
            })?;
            let use_dbs_table = radio.is_hw_dbs_capable() && radio.is_dbs_allowed_for_mode(mode);
            debug!("second connection index {} dbs table {}", bucket, use_dbs_table);
            second_connection_pcl(&bucket, mode, pref, use_dbs_table)
        }
        2 => {
            let bucket = third_connection_index(radio, &state.connections).ok_or_else(|| {
                error!("couldn't find index for 3rd connection pcl table");
                table_lookup_miss(state, mode)
            })?;
            third_connection_pcl(&bucket, mode, pref, radio.is_hw_dbs_capable())
        }
        3 if providers.config.supports_fourth_connection() => {
            if !radio.is_hw_dbs_capable() {
                error!("Can't find index for 4th port pcl table for non dbs capable");
                return Err(table_lookup_miss(state, mode));
            }
            // SAP and P2P GO share the fourth connection policy.
            let table_mode = if mode == Mode::P2pGo { Mode::Sap } else { mode };
            if !matches!(table_mode, Mode::Sta | Mode::Sap | Mode::Ndi) {
                error!("Can't start 4th port if not STA, SAP, NDI");
                return Err(PolicyError::InvalidMode(mode));
            }
            let bucket = fourth_connection_index(&state.connections).ok_or_else(|| {
                error!("Can't find index for 4th port pcl table");
                table_lookup_miss(state, mode)
            })?;
            debug!("Index for 4th port pcl table: {:?}", bucket);
            fourth_connection_pcl(bucket, table_mode, pref)
        }
        _ => {
            error!("unexpected number of connections {}", count);
            return Err(table_lookup_miss(state, mode));
        }
    };
    debug!("pcl type {} for mode {}", pcl, mode);
    Ok(pcl)
}

/// Where a PCL request is in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RequestStage {
    Idle,
    /// Classifying the existing connections and picking a PCL type.
    Bucketing,
    /// Expanding the PCL type into channels.
    Resolving,
    /// Mode specific and DNBS filters.
    Filtering,
    Done,
    Failed,
}

/// One pass of the PCL pipeline. Every stage transition is logged, and a failure records the
/// stage it happened in.
struct PclRequest {
    mode: Mode,
    stage: RequestStage,
    failed_in: Option<RequestStage>,
}

impl PclRequest {
    fn new(mode: Mode) -> Self {
        PclRequest { mode, stage: RequestStage::Idle, failed_in: None }
    }

    fn enter(&mut self, stage: RequestStage) {
        debug!("pcl request for mode {}: {:?} -> {:?}", self.mode, self.stage, stage);
        self.stage = stage;
    }

    fn run(
        &mut self,
        state: &PolicyState,
        providers: &Providers,
    ) -> Result<Vec<PclEntry>, PolicyError> {
        let mode = self.mode;
        self.enter(RequestStage::Bucketing);
        let pcl_type = pcl_type_for(state, providers, mode)?;
        self.enter(RequestStage::Resolving);
        let mut pcl = get_channel_list(state, providers, pcl_type, mode)?;
        dump_channel_list(&pcl);
        self.enter(RequestStage::Filtering);
        mode_specific_modification(state, providers, &mut pcl, mode)?;
        modify_pcl_based_on_dnbs(state, providers, &mut pcl)?;
        debug!("final pcl for mode {}", mode);
        dump_channel_list(&pcl);
        Ok(pcl)
    }

    fn finish(&mut self, result: &Result<Vec<PclEntry>, PolicyError>) {
        match result {
            Ok(_) => self.enter(RequestStage::Done),
            Err(e) => {
                error!("pcl request for mode {} failed in {:?}: {}", self.mode, self.stage, e);
                self.failed_in = Some(self.stage);
                self.enter(RequestStage::Failed);
            }
        }
    }
}

/// The full PCL pipeline over the current (possibly temporarily reduced) connection table.
fn pcl_for_new_connection(
    state: &PolicyState,
    providers: &Providers,
    mode: Mode,
) -> Result<Vec<PclEntry>, PolicyError> {
    let mut request = PclRequest::new(mode);
    let result = request.run(state, providers);
    request.finish(&result);
    result
}

fn pcl_for_existing_conn(
    state: &mut PolicyState,
    providers: &Providers,
    mode: Mode,
    all_matching: bool,
) -> Result<Vec<PclEntry>, PolicyError> {
    debug!("get pcl for existing conn:{}", mode);
    if state.connections.mode_count(mode) == 0 {
        return Ok(vec![]);
    }
    let stored = StoredConnections::by_mode(state, mode, all_matching);
    pcl_for_new_connection(&stored, providers, mode)
}

/// Connections to take out of the table when computing the PCL of `vdev_id`. A STA affiliated
/// with a multi-link connection brings its links along.
fn related_vdevs(
    state: &PolicyState,
    providers: &Providers,
    mode: Mode,
    vdev_id: VdevId,
) -> Vec<VdevId> {
    if mode != Mode::Sta || !providers.config.supports_mlo() {
        return vec![vdev_id];
    }
    let vdevs = &providers.vdevs;
    match vdevs.is_link_sta_vdev(vdev_id) {
        Ok(false) => {}
        Ok(true) => {
            debug!("ignore ML STA link vdev {}", vdev_id);
            return vec![];
        }
        Err(e) => {
            error!("vdev {} is not present: {}", vdev_id, e);
            return vec![];
        }
    }
    let is_ml_sta = vdevs.is_mlo_vdev(vdev_id).unwrap_or(false);

    let vdev_freq = match state.connections.first_freq(Mode::Sta, Some(vdev_id)) {
        Some(freq) if freq != 0 => freq,
        _ => return vec![],
    };
    let ml_links: Vec<(VdevId, u32)> = state
        .connections
        .in_use()
        .filter(|c| c.mode == Mode::Sta && vdevs.is_mlo_vdev(c.vdev_id).unwrap_or(false))
        .map(|c| (c.vdev_id, c.freq))
        .collect();

    let mut related = vec![vdev_id];
    let mut has_same_band = false;
    let mut diff_band_link = None;
    for (link, link_freq) in ml_links.into_iter().filter(|(link, _)| *link != vdev_id) {
        if is_ml_sta {
            related.push(link);
            continue;
        }
        if is_24ghz(link_freq) == is_24ghz(vdev_freq) {
            if providers.radio.are_sbs_freqs(vdev_freq, link_freq)
                && providers.config.same_band_sta_allowed()
            {
                continue;
            }
            related.push(link);
            has_same_band = true;
            break;
        }
        diff_band_link = Some(link);
    }
    if !has_same_band {
        related.extend(diff_band_link);
    }
    debug!("vdevs related to {}: {:?}", vdev_id, related);
    related
}

fn pcl_for_vdev_id(
    state: &mut PolicyState,
    providers: &Providers,
    mode: Mode,
    vdev_id: VdevId,
) -> Result<Vec<PclEntry>, PolicyError> {
    debug!("get pcl for existing conn:{} vdev id {}", mode, vdev_id);
    let related = related_vdevs(state, providers, mode, vdev_id);
    if related.is_empty() {
        return Err(PolicyError::InvalidArgument(format!(
            "no connection to compute a pcl for on vdev {}",
            vdev_id
        )));
    }
    let stored = StoredConnections::by_vdevs(state, &related);
    pcl_for_new_connection(&stored, providers, mode)
}

/// Computes preferred channel lists for new and existing connections. All operations serialize
/// on one lock that is held for the whole request.
pub struct PolicyManagerContext {
    state: Mutex<PolicyState>,
    providers: Providers,
}

assert_impl_all!(PolicyManagerContext: Send, Sync);

impl PolicyManagerContext {
    pub fn new(providers: Providers) -> Self {
        let state = PolicyState::new(&providers);
        info!(
            "policy manager up with {} valid channels, {} unsafe channels",
            state.valid_channels.len(),
            state.unsafe_channels.len()
        );
        PolicyManagerContext { state: Mutex::new(state), providers }
    }

    pub fn add_connection(&self, connection: Connection) -> Result<usize, PolicyError> {
        self.state.lock().connections.add(connection)
    }

    pub fn remove_connection(&self, vdev_id: VdevId) -> Result<Connection, PolicyError> {
        self.state.lock().connections.remove_by_vdev(vdev_id).ok_or_else(|| {
            PolicyError::InvalidArgument(format!("no connection for vdev {}", vdev_id))
        })
    }

    pub fn update_connection(
        &self,
        vdev_id: VdevId,
        freq: u32,
        chain_mask: ChainMask,
        ch_width: ChannelWidth,
    ) -> Result<(), PolicyError> {
        self.state.lock().connections.update_by_vdev(vdev_id, freq, chain_mask, ch_width)
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.count()
    }

    /// Snapshot of the in-use connections in slot order.
    pub fn connections(&self) -> Vec<Connection> {
        self.state.lock().connections.in_use().copied().collect()
    }

    /// PCL for a new connection of `mode`, given every connection currently in the table.
    pub fn get_pcl(&self, mode: Mode) -> Result<Vec<PclEntry>, PolicyError> {
        let state = self.state.lock();
        pcl_for_new_connection(&state, &self.providers, mode)
    }

    /// PCL for a connection of `mode` that already exists, computed as though it (or, with
    /// `all_matching`, every connection of that mode) were coming up anew. Empty when no such
    /// connection exists.
    pub fn get_pcl_for_existing_conn(
        &self,
        mode: Mode,
        all_matching: bool,
    ) -> Result<Vec<PclEntry>, PolicyError> {
        let mut state = self.state.lock();
        pcl_for_existing_conn(&mut state, &self.providers, mode, all_matching)
    }

    pub fn get_pcl_for_vdev_id(
        &self,
        mode: Mode,
        vdev_id: VdevId,
    ) -> Result<Vec<PclEntry>, PolicyError> {
        let mut state = self.state.lock();
        pcl_for_vdev_id(&mut state, &self.providers, mode, vdev_id)
    }

    /// Whether a third connection may join the two existing connections on `freq`.
    pub fn is_3rd_conn_on_same_band_allowed(&self, mode: Mode, freq: u32) -> bool {
        let state = self.state.lock();
        let slot_freq = |slot| state.connections.get(slot).map_or(0, |c| c.freq);
        let (freq0, freq1) = (slot_freq(0), slot_freq(1));
        if freq0 != freq || freq0 != freq1 {
            debug!("No MCC support in 3vif in same mac: {} {} {}", freq0, freq1, freq);
            return false;
        }
        let pref = SystemPreference::from_raw(self.providers.config.conc_system_pref());
        let radio = &*self.providers.radio;
        let bucket = match third_connection_index(radio, &state.connections) {
            Some(bucket) => bucket,
            None => {
                error!("couldn't find index for 3rd connection pcl table");
                return false;
            }
        };
        let pcl = third_connection_pcl(&bucket, mode, pref, radio.is_hw_dbs_capable());
        debug!("pcl for third connection mode {} is {}", mode, pcl);
        pcl.includes_connection_channels()
    }

    /// A channel that is neither DFS nor unsafe, falling back to channel 6.
    pub fn get_nondfs_preferred_channel(&self, mode: Mode, for_existing_conn: bool) -> u32 {
        let mut state = self.state.lock();
        let regulatory = &self.providers.regulatory;
        let pcl = if for_existing_conn {
            let non_dfs = state
                .connections
                .in_use()
                .filter(|c| !regulatory.is_dfs(c.freq))
                .map(|c| c.freq)
                .last();
            if let Some(freq) = non_dfs {
                return freq;
            }
            pcl_for_existing_conn(&mut state, &self.providers, mode, false)
        } else {
            pcl_for_new_connection(&state, &self.providers, mode)
        };
        let pcl = match pcl {
            Ok(pcl) => pcl,
            Err(e) => {
                warn!("no pcl for mode {}, using channel 6: {}", mode, e);
                return PM_24_GHZ_CH_FREQ_6;
            }
        };
        pcl.iter()
            .map(|entry| entry.freq)
            .find(|&freq| !regulatory.is_dfs(freq) && !state.unsafe_channels.contains(&freq))
            .unwrap_or(PM_24_GHZ_CH_FREQ_6)
    }

    /// A channel a SAP could move to, away from its home channel and the MAC of its current
    /// channel. Returns 0 when nothing fits.
    pub fn get_alternate_channel_for_sap(
        &self,
        sap_vdev_id: VdevId,
        sap_freq: u32,
        pref_band: PreferredBand,
    ) -> u32 {
        let mut state = self.state.lock();
        let mode = match state.connections.find_by_vdev(sap_vdev_id) {
            Some(slot) => match state.connections.get(slot) {
                Some(c) => c.mode,
                None => return 0,
            },
            None => {
                error!("no connection for vdev {}", sap_vdev_id);
                return 0;
            }
        };
        let is_6ghz_cap = self.providers.vdevs.is_ap_6ghz_capable(sap_vdev_id);
        let regulatory = &self.providers.regulatory;
        let radio = &self.providers.radio;

        let mut freq = 0;
        let mut first_non_dfs_5g = 0;
        let mut first_dfs_5g = 0;
        let mut first_6g = 0;
        {
            let stored = StoredConnections::by_vdevs(&mut *state, &[sap_vdev_id]);
            let pcl = match pcl_for_new_connection(&stored, &self.providers, mode) {
                Ok(pcl) => pcl,
                Err(e) => {
                    error!("failed to get pcl for alternate sap channel: {}", e);
                    vec![]
                }
            };
            let count = stored.connections.count();
            for candidate in pcl.iter().map(|entry| entry.freq) {
                if candidate == sap_freq {
                    continue;
                }
                if !is_6ghz_cap && is_6ghz(candidate) {
                    continue;
                }
                if count > 0 && radio.are_freqs_on_same_mac(sap_freq, candidate) {
                    continue;
                }
                if stored.connections.count_with_freq(candidate) > 0 {
                    freq = candidate;
                    break;
                } else if freq == 0 {
                    freq = candidate;
                }
                if first_non_dfs_5g == 0 && is_5ghz(candidate) {
                    if !regulatory.is_dfs_in_secondary_list(candidate) {
                        first_non_dfs_5g = candidate;
                        if pref_band == PreferredBand::FiveGhz {
                            break;
                        }
                    } else if first_dfs_5g == 0 {
                        first_dfs_5g = candidate;
                    }
                }
                if first_6g == 0 && is_6ghz(candidate) {
                    first_6g = candidate;
                    if pref_band == PreferredBand::SixGhz {
                        break;
                    }
                }
            }
        }

        let first_nonzero = |freqs: &[u32]| freqs.iter().copied().find(|&f| f != 0);
        let preferred = match pref_band {
            PreferredBand::SixGhz => first_nonzero(&[first_6g, first_non_dfs_5g, first_dfs_5g]),
            PreferredBand::FiveGhz => first_nonzero(&[first_non_dfs_5g, first_dfs_5g]),
            PreferredBand::TwoGhz => None,
        };
        preferred.unwrap_or(freq)
    }

    /// Mandatory channel a SAP on `sap_freq` should restart on given an interfering connection
    /// on `intf_freq`. Returns 0 when the SAP can stay where it is.
    pub fn get_sap_mandatory_channel(
        &self,
        sap_freq: u32,
        intf_freq: u32,
        vdev_id: VdevId,
    ) -> Result<u32, PolicyError> {
        let mut state = self.state.lock();
        let providers = &self.providers;
        let mut pcl = pcl_for_existing_conn(&mut state, providers, Mode::Sap, false)?;
        if pcl.is_empty() && state.connections.mode_count(Mode::Sap) == 0 {
            debug!("no existing SAP, computing pcl for a new one");
            pcl = pcl_for_new_connection(&state, providers, Mode::Sap)?;
        }
        modify_sap_pcl_based_on_mandatory_channel(&state, providers, &mut pcl)?;
        drop(state);
        if pcl.is_empty() {
            error!("No common channel between mandatory list & PCL");
            return Err(PolicyError::NoValidChannels);
        }

        let radio = &providers.radio;
        let contains = |freq: u32| pcl.iter().any(|entry| entry.freq == freq);
        if radio.are_sbs_freqs(sap_freq, intf_freq) && contains(sap_freq) {
            debug!("{} and {} are SBS, allow sap on mandatory freq", sap_freq, intf_freq);
            return Ok(0);
        }
        if !is_24ghz(intf_freq) {
            if let Some(entry) = pcl.iter().find(|e| radio.are_sbs_freqs(e.freq, intf_freq)) {
                return Ok(entry.freq);
            }
        }

        let user_config_freq = providers.config.user_config_sap_freq(vdev_id);
        let scc_on_indoor = providers.config.sta_sap_scc_on_indoor_chan();
        for entry in &pcl {
            if scc_on_indoor && providers.regulatory.is_indoor(entry.freq) && !is_6ghz(entry.freq)
            {
                debug!("Choose Indoor channel from PCL list {}", entry.freq);
                return Ok(entry.freq);
            }
            if user_config_freq == Some(entry.freq) {
                debug!("Prefer starting SAP on user configured channel:{}", entry.freq);
                return Ok(entry.freq);
            }
        }

        let mut new_freq = pcl[0].freq;
        if (is_6ghz(sap_freq) || (is_5ghz(sap_freq) && is_5ghz(intf_freq))) && contains(intf_freq)
        {
            new_freq = intf_freq;
        }
        debug!("Mandatory channel:{} org sap ch {}", new_freq, sap_freq);
        Ok(new_freq)
    }

    /// Channel a SAP should use next to a 6 GHz STA on `intf_freq`. 0 means SCC on the STA's
    /// PSC channel is allowed.
    pub fn sap_on_non_psc_channel(&self, intf_freq: u32, vdev_id: VdevId) -> u32 {
        if !is_6ghz(intf_freq) {
            return intf_freq;
        }
        let power_type = match self.providers.regulatory.ap_power_type(vdev_id) {
            Ok(power_type) => power_type,
            Err(e) => {
                error!("vdev {} is not present: {}", vdev_id, e);
                return intf_freq;
            }
        };
        let mut state = self.state.lock();
        let pcl = match pcl_for_existing_conn(&mut state, &self.providers, Mode::Sap, false) {
            Ok(pcl) => pcl,
            Err(e) => {
                error!("Unable to get PCL for SAP: {}", e);
                return intf_freq;
            }
        };
        let on_psc = pcl.iter().any(|entry| is_6ghz(entry.freq) && entry.freq == intf_freq);
        if on_psc && power_type == ApPowerType::VeryLowPower {
            debug!("STA is in PSC channel {} in VLP mode, SAP + STA allowed", intf_freq);
            return 0;
        }
        pcl.first().map_or(0, |entry| entry.freq)
    }

    /// Weights for every channel in `saved_chans`: the PCL weight when listed in `pcl`,
    /// `WEIGHT_OF_NON_PCL_CHANNELS` when the concurrency check admits it, disallowed otherwise.
    pub fn get_valid_chan_weights(
        &self,
        saved_chans: &[u32],
        pcl: &[PclEntry],
        mode: Mode,
        vdev_id: Option<VdevId>,
    ) -> Vec<u8> {
        let saved_chans = &saved_chans[..saved_chans.len().min(NUM_CHANNELS)];
        let mut weights = vec![WEIGHT_OF_DISALLOWED_CHANNELS; saved_chans.len()];
        {
            let mut state = self.state.lock();
            let sta_count = state.connections.mode_count(Mode::Sta);
            if matches!(mode, Mode::P2pGo | Mode::P2pClient) || (mode == Mode::Sta && sta_count > 0)
            {
                // A STA is checked as though it were coming up anew.
                let stored = match (mode, vdev_id) {
                    (Mode::Sta, Some(vdev_id)) => {
                        StoredConnections::by_vdevs(&mut *state, &[vdev_id])
                    }
                    (Mode::Sta, None) => StoredConnections::by_mode(&mut *state, Mode::Sta, true),
                    _ => StoredConnections::new(&mut *state, vec![]),
                };
                for (weight, &freq) in weights.iter_mut().zip(saved_chans) {
                    if self.providers.concurrency.is_concurrency_allowed(
                        &stored.connections,
                        mode,
                        freq,
                    ) {
                        *weight = WEIGHT_OF_NON_PCL_CHANNELS;
                    }
                }
            }
        }
        for (weight, freq) in weights.iter_mut().zip(saved_chans) {
            if let Some(entry) = pcl.iter().find(|entry| entry.freq == *freq) {
                *weight = entry.weight;
            }
        }
        weights
    }

    /// Narrows an arbitrary frequency list the way a PCL for `mode` would be narrowed.
    pub fn get_valid_chans_from_range(
        &self,
        freqs: &[u32],
        mode: Mode,
    ) -> Result<Vec<u32>, PolicyError> {
        let state = self.state.lock();
        let mut list: Vec<PclEntry> = freqs
            .iter()
            .take(NUM_CHANNELS)
            .map(|&freq| PclEntry::new(freq, WEIGHT_OF_GROUP1_PCL_CHANNELS))
            .collect();
        if mode.is_beaconing() {
            resolver::update_with_safe_channel_list(&state, &self.providers, &mut list);
        }
        mode_specific_modification(&state, &self.providers, &mut list, mode).map_err(|e| {
            error!("failed to get modified pcl for mode {}", mode);
            e
        })?;
        modify_pcl_based_on_dnbs(&state, &self.providers, &mut list).map_err(|e| {
            error!("failed to get modified pcl based on DNBS");
            e
        })?;
        dump_channel_list(&list);
        Ok(list.into_iter().map(|entry| entry.freq).collect())
    }

    /// The cached valid channel list, without DSRC channels.
    pub fn get_valid_chans(&self) -> Result<Vec<u32>, PolicyError> {
        resolver::valid_channels(&self.state.lock())
    }

    pub fn set_sap_mandatory_channels(&self, channels: &[u32]) -> Result<(), PolicyError> {
        if channels.is_empty() {
            return Err(PolicyError::InvalidArgument("empty mandatory channel list".to_string()));
        }
        if !list_has_24ghz_channel(channels) {
            error!("2.4GHz channels missing, this is not expected");
            return Err(PolicyError::InvalidArgument(
                "mandatory channel list has no 2.4 GHz channel".to_string(),
            ));
        }
        let mut state = self.state.lock();
        state.sap_mandatory_channels = channels.iter().copied().take(NUM_CHANNELS).collect();
        debug!("mandatory channels: {:?}", state.sap_mandatory_channels);
        Ok(())
    }

    pub fn is_sap_mandatory_channel_set(&self) -> bool {
        !self.state.lock().sap_mandatory_channels.is_empty()
    }

    /// Refreshes the cached channel state after a regulatory change.
    pub fn reg_chan_change_callback(
        &self,
        channels: &[RegulatoryChannel],
        avoid_freq_ind: Option<AvoidFreqIndication>,
    ) {
        let mut state = self.state.lock();
        state.update_valid_channels(channels);
        let avoid = match avoid_freq_ind {
            Some(avoid) => avoid,
            None => {
                debug!("avoid_freq_ind NULL");
                return;
            }
        };
        state.set_unsafe_channels(&avoid.unsafe_channels);
        state.restriction_mask = avoid.restriction_mask;
        info!(
            "Channel list update, received {} avoided channels",
            state.unsafe_channels.len()
        );
    }

    pub fn init_chan_avoidance(&self, channels: &[u32]) {
        let mut state = self.state.lock();
        state.set_unsafe_channels(channels);
        info!("Channel list init, received {} avoided channels", state.unsafe_channels.len());
    }

    pub fn unsafe_channels(&self) -> Vec<u32> {
        self.state.lock().unsafe_channels.clone()
    }

    pub fn restriction_mask(&self) -> u32 {
        self.state.lock().restriction_mask
    }

    pub fn update_with_safe_channel_list(&self, pcl: &mut Vec<PclEntry>) {
        let state = self.state.lock();
        resolver::update_with_safe_channel_list(&state, &self.providers, pcl);
    }

    /// Frequency of the first connection of `mode`, optionally on a given vdev. 0 when none.
    pub fn get_channel(&self, mode: Mode, vdev_id: Option<VdevId>) -> u32 {
        self.state.lock().connections.first_freq(mode, vdev_id).unwrap_or(0)
    }

    pub fn mode_specific_get_channel(&self, mode: Mode) -> u32 {
        self.get_channel(mode, None)
    }

    pub fn get_connection_count_with_ch_freq(&self, freq: u32) -> usize {
        self.state.lock().connections.count_with_freq(freq)
    }

    pub fn filter_passive_ch(&self, freqs: &mut Vec<u32>) {
        filter_passive_ch(&self.providers, freqs);
    }

    /// Single MAC hardware keeps a STA off 6 GHz and indoor channels while a SAP is up, when
    /// so configured.
    pub fn is_sta_chan_valid_for_connect_and_roam(&self, freq: u32) -> bool {
        let sap_count = self.state.lock().connections.mode_count(Mode::Sap);
        !(self.providers.config.skip_6g_and_indoor_freq()
            && sap_count > 0
            && !self.providers.radio.is_hw_dbs_capable()
            && (is_6ghz(freq) || self.providers.regulatory.is_indoor(freq)))
    }

    /// Removes a connection and hands every remaining STA its updated PCL. The consumer runs
    /// after the lock is released and may call back into the policy manager.
    pub fn decr_session_set_pcl(&self, mode: Mode, vdev_id: VdevId) -> Result<(), PolicyError> {
        let mut state = self.state.lock();
        if state.connections.remove_by_vdev(vdev_id).is_none() {
            debug!("Invalid active session");
            return Err(PolicyError::InvalidArgument(format!(
                "no active session for vdev {}",
                vdev_id
            )));
        }
        if mode == Mode::Sta || state.connections.mode_count(Mode::Sta) == 0 {
            return Ok(());
        }
        let sta_vdevs: Vec<VdevId> = state
            .connections
            .in_use()
            .filter(|c| c.mode == Mode::Sta)
            .map(|c| c.vdev_id)
            .collect();
        let mut updates = Vec::with_capacity(sta_vdevs.len());
        for sta_vdev in sta_vdevs {
            match pcl_for_vdev_id(&mut state, &self.providers, Mode::Sta, sta_vdev) {
                Ok(pcl) => updates.push((sta_vdev, pcl)),
                Err(e) => error!("failed to get pcl for STA vdev {}: {}", sta_vdev, e),
            }
        }
        drop(state);

        for (sta_vdev, pcl) in updates {
            self.providers.pcl_consumer.set_pcl(sta_vdev, Mode::Sta, &pcl);
        }
        Ok(())
    }

    pub fn skip_dfs_ch(&self) -> Result<bool, PolicyError> {
        resolver::skip_dfs_ch(&self.state.lock(), &self.providers)
    }
}
