// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Expansion of a `PclType` into a concrete, weighted channel list.

use {
    crate::{
        channel::{
            is_24ghz, is_5ghz, is_6ghz, is_dsrc, BandPriority, ChannelState, PclEntry,
            MIN_5GHZ_FREQ, NUM_CHANNELS, WEIGHT_OF_DISALLOWED_CHANNELS,
            WEIGHT_OF_GROUP1_PCL_CHANNELS, WEIGHT_OF_GROUP2_PCL_CHANNELS,
            WEIGHT_OF_GROUP3_PCL_CHANNELS, WEIGHT_OF_GROUP4_PCL_CHANNELS,
        },
        connection_table::{ConnectionTable, MAX_NUMBER_OF_CONC_CONNECTIONS},
        error::{FilterStage, PolicyError},
        pcl_tables::PclType,
        policy_manager::{PolicyState, Providers},
        types::Mode,
    },
    log::{debug, error},
};

/// The pair of weights still available to a composition step.
#[derive(Clone, Copy, Debug, PartialEq)]
enum WeightGroup {
    Id1Id2,
    Id2Id3,
    Id3Id4,
}

impl WeightGroup {
    fn weights(self) -> (u8, u8) {
        match self {
            WeightGroup::Id1Id2 => (WEIGHT_OF_GROUP1_PCL_CHANNELS, WEIGHT_OF_GROUP2_PCL_CHANNELS),
            WeightGroup::Id2Id3 => (WEIGHT_OF_GROUP2_PCL_CHANNELS, WEIGHT_OF_GROUP3_PCL_CHANNELS),
            WeightGroup::Id3Id4 => (WEIGHT_OF_GROUP3_PCL_CHANNELS, WEIGHT_OF_GROUP4_PCL_CHANNELS),
        }
    }
}

/// Order in which the channels of existing connections are emitted.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ConnectionOrder {
    /// Slot order, every band, one weight.
    Slot,
    TwoGhzThenFiveGhz,
    FiveGhzThenTwoGhz,
}

/// Whether a connection of `mode` is up at or above the bottom of the 5 GHz band.
pub(crate) fn special_mode_active_5g(connections: &ConnectionTable, mode: Mode) -> bool {
    connections.in_use().any(|c| c.mode == mode && c.freq >= MIN_5GHZ_FREQ)
}

/// Whether a beaconing interface has to stay off DFS channels given the current connections.
pub(crate) fn skip_dfs_ch(state: &PolicyState, providers: &Providers) -> Result<bool, PolicyError> {
    let dfs_master_capable = providers.config.dfs_master_capable().map_err(|e| {
        error!("failed to get dfs master capable: {}", e);
        e
    })?;
    if !dfs_master_capable {
        debug!("skip DFS ch for SAP/Go dfs master cap {}", dfs_master_capable);
        return Ok(true);
    }

    let scc_on_dfs = providers.config.sta_sap_scc_on_dfs_chan();
    let skip = if providers.radio.is_hw_dbs_capable() {
        (special_mode_active_5g(&state.connections, Mode::P2pClient)
            || special_mode_active_5g(&state.connections, Mode::Sta))
            && !scc_on_dfs
    } else {
        state.connections.mode_count(Mode::Sta) > 0 && !scc_on_dfs
    };
    if skip {
        debug!("skip DFS ch from pcl for SAP/Go");
    }
    Ok(skip)
}

/// The cached valid list with DSRC channels removed.
pub(crate) fn valid_channels(state: &PolicyState) -> Result<Vec<u32>, PolicyError> {
    if state.valid_channels.is_empty() {
        error!("Invalid PM valid channel list");
        return Err(PolicyError::NoValidChannels);
    }
    Ok(state.valid_channels.iter().copied().filter(|&freq| !is_dsrc(freq)).collect())
}

/// Drops channels on the avoidance list, except those a STA or P2P client already shares when
/// SCC on LTE-coex channels is allowed.
pub(crate) fn update_with_safe_channel_list(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) {
    if state.unsafe_channels.is_empty() {
        debug!("There are no unsafe channels");
        return;
    }
    pcl.truncate(NUM_CHANNELS);
    let scc_on_lte_coex = providers.config.sta_sap_scc_on_lte_coex_chan();
    pcl.retain(|entry| {
        if !state.unsafe_channels.contains(&entry.freq) {
            return true;
        }
        debug!("CH {} is not safe", entry.freq);
        let shared_with_client = state.connections.in_use().any(|c| {
            matches!(c.mode, Mode::Sta | Mode::P2pClient) && c.freq == entry.freq
        });
        if scc_on_lte_coex && shared_with_client {
            debug!("CH {} unsafe ignored when STA present on it", entry.freq);
            return true;
        }
        false
    });
}

/// Zeroes the weight of inactive channels while a SAP may share a DFS channel with a STA.
fn set_weight_of_dfs_passive_channels_to_zero(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut [PclEntry],
) {
    let scc_on_dfs = providers.config.sta_sap_scc_on_dfs_chan();
    let sap_count = state.connections.mode_count(Mode::Sap);
    debug!("sta_sap_scc_on_dfs_chan {}, sap_count {}", scc_on_dfs, sap_count);
    if !scc_on_dfs || sap_count == 0 {
        return;
    }
    debug!("Set weight of DFS/passive channels to 0");
    for entry in pcl.iter_mut().take(NUM_CHANNELS) {
        match providers.regulatory.channel_state(entry.freq) {
            ChannelState::Disable | ChannelState::Invalid => {
                entry.weight = WEIGHT_OF_DISALLOWED_CHANNELS
            }
            ChannelState::Enable | ChannelState::Dfs => {}
        }
    }
}

/// Channels the existing connections sit on, split by how they relate to the first of them.
#[derive(Debug, Default, PartialEq)]
struct SubChannels {
    scc: Vec<u32>,
    sbs: Vec<u32>,
    rest: Vec<u32>,
}

struct ChannelListBuilder<'a> {
    state: &'a PolicyState,
    providers: &'a Providers,
    mode: Mode,
    skip_dfs: bool,
    skip_6ghz: bool,
    chlist_24: Vec<u32>,
    /// 5 GHz and 6 GHz lists, in configured band priority order.
    chlist1: Vec<u32>,
    chlist2: Vec<u32>,
    pcl: Vec<PclEntry>,
}

impl<'a> ChannelListBuilder<'a> {
    fn new(
        state: &'a PolicyState,
        providers: &'a Providers,
        mode: Mode,
        channels: &[u32],
    ) -> Result<Self, PolicyError> {
        let skip_dfs = if mode.is_beaconing() {
            skip_dfs_ch(state, providers).map_err(|e| {
                error!("unable to decide on DFS channels: {}", e);
                PolicyError::filter_failed(FilterStage::Dfs, e)
            })?
        } else {
            false
        };

        let mut chlist_24 = vec![];
        let mut chlist_5 = vec![];
        let mut chlist_6 = vec![];
        for &freq in channels {
            if is_24ghz(freq) {
                chlist_24.push(freq);
            } else if is_5ghz(freq) {
                if skip_dfs && providers.regulatory.is_dfs(freq) {
                    continue;
                }
                chlist_5.push(freq);
            } else if is_6ghz(freq) {
                chlist_6.push(freq);
            }
        }
        let skip_6ghz = !mode.supports_6ghz_concurrency();
        if skip_6ghz {
            chlist_6.clear();
        }

        let (chlist1, chlist2) = match providers.config.pcl_band_priority() {
            BandPriority::SixGhzThenFiveGhz => (chlist_6, chlist_5),
            BandPriority::FiveGhzThenSixGhz => (chlist_5, chlist_6),
        };

        Ok(ChannelListBuilder {
            state,
            providers,
            mode,
            skip_dfs,
            skip_6ghz,
            chlist_24,
            chlist1,
            chlist2,
            pcl: Vec::with_capacity(NUM_CHANNELS),
        })
    }

    fn push(&mut self, freq: u32, weight: u8) -> bool {
        if self.pcl.len() >= NUM_CHANNELS {
            return false;
        }
        self.pcl.push(PclEntry::new(freq, weight));
        true
    }

    /// The 2.4 GHz list is never trimmed of DFS or 6 GHz channels.
    fn add_24g(&mut self, weight: u8) {
        let channels = self.chlist_24.clone();
        for freq in channels {
            if !self.push(freq, weight) {
                break;
            }
        }
        debug!("Add 24g chlist len {} index {}", self.chlist_24.len(), self.pcl.len());
    }

    fn add_5g(&mut self, group: WeightGroup) {
        let (weight1, weight2) = group.weights();
        for (list, weight) in [(self.chlist1.clone(), weight1), (self.chlist2.clone(), weight2)] {
            if self.pcl.len() + list.len() > NUM_CHANNELS {
                error!("no enough weight len {} chlist len {}", NUM_CHANNELS, list.len());
                return;
            }
            self.pcl.extend(list.into_iter().map(|freq| PclEntry::new(freq, weight)));
        }
        debug!(
            "Add 5g chlist len {} 6g chlist len {} index {}",
            self.chlist1.len(),
            self.chlist2.len(),
            self.pcl.len()
        );
    }

    fn add_connection_channels(&mut self, order: ConnectionOrder, group: WeightGroup) {
        let (weight1, weight2) = group.weights();
        let add_6ghz = self.mode.supports_6ghz_concurrency();
        let freqs: Vec<u32> = self.state.connections.in_use().map(|c| c.freq).collect();
        let regulatory = &self.providers.regulatory;
        let skip_dfs = self.skip_dfs;
        let not_skipped_dfs = |freq: u32| !(skip_dfs && regulatory.is_dfs(freq));

        let mut picked: Vec<(u32, u8)> = vec![];
        match order {
            ConnectionOrder::Slot => {
                picked.extend(
                    freqs
                        .iter()
                        .filter(|&&f| not_skipped_dfs(f) && (!is_6ghz(f) || add_6ghz))
                        .map(|&f| (f, weight1)),
                );
            }
            ConnectionOrder::TwoGhzThenFiveGhz => {
                picked.extend(freqs.iter().filter(|&&f| is_24ghz(f)).map(|&f| (f, weight1)));
                picked.extend(
                    freqs
                        .iter()
                        .filter(|&&f| not_skipped_dfs(f) && is_5ghz(f))
                        .map(|&f| (f, weight2)),
                );
            }
            ConnectionOrder::FiveGhzThenTwoGhz => {
                picked.extend(
                    freqs
                        .iter()
                        .filter(|&&f| not_skipped_dfs(f) && is_5ghz(f))
                        .map(|&f| (f, weight1)),
                );
                picked.extend(freqs.iter().filter(|&&f| is_24ghz(f)).map(|&f| (f, weight2)));
            }
        }
        if add_6ghz && order != ConnectionOrder::Slot {
            picked.extend(freqs.iter().filter(|&&f| is_6ghz(f)).map(|&f| (f, weight2)));
        }

        for (freq, weight) in picked {
            if !self.push(freq, weight) {
                break;
            }
        }
    }

    fn sub_channels(&self) -> SubChannels {
        let mut scc: Vec<u32> = vec![];
        // 6 GHz home channels go ahead of 5 GHz ones.
        let six = self.state.connections.in_use().map(|c| c.freq).filter(|&f| is_6ghz(f));
        let five = self.state.connections.in_use().map(|c| c.freq).filter(|&f| is_5ghz(f));
        for freq in six.chain(five) {
            if scc.len() < MAX_NUMBER_OF_CONC_CONNECTIONS && !scc.contains(&freq) {
                scc.push(freq);
            }
        }

        let radio = &self.providers.radio;
        let candidates = || self.chlist1.iter().chain(self.chlist2.iter()).copied();
        let sbs: Vec<u32> = match scc.as_slice() {
            _ if !radio.is_hw_sbs_capable() => vec![],
            // Two home channels already SBS apart leave no room for a third.
            [first, second, ..] if radio.are_sbs_freqs(*first, *second) => vec![],
            [first, ..] => candidates().filter(|&f| radio.are_sbs_freqs(*first, f)).collect(),
            [] => vec![],
        };
        let rest = candidates().filter(|f| !scc.contains(f) && !sbs.contains(f)).collect();

        SubChannels { scc, sbs, rest }
    }

    /// Appends `list`, leaving out DFS and 6 GHz channels when those are being skipped.
    fn add_chlist(&mut self, list: &[u32], weight: u8) {
        for &freq in list {
            if self.skip_dfs && self.providers.regulatory.is_dfs(freq) {
                continue;
            }
            if self.skip_6ghz && is_6ghz(freq) {
                continue;
            }
            if !self.push(freq, weight) {
                break;
            }
        }
        debug!("Add chlist len {} index {}", list.len(), self.pcl.len());
    }

    fn compose(&mut self, pcl: PclType) {
        use PclType as P;
        let (g1, g2, g3, g4) = (
            WEIGHT_OF_GROUP1_PCL_CHANNELS,
            WEIGHT_OF_GROUP2_PCL_CHANNELS,
            WEIGHT_OF_GROUP3_PCL_CHANNELS,
            WEIGHT_OF_GROUP4_PCL_CHANNELS,
        );
        let slot = ConnectionOrder::Slot;
        let two_then_five = ConnectionOrder::TwoGhzThenFiveGhz;
        let five_then_two = ConnectionOrder::FiveGhzThenTwoGhz;
        match pcl {
            P::None | P::Invalid => {}
            P::TwoG => self.add_24g(g1),
            P::FiveG => self.add_5g(WeightGroup::Id1Id2),
            P::SccCh | P::MccCh => self.add_connection_channels(slot, WeightGroup::Id1Id2),
            P::SccCh24G | P::MccCh24G => {
                self.add_connection_channels(slot, WeightGroup::Id1Id2);
                self.add_24g(g2);
            }
            P::SccCh5G | P::MccCh5G => {
                self.add_connection_channels(slot, WeightGroup::Id1Id2);
                self.add_5g(WeightGroup::Id2Id3);
            }
            P::TwoGSccCh | P::TwoGMccCh => {
                self.add_24g(g1);
                self.add_connection_channels(slot, WeightGroup::Id2Id3);
            }
            P::FiveGSccCh | P::FiveGMccCh => {
                self.add_5g(WeightGroup::Id1Id2);
                self.add_connection_channels(slot, WeightGroup::Id3Id4);
            }
            P::SccOn24SccOn5 => self.add_connection_channels(two_then_five, WeightGroup::Id1Id2),
            P::SccOn5SccOn24 => self.add_connection_channels(five_then_two, WeightGroup::Id1Id2),
            P::SccOn24SccOn5With24G => {
                self.add_connection_channels(two_then_five, WeightGroup::Id1Id2);
                self.add_24g(g3);
            }
            P::SccOn24SccOn5With5G => {
                self.add_connection_channels(two_then_five, WeightGroup::Id1Id2);
                self.add_5g(WeightGroup::Id3Id4);
            }
            P::SccOn5SccOn24With24G => {
                self.add_connection_channels(five_then_two, WeightGroup::Id1Id2);
                self.add_24g(g3);
            }
            P::SccOn5SccOn24With5G => {
                self.add_connection_channels(five_then_two, WeightGroup::Id1Id2);
                self.add_5g(WeightGroup::Id3Id4);
            }
            P::TwoGSccChSbsCh => {
                let sub = self.sub_channels();
                self.add_24g(g1);
                self.add_chlist(&sub.scc, g2);
                self.add_chlist(&sub.sbs, g3);
            }
            P::TwoGSccChSbsCh5G => {
                let sub = self.sub_channels();
                self.add_24g(g1);
                self.add_chlist(&sub.scc, g2);
                self.add_chlist(&sub.sbs, g3);
                self.add_chlist(&sub.rest, g4);
            }
            P::TwoGSbsChMccCh => {
                let sub = self.sub_channels();
                self.add_24g(g1);
                self.add_chlist(&sub.sbs, g2);
                self.add_chlist(&sub.scc, g3);
            }
            P::SbsCh => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.sbs, g1);
                self.add_chlist(&sub.scc, g2);
            }
            P::SbsCh5G => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.sbs, g1);
                self.add_chlist(&sub.scc, g2);
                self.add_chlist(&sub.rest, g3);
            }
            P::SbsCh24GSccCh => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.sbs, g1);
                self.add_24g(g2);
                self.add_chlist(&sub.scc, g3);
            }
            P::SbsChSccCh24G => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.sbs, g1);
                self.add_chlist(&sub.scc, g2);
                self.add_24g(g3);
            }
            P::SccChSbsCh24G => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.scc, g1);
                self.add_chlist(&sub.sbs, g2);
                self.add_24g(g3);
            }
            P::SbsChSccCh5G24G => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.sbs, g1);
                self.add_chlist(&sub.scc, g2);
                self.add_chlist(&sub.rest, g3);
                self.add_24g(g4);
            }
            P::SccChMccChSbsCh24G => {
                let sub = self.sub_channels();
                self.add_chlist(&sub.scc, g1);
                self.add_chlist(&sub.rest, g2);
                self.add_chlist(&sub.sbs, g3);
                self.add_24g(g4);
            }
        }
    }
}

/// Turns a PCL type into an ordered list of `(frequency, weight)` entries for `mode`.
///
/// `PclType::None` yields an empty list and `PclType::Invalid` is a table miss. Any other type
/// that expands to no channel is `NoValidChannels`. Beaconing modes additionally have unsafe
/// channels removed; the result never exceeds `NUM_CHANNELS`.
pub(crate) fn get_channel_list(
    state: &PolicyState,
    providers: &Providers,
    pcl: PclType,
    mode: Mode,
) -> Result<Vec<PclEntry>, PolicyError> {
    match pcl {
        PclType::Invalid => {
            error!("pcl is invalid");
            return Err(PolicyError::TableLookupMiss {
                connections: state.connections.count(),
                mode,
            });
        }
        PclType::None => {
            debug!("pcl is 0");
            return Ok(vec![]);
        }
        _ => {}
    }

    let channels = valid_channels(state)?;
    let mut builder = ChannelListBuilder::new(state, providers, mode, &channels)?;
    builder.compose(pcl);
    let mut list = builder.pcl;
    debug!("pcl {}: mode {}", pcl, mode);
    debug!("pcl len {}", list.len());
    if list.is_empty() {
        error!("no valid channel for pcl {} mode {}", pcl, mode);
        return Err(PolicyError::NoValidChannels);
    }

    if mode.is_beaconing() {
        update_with_safe_channel_list(state, providers, &mut list);
    }
    set_weight_of_dfs_passive_channels_to_zero(state, providers, &mut list);
    list.truncate(NUM_CHANNELS);
    Ok(list)
}
