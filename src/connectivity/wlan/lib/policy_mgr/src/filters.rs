// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Mode-specific narrowing of a resolved PCL.
//!
//! Every stage is a stable `retain` over the entry list: a stage may only drop entries, and a
//! frequency always leaves together with its weight.

use {
    crate::{
        channel::{
            is_5ghz, is_6ghz, is_6ghz_psc, is_same_band, list_has_24ghz_channel, ApPowerType,
            ChannelWidth, PclEntry, NUM_CHANNELS,
        },
        error::{FilterStage, PolicyError},
        policy_manager::{PolicyState, Providers},
        resolver::{skip_dfs_ch, special_mode_active_5g},
        types::Mode,
    },
    log::{debug, error},
};

/// Runs one stage, tagging any failure with the stage it came from.
fn run_stage<F>(stage: FilterStage, pcl: &mut Vec<PclEntry>, filter: F) -> Result<(), PolicyError>
where
    F: FnOnce(&mut Vec<PclEntry>) -> Result<(), PolicyError>,
{
    let before = pcl.len();
    filter(pcl).map_err(|e| {
        error!("failed to get {} modified pcl: {}", stage, e);
        PolicyError::filter_failed(stage, e)
    })?;
    debug!("{} filter: {} -> {} channels", stage, before, pcl.len());
    Ok(())
}

/// First in-use STA on an indoor channel.
fn sta_on_indoor_channel(state: &PolicyState, providers: &Providers) -> Option<u32> {
    state
        .connections
        .in_use()
        .find(|c| c.mode == Mode::Sta && providers.regulatory.is_indoor(c.freq))
        .map(|c| c.freq)
}

/// First in-use STA or P2P client on a DFS channel. A 160 MHz 5 GHz connection always overlaps
/// DFS spectrum.
fn sta_on_dfs_channel(state: &PolicyState, providers: &Providers) -> Option<u32> {
    state
        .connections
        .in_use()
        .find(|c| {
            matches!(c.mode, Mode::Sta | Mode::P2pClient)
                && (providers.regulatory.is_dfs(c.freq)
                    || (is_5ghz(c.freq) && c.ch_width == ChannelWidth::Mhz160))
        })
        .map(|c| c.freq)
}

fn connected_sta_5g(state: &PolicyState) -> Option<u32> {
    state.connections.in_use().find(|c| c.mode == Mode::Sta && is_5ghz(c.freq)).map(|c| c.freq)
}

/// Keeps only the configured SAP mandatory channels. With force SCC a channel an existing STA
/// already occupies is kept too, when SCC on that kind of channel is allowed.
pub(crate) fn modify_sap_pcl_based_on_mandatory_channel(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    let mandatory = &state.sap_mandatory_channels;
    if mandatory.is_empty() {
        return Ok(());
    }
    if !list_has_24ghz_channel(mandatory) {
        error!("fav channel list is missing 2.4GHz channels");
        return Err(PolicyError::InvalidArgument(
            "mandatory channel list has no 2.4 GHz channel".to_string(),
        ));
    }
    debug!("fav chan: {:?}", mandatory);

    let config = &providers.config;
    let mut scc_freqs = vec![];
    if config.is_force_scc() {
        if config.sta_sap_scc_on_indoor_chan() {
            scc_freqs.extend(sta_on_indoor_channel(state, providers));
        }
        if config.sta_sap_scc_on_dfs_chan() {
            scc_freqs.extend(sta_on_dfs_channel(state, providers));
        }
        scc_freqs.extend(connected_sta_5g(state));
    }

    pcl.truncate(NUM_CHANNELS);
    pcl.retain(|entry| {
        if scc_freqs.contains(&entry.freq) {
            debug!("scc chan:{}", entry.freq);
            return true;
        }
        mandatory.contains(&entry.freq)
    });
    Ok(())
}

fn modify_sap_pcl_based_on_nol(providers: &Providers, pcl: &mut Vec<PclEntry>) {
    pcl.retain(|entry| !providers.regulatory.is_disabled_in_secondary_list(entry.freq));
}

fn modify_sap_pcl_based_on_dfs(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    if !skip_dfs_ch(state, providers)? {
        return Ok(());
    }
    pcl.retain(|entry| !providers.regulatory.is_dfs_in_secondary_list(entry.freq));
    Ok(())
}

fn modify_pcl_based_on_srd(providers: &Providers, pcl: &mut Vec<PclEntry>) {
    pcl.retain(|entry| !providers.regulatory.is_etsi13_srd(entry.freq));
}

fn modify_pcl_based_on_indoor(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    let mut include_indoor = providers.config.indoor_channel_support()?;
    if providers.config.sta_sap_scc_on_indoor_chan()
        && (special_mode_active_5g(&state.connections, Mode::P2pClient)
            || special_mode_active_5g(&state.connections, Mode::Sta))
    {
        include_indoor = true;
    }
    if include_indoor {
        return Ok(());
    }
    pcl.retain(|entry| !providers.regulatory.is_indoor_in_secondary_list(entry.freq));
    Ok(())
}

fn modify_pcl_based_on_passive(providers: &Providers, pcl: &mut Vec<PclEntry>) {
    pcl.retain(|entry| !providers.regulatory.is_passive(entry.freq));
}

/// A SAP may only join a 6 GHz STA on PSC channels its AP power type permits.
fn modify_sap_pcl_for_6ghz_channels(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    let reference = state
        .connections
        .in_use()
        .find(|c| c.mode == Mode::Sta)
        .or_else(|| state.connections.in_use().find(|c| c.mode == Mode::P2pClient));
    let (sta_freq, vdev_id) = match reference {
        Some(c) if is_6ghz(c.freq) => (c.freq, c.vdev_id),
        _ => return Ok(()),
    };

    let power_type = providers.regulatory.ap_power_type(vdev_id)?;
    debug!("STA {} on {} power type : {:?}", vdev_id, sta_freq, power_type);
    let indoor_support = providers.config.indoor_channel_support()?;

    pcl.retain(|entry| {
        if !is_6ghz(entry.freq) {
            return true;
        }
        if !is_6ghz_psc(entry.freq) {
            return false;
        }
        match power_type {
            ApPowerType::VeryLowPower => true,
            ApPowerType::Indoor => {
                !providers.regulatory.is_indoor(entry.freq) || indoor_support
            }
            ApPowerType::StandardPower => false,
        }
    });
    Ok(())
}

fn pcl_modification_for_sap(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    if !state.sap_mandatory_channels.is_empty() {
        run_stage(FilterStage::Mandatory, pcl, |pcl| {
            modify_sap_pcl_based_on_mandatory_channel(state, providers, pcl)
        })?;
    }
    run_stage(FilterStage::Nol, pcl, |pcl| {
        modify_sap_pcl_based_on_nol(providers, pcl);
        Ok(())
    })?;
    run_stage(FilterStage::Dfs, pcl, |pcl| modify_sap_pcl_based_on_dfs(state, providers, pcl))?;
    if !providers.config.srd_master_mode(Mode::Sap) {
        run_stage(FilterStage::Srd, pcl, |pcl| {
            modify_pcl_based_on_srd(providers, pcl);
            Ok(())
        })?;
    }
    run_stage(FilterStage::Indoor, pcl, |pcl| modify_pcl_based_on_indoor(state, providers, pcl))?;
    run_stage(FilterStage::Passive, pcl, |pcl| {
        modify_pcl_based_on_passive(providers, pcl);
        Ok(())
    })?;
    run_stage(FilterStage::SixGhz, pcl, |pcl| {
        modify_sap_pcl_for_6ghz_channels(state, providers, pcl)
    })
}

fn pcl_modification_for_p2p_go(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    run_stage(FilterStage::EnabledChannels, pcl, |pcl| {
        pcl.retain(|entry| !providers.regulatory.is_passive_or_disabled(entry.freq));
        Ok(())
    })?;
    run_stage(FilterStage::Dfs, pcl, |pcl| modify_sap_pcl_based_on_dfs(state, providers, pcl))?;
    if !providers.config.srd_master_mode(Mode::P2pGo) {
        run_stage(FilterStage::Srd, pcl, |pcl| {
            modify_pcl_based_on_srd(providers, pcl);
            Ok(())
        })?;
    }
    Ok(())
}

/// Applies the stages that depend on the requesting mode. Every mode loses passive channels;
/// the SAP pipeline drops them ahead of its 6 GHz stage.
pub(crate) fn mode_specific_modification(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
    mode: Mode,
) -> Result<(), PolicyError> {
    match mode {
        Mode::Sap => return pcl_modification_for_sap(state, providers, pcl),
        Mode::P2pGo => pcl_modification_for_p2p_go(state, providers, pcl)?,
        Mode::Sta | Mode::P2pClient | Mode::NanDisc | Mode::Ndi => {}
    }
    run_stage(FilterStage::Passive, pcl, |pcl| {
        modify_pcl_based_on_passive(providers, pcl);
        Ok(())
    })
}

/// Whether `freq` can be used without forcing a beaconing interface that must not switch
/// channels off its current one.
pub(crate) fn is_chan_ok_for_dnbs(
    state: &PolicyState,
    providers: &Providers,
    freq: u32,
) -> Result<bool, PolicyError> {
    let beaconing: Vec<_> = [Mode::Sap, Mode::P2pGo]
        .iter()
        .flat_map(|&mode| state.connections.in_use().filter(move |c| c.mode == mode))
        .collect();
    if beaconing.is_empty() {
        return Ok(true);
    }
    if freq == 0 {
        error!("channel is 0, cc count {}", beaconing.len());
        return Err(PolicyError::InvalidArgument("channel is 0".to_string()));
    }
    for conn in beaconing {
        if !providers.vdevs.is_dnsc_set(conn.vdev_id)? {
            continue;
        }
        let ok = if conn.freq == freq {
            true
        } else if is_same_band(conn.freq, freq) {
            false
        } else {
            providers.radio.is_hw_dbs_capable()
        };
        return Ok(ok);
    }
    Ok(true)
}

pub(crate) fn modify_pcl_based_on_dnbs(
    state: &PolicyState,
    providers: &Providers,
    pcl: &mut Vec<PclEntry>,
) -> Result<(), PolicyError> {
    if pcl.len() > NUM_CHANNELS {
        error!("Invalid PCL List Length {}", pcl.len());
        return Err(PolicyError::InvalidArgument(format!("pcl length {}", pcl.len())));
    }
    let mut ok = Vec::with_capacity(pcl.len());
    for entry in pcl.iter() {
        let allowed = is_chan_ok_for_dnbs(state, providers, entry.freq).map_err(|e| {
            error!("Not able to check DNBS eligibility");
            PolicyError::filter_failed(FilterStage::Dnbs, e)
        })?;
        ok.push(allowed);
    }
    let mut verdicts = ok.into_iter();
    pcl.retain(|_| verdicts.next().unwrap_or(false));
    Ok(())
}

/// Drops passive frequencies from a bare frequency list.
pub(crate) fn filter_passive_ch(providers: &Providers, freqs: &mut Vec<u32>) {
    freqs.retain(|&freq| !providers.regulatory.is_passive(freq));
}
