// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Frequency band predicates, PCL weights and the `(frequency, weight)` entry type.

use {
    log::debug,
    serde::{Deserialize, Serialize},
    std::fmt::Write,
};

/// Upper bound on the length of any channel list handled by the policy manager.
pub const NUM_CHANNELS: usize = 196;
pub const POLICY_MGR_MAX_CHANNEL_LIST: usize = 128;

/// Weights handed to firmware alongside each PCL channel. Higher is more preferred.
pub const WEIGHT_OF_GROUP1_PCL_CHANNELS: u8 = u8::MAX;
pub const PCL_GROUPS_WEIGHT_DIFFERENCE: u8 = 20;
pub const WEIGHT_OF_GROUP2_PCL_CHANNELS: u8 =
    WEIGHT_OF_GROUP1_PCL_CHANNELS - PCL_GROUPS_WEIGHT_DIFFERENCE;
pub const WEIGHT_OF_GROUP3_PCL_CHANNELS: u8 =
    WEIGHT_OF_GROUP2_PCL_CHANNELS - PCL_GROUPS_WEIGHT_DIFFERENCE;
pub const WEIGHT_OF_GROUP4_PCL_CHANNELS: u8 =
    WEIGHT_OF_GROUP3_PCL_CHANNELS - PCL_GROUPS_WEIGHT_DIFFERENCE;
pub const WEIGHT_OF_NON_PCL_CHANNELS: u8 = 1;
pub const WEIGHT_OF_DISALLOWED_CHANNELS: u8 = 0;

/// Channel 6, used whenever no better channel can be found.
pub const PM_24_GHZ_CH_FREQ_6: u32 = 2437;

const MIN_24GHZ_FREQ: u32 = 2412;
const MAX_24GHZ_FREQ: u32 = 2484;
pub const MIN_5GHZ_FREQ: u32 = 4912;
const MAX_5GHZ_FREQ: u32 = 5920;
const MIN_6GHZ_FREQ: u32 = 5935;
const MAX_6GHZ_FREQ: u32 = 7115;
const SIXG_START_FREQ: u32 = 5950;
const SIXG_PSC_OFFSET: u32 = 25;
const SIXG_PSC_SPACING: u32 = 80;
const DSRC_START_FREQ: u32 = 5852;
const DSRC_END_FREQ: u32 = 5920;

pub fn is_24ghz(freq: u32) -> bool {
    (MIN_24GHZ_FREQ..=MAX_24GHZ_FREQ).contains(&freq)
}

pub fn is_5ghz(freq: u32) -> bool {
    (MIN_5GHZ_FREQ..=MAX_5GHZ_FREQ).contains(&freq)
}

pub fn is_6ghz(freq: u32) -> bool {
    (MIN_6GHZ_FREQ..=MAX_6GHZ_FREQ).contains(&freq)
}

/// Preferred scanning channels are every fourth 20 MHz 6 GHz channel, starting at channel 5.
pub fn is_6ghz_psc(freq: u32) -> bool {
    is_6ghz(freq)
        && freq >= SIXG_START_FREQ
        && (freq - SIXG_START_FREQ) % SIXG_PSC_SPACING == SIXG_PSC_OFFSET
}

pub fn is_dsrc(freq: u32) -> bool {
    (DSRC_START_FREQ..=DSRC_END_FREQ).contains(&freq)
}

pub fn is_same_band(freq1: u32, freq2: u32) -> bool {
    (is_24ghz(freq1) && is_24ghz(freq2))
        || (is_5ghz(freq1) && is_5ghz(freq2))
        || (is_6ghz(freq1) && is_6ghz(freq2))
}

pub fn list_has_24ghz_channel(freqs: &[u32]) -> bool {
    freqs.iter().any(|&freq| is_24ghz(freq))
}

/// Regulatory state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Enable,
    Disable,
    Dfs,
    Invalid,
}

/// 6 GHz AP power type of the BSS a client is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApPowerType {
    /// Low power indoor.
    Indoor,
    StandardPower,
    VeryLowPower,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum ChannelWidth {
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
    Mhz80P80,
    Mhz320,
}

/// Order in which 5 GHz and 6 GHz channels are added to a PCL.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum BandPriority {
    FiveGhzThenSixGhz,
    SixGhzThenFiveGhz,
}

impl Default for BandPriority {
    fn default() -> Self {
        BandPriority::FiveGhzThenSixGhz
    }
}

/// Band a caller would like an alternate SAP channel to be on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredBand {
    TwoGhz,
    FiveGhz,
    SixGhz,
}

/// A single PCL entry. Frequency and weight always travel together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PclEntry {
    pub freq: u32,
    pub weight: u8,
}

impl PclEntry {
    pub fn new(freq: u32, weight: u8) -> Self {
        PclEntry { freq, weight }
    }
}

pub fn freqs_of(pcl: &[PclEntry]) -> Vec<u32> {
    pcl.iter().map(|entry| entry.freq).collect()
}

const MAX_CHAN_TO_PRINT: usize = 39;

/// Logs a channel list as `freq[weight]` pairs, a bounded number per line.
pub fn dump_channel_list(pcl: &[PclEntry]) {
    debug!("Total PCL Chan Freq {}", pcl.len());
    for chunk in pcl.iter().take(NUM_CHANNELS).collect::<Vec<_>>().chunks(MAX_CHAN_TO_PRINT) {
        let mut line = String::new();
        for entry in chunk {
            // Writing into a String cannot fail.
            let _ = write!(line, " {}[{}]", entry.freq, entry.weight);
        }
        debug!("Freq[weight]:{}", line);
    }
}
