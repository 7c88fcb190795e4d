// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::channel::ChannelWidth,
    log::error,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Concurrency mode of a connection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Mode {
    Sta,
    Sap,
    P2pClient,
    P2pGo,
    NanDisc,
    Ndi,
}

impl Mode {
    pub const COUNT: usize = 6;
    pub const ALL: [Mode; Mode::COUNT] =
        [Mode::Sta, Mode::Sap, Mode::P2pClient, Mode::P2pGo, Mode::NanDisc, Mode::Ndi];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// SAP and P2P GO beacon, and are subject to regulatory restrictions a client is not.
    pub fn is_beaconing(self) -> bool {
        matches!(self, Mode::Sap | Mode::P2pGo)
    }

    /// Modes that may operate on a 6 GHz channel while another connection is active.
    pub fn supports_6ghz_concurrency(self) -> bool {
        matches!(self, Mode::Sta | Mode::Sap | Mode::P2pClient | Mode::P2pGo)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Sta => "STA",
            Mode::Sap => "SAP",
            Mode::P2pClient => "P2P_CLIENT",
            Mode::P2pGo => "P2P_GO",
            Mode::NanDisc => "NAN_DISC",
            Mode::Ndi => "NDI",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ChainMask {
    OneOne,
    TwoTwo,
}

impl ChainMask {
    pub const COUNT: usize = 2;
    pub const ALL: [ChainMask; ChainMask::COUNT] = [ChainMask::OneOne, ChainMask::TwoTwo];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Global preference consulted as one axis of every table lookup.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SystemPreference {
    Throughput,
    Powersave,
    Latency,
}

impl SystemPreference {
    pub const COUNT: usize = 3;
    pub const ALL: [SystemPreference; SystemPreference::COUNT] =
        [SystemPreference::Throughput, SystemPreference::Powersave, SystemPreference::Latency];

    /// Maps the raw configured value onto a table index. Values outside the known range are
    /// logged and fall back to throughput.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SystemPreference::Throughput,
            1 => SystemPreference::Powersave,
            2 => SystemPreference::Latency,
            _ => {
                error!("unknown cur_conc_system_pref value {}", raw);
                SystemPreference::Throughput
            }
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Handle of the radio interface a connection runs on.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct VdevId(pub u8);

impl fmt::Display for VdevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One slot of the connection table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub mode: Mode,
    /// Center frequency in MHz. 0 marks a free slot.
    pub freq: u32,
    pub chain_mask: ChainMask,
    pub ch_width: ChannelWidth,
    pub vdev_id: VdevId,
    pub in_use: bool,
}

impl Connection {
    pub fn new(mode: Mode, freq: u32, chain_mask: ChainMask, vdev_id: VdevId) -> Self {
        Connection { mode, freq, chain_mask, ch_width: ChannelWidth::Mhz20, vdev_id, in_use: true }
    }

    pub fn with_width(mut self, ch_width: ChannelWidth) -> Self {
        self.ch_width = ch_width;
        self
    }

    pub(crate) fn empty() -> Self {
        Connection {
            mode: Mode::Sta,
            freq: 0,
            chain_mask: ChainMask::OneOne,
            ch_width: ChannelWidth::Mhz20,
            vdev_id: VdevId(0),
            in_use: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(0, SystemPreference::Throughput; "throughput")]
    #[test_case(1, SystemPreference::Powersave; "powersave")]
    #[test_case(2, SystemPreference::Latency; "latency")]
    #[test_case(7, SystemPreference::Throughput; "unknown value falls back to throughput")]
    fn system_preference_from_raw(raw: u8, expected: SystemPreference) {
        assert_eq!(SystemPreference::from_raw(raw), expected);
    }

    #[test]
    fn mode_indices_follow_all() {
        for (i, mode) in Mode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn only_sap_and_go_beacon() {
        let beaconing: Vec<Mode> = Mode::ALL.iter().copied().filter(|m| m.is_beaconing()).collect();
        assert_eq!(beaconing, vec![Mode::Sap, Mode::P2pGo]);
    }
}
