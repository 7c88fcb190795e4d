// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Classification of existing connections into the buckets that index the PCL tables.

use {
    crate::{
        channel::{is_24ghz, is_5ghz},
        connection_table::ConnectionTable,
        providers::RadioCapabilityProvider,
        types::{ChainMask, Connection, Mode},
    },
    log::debug,
    std::fmt,
};

/// How two concurrent connections share the radio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Same channel.
    Scc,
    /// Different channels on the same MAC.
    Mcc,
    /// Different MACs, both outside 2.4 GHz.
    Sbs,
    /// Different MACs, different bands.
    Dbs,
}

pub fn classify_pair(
    radio: &dyn RadioCapabilityProvider,
    conn_a: &Connection,
    conn_b: &Connection,
) -> Topology {
    if conn_a.freq == conn_b.freq {
        Topology::Scc
    } else if radio.are_freqs_on_same_mac(conn_a.freq, conn_b.freq) {
        Topology::Mcc
    } else if !is_24ghz(conn_a.freq) && !is_24ghz(conn_b.freq) {
        Topology::Sbs
    } else {
        Topology::Dbs
    }
}

/// Unordered pair of modes of two existing connections. Each pair selects its own block of the
/// third connection table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModePair {
    CliSap,
    StaSap,
    SapSap,
    StaGo,
    StaCli,
    GoCli,
    GoSap,
    StaSta,
    StaNan,
    NanNdi,
    SapNan,
    GoGo,
    CliCli,
}

impl ModePair {
    pub const COUNT: usize = 13;
    pub const ALL: [ModePair; ModePair::COUNT] = [
        ModePair::CliSap,
        ModePair::StaSap,
        ModePair::SapSap,
        ModePair::StaGo,
        ModePair::StaCli,
        ModePair::GoCli,
        ModePair::GoSap,
        ModePair::StaSta,
        ModePair::StaNan,
        ModePair::NanNdi,
        ModePair::SapNan,
        ModePair::GoGo,
        ModePair::CliCli,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Both connections are P2P roles. Firmware runs at most two P2P interfaces.
    pub const fn is_p2p_only(self) -> bool {
        matches!(self, ModePair::GoCli | ModePair::GoGo | ModePair::CliCli)
    }

    pub fn classify(mode_a: Mode, mode_b: Mode) -> Option<ModePair> {
        let either = |x: Mode, y: Mode| (mode_a == x && mode_b == y) || (mode_a == y && mode_b == x);
        let pair = if either(Mode::P2pClient, Mode::Sap) {
            ModePair::CliSap
        } else if either(Mode::Sta, Mode::Sap) {
            ModePair::StaSap
        } else if either(Mode::Sap, Mode::Sap) {
            ModePair::SapSap
        } else if either(Mode::Sta, Mode::P2pGo) {
            ModePair::StaGo
        } else if either(Mode::Sta, Mode::P2pClient) {
            ModePair::StaCli
        } else if either(Mode::P2pGo, Mode::P2pClient) {
            ModePair::GoCli
        } else if either(Mode::Sap, Mode::P2pGo) {
            ModePair::GoSap
        } else if either(Mode::Sta, Mode::Sta) {
            ModePair::StaSta
        } else if either(Mode::Sta, Mode::NanDisc) {
            ModePair::StaNan
        } else if either(Mode::NanDisc, Mode::Ndi) {
            ModePair::NanNdi
        } else if either(Mode::Sap, Mode::NanDisc) {
            ModePair::SapNan
        } else if either(Mode::P2pGo, Mode::P2pGo) {
            ModePair::GoGo
        } else if either(Mode::P2pClient, Mode::P2pClient) {
            ModePair::CliCli
        } else {
            return None;
        };
        Some(pair)
    }

    /// NAN discovery only runs on 2.4 GHz, so NAN pairs collapse to fewer topologies.
    pub fn involves_nan(self) -> bool {
        matches!(self, ModePair::StaNan | ModePair::NanNdi | ModePair::SapNan)
    }

    fn name(self) -> &'static str {
        match self {
            ModePair::CliSap => "P2P_CLI_SAP",
            ModePair::StaSap => "STA_SAP",
            ModePair::SapSap => "SAP_SAP",
            ModePair::StaGo => "STA_P2P_GO",
            ModePair::StaCli => "STA_P2P_CLI",
            ModePair::GoCli => "P2P_GO_P2P_CLI",
            ModePair::GoSap => "P2P_GO_SAP",
            ModePair::StaSta => "STA_STA",
            ModePair::StaNan => "STA_NAN_DISC",
            ModePair::NanNdi => "NAN_DISC_NDI",
            ModePair::SapNan => "SAP_NAN_DISC",
            ModePair::GoGo => "P2P_GO_P2P_GO",
            ModePair::CliCli => "P2P_CLI_P2P_CLI",
        }
    }
}

fn chain_mask_name(chain_mask: ChainMask) -> &'static str {
    match chain_mask {
        ChainMask::OneOne => "1x1",
        ChainMask::TwoTwo => "2x2",
    }
}

/// Band of a single existing connection. Anything outside 2.4 GHz counts as 5 GHz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionBand {
    TwoGhz,
    FiveGhz,
}

impl ConnectionBand {
    fn of(freq: u32) -> Self {
        if is_24ghz(freq) {
            ConnectionBand::TwoGhz
        } else {
            ConnectionBand::FiveGhz
        }
    }
}

/// Rows of the second connection table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecondTableRow {
    Sta24,
    Sta5,
    Cli24,
    Cli5,
    Go24,
    Go5,
    Sap24,
    Sap5,
    NanDisc24,
}

impl SecondTableRow {
    pub const COUNT: usize = 9;
    pub const ALL: [SecondTableRow; SecondTableRow::COUNT] = [
        SecondTableRow::Sta24,
        SecondTableRow::Sta5,
        SecondTableRow::Cli24,
        SecondTableRow::Cli5,
        SecondTableRow::Go24,
        SecondTableRow::Go5,
        SecondTableRow::Sap24,
        SecondTableRow::Sap5,
        SecondTableRow::NanDisc24,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Index into the second connection table: the single existing connection's mode, band and
/// chain mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OneConnectionBucket {
    pub mode: Mode,
    pub band: ConnectionBand,
    pub chain_mask: ChainMask,
}

impl OneConnectionBucket {
    pub fn row(&self) -> SecondTableRow {
        match (self.mode, self.band) {
            (Mode::Sta, ConnectionBand::TwoGhz) => SecondTableRow::Sta24,
            (Mode::Sta, ConnectionBand::FiveGhz) => SecondTableRow::Sta5,
            (Mode::P2pClient, ConnectionBand::TwoGhz) => SecondTableRow::Cli24,
            (Mode::P2pClient, ConnectionBand::FiveGhz) => SecondTableRow::Cli5,
            (Mode::P2pGo, ConnectionBand::TwoGhz) => SecondTableRow::Go24,
            (Mode::P2pGo, ConnectionBand::FiveGhz) => SecondTableRow::Go5,
            (Mode::Sap, ConnectionBand::TwoGhz) => SecondTableRow::Sap24,
            (Mode::Sap, ConnectionBand::FiveGhz) => SecondTableRow::Sap5,
            (Mode::NanDisc, _) | (Mode::Ndi, _) => SecondTableRow::NanDisc24,
        }
    }
}

impl fmt::Display for OneConnectionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let band = match self.band {
            ConnectionBand::TwoGhz => "24",
            ConnectionBand::FiveGhz => "5",
        };
        let mode = match self.mode {
            Mode::P2pClient => "P2P_CLI".to_string(),
            other => other.to_string(),
        };
        write!(f, "{}_{}_{}", mode, band, chain_mask_name(self.chain_mask))
    }
}

/// Classifies the first in-use connection. NDI alone has no bucket.
pub fn second_connection_index(connections: &ConnectionTable) -> Option<OneConnectionBucket> {
    let first = connections.in_use().next()?;
    let band = match first.mode {
        Mode::Sta | Mode::Sap | Mode::P2pClient | Mode::P2pGo => ConnectionBand::of(first.freq),
        Mode::NanDisc => ConnectionBand::TwoGhz,
        Mode::Ndi => return None,
    };
    let bucket = OneConnectionBucket { mode: first.mode, band, chain_mask: first.chain_mask };
    debug!(
        "mode:{} freq:{} chain:{:?} index:{}",
        first.mode, first.freq, first.chain_mask, bucket
    );
    Some(bucket)
}

/// Topology and band of a pair of existing connections. These are the row classes of the third
/// connection table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairTopology {
    Scc24,
    Scc5,
    Mcc24,
    Mcc5,
    Mcc24And5,
    Sbs5,
    Dbs,
}

impl PairTopology {
    pub const COUNT: usize = 7;
    pub const ALL: [PairTopology; PairTopology::COUNT] = [
        PairTopology::Scc24,
        PairTopology::Scc5,
        PairTopology::Mcc24,
        PairTopology::Mcc5,
        PairTopology::Mcc24And5,
        PairTopology::Sbs5,
        PairTopology::Dbs,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            PairTopology::Scc24 => "SCC_24",
            PairTopology::Scc5 => "SCC_5",
            PairTopology::Mcc24 => "MCC_24",
            PairTopology::Mcc5 => "MCC_5",
            PairTopology::Mcc24And5 => "MCC_24_5",
            PairTopology::Sbs5 => "SBS_5",
            PairTopology::Dbs => "DBS",
        }
    }
}

/// Index into the third connection table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwoConnectionBucket {
    pub pair: ModePair,
    pub topology: PairTopology,
    pub chain_mask: ChainMask,
}

impl fmt::Display for TwoConnectionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.pair.name(),
            self.topology.name(),
            chain_mask_name(self.chain_mask)
        )
    }
}

/// Buckets a pair of connections. The chain mask always comes from the primary connection (the
/// first in-use slot), whatever order the two connections are passed in.
pub fn two_connection_bucket(
    radio: &dyn RadioCapabilityProvider,
    pair: ModePair,
    first: &Connection,
    second: &Connection,
    primary_connection_chain_mask: ChainMask,
) -> TwoConnectionBucket {
    let topology = classify_pair(radio, first, second);
    let first_24 = is_24ghz(first.freq);
    let second_24 = is_24ghz(second.freq);
    let topology = if pair.involves_nan() {
        match topology {
            Topology::Scc => PairTopology::Scc24,
            Topology::Mcc => PairTopology::Mcc24,
            Topology::Sbs | Topology::Dbs => PairTopology::Dbs,
        }
    } else {
        match topology {
            Topology::Scc if first_24 => PairTopology::Scc24,
            Topology::Scc => PairTopology::Scc5,
            Topology::Mcc if first_24 && second_24 => PairTopology::Mcc24,
            Topology::Mcc if !first_24 && !second_24 => PairTopology::Mcc5,
            Topology::Mcc => PairTopology::Mcc24And5,
            Topology::Sbs => PairTopology::Sbs5,
            Topology::Dbs => PairTopology::Dbs,
        }
    };
    TwoConnectionBucket { pair, topology, chain_mask: primary_connection_chain_mask }
}

/// Classifies the first two in-use connections. Mode pairs with no table block miss.
pub fn third_connection_index(
    radio: &dyn RadioCapabilityProvider,
    connections: &ConnectionTable,
) -> Option<TwoConnectionBucket> {
    let mut in_use = connections.in_use();
    let first = in_use.next()?;
    let second = in_use.next()?;
    let pair = ModePair::classify(first.mode, second.mode)?;
    let bucket = two_connection_bucket(radio, pair, first, second, first.chain_mask);
    debug!(
        "mode0:{} mode1:{} freq0:{} freq1:{} chain:{:?} index:{}",
        first.mode, second.mode, first.freq, second.freq, first.chain_mask, bucket
    );
    Some(bucket)
}

/// Index into the fourth connection table. Only a handful of three-connection layouts have a
/// policy; everything else is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreeConnectionBucket {
    StaSapScc24Sap5Dbs,
    StaSapScc5Sap24Dbs,
    StaSapScc24Sta5Dbs,
    StaSapScc5Sta24Dbs,
    NanDiscSapScc24Ndi5Dbs,
    NanDiscNdiScc24Sap5Dbs,
    SapNdiScc5NanDisc24Dbs,
    NanDiscSta24Ndi5Dbs,
    NanDiscNdi24Sta5Dbs,
    StaNdi5NanDisc24Dbs,
    StaNdiNanDisc24Smm,
    NanDiscNdi24Ndi5Dbs,
    NdiNdi5NanDisc24Dbs,
    NdiNdiNanDisc24Smm,
}

impl ThreeConnectionBucket {
    pub const COUNT: usize = 14;
    pub const ALL: [ThreeConnectionBucket; ThreeConnectionBucket::COUNT] = [
        ThreeConnectionBucket::StaSapScc24Sap5Dbs,
        ThreeConnectionBucket::StaSapScc5Sap24Dbs,
        ThreeConnectionBucket::StaSapScc24Sta5Dbs,
        ThreeConnectionBucket::StaSapScc5Sta24Dbs,
        ThreeConnectionBucket::NanDiscSapScc24Ndi5Dbs,
        ThreeConnectionBucket::NanDiscNdiScc24Sap5Dbs,
        ThreeConnectionBucket::SapNdiScc5NanDisc24Dbs,
        ThreeConnectionBucket::NanDiscSta24Ndi5Dbs,
        ThreeConnectionBucket::NanDiscNdi24Sta5Dbs,
        ThreeConnectionBucket::StaNdi5NanDisc24Dbs,
        ThreeConnectionBucket::StaNdiNanDisc24Smm,
        ThreeConnectionBucket::NanDiscNdi24Ndi5Dbs,
        ThreeConnectionBucket::NdiNdi5NanDisc24Dbs,
        ThreeConnectionBucket::NdiNdiNanDisc24Smm,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Classifies three existing connections by counting modes. GO counts as SAP, with the SAP
/// connections listed ahead of the GO connections.
pub fn fourth_connection_index(connections: &ConnectionTable) -> Option<ThreeConnectionBucket> {
    let freqs_of = |mode: Mode| -> Vec<u32> {
        connections.in_use().filter(|c| c.mode == mode).map(|c| c.freq).collect()
    };
    let mut sap = freqs_of(Mode::Sap);
    sap.extend(freqs_of(Mode::P2pGo));
    let sta = freqs_of(Mode::Sta);
    let ndi = freqs_of(Mode::Ndi);
    let nan = freqs_of(Mode::NanDisc);
    debug!("sap/ago {}, sta {}, ndi {} nan disc {}", sap.len(), sta.len(), ndi.len(), nan.len());

    use ThreeConnectionBucket::*;
    let two = |f: u32| is_24ghz(f);
    let five = |f: u32| is_5ghz(f);

    let bucket = match (sap.len(), sta.len(), ndi.len(), nan.len()) {
        (2, 1, _, _) => {
            let (sap0, sap1, sta0) = (sap[0], sap[1], sta[0]);
            if two(sta0) && ((two(sap0) && five(sap1)) || (two(sap1) && five(sap0))) {
                Some(StaSapScc24Sap5Dbs)
            } else if five(sta0) && ((two(sap0) && five(sap1)) || (two(sap1) && five(sap0))) {
                Some(StaSapScc5Sap24Dbs)
            } else {
                None
            }
        }
        (1, 2, _, _) => {
            let (sap0, sta0, sta1) = (sap[0], sta[0], sta[1]);
            if two(sap0) && ((two(sta0) && five(sta1)) || (two(sta1) && five(sta0))) {
                Some(StaSapScc24Sta5Dbs)
            } else if five(sap0) && ((two(sta0) && five(sta1)) || (two(sta1) && five(sta0))) {
                Some(StaSapScc5Sta24Dbs)
            } else {
                None
            }
        }
        (1, _, 1, 1) => {
            let (sap0, ndi0) = (sap[0], ndi[0]);
            if two(sap0) && five(ndi0) {
                Some(NanDiscSapScc24Ndi5Dbs)
            } else if five(sap0) && two(ndi0) {
                Some(NanDiscNdiScc24Sap5Dbs)
            } else if five(sap0) && five(ndi0) {
                Some(SapNdiScc5NanDisc24Dbs)
            } else {
                None
            }
        }
        (_, 1, 1, 1) => {
            let (sta0, ndi0) = (sta[0], ndi[0]);
            if two(sta0) && five(ndi0) {
                Some(NanDiscSta24Ndi5Dbs)
            } else if five(sta0) && two(ndi0) {
                Some(NanDiscNdi24Sta5Dbs)
            } else if five(sta0) && five(ndi0) {
                Some(StaNdi5NanDisc24Dbs)
            } else if two(sta0) && two(ndi0) {
                Some(StaNdiNanDisc24Smm)
            } else {
                None
            }
        }
        (_, _, 2, 1) => {
            let (ndi0, ndi1) = (ndi[0], ndi[1]);
            if (two(ndi0) && five(ndi1)) || (five(ndi0) && two(ndi1)) {
                Some(NanDiscNdi24Ndi5Dbs)
            } else if five(ndi0) && five(ndi1) {
                Some(NdiNdi5NanDisc24Dbs)
            } else if two(ndi0) && two(ndi1) {
                Some(NdiNdiNanDisc24Smm)
            } else {
                None
            }
        }
        _ => None,
    };
    debug!("index for 4th port pcl table: {:?}", bucket);
    bucket
}
