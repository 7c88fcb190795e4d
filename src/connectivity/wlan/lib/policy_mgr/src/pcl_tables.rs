// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Static preferred channel list tables.
//!
//! Each table maps the current concurrency (as classified by `topology`), the requested mode and
//! the system preference onto a `PclType`. The tables are fixed-size arrays indexed by enum
//! discriminants, so every cell is populated at compile time.

use {
    crate::{
        topology::{
            ModePair, OneConnectionBucket, PairTopology, SecondTableRow, ThreeConnectionBucket,
            TwoConnectionBucket,
        },
        types::{ChainMask, Mode, SystemPreference},
    },
    static_assertions::const_assert_eq,
    std::fmt,
};

/// An abstract preference class. The resolver expands it into concrete channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PclType {
    None,
    TwoG,
    FiveG,
    SccCh,
    MccCh,
    SccCh24G,
    SccCh5G,
    TwoGSccCh,
    FiveGSccCh,
    SccOn5SccOn24With24G,
    SccOn5SccOn24With5G,
    SccOn24SccOn5With24G,
    SccOn24SccOn5With5G,
    SccOn5SccOn24,
    SccOn24SccOn5,
    MccCh24G,
    MccCh5G,
    TwoGMccCh,
    FiveGMccCh,
    SbsCh,
    SbsCh5G,
    TwoGSccChSbsCh,
    TwoGSccChSbsCh5G,
    TwoGSbsChMccCh,
    SbsCh24GSccCh,
    SbsChSccCh24G,
    SccChSbsCh24G,
    SbsChSccCh5G24G,
    SccChMccChSbsCh24G,
    /// No policy exists for the combination.
    Invalid,
}

impl PclType {
    /// Whether the class places the channels of existing connections in the list.
    pub fn includes_connection_channels(self) -> bool {
        !matches!(
            self,
            PclType::None
                | PclType::TwoG
                | PclType::FiveG
                | PclType::SbsCh
                | PclType::SbsCh5G
                | PclType::Invalid
        )
    }
}

impl fmt::Display for PclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PclType::None => "PM_NONE",
            PclType::TwoG => "PM_24G",
            PclType::FiveG => "PM_5G",
            PclType::SccCh => "PM_SCC_CH",
            PclType::MccCh => "PM_MCC_CH",
            PclType::SccCh24G => "PM_SCC_CH_24G",
            PclType::SccCh5G => "PM_SCC_CH_5G",
            PclType::TwoGSccCh => "PM_24G_SCC_CH",
            PclType::FiveGSccCh => "PM_5G_SCC_CH",
            PclType::SccOn5SccOn24With24G => "PM_SCC_ON_5_SCC_ON_24_24G",
            PclType::SccOn5SccOn24With5G => "PM_SCC_ON_5_SCC_ON_24_5G",
            PclType::SccOn24SccOn5With24G => "PM_SCC_ON_24_SCC_ON_5_24G",
            PclType::SccOn24SccOn5With5G => "PM_SCC_ON_24_SCC_ON_5_5G",
            PclType::SccOn5SccOn24 => "PM_SCC_ON_5_SCC_ON_24",
            PclType::SccOn24SccOn5 => "PM_SCC_ON_24_SCC_ON_5",
            PclType::MccCh24G => "PM_MCC_CH_24G",
            PclType::MccCh5G => "PM_MCC_CH_5G",
            PclType::TwoGMccCh => "PM_24G_MCC_CH",
            PclType::FiveGMccCh => "PM_5G_MCC_CH",
            PclType::SbsCh => "PM_SBS_CH",
            PclType::SbsCh5G => "PM_SBS_CH_5G",
            PclType::TwoGSccChSbsCh => "PM_24G_SCC_CH_SBS_CH",
            PclType::TwoGSccChSbsCh5G => "PM_24G_SCC_CH_SBS_CH_5G",
            PclType::TwoGSbsChMccCh => "PM_24G_SBS_CH_MCC_CH",
            PclType::SbsCh24GSccCh => "PM_SBS_CH_24G_SCC_CH",
            PclType::SbsChSccCh24G => "PM_SBS_CH_SCC_CH_24G",
            PclType::SccChSbsCh24G => "PM_SCC_CH_SBS_CH_24G",
            PclType::SbsChSccCh5G24G => "PM_SBS_CH_SCC_CH_5G_24G",
            PclType::SccChMccChSbsCh24G => "PM_SCC_CH_MCC_CH_SBS_CH_24G",
            PclType::Invalid => "PM_MAX_PCL_TYPE",
        };
        write!(f, "{}", name)
    }
}

const PREFS: usize = SystemPreference::COUNT;
const MODES: usize = Mode::COUNT;
const CHAINS: usize = ChainMask::COUNT;

const_assert_eq!(PREFS, 3);
const_assert_eq!(MODES, 6);
const_assert_eq!(CHAINS, 2);
const_assert_eq!(ModePair::ALL.len(), ModePair::COUNT);
const_assert_eq!(SecondTableRow::ALL.len(), SecondTableRow::COUNT);
const_assert_eq!(PairTopology::ALL.len(), PairTopology::COUNT);
const_assert_eq!(ThreeConnectionBucket::ALL.len(), ThreeConnectionBucket::COUNT);

type Row = [PclType; PREFS];

// Rows below are [throughput, powersave, latency].
const NONE: Row = [PclType::None; PREFS];
const ONLY_24G: Row = [PclType::TwoG; PREFS];
const ONLY_5G: Row = [PclType::FiveG; PREFS];
const INVALID: Row = [PclType::Invalid; PREFS];

const SCC_THEN_24G: Row = [PclType::SccCh24G, PclType::SccCh, PclType::SccCh24G];
const SCC_THEN_5G: Row = [PclType::SccCh5G, PclType::SccCh, PclType::SccCh5G];
const MCC_THEN_24G: Row = [PclType::MccCh24G, PclType::MccCh, PclType::MccCh24G];
const MCC_THEN_5G: Row = [PclType::MccCh5G, PclType::MccCh, PclType::MccCh5G];
const SCC_5_THEN_SCC_24: Row =
    [PclType::SccOn5SccOn24, PclType::SccOn5SccOn24, PclType::SccOn24SccOn5];
const SCC_5_THEN_SCC_24_THEN_24G: Row =
    [PclType::SccOn5SccOn24With24G, PclType::SccOn5SccOn24, PclType::SccOn24SccOn5With24G];
const SCC_5_THEN_SCC_24_THEN_5G: Row =
    [PclType::SccOn5SccOn24With5G, PclType::SccOn5SccOn24, PclType::SccOn24SccOn5With5G];

const FIVE_G_THEN_SCC: Row = [PclType::FiveGSccCh, PclType::SccCh5G, PclType::FiveGSccCh];
const TWO_G_THEN_SCC: Row = [PclType::TwoGSccCh, PclType::SccCh24G, PclType::TwoGSccCh];
const FIVE_G_THEN_MCC: Row = [PclType::FiveGMccCh, PclType::MccCh5G, PclType::FiveGMccCh];
const TWO_G_SBS_THEN_MCC: Row =
    [PclType::TwoGSbsChMccCh, PclType::MccCh24G, PclType::TwoGSbsChMccCh];
const SBS_THEN_SCC: Row = [PclType::SbsChSccCh24G, PclType::SccChSbsCh24G, PclType::SbsChSccCh24G];
const SBS_THEN_SCC_THEN_REST: Row =
    [PclType::SbsChSccCh5G24G, PclType::SccChSbsCh24G, PclType::SbsCh5G];
const SCC_SBS_24G: Row =
    [PclType::SccChSbsCh24G, PclType::SccChSbsCh24G, PclType::TwoGSccChSbsCh];
const SCC_MCC_SBS_24G: Row =
    [PclType::SccChMccChSbsCh24G, PclType::SccChMccChSbsCh24G, PclType::TwoGSccChSbsCh5G];

/// Policy when no connection exists.
pub static FIRST_CONNECTION_PCL_TABLE: [Row; MODES] = [
    // STA
    NONE,
    // SAP
    ONLY_5G,
    // P2P CLI
    ONLY_5G,
    // P2P GO
    ONLY_5G,
    // NAN DISC
    ONLY_5G,
    // NDI
    NONE,
];

type SecondTableBase = [[Row; MODES]; SecondTableRow::COUNT];
type SecondTable = [[[Row; MODES]; CHAINS]; SecondTableRow::COUNT];
type ThirdTableBase = [[Row; MODES]; PairTopology::COUNT];
type ThirdTable = [[[[Row; MODES]; CHAINS]; PairTopology::COUNT]; ModePair::COUNT];

/// On DBS hardware a 1x1 primary connection takes the throughput choice for every preference.
const fn one_chain_row(row: Row) -> Row {
    [row[0]; PREFS]
}

const fn chain_row(row: Row, chain: usize, dbs: bool) -> Row {
    if dbs && chain == ChainMask::OneOne as usize {
        one_chain_row(row)
    } else {
        row
    }
}

const fn expand_second_table(base: &SecondTableBase, dbs: bool) -> SecondTable {
    let mut table = [[[INVALID; MODES]; CHAINS]; SecondTableRow::COUNT];
    let mut row = 0;
    while row < SecondTableRow::COUNT {
        let mut chain = 0;
        while chain < CHAINS {
            let mut mode = 0;
            while mode < MODES {
                table[row][chain][mode] = chain_row(base[row][mode], chain, dbs);
                mode += 1;
            }
            chain += 1;
        }
        row += 1;
    }
    table
}

const fn expand_third_table(base: &ThirdTableBase, dbs: bool) -> ThirdTable {
    let mut table = [[[[INVALID; MODES]; CHAINS]; PairTopology::COUNT]; ModePair::COUNT];
    let mut pair = 0;
    while pair < ModePair::COUNT {
        let p2p_only = ModePair::ALL[pair].is_p2p_only();
        let mut topology = 0;
        while topology < PairTopology::COUNT {
            let mut chain = 0;
            while chain < CHAINS {
                let mut mode = 0;
                while mode < MODES {
                    let is_p2p = mode == Mode::P2pClient as usize || mode == Mode::P2pGo as usize;
                    table[pair][topology][chain][mode] = if p2p_only && is_p2p {
                        INVALID
                    } else {
                        chain_row(base[topology][mode], chain, dbs)
                    };
                    mode += 1;
                }
                chain += 1;
            }
            topology += 1;
        }
        pair += 1;
    }
    table
}

/// One existing 2x2 connection, single MAC hardware: stay on the existing channel.
const SECOND_CONNECTION_NON_DBS_BASE: SecondTableBase = [
    //  STA            SAP            P2P CLI        P2P GO         NAN DISC   NDI
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // STA 2.4
    [SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, ONLY_24G, SCC_THEN_5G],      // STA 5
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // CLI 2.4
    [SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, ONLY_24G, SCC_THEN_5G],      // CLI 5
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // GO 2.4
    [SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, ONLY_24G, SCC_THEN_5G],      // GO 5
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // SAP 2.4
    [SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, ONLY_24G, SCC_THEN_5G],      // SAP 5
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // NAN 2.4
];

/// One existing 2x2 connection, DBS hardware: prefer the band the existing connection is not on.
const SECOND_CONNECTION_DBS_BASE: SecondTableBase = [
    //  STA               SAP              P2P CLI          P2P GO           NAN DISC  NDI
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // STA 2.4
    [TWO_G_THEN_SCC, SBS_THEN_SCC, TWO_G_THEN_SCC, SBS_THEN_SCC, ONLY_24G, SCC_THEN_24G], // STA 5
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // CLI 2.4
    [TWO_G_THEN_SCC, SBS_THEN_SCC, TWO_G_THEN_SCC, SBS_THEN_SCC, ONLY_24G, SCC_THEN_24G], // CLI 5
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // GO 2.4
    [TWO_G_THEN_SCC, SBS_THEN_SCC, TWO_G_THEN_SCC, SBS_THEN_SCC, ONLY_24G, SCC_THEN_24G], // GO 5
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // SAP 2.4
    [TWO_G_THEN_SCC, SBS_THEN_SCC, TWO_G_THEN_SCC, SBS_THEN_SCC, ONLY_24G, SCC_THEN_24G], // SAP 5
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // NAN 2.4
];

/// Two existing connections with a 2x2 primary, single MAC hardware.
const THIRD_CONNECTION_NON_DBS_BASE: ThirdTableBase = [
    //  STA            SAP            P2P CLI        P2P GO         NAN DISC  NDI
    [SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, SCC_THEN_24G, ONLY_24G, SCC_THEN_24G], // SCC 2.4
    [SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, SCC_THEN_5G, ONLY_24G, SCC_THEN_5G],      // SCC 5
    [MCC_THEN_24G, MCC_THEN_24G, MCC_THEN_24G, MCC_THEN_24G, ONLY_24G, MCC_THEN_24G], // MCC 2.4
    [MCC_THEN_5G, MCC_THEN_5G, MCC_THEN_5G, MCC_THEN_5G, ONLY_24G, MCC_THEN_5G],      // MCC 5
    [SCC_5_THEN_SCC_24; MODES],                                                       // MCC 2.4/5
    [MCC_THEN_5G, MCC_THEN_5G, MCC_THEN_5G, MCC_THEN_5G, ONLY_24G, MCC_THEN_5G],      // SBS 5
    [SCC_5_THEN_SCC_24; MODES],                                                       // DBS
];

/// Two existing connections with a 2x2 primary, DBS hardware.
const THIRD_CONNECTION_DBS_BASE: ThirdTableBase = [
    //  STA               SAP              P2P CLI          P2P GO           NAN DISC  NDI
    [FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, FIVE_G_THEN_SCC, ONLY_24G, FIVE_G_THEN_SCC], // SCC 2.4
    [TWO_G_THEN_SCC, SBS_THEN_SCC_THEN_REST, TWO_G_THEN_SCC, SBS_THEN_SCC_THEN_REST, ONLY_24G, TWO_G_THEN_SCC], // SCC 5
    [FIVE_G_THEN_MCC, FIVE_G_THEN_MCC, FIVE_G_THEN_MCC, FIVE_G_THEN_MCC, ONLY_24G, FIVE_G_THEN_MCC], // MCC 2.4
    [TWO_G_SBS_THEN_MCC, TWO_G_SBS_THEN_MCC, TWO_G_SBS_THEN_MCC, TWO_G_SBS_THEN_MCC, ONLY_24G, MCC_THEN_24G], // MCC 5
    [SCC_5_THEN_SCC_24_THEN_5G, SCC_5_THEN_SCC_24_THEN_5G, SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, ONLY_24G, SCC_5_THEN_SCC_24], // MCC 2.4/5
    [SCC_SBS_24G, SCC_MCC_SBS_24G, SCC_SBS_24G, SCC_SBS_24G, ONLY_24G, SCC_SBS_24G], // SBS 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24_THEN_24G, SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, ONLY_24G, SCC_5_THEN_SCC_24], // DBS
];

/// One existing connection, single MAC hardware, by (mode and band, chain mask).
pub static SECOND_CONNECTION_PCL_NON_DBS_TABLE: SecondTable =
    expand_second_table(&SECOND_CONNECTION_NON_DBS_BASE, false);

/// One existing connection, DBS hardware, by (mode and band, chain mask).
pub static SECOND_CONNECTION_PCL_DBS_TABLE: SecondTable =
    expand_second_table(&SECOND_CONNECTION_DBS_BASE, true);

/// Two existing connections, single MAC hardware, by (mode pair, topology, chain mask).
pub static THIRD_CONNECTION_PCL_NON_DBS_TABLE: ThirdTable =
    expand_third_table(&THIRD_CONNECTION_NON_DBS_BASE, false);

/// Two existing connections, DBS hardware, by (mode pair, topology, chain mask).
pub static THIRD_CONNECTION_PCL_DBS_TABLE: ThirdTable =
    expand_third_table(&THIRD_CONNECTION_DBS_BASE, true);

type FourthTable = [[Row; MODES]; ThreeConnectionBucket::COUNT];

/// Three existing connections on DBS hardware. Only STA, SAP (and GO, looked up as SAP) and NDI
/// may request a fourth connection.
pub static FOURTH_CONNECTION_PCL_DBS_TABLE: FourthTable = [
    //  STA                SAP                P2P CLI  P2P GO   NAN DISC NDI
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, INVALID], // STA+SAP SCC 2.4, SAP 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, INVALID], // STA+SAP SCC 5, SAP 2.4
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, INVALID], // STA+SAP SCC 2.4, STA 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, INVALID], // STA+SAP SCC 5, STA 2.4
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NAN+SAP SCC 2.4, NDI 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NAN+NDI SCC 2.4, SAP 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // SAP+NDI SCC 5, NAN 2.4
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NAN+STA 2.4, NDI 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NAN+NDI 2.4, STA 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // STA+NDI 5, NAN 2.4
    [SCC_THEN_5G, SCC_THEN_5G, INVALID, INVALID, INVALID, SCC_THEN_5G],                   // STA+NDI+NAN 2.4 SMM
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NAN+NDI 2.4, NDI 5
    [SCC_5_THEN_SCC_24, SCC_5_THEN_SCC_24, INVALID, INVALID, INVALID, SCC_5_THEN_SCC_24], // NDI+NDI 5, NAN 2.4
    [SCC_THEN_5G, SCC_THEN_5G, INVALID, INVALID, INVALID, SCC_THEN_5G],                   // NDI+NDI+NAN 2.4 SMM
];

pub fn first_connection_pcl(mode: Mode, pref: SystemPreference) -> PclType {
    FIRST_CONNECTION_PCL_TABLE[mode.index()][pref.index()]
}

pub fn second_connection_pcl(
    bucket: &OneConnectionBucket,
    mode: Mode,
    pref: SystemPreference,
    use_dbs_table: bool,
) -> PclType {
    let table = if use_dbs_table {
        &SECOND_CONNECTION_PCL_DBS_TABLE
    } else {
        &SECOND_CONNECTION_PCL_NON_DBS_TABLE
    };
    table[bucket.row().index()][bucket.chain_mask.index()][mode.index()][pref.index()]
}

pub fn third_connection_pcl(
    bucket: &TwoConnectionBucket,
    mode: Mode,
    pref: SystemPreference,
    use_dbs_table: bool,
) -> PclType {
    let table = if use_dbs_table {
        &THIRD_CONNECTION_PCL_DBS_TABLE
    } else {
        &THIRD_CONNECTION_PCL_NON_DBS_TABLE
    };
    table[bucket.pair.index()][bucket.topology.index()][bucket.chain_mask.index()][mode.index()]
        [pref.index()]
}

pub fn fourth_connection_pcl(
    bucket: ThreeConnectionBucket,
    mode: Mode,
    pref: SystemPreference,
) -> PclType {
    FOURTH_CONNECTION_PCL_DBS_TABLE[bucket.index()][mode.index()][pref.index()]
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            topology::{ConnectionBand, ModePair},
            types::ChainMask,
        },
        test_case::test_case,
    };

    #[test]
    fn first_connection_sap_prefers_5g() {
        assert_eq!(first_connection_pcl(Mode::Sap, SystemPreference::Throughput), PclType::FiveG);
        assert_eq!(first_connection_pcl(Mode::Sta, SystemPreference::Throughput), PclType::None);
    }

    #[test]
    fn second_connection_sta_5_1x1_non_dbs_is_defined() {
        let bucket = OneConnectionBucket {
            mode: Mode::Sta,
            band: ConnectionBand::FiveGhz,
            chain_mask: ChainMask::OneOne,
        };
        let pcl = second_connection_pcl(&bucket, Mode::Sap, SystemPreference::Throughput, false);
        assert_ne!(pcl, PclType::Invalid);
        assert_eq!(pcl, PclType::SccCh5G);
    }

    #[test]
    fn tables_for_up_to_two_connections_have_no_holes() {
        for pref in SystemPreference::ALL.iter() {
            for mode in Mode::ALL.iter() {
                assert_ne!(first_connection_pcl(*mode, *pref), PclType::Invalid);
                for row in SecondTableRow::ALL.iter() {
                    for chain in ChainMask::ALL.iter() {
                        for table in
                            [&SECOND_CONNECTION_PCL_DBS_TABLE, &SECOND_CONNECTION_PCL_NON_DBS_TABLE]
                                .iter()
                        {
                            assert_ne!(
                                table[row.index()][chain.index()][mode.index()][pref.index()],
                                PclType::Invalid,
                                "second table hole at {:?} {:?} {} {:?}",
                                row,
                                chain,
                                mode,
                                pref
                            );
                        }
                    }
                }
                for pair in ModePair::ALL.iter() {
                    if pair.is_p2p_only() && matches!(mode, Mode::P2pClient | Mode::P2pGo) {
                        continue;
                    }
                    for topology in PairTopology::ALL.iter() {
                        for chain in ChainMask::ALL.iter() {
                            let bucket = TwoConnectionBucket {
                                pair: *pair,
                                topology: *topology,
                                chain_mask: *chain,
                            };
                            for dbs in [true, false].iter() {
                                assert_ne!(
                                    third_connection_pcl(&bucket, *mode, *pref, *dbs),
                                    PclType::Invalid,
                                    "third table hole at {} {} {:?}",
                                    bucket,
                                    mode,
                                    pref
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    #[test_case(
        ConnectionBand::FiveGhz, Mode::Sap, PclType::SbsChSccCh24G, PclType::SccChSbsCh24G;
        "sap next to 5ghz sta"
    )]
    #[test_case(
        ConnectionBand::TwoGhz, Mode::Sta, PclType::FiveGSccCh, PclType::SccCh5G;
        "sta next to 2ghz sta"
    )]
    fn chain_mask_selects_second_dbs_row(
        band: ConnectionBand,
        mode: Mode,
        one_by_one: PclType,
        two_by_two: PclType,
    ) {
        let bucket = |chain_mask| OneConnectionBucket { mode: Mode::Sta, band, chain_mask };
        let pref = SystemPreference::Powersave;
        assert_eq!(
            second_connection_pcl(&bucket(ChainMask::OneOne), mode, pref, true),
            one_by_one
        );
        assert_eq!(
            second_connection_pcl(&bucket(ChainMask::TwoTwo), mode, pref, true),
            two_by_two
        );
    }

    #[test]
    fn chain_mask_does_not_matter_on_single_mac() {
        for row in SecondTableRow::ALL.iter() {
            assert_eq!(
                SECOND_CONNECTION_PCL_NON_DBS_TABLE[row.index()][ChainMask::OneOne.index()],
                SECOND_CONNECTION_PCL_NON_DBS_TABLE[row.index()][ChainMask::TwoTwo.index()]
            );
        }
    }

    #[test]
    fn chain_mask_selects_third_dbs_row() {
        let bucket = |chain_mask| TwoConnectionBucket {
            pair: ModePair::StaSap,
            topology: PairTopology::Scc5,
            chain_mask,
        };
        let pref = SystemPreference::Powersave;
        assert_eq!(
            third_connection_pcl(&bucket(ChainMask::OneOne), Mode::Sap, pref, true),
            PclType::SbsChSccCh5G24G
        );
        assert_eq!(
            third_connection_pcl(&bucket(ChainMask::TwoTwo), Mode::Sap, pref, true),
            PclType::SccChSbsCh24G
        );
    }

    #[test]
    fn every_chain_mask_and_pair_dimension_is_used() {
        let mut chain_differences = 0;
        let mut pair_differences = 0;
        for topology in PairTopology::ALL.iter() {
            for mode in Mode::ALL.iter() {
                for pref in SystemPreference::ALL.iter() {
                    let lookup = |pair, chain_mask| {
                        let bucket = TwoConnectionBucket { pair, topology: *topology, chain_mask };
                        third_connection_pcl(&bucket, *mode, *pref, true)
                    };
                    if lookup(ModePair::StaSap, ChainMask::OneOne)
                        != lookup(ModePair::StaSap, ChainMask::TwoTwo)
                    {
                        chain_differences += 1;
                    }
                    if lookup(ModePair::StaSap, ChainMask::TwoTwo)
                        != lookup(ModePair::GoCli, ChainMask::TwoTwo)
                    {
                        pair_differences += 1;
                    }
                }
            }
        }
        assert!(chain_differences > 0);
        assert!(pair_differences > 0);
    }

    #[test_case(ModePair::GoCli; "go cli")]
    #[test_case(ModePair::GoGo; "go go")]
    #[test_case(ModePair::CliCli; "cli cli")]
    fn third_p2p_role_has_no_policy(pair: ModePair) {
        let bucket = TwoConnectionBucket {
            pair,
            topology: PairTopology::Scc24,
            chain_mask: ChainMask::TwoTwo,
        };
        for dbs in [true, false].iter() {
            for mode in [Mode::P2pClient, Mode::P2pGo].iter() {
                assert_eq!(
                    third_connection_pcl(&bucket, *mode, SystemPreference::Throughput, *dbs),
                    PclType::Invalid
                );
            }
            assert_ne!(
                third_connection_pcl(&bucket, Mode::Sta, SystemPreference::Throughput, *dbs),
                PclType::Invalid
            );
        }
    }

    #[test_case(Mode::Sta; "sta")]
    #[test_case(Mode::Sap; "sap")]
    #[test_case(Mode::Ndi; "ndi")]
    fn fourth_table_is_defined_for_nan_buckets(mode: Mode) {
        let pcl = fourth_connection_pcl(
            ThreeConnectionBucket::NanDiscNdi24Ndi5Dbs,
            mode,
            SystemPreference::Throughput,
        );
        assert_ne!(pcl, PclType::Invalid);
    }

    #[test]
    fn fourth_table_rejects_ndi_for_sta_sap_buckets() {
        let pcl = fourth_connection_pcl(
            ThreeConnectionBucket::StaSapScc24Sap5Dbs,
            Mode::Ndi,
            SystemPreference::Throughput,
        );
        assert_eq!(pcl, PclType::Invalid);
    }

    #[test]
    fn dbs_table_differs_from_non_dbs() {
        let bucket = TwoConnectionBucket {
            pair: ModePair::StaSap,
            topology: PairTopology::Scc24,
            chain_mask: ChainMask::OneOne,
        };
        let dbs = third_connection_pcl(&bucket, Mode::P2pGo, SystemPreference::Throughput, true);
        let non_dbs =
            third_connection_pcl(&bucket, Mode::P2pGo, SystemPreference::Throughput, false);
        assert_eq!(dbs, PclType::FiveGSccCh);
        assert_eq!(non_dbs, PclType::SccCh24G);
    }

    #[test_case(PclType::SccCh, true; "scc")]
    #[test_case(PclType::TwoGSbsChMccCh, true; "mcc with sbs")]
    #[test_case(PclType::SbsCh5G, false; "sbs only")]
    #[test_case(PclType::FiveG, false; "band only")]
    #[test_case(PclType::Invalid, false; "invalid")]
    fn connection_channel_classes(pcl: PclType, expected: bool) {
        assert_eq!(pcl.includes_connection_channels(), expected);
    }

    #[test]
    fn display_uses_tag_names() {
        assert_eq!(PclType::SccOn24SccOn5With5G.to_string(), "PM_SCC_ON_24_SCC_ON_5_5G");
        assert_eq!(PclType::Invalid.to_string(), "PM_MAX_PCL_TYPE");
    }
}
