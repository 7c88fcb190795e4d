// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        channel::ChannelWidth,
        error::PolicyError,
        types::{ChainMask, Connection, Mode, VdevId},
    },
    log::{debug, error},
    static_assertions::const_assert,
    std::ops::{Deref, DerefMut},
};

/// Number of physical slots in the connection table.
pub const MAX_NUMBER_OF_CONC_CONNECTIONS: usize = 4;
/// Usable slots unless four-port concurrency is enabled.
pub const DEFAULT_CONC_CONNECTIONS: usize = 3;

const_assert!(DEFAULT_CONC_CONNECTIONS <= MAX_NUMBER_OF_CONC_CONNECTIONS);

/// A connection captured off the table together with the slot it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedConnection {
    pub slot: usize,
    pub connection: Connection,
}

/// Registry of active connections. Slot order is insertion order and is significant: the
/// classifier reads the first in-use slots positionally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionTable {
    slots: [Connection; MAX_NUMBER_OF_CONC_CONNECTIONS],
    capacity: usize,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        ConnectionTable::new(DEFAULT_CONC_CONNECTIONS)
    }
}

impl ConnectionTable {
    pub fn new(capacity: usize) -> Self {
        ConnectionTable {
            slots: [Connection::empty(); MAX_NUMBER_OF_CONC_CONNECTIONS],
            capacity: capacity.min(MAX_NUMBER_OF_CONC_CONNECTIONS),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|c| c.in_use).count()
    }

    pub fn get(&self, slot: usize) -> Option<&Connection> {
        self.slots.get(slot)
    }

    /// In-use connections in slot order.
    pub fn in_use(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.slots.iter().filter(|c| c.in_use)
    }

    /// In-use connections with their slot index, in slot order.
    pub fn in_use_slots(&self) -> impl Iterator<Item = (usize, &Connection)> + '_ {
        self.slots.iter().enumerate().filter(|(_, c)| c.in_use)
    }

    pub fn find_by_mode(&self, mode: Mode) -> impl Iterator<Item = usize> + '_ {
        self.in_use_slots().filter(move |(_, c)| c.mode == mode).map(|(slot, _)| slot)
    }

    pub fn find_by_vdev(&self, vdev_id: VdevId) -> Option<usize> {
        self.in_use_slots().find(|(_, c)| c.vdev_id == vdev_id).map(|(slot, _)| slot)
    }

    pub fn mode_count(&self, mode: Mode) -> usize {
        self.find_by_mode(mode).count()
    }

    /// Frequency of the first in-use connection of `mode`, optionally restricted to one vdev.
    pub fn first_freq(&self, mode: Mode, vdev_id: Option<VdevId>) -> Option<u32> {
        self.in_use()
            .find(|c| c.mode == mode && vdev_id.map_or(true, |id| id == c.vdev_id))
            .map(|c| c.freq)
    }

    pub fn count_with_freq(&self, freq: u32) -> usize {
        self.in_use().filter(|c| c.freq == freq).count()
    }

    /// Inserts a connection in the first free slot.
    pub fn add(&mut self, connection: Connection) -> Result<usize, PolicyError> {
        if self.find_by_vdev(connection.vdev_id).is_some() {
            return Err(PolicyError::InvalidArgument(format!(
                "vdev {} already has a connection",
                connection.vdev_id
            )));
        }
        if self.count() >= self.capacity {
            return Err(PolicyError::InvalidArgument(format!(
                "connection table is full ({} connections)",
                self.capacity
            )));
        }
        let slot = self.slots[..self.capacity]
            .iter()
            .position(|c| !c.in_use)
            .ok_or_else(|| PolicyError::InvalidArgument("no free connection slot".to_string()))?;
        self.slots[slot] = Connection { in_use: true, ..connection };
        debug!(
            "add connection slot:{} mode:{} freq:{} vdev:{}",
            slot, connection.mode, connection.freq, connection.vdev_id
        );
        Ok(slot)
    }

    /// Removes a connection for good. Later slots move down so that insertion order is kept
    /// without holes.
    pub fn remove_by_vdev(&mut self, vdev_id: VdevId) -> Option<Connection> {
        let slot = self.find_by_vdev(vdev_id)?;
        let removed = self.slots[slot];
        for i in slot..MAX_NUMBER_OF_CONC_CONNECTIONS - 1 {
            self.slots[i] = self.slots[i + 1];
        }
        self.slots[MAX_NUMBER_OF_CONC_CONNECTIONS - 1] = Connection::empty();
        debug!("removed connection for vdev {} from slot {}", vdev_id, slot);
        Some(removed)
    }

    pub fn update_by_vdev(
        &mut self,
        vdev_id: VdevId,
        freq: u32,
        chain_mask: ChainMask,
        ch_width: ChannelWidth,
    ) -> Result<(), PolicyError> {
        let slot = self.find_by_vdev(vdev_id).ok_or_else(|| {
            PolicyError::InvalidArgument(format!("no connection for vdev {}", vdev_id))
        })?;
        let conn = &mut self.slots[slot];
        conn.freq = freq;
        conn.chain_mask = chain_mask;
        conn.ch_width = ch_width;
        Ok(())
    }

    fn take_slots(&mut self, slots: Vec<usize>) -> Vec<SavedConnection> {
        slots
            .into_iter()
            .map(|slot| {
                let saved = SavedConnection { slot, connection: self.slots[slot] };
                self.slots[slot] = Connection::empty();
                saved
            })
            .collect()
    }

    /// Captures every in-use slot matching `predicate` and frees it.
    pub fn store_and_remove<P>(&mut self, predicate: P) -> Vec<SavedConnection>
    where
        P: Fn(&Connection) -> bool,
    {
        let slots: Vec<usize> =
            self.in_use_slots().filter(|(_, c)| predicate(c)).map(|(slot, _)| slot).collect();
        self.take_slots(slots)
    }

    /// Captures connections of `mode`: every match when `all_matching`, else only the first.
    pub fn store_and_remove_by_mode(
        &mut self,
        mode: Mode,
        all_matching: bool,
    ) -> Vec<SavedConnection> {
        let mut slots: Vec<usize> = self.find_by_mode(mode).collect();
        if !all_matching {
            slots.truncate(1);
        }
        self.take_slots(slots)
    }

    pub fn store_and_remove_by_vdev(&mut self, vdev_id: VdevId) -> Vec<SavedConnection> {
        let slots = self.find_by_vdev(vdev_id).into_iter().collect();
        self.take_slots(slots)
    }

    pub fn store_and_remove_by_chan_and_mode(
        &mut self,
        freq: u32,
        mode: Mode,
    ) -> Vec<SavedConnection> {
        self.store_and_remove(|c| c.freq == freq && c.mode == mode)
    }

    /// Puts saved connections back at their original slots. A slot that is no longer free means
    /// the table was mutated between store and restore.
    pub fn restore(&mut self, saved: Vec<SavedConnection>) -> Result<(), PolicyError> {
        for SavedConnection { slot, connection } in saved {
            let target = self.slots.get_mut(slot).ok_or_else(|| {
                PolicyError::InvalidArgument(format!("restore slot {} out of range", slot))
            })?;
            if target.in_use {
                return Err(PolicyError::InvalidArgument(format!(
                    "restore slot {} is occupied by vdev {}",
                    slot, target.vdev_id
                )));
            }
            *target = connection;
        }
        Ok(())
    }
}

/// Anything that owns a connection table and can lend it out for a temporary store/restore.
pub trait ConnectionTableOwner {
    fn connection_table(&self) -> &ConnectionTable;
    fn connection_table_mut(&mut self) -> &mut ConnectionTable;
}

impl ConnectionTableOwner for ConnectionTable {
    fn connection_table(&self) -> &ConnectionTable {
        self
    }

    fn connection_table_mut(&mut self) -> &mut ConnectionTable {
        self
    }
}

/// Connections temporarily removed from a table. The owner is reachable through `Deref` while
/// the guard is alive, and the removed connections are restored when it is dropped.
pub struct StoredConnections<'a, O: ConnectionTableOwner> {
    owner: &'a mut O,
    saved: Vec<SavedConnection>,
}

impl<'a, O: ConnectionTableOwner> StoredConnections<'a, O> {
    pub fn new(owner: &'a mut O, saved: Vec<SavedConnection>) -> Self {
        StoredConnections { owner, saved }
    }

    /// Stores every connection of `mode` (or only the first one).
    pub fn by_mode(owner: &'a mut O, mode: Mode, all_matching: bool) -> Self {
        let saved = owner.connection_table_mut().store_and_remove_by_mode(mode, all_matching);
        StoredConnections::new(owner, saved)
    }

    /// Stores the connections of each listed vdev.
    pub fn by_vdevs(owner: &'a mut O, vdev_ids: &[VdevId]) -> Self {
        let table = owner.connection_table_mut();
        let saved =
            vdev_ids.iter().flat_map(|&vdev_id| table.store_and_remove_by_vdev(vdev_id)).collect();
        StoredConnections::new(owner, saved)
    }

    pub fn saved(&self) -> &[SavedConnection] {
        &self.saved
    }

    pub fn removed_count(&self) -> usize {
        self.saved.len()
    }

    /// Hands the snapshot back without restoring it.
    pub fn into_saved(mut self) -> Vec<SavedConnection> {
        std::mem::take(&mut self.saved)
    }
}

impl<'a, O: ConnectionTableOwner> Deref for StoredConnections<'a, O> {
    type Target = O;

    fn deref(&self) -> &O {
        self.owner
    }
}

impl<'a, O: ConnectionTableOwner> DerefMut for StoredConnections<'a, O> {
    fn deref_mut(&mut self) -> &mut O {
        self.owner
    }
}

impl<'a, O: ConnectionTableOwner> Drop for StoredConnections<'a, O> {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        if saved.is_empty() {
            return;
        }
        if let Err(e) = self.owner.connection_table_mut().restore(saved) {
            error!("failed to restore deleted connections: {}", e);
            debug_assert!(false, "failed to restore deleted connections: {}", e);
        }
    }
}
