use std::collections::HashMap;
use std::time::Instant;

use super::types::{ClientId, ConnectionHandle, FIRST_CLIENT_ID, PeerAddr};

#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    pub peer: PeerAddr,
    pub connected_at: Instant,
}

/// Server-side mapping between transport connections and client ids.
///
/// Keeps id→connection, connection→id and connection→peer in lockstep;
/// an entry exists in all three or in none.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections_by_client: HashMap<ClientId, ConnectionHandle>,
    clients_by_connection: HashMap<ConnectionHandle, ClientId>,
    infos: HashMap<ConnectionHandle, ConnectionInfo>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest id at or above `FIRST_CLIENT_ID` that is not live.
    pub fn next_free_id(&self) -> ClientId {
        let mut id = FIRST_CLIENT_ID;
        while self.connections_by_client.contains_key(&id) {
            id += 1;
        }
        id
    }

    pub fn register(&mut self, connection: ConnectionHandle, peer: PeerAddr) -> ClientId {
        if let Some(&client_id) = self.clients_by_connection.get(&connection) {
            return client_id;
        }

        let client_id = self.next_free_id();
        self.connections_by_client.insert(client_id, connection);
        self.clients_by_connection.insert(connection, client_id);
        self.infos.insert(
            connection,
            ConnectionInfo {
                peer,
                connected_at: Instant::now(),
            },
        );
        client_id
    }

    pub fn remove_connection(&mut self, connection: ConnectionHandle) -> Option<ClientId> {
        let client_id = self.clients_by_connection.remove(&connection)?;
        self.connections_by_client.remove(&client_id);
        self.infos.remove(&connection);
        Some(client_id)
    }

    pub fn client_for(&self, connection: ConnectionHandle) -> Option<ClientId> {
        self.clients_by_connection.get(&connection).copied()
    }

    pub fn connection_for(&self, client_id: ClientId) -> Option<ConnectionHandle> {
        self.connections_by_client.get(&client_id).copied()
    }

    pub fn info(&self, connection: ConnectionHandle) -> Option<&ConnectionInfo> {
        self.infos.get(&connection)
    }

    pub fn peer(&self, connection: ConnectionHandle) -> Option<PeerAddr> {
        self.infos.get(&connection).map(|info| info.peer)
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.connections_by_client.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, ConnectionHandle)> + '_ {
        self.connections_by_client
            .iter()
            .map(|(&client_id, &connection)| (client_id, connection))
    }

    pub fn len(&self) -> usize {
        self.connections_by_client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections_by_client.is_empty()
    }
}
