use karma::ClientId;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientJoined {
        client_id: ClientId,
        name: String,
        ip: String,
    },
    ClientLeft {
        client_id: ClientId,
        name: String,
    },
    ClientRejected {
        client_id: ClientId,
        reason: String,
    },
    ClientKicked {
        client_id: ClientId,
    },
    Chat {
        from: ClientId,
        to: ClientId,
        text: String,
    },
}

impl ServerEvent {
    pub fn describe(&self) -> String {
        match self {
            ServerEvent::ClientJoined {
                client_id,
                name,
                ip,
            } => format!("Client {} joined as '{}' from {}", client_id, name, ip),
            ServerEvent::ClientLeft { client_id, name } => {
                format!("Client {} ('{}') left", client_id, name)
            }
            ServerEvent::ClientRejected { client_id, reason } => {
                format!("Client {} rejected: {}", client_id, reason)
            }
            ServerEvent::ClientKicked { client_id } => format!("Client {} kicked", client_id),
            ServerEvent::Chat { from, to, text } => {
                if *to == karma::BROADCAST_CLIENT_ID {
                    format!("[{}] {}", from, text)
                } else {
                    format!("[{} -> {}] {}", from, to, text)
                }
            }
        }
    }
}
