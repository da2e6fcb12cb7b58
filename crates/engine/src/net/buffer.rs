use super::message::MessageVariant;

#[derive(Debug)]
struct BufferedMessage<M> {
    msg: M,
    peeked: bool,
}

/// Per-tick inbox shared by the client and server façades.
///
/// Peeked entries stay in place until `flush_peeked` so a reference handed
/// out by `peek` remains meaningful for the rest of the tick, but they are
/// no longer eligible for `consume`.
#[derive(Debug)]
pub struct MessageBuffer<M> {
    entries: Vec<BufferedMessage<M>>,
}

impl<M> Default for MessageBuffer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MessageBuffer<M> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, msg: M) {
        self.entries.push(BufferedMessage { msg, peeked: false });
    }

    pub fn peek<T, F>(&mut self, predicate: F) -> Option<&T>
    where
        T: MessageVariant<M>,
        F: Fn(&T) -> bool,
    {
        let index = self
            .entries
            .iter()
            .position(|entry| T::from_ref(&entry.msg).is_some_and(|m| predicate(m)))?;

        let entry = &mut self.entries[index];
        entry.peeked = true;
        T::from_ref(&entry.msg)
    }

    pub fn consume<T, F>(&mut self, predicate: F) -> Vec<T>
    where
        T: MessageVariant<M>,
        F: Fn(&T) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in std::mem::take(&mut self.entries) {
            let matches =
                !entry.peeked && T::from_ref(&entry.msg).is_some_and(|m| predicate(m));
            if !matches {
                kept.push(entry);
                continue;
            }

            match T::from_msg(entry.msg) {
                Ok(msg) => taken.push(msg),
                Err(msg) => kept.push(BufferedMessage { msg, peeked: false }),
            }
        }

        self.entries = kept;
        taken
    }

    /// Drops every peeked entry. Returns how many were removed.
    pub fn flush_peeked(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.peeked);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::message::{ClientChat, ClientMsg, ClientPlayerLeave, ClientRequestPlayerSpawn};

    fn chat(client_id: u32, text: &str) -> ClientMsg {
        ClientMsg::Chat(ClientChat {
            client_id,
            to_id: 0,
            text: text.to_string(),
        })
    }

    #[test]
    fn test_consume_preserves_arrival_order() {
        let mut buffer = MessageBuffer::new();
        buffer.push(chat(1, "a"));
        buffer.push(ClientMsg::PlayerLeave(ClientPlayerLeave { client_id: 4 }));
        buffer.push(chat(2, "b"));
        buffer.push(chat(1, "c"));

        let chats: Vec<ClientChat> = buffer.consume(|_: &ClientChat| true);
        let texts: Vec<&str> = chats.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_consume_with_disjoint_predicates() {
        let mut buffer = MessageBuffer::new();
        for (id, text) in [(1, "a"), (2, "b"), (1, "c"), (3, "d")] {
            buffer.push(chat(id, text));
        }

        let first = buffer.consume(|c: &ClientChat| c.client_id == 1);
        let rest = buffer.consume(|c: &ClientChat| c.client_id != 1);
        let again = buffer.consume(|_: &ClientChat| true);

        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 2);
        assert!(again.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_peek_marks_and_flush_removes() {
        let mut buffer = MessageBuffer::new();
        buffer.push(ClientMsg::RequestPlayerSpawn(ClientRequestPlayerSpawn {
            client_id: 6,
        }));
        buffer.push(chat(6, "hi"));

        let peeked = buffer.peek(|_: &ClientRequestPlayerSpawn| true);
        assert_eq!(peeked.map(|m| m.client_id), Some(6));

        // Same entry is handed out again until the flush.
        assert!(buffer.peek(|_: &ClientRequestPlayerSpawn| true).is_some());
        assert!(buffer
            .consume(|_: &ClientRequestPlayerSpawn| true)
            .is_empty());

        assert_eq!(buffer.flush_peeked(), 1);
        assert!(buffer.peek(|_: &ClientRequestPlayerSpawn| true).is_none());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_peek_respects_predicate() {
        let mut buffer = MessageBuffer::new();
        buffer.push(chat(1, "one"));
        buffer.push(chat(2, "two"));

        let found = buffer.peek(|c: &ClientChat| c.client_id == 2);
        assert_eq!(found.map(|c| c.text.as_str()), Some("two"));
        assert!(buffer.peek(|c: &ClientChat| c.client_id == 9).is_none());

        assert_eq!(buffer.flush_peeked(), 1);
        let remaining = buffer.consume(|_: &ClientChat| true);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "one");
    }
}
