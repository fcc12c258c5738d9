use duet_core::{
    ChatMessage, MessageContent, Participant, ParticipantId, RoomCode, RoomError, RoomId,
    RoomMode,
};
use std::time::Duration;
use tokio::time::Instant;

/// A room never holds more than this many members.
pub const MAX_MEMBERS: usize = 2;

/// What a successful join hands back to the joiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub total_users: usize,
    pub messages: Vec<ChatMessage>,
    pub mode: RoomMode,
    pub is_initiator: bool,
}

/// Point-in-time view of a room, for observation and tests.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub code: RoomCode,
    pub mode: RoomMode,
    pub members: Vec<Participant>,
    pub message_count: usize,
}

/// Membership and history of one room. Owned and mutated only by its actor.
///
/// `members[0]` holds the initiator seat: the creator while present, otherwise
/// whoever has been in the room longest.
#[derive(Debug)]
pub struct RoomState {
    code: RoomCode,
    mode: RoomMode,
    members: Vec<ParticipantId>,
    messages: Vec<ChatMessage>,
    expires_at: Instant,
    empty_since: Option<Instant>,
}

impl RoomState {
    pub fn new(
        code: RoomCode,
        mode: RoomMode,
        creator: ParticipantId,
        now: Instant,
        ttl: Duration,
    ) -> Self {
        Self {
            code,
            mode,
            members: vec![creator],
            messages: Vec::new(),
            expires_at: now + ttl,
            empty_since: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn mode(&self) -> RoomMode {
        self.mode
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn is_member(&self, participant: &ParticipantId) -> bool {
        self.members.contains(participant)
    }

    pub fn is_initiator(&self, participant: &ParticipantId) -> bool {
        self.members.first() == Some(participant)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members other than `participant`.
    pub fn others(&self, participant: &ParticipantId) -> Vec<ParticipantId> {
        self.members
            .iter()
            .filter(|id| *id != participant)
            .copied()
            .collect()
    }

    /// Adds a member. The second flag is false when the participant was already inside.
    pub fn join(&mut self, participant: ParticipantId) -> Result<(JoinOutcome, bool), RoomError> {
        let newly_joined = if self.is_member(&participant) {
            false
        } else if self.members.len() >= MAX_MEMBERS {
            return Err(RoomError::RoomFull);
        } else {
            self.members.push(participant);
            self.empty_since = None;
            true
        };

        let outcome = JoinOutcome {
            total_users: self.members.len(),
            messages: self.messages.clone(),
            mode: self.mode,
            is_initiator: self.is_initiator(&participant),
        };
        Ok((outcome, newly_joined))
    }

    /// Removes a member and returns how many remain.
    pub fn leave(&mut self, participant: &ParticipantId, now: Instant) -> Result<usize, RoomError> {
        let position = self
            .members
            .iter()
            .position(|id| id == participant)
            .ok_or(RoomError::NotInRoom)?;
        self.members.remove(position);

        if self.members.is_empty() {
            self.empty_since = Some(now);
        }
        Ok(self.members.len())
    }

    pub fn append(
        &mut self,
        sender: ParticipantId,
        content: MessageContent,
        timestamp: u64,
        max_file_bytes: u64,
    ) -> Result<ChatMessage, RoomError> {
        if !self.is_member(&sender) {
            return Err(RoomError::NotInRoom);
        }
        if let MessageContent::File(file) = &content {
            let size = file.data.len() as u64;
            if size > max_file_bytes {
                return Err(RoomError::FileTooLarge {
                    size,
                    limit: max_file_bytes,
                });
            }
        }

        let message = ChatMessage::new(sender, content, timestamp);
        self.messages.push(message.clone());
        Ok(message)
    }

    /// When the room must be torn down: at expiry, or once the grace period of
    /// an empty room has run out, whichever comes first.
    pub fn deadline(&self, grace: Duration) -> Instant {
        match self.empty_since {
            Some(since) => (since + grace).min(self.expires_at),
            None => self.expires_at,
        }
    }

    pub fn snapshot(&self, id: RoomId) -> RoomSnapshot {
        let members = self
            .members
            .iter()
            .map(|id| Participant {
                id: *id,
                room_code: self.code.clone(),
                is_initiator: self.is_initiator(id),
            })
            .collect();

        RoomSnapshot {
            id,
            code: self.code.clone(),
            mode: self.mode,
            members,
            message_count: self.messages.len(),
        }
    }
}
