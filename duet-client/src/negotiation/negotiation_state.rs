use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    AwaitingLocalMedia,
    OfferSent,
    OfferReceived,
    AnswerSent,
    AnswerReceived,
    Connected,
    Ended,
}

impl NegotiationState {
    /// States belonging to a live attempt.
    pub fn is_negotiating(self) -> bool {
        !matches!(self, Self::Idle | Self::Ended)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
