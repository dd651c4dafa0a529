use displaydoc::Display;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AddressParseError {
    /// address string ended before the grammar was satisfied
    Truncated,
    /// unrecognized address scheme: {0}
    UnknownScheme(String),
    /// host component could not be parsed
    InvalidHost,
    /// port component was not a valid u16
    InvalidPort,
    /// trailing segments did not match `/p2p/<nodeID>`
    UnexpectedTrailer,
    /// dial address must not carry an embedded NodeID
    UnexpectedNodeId,
    /// full address requires a `/p2p/<nodeID>` suffix
    MissingNodeId,
    /// NodeID suffix was not valid base58
    InvalidNodeId,
}

impl std::error::Error for AddressParseError {}
