use lendscan_ctoken::EventOrigin;

/// Deterministic activity-record identifier for an event's chain position.
///
/// `"{transaction_hash}-{log_index}"` is unique per emitted log and stable
/// under replay, so re-processing an event overwrites itself instead of
/// duplicating.
pub fn generate_id(origin: &EventOrigin) -> String {
    format!("{}-{}", origin.transaction_hash, origin.log_index)
}
