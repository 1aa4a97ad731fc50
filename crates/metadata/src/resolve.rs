//! Resolve the trakt id linked to a TVDB id.

use crate::trakt::TraktSearchResult;
use crate::MetadataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraktLink {
    Linked(i64),
    /// The show is not on trakt. Not an error.
    NotLinked,
}

/// Exactly one match is expected. Several matches, or a match without its
/// own id, mean the lookup response cannot be trusted.
pub fn resolve_trakt_id(results: &[TraktSearchResult]) -> Result<TraktLink, MetadataError> {
    match results {
        [] => Ok(TraktLink::NotLinked),
        [only] => only
            .show
            .as_ref()
            .and_then(|show| show.ids.as_ref())
            .and_then(|ids| ids.trakt)
            .map(TraktLink::Linked)
            .ok_or_else(|| {
                MetadataError::Corrupted("show trakt id lookup: match without trakt id".into())
            }),
        many => Err(MetadataError::Corrupted(format!(
            "show trakt id lookup: expected one match, got {}",
            many.len()
        ))),
    }
}
