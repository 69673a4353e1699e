//! Request/response exchange with the shared store.

use crate::{
    Result,
    persist::{SyncRequest, SyncResponse},
};

/// Port for talking to the authoritative store.
///
/// Both calls answer with the full snapshot of every table the store holds.
pub trait SyncTransport: Send {
    /// `GET`: fetch the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] when the exchange fails.
    fn fetch(&mut self) -> Result<SyncResponse>;

    /// `POST`: deliver a batch of updates or a reset request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] when the exchange fails.
    fn push(&mut self, request: &SyncRequest) -> Result<SyncResponse>;
}
