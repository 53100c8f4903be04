//! The handler contract a session serves requests through.

use crate::error::Result;
use crate::oid::Oid;
use crate::value::Value;

/// Serves the OID region a session has registered.
///
/// The session translates every incoming Get, GetNext and GetBulk varbind
/// into calls on this trait and maps `None` results to the appropriate
/// exception varbind (noSuchObject for Get, endOfMibView for GetNext and
/// GetBulk). An `Err` marks the whole response with `processingError` while
/// the per-varbind layout of the request is preserved.
///
/// Handlers are called from the dispatcher between frames, so they should
/// return quickly; snapshot slow data into a [`ListHandler`]-style table
/// instead of blocking here.
///
/// [`ListHandler`]: crate::list_handler::ListHandler
pub trait Handler: Send + Sync {
    /// Look up the exact `oid`.
    ///
    /// Returns the matched OID and its value, or `None` if no such object
    /// exists.
    fn get(&self, oid: &Oid) -> Result<Option<(Oid, Value)>>;

    /// Find the first variable after `from` (at `from` itself when
    /// `include_from`) and strictly before `to`. An empty `to` leaves the
    /// range unbounded above.
    fn get_next(&self, from: &Oid, include_from: bool, to: &Oid) -> Result<Option<(Oid, Value)>>;
}
