use foldhash::fast::RandomState;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;

use crate::{
    codec::CodecId,
    error::{Error, ErrorKind, Result},
    value::Value,
};

pub(crate) type CallResult = Result<Option<Value>>;

/// One in-flight call: the return type the read loop must decode with, and
/// the slot the caller is waiting on.
pub(crate) struct Pending {
    pub ret: Option<CodecId>,
    tx: oneshot::Sender<CallResult>,
}

impl Pending {
    pub fn complete(self, result: CallResult) {
        // the caller may have abandoned the call; its response is discarded
        let _ = self.tx.send(result);
    }
}

/// Pending-call table correlating request ids with their waiting callers.
///
/// Ids come from a wrapping u32 counter; the wire carries them as a 4-byte
/// field. An entry is kept until its response arrives or the
/// connection dies — even when the caller has given up — because frames have
/// no length prefix and a response can only be consumed by decoding it with
/// the entry's return type.
#[derive(Default)]
pub(crate) struct Waiter {
    index: AtomicU32,
    id_map: dashmap::DashMap<u32, Pending, RandomState>,
}

impl Waiter {
    /// Reserves a fresh request id and registers its completion slot.
    ///
    /// # Errors
    ///
    /// Fails if the wrapped-around id is still pending, which bounds the
    /// number of concurrently in-flight calls below 2^32.
    pub fn alloc(&self, ret: Option<CodecId>) -> Result<(u32, oneshot::Receiver<CallResult>)> {
        use dashmap::mapref::entry::Entry;

        let id = self.index.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        match self.id_map.entry(id) {
            Entry::Occupied(_) => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("request id {id} is still in flight"),
            )),
            Entry::Vacant(entry) => {
                entry.insert(Pending { ret, tx });
                Ok((id, rx))
            }
        }
    }

    /// Removes and returns the pending entry for `id`, if any.
    pub fn take(&self, id: u32) -> Option<Pending> {
        self.id_map.remove(&id).map(|(_, pending)| pending)
    }

    /// Fails every outstanding call with a connection-broken error. Called
    /// on the unhealthy transition so no waiter is left hanging.
    pub fn fail_all(&self) {
        let ids: Vec<u32> = self.id_map.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some(pending) = self.take(id) {
                pending.complete(Err(Error::kind(ErrorKind::ConnectionBroken)));
            }
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter").finish()
    }
}
