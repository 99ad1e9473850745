//! Waiting for a page's swap transfer to finish.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use super::TranslationTable;
use crate::mem::Vpn;

/// The future returned by [begin_io]. Resolves once this caller holds the
/// page's I/O-busy bit.
pub struct BeginIo<'a> {
    table: &'a dyn TranslationTable,
    vpn: Vpn,
}

/// Wait until no transfer of the page is in flight, then claim the page for
/// a transfer of our own. The caller must end it with
/// [end_io](TranslationTable::end_io).
pub fn begin_io(table: &dyn TranslationTable, vpn: Vpn) -> BeginIo<'_> {
    BeginIo { table, vpn }
}

impl Future for BeginIo<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<()> {
        if self.table.try_begin_io(self.vpn) {
            return Poll::Ready(());
        }

        // Register before looking again, so an end_io landing in between
        // still wakes us.
        self.table.wait_io(self.vpn, ctx.waker());
        if self.table.try_begin_io(self.vpn) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
