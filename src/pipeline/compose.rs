//! Static pipeline composition.
//!
//! [`attach`] wires a consumer onto a producer's broadcast node and hands the
//! consumer back, so linear chains read left to right:
//!
//! ```ignore
//! source
//!     .pipe(shared(Coalescer::new()))
//!     .pipe(shared(FragmentDecoder::new()))
//!     .pipe(shared(CsvFormatter::new()))
//!     .pipe(shared(Echo::stdout()));
//! ```
//!
//! Fan-out is built by piping several consumers from the same handle.
//! Composition happens once, before any source is started.

use crate::pipeline::broadcast::{lock, Listener, Producer, Shared};

/// Attach `consumer` to `producer` and return `consumer`.
pub fn attach<M, P, L>(producer: &Shared<P>, consumer: Shared<L>) -> Shared<L>
where
    P: Producer<M> + ?Sized,
    L: Listener<M> + 'static,
{
    let name = lock(&consumer).name().to_string();
    tracing::debug!("Attaching {}", name);
    lock(producer).output().attach(consumer)
}

/// Method form of [`attach`] on any shared producer handle.
pub trait Pipe<M> {
    fn pipe<L>(&self, consumer: Shared<L>) -> Shared<L>
    where
        L: Listener<M> + 'static;
}

impl<M, P> Pipe<M> for Shared<P>
where
    P: Producer<M>,
{
    fn pipe<L>(&self, consumer: Shared<L>) -> Shared<L>
    where
        L: Listener<M> + 'static,
    {
        attach(self, consumer)
    }
}
