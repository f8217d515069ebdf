#![doc(test(attr(deny(warnings))))]

//! Finance Core offers the ledger reconciliation engine behind a personal
//! finance tracker: accounts, balance snapshots, cards, a transaction ledger,
//! a recurring-item scheduler, and budget alerting, namespaced per owner over
//! a pluggable document store.

pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Finance Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
