//! tcc Integration Tests
//!
//! End-to-end behavior of the coordinator through the public facade:
//! confirm/cancel ordering, failure handling, the wallet payment flow, and
//! restart survival of unresolved transactions.

mod common;

mod commit;
mod durability;
mod wallet;
