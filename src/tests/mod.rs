//! End-to-end tests that run the Poller and helper tasks together over the
//! notification bus.
