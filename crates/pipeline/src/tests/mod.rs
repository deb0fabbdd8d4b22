//! End-to-end pipeline tests with in-memory sources.
