//! Cross-crate integration tests for Custos. See `tests/`.
