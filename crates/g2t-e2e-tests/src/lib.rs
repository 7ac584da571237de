//! End-to-end tests for goe2tesla. The scenarios live under `tests/`.
