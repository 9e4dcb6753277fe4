//! Selects TLS implementation for the HTTP client.
