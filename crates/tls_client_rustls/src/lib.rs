//! Enables rustls with native root certificates for reqwest.
