//! Concrete implementations of the persistence ports.

pub mod memory;

pub use memory::{
    InMemoryResetTokenRepository, InMemorySessionRepository, InMemoryUserRepository,
};
