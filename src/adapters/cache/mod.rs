//! Caching decorators for repository adapters.

pub mod cached_event_repository;

pub use cached_event_repository::CachedEventRepository;
