//! Persistence primitives shared by the stock services. Every function is
//! generic over `ConnectionTrait` so it runs equally inside a transaction
//! or against the pool.

pub mod balance_repository;
pub mod movement_repository;
