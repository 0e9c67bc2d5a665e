//! # duo-db
//!
//! PostgreSQL implementations of the `duo-core` repository traits.
//!
//! The layer is deliberately thin: pool construction, row models with
//! sqlx `FromRow` derives, and one repository per aggregate. Roster
//! mutations that must be race-free (capacity-checked joins, close-when-
//! empty) are single conditional statements, never read-modify-write.
//!
//! ```rust,ignore
//! use duo_db::{create_pool, DatabaseConfig, PgRoomRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     let rooms = PgRoomRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use repositories::{PgMessageRepository, PgRoomRepository, PgSessionRepository};
