pub mod row_store;
pub use row_store::{InMemoryRowStore, Row, RowStore};
pub mod cache;
pub use cache::{InMemoryTtlCache, TtlCache};
pub mod customer_repo;
pub use customer_repo::{CustomerRepository, UpsertOutcome};
pub mod session_repo;
pub use session_repo::SessionRepository;
