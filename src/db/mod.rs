// Postgres + pgvector storage backend

pub mod operations;
pub mod pool;
pub mod table;

pub use operations::*;
pub use pool::*;
pub use table::*;
