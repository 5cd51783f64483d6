pub mod queries;

pub use deadpool_postgres;
pub use tokio_postgres;

/// Parameter slice accepted by every statement in [`queries`].
pub(crate) type Params<'a> = [&'a (dyn postgres_types::ToSql + Sync)];
