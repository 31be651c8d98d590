pub mod connection;
pub mod results;
pub mod schema;

pub use connection::make_pool;
pub use results::store_matches;
pub use schema::{PgRegistry, PgSource};
