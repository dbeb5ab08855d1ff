mod connection;
mod repository;

pub use connection::connect_taxonomy_pool;
pub use repository::SqliteTaxonomyStore;
