//! Connection provider and query library for the scrape database.
//!
//! Every query is a pass-through: a statement is built here, executed by the
//! remote engine (through Supabase's `run_query` procedure or a direct
//! Postgres pool), and the JSON rows are decoded into typed records. Grouping,
//! ordering and filtering all happen remotely.

pub mod connection;
pub mod error;
pub mod postgres;
pub mod queries;
pub mod statements;
pub mod supabase;
pub mod types;

pub use connection::{Connection, Row};
pub use error::QueryError;
pub use postgres::{PoolConfig, PostgresBackend};
pub use queries::{
    find_client_id, find_keyword_id, latest_scrape_date, list_clients, list_keywords,
    merchant_distribution, merchant_products, position_trends, top_filters, top_products,
    TopProductsFilter,
};
pub use statements::{Order, TableSelect};
pub use supabase::SupabaseClient;
pub use types::{FilterCount, MerchantCount, MerchantProduct, PositionTrend, TopProduct};
