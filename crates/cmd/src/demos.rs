//! Built-in demo scripts.
//!
//! Both seed the same four tables and build the latest-order-per-customer
//! report through a chain of temporary tables. `consolidate` seeds with
//! `CREATE TABLE ... AS SELECT * FROM VALUES`; `settle` declares the tables
//! and fills them with `INSERT OVERWRITE`.

use clap::ValueEnum;

const CONSOLIDATE_SQL: &str = include_str!("../sql/consolidate.sql");
const SETTLE_SQL: &str = include_str!("../sql/settle.sql");

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Seed with CREATE TABLE AS SELECT, then build the report
    Consolidate,
    /// Seed with explicit DDL and INSERT OVERWRITE, then build the report
    Settle,
}

impl Demo {
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Demo::Consolidate => CONSOLIDATE_SQL,
            Demo::Settle => SETTLE_SQL,
        }
    }

    /// Heading printed above the result table
    #[must_use]
    pub fn title(self) -> Option<&'static str> {
        match self {
            Demo::Consolidate => Some("Result from TMP_CUSTOMER_LATEST_ORDER:"),
            Demo::Settle => None,
        }
    }
}
