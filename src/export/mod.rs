pub mod csv_export;

pub use csv_export::{export_matches_csv, export_unresolved_csv, write_stats_json};
