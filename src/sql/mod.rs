//! SQL generation for mock substitution.
//!
//! - [`value`] - Typed host values
//! - [`encoder`] - Value → Snowflake literal rules
//! - [`literal_table`] - Rows → `UNION ALL` derived table
//! - [`rewrite`] - Textual substitution of table references
//! - [`helpers`] - Quoting and formatting primitives

pub mod encoder;
pub mod helpers;
pub mod literal_table;
pub mod rewrite;
pub mod value;


pub use encoder::{encode, EncodeError, LiteralEncoder, LiteralRule};
pub use literal_table::{build_literal_table, Row};
pub use rewrite::{
    count_table_references, replace_table_reference, replace_table_references, Replacement, Replacements,
};
pub use value::Value;
