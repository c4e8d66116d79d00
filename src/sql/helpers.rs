//! Shared rendering helpers for Snowflake literal SQL.

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes.
///
/// Snowflake treats `\` as an escape inside single-quoted literals, so
/// backslashes are doubled along with embedded quotes.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

// =============================================================================
// Scalars
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format a finite float in its shortest round-trip form.
///
/// Returns `None` for NaN and infinities, which have no literal form.
pub fn format_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    let mut buffer = ryu::Buffer::new();
    Some(buffer.format_finite(f).to_string())
}

/// Append a `::type` cast to a literal.
pub fn cast(literal: &str, warehouse_type: &str) -> String {
    format!("{}::{}", literal, warehouse_type)
}

// =============================================================================
// Semi-structured Constructors
// =============================================================================

/// `TO_VARIANT(OBJECT_CONSTRUCT(...))` over already-encoded arguments.
pub fn variant_object(args: &[String]) -> String {
    format!("TO_VARIANT(OBJECT_CONSTRUCT({}))", args.join(","))
}

/// `TO_VARIANT(ARRAY_CONSTRUCT(...))` over already-encoded elements.
pub fn variant_array(items: &[String]) -> String {
    format!("TO_VARIANT(ARRAY_CONSTRUCT({}))", items.join(","))
}
