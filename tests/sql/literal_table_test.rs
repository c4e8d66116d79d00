//! Row set literals built from mock rows.
#[path = "../support/mod.rs"]
mod support;

use insta::assert_snapshot;
use snowmock::sql::{build_literal_table, LiteralEncoder, Row, Value};
use support::{assert_parses, occurrences};

fn encoder() -> LiteralEncoder {
    LiteralEncoder::snowflake()
}

#[test]
fn test_two_rows() {
    let rows = vec![
        Row::new().with("email_status", "sent").with("id", 1),
        Row::new().with("email_status", "answered").with("id", 2),
    ];
    assert_snapshot!(build_literal_table(&rows, &encoder()).unwrap(), @r"
    (SELECT 'sent'::text AS email_status, 1::number AS id
    UNION ALL
    SELECT 'answered'::text AS email_status, 2::number AS id)
    ");
}

#[test]
fn test_n_rows_give_n_selects() {
    for n in [1usize, 2, 5, 12] {
        let rows: Vec<Row> = (0..n)
            .map(|i| Row::new().with("id", i as i64).with("flag", i % 2 == 0))
            .collect();
        let sql = build_literal_table(&rows, &encoder()).unwrap();

        assert_eq!(occurrences(&sql, "SELECT "), n, "{sql}");
        assert_eq!(occurrences(&sql, "UNION ALL"), n - 1, "{sql}");
        assert!(sql.starts_with('(') && sql.ends_with(')'));
        assert_parses(&format!("SELECT * FROM {}", sql));
    }
}

#[test]
fn test_field_order_follows_each_row() {
    let rows = vec![
        Row::new().with("b", 1).with("a", 2),
        Row::new().with("a", 3).with("b", 4),
    ];
    let sql = build_literal_table(&rows, &encoder()).unwrap();
    assert_eq!(
        sql,
        "(SELECT 1::number AS b, 2::number AS a\nUNION ALL\nSELECT 3::number AS a, 4::number AS b)"
    );
}

#[test]
fn test_row_from_iterator() {
    let row: Row = [("email_id", Value::from("Email to Jef")), ("opened", Value::Null)]
        .into_iter()
        .collect();
    let sql = build_literal_table(&[row], &encoder()).unwrap();
    assert_eq!(sql, "(SELECT 'Email to Jef'::text AS email_id, NULL AS opened)");
}

#[test]
fn test_empty_rows_render_empty_parens() {
    assert_eq!(build_literal_table(&[], &encoder()).unwrap(), "()");
}

#[test]
fn test_backslashes_keep_the_query_intact() {
    let rows = vec![
        Row::new()
            .with("path", r"C:\temp\")
            .with("n", 1)
            .with("meta", Value::Null),
        Row::new()
            .with("path", r"\\share\new")
            .with("n", 2)
            .with("meta", Value::object([(r"dir\", Value::from("tab\tend"))])),
    ];
    let sql = build_literal_table(&rows, &encoder()).unwrap();

    assert!(sql.contains(r"'C:\\temp\\'::text AS path"), "{sql}");
    assert!(sql.contains(r"'\\\\share\\new'::text AS path"), "{sql}");
    assert!(sql.contains("OBJECT_CONSTRUCT('dir\\\\','tab\tend'::text)"), "{sql}");
    assert_parses(&format!("SELECT * FROM {}", sql));
}
