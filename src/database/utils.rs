use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?").expect("placeholder pattern is valid"));

/// Collapse whitespace and rewrite positional `?` placeholders into the
/// numbered `$n` form Postgres expects. Queries passed here must not contain
/// a literal `?`.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut index = 0;
    PLACEHOLDER
        .replace_all(&cleaned, |_: &regex::Captures| {
            index += 1;
            format!("${}", index)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sql_numbers_placeholders_in_order() {
        let query = sql(r#"
            SELECT id
            FROM   posts
            WHERE  tenant_id = ? AND installation_id = ?
        "#);

        assert_eq!(
            query,
            "SELECT id FROM posts WHERE tenant_id = $1 AND installation_id = $2"
        );
    }

    #[test]
    fn test_sql_without_placeholders_is_only_cleaned() {
        assert_eq!(sql("SELECT  1"), "SELECT 1");
    }
}
