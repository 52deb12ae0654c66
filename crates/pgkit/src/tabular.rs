//! Parser for `|`-separated tables printed by `psql`.
//!
//! Only lines that split into exactly the expected number of segments are
//! treated as table rows; banners, row-count footers and blank lines fall
//! out naturally. The first such line is the header. The last segment of
//! every row is dropped: listing queries end each row with a separator.

use serde::Serialize;

/// Column separator used in listing output.
pub const SEPARATOR: char = '|';

/// One table row as ordered, key-unique `(field, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabularRecord {
    fields: Vec<(String, String)>,
}

impl TabularRecord {
    /// Build a record, keeping the first occurrence of duplicate fields.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            if fields.iter().any(|(k, _)| *k == key) {
                continue;
            }
            fields.push((key, value.into()));
        }
        Self { fields }
    }

    /// Value of a field, if the record has it.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    /// Field value interpreted as a psql boolean (`t` / `f`).
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            "t" | "true" | "on" => Some(true),
            "f" | "false" | "off" => Some(false),
            _ => None,
        }
    }

    /// Field names in header order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// `(field, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse `raw` into records, using only lines with exactly `columns` segments.
///
/// Returns an empty vector when no line qualifies.
pub fn parse(raw: &str, columns: usize) -> Vec<TabularRecord> {
    let mut rows = raw.lines().filter_map(|line| {
        let segments: Vec<&str> = line.split(SEPARATOR).map(str::trim).collect();
        (segments.len() == columns).then_some(segments)
    });

    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let names = &header[..header.len() - 1];

    rows.filter(|row| !row[0].is_empty())
        .map(|row| {
            TabularRecord::from_pairs(
                names
                    .iter()
                    .zip(&row[..row.len() - 1])
                    .map(|(k, v)| (*k, *v)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Name | Owner | Encoding | Collate | Ctype |
alpha | bob | UTF8 | C | C |
";

    #[test]
    fn test_parse_single_row() {
        let records = parse(LISTING, 6);
        assert_eq!(records.len(), 1);

        let expected = TabularRecord::from_pairs([
            ("Name", "alpha"),
            ("Owner", "bob"),
            ("Encoding", "UTF8"),
            ("Collate", "C"),
            ("Ctype", "C"),
        ]);
        assert_eq!(records[0], expected);
        assert_eq!(
            records[0].fields().collect::<Vec<_>>(),
            vec!["Name", "Owner", "Encoding", "Collate", "Ctype"]
        );
    }

    #[test]
    fn test_rejects_short_and_long_rows() {
        let raw = "\
Name | Owner | Encoding | Collate | Ctype |
short | bob | UTF8 | C |
long | bob | UTF8 | C | C | x |
beta | carol | UTF8 | C | C |
";
        let records = parse(raw, 6);
        let names: Vec<_> = records.iter().filter_map(|r| r.get("Name")).collect();
        assert_eq!(names, vec!["beta"]);
    }

    #[test]
    fn test_skips_divider_rows_and_footer() {
        let raw = "\
 List of databases
Name | Owner | Encoding | Collate | Ctype |
     |       |          |         |       |
alpha | bob | UTF8 | C | C |
(1 row)

";
        let records = parse(raw, 6);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Owner"), Some("bob"));
    }

    #[test]
    fn test_no_qualifying_lines() {
        assert!(parse("", 6).is_empty());
        assert!(parse("psql: error: connection refused\n", 6).is_empty());
    }

    #[test]
    fn test_header_only() {
        assert!(parse("Name|Owner|Encoding|Collate|Ctype|_\n", 6).is_empty());
    }

    #[test]
    fn test_unaligned_output_with_null_trailer() {
        let raw = "Name|Owner|Encoding|Collate|Ctype|_\npostgres|postgres|UTF8|en_US.UTF-8|en_US.UTF-8|\n";
        let records = parse(raw, 6);
        assert_eq!(records[0].get("Name"), Some("postgres"));
        assert_eq!(records[0].get("_"), None);
        assert_eq!(records[0].len(), 5);
    }

    #[test]
    fn test_duplicate_header_keeps_first() {
        let records = parse("a|a|\n1|2|\n", 3);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0].get("a"), Some("1"));
    }

    #[test]
    fn test_get_bool() {
        let record = TabularRecord::from_pairs([("rolcreatedb", "t"), ("rolsuper", "f")]);
        assert_eq!(record.get_bool("rolcreatedb"), Some(true));
        assert_eq!(record.get_bool("rolsuper"), Some(false));
        assert_eq!(record.get_bool("missing"), None);
    }
}
