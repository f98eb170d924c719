//! Client-side text search over display fields

use crate::models::Record;

/// Case-insensitive substring match of `term` against any of `fields`.
/// A blank term matches every record.
pub fn matches(record: &Record, fields: &[&str], term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|field| record.text(field).to_lowercase().contains(&needle))
}

pub fn filter_records<'a>(records: &'a [Record], fields: &[&str], term: &str) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| matches(record, fields, term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn students() -> Vec<Record> {
        vec![
            json!({"id": 1, "first_name": "Amina", "last_name": "Otieno", "class_name": "7A"}),
            json!({"id": 2, "first_name": "Brian", "last_name": "Kamau", "class_name": "7B"}),
            json!({"id": 3, "first_name": "Chloé", "last_name": "AMIR", "class_name": null}),
        ]
        .into_iter()
        .filter_map(Record::from_value)
        .collect()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let records = students();
        let fields = ["first_name", "last_name", "class_name"];

        let ids: Vec<i64> = filter_records(&records, &fields, "AMI").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let ids: Vec<i64> = filter_records(&records, &fields, "7b").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);

        assert_eq!(filter_records(&records, &fields, "chloé").len(), 1);
    }

    #[test]
    fn test_blank_term_matches_all() {
        let records = students();
        assert_eq!(filter_records(&records, &["first_name"], "").len(), 3);
        assert_eq!(filter_records(&records, &["first_name"], "   ").len(), 3);
    }

    #[test]
    fn test_only_listed_fields_are_searched() {
        let records = students();
        assert!(filter_records(&records, &["first_name"], "kamau").is_empty());
    }
}
