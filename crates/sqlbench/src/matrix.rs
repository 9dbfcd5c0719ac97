//! Run matrix generation.

use crate::scenario::Scenario;

/// Expand backends x {prepared, unprepared} x {transactional, autocommit}.
///
/// Backends keep their given order with duplicates dropped; within a backend
/// prepared precedes unprepared and transactional precedes autocommit.
pub fn generate<S: AsRef<str>>(backend_ids: &[S], row_count: u64) -> Vec<Scenario> {
    let mut seen: Vec<&str> = Vec::with_capacity(backend_ids.len());
    for id in backend_ids {
        let id = id.as_ref();
        if !seen.contains(&id) {
            seen.push(id);
        }
    }

    seen.into_iter()
        .flat_map(|id| {
            [true, false].into_iter().flat_map(move |prepared| {
                [true, false]
                    .into_iter()
                    .map(move |transactional| Scenario::new(id, prepared, transactional, row_count))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(scenarios: &[Scenario]) -> Vec<(String, bool, bool)> {
        scenarios
            .iter()
            .map(|s| (s.backend_id().to_string(), s.prepared(), s.transactional()))
            .collect()
    }

    #[test]
    fn test_full_cross_product_in_order() {
        let scenarios = generate(&["a", "b"], 100);

        assert_eq!(scenarios.len(), 8);
        assert_eq!(
            flags(&scenarios),
            vec![
                ("a".to_string(), true, true),
                ("a".to_string(), true, false),
                ("a".to_string(), false, true),
                ("a".to_string(), false, false),
                ("b".to_string(), true, true),
                ("b".to_string(), true, false),
                ("b".to_string(), false, true),
                ("b".to_string(), false, false),
            ]
        );
        assert!(scenarios.iter().all(|s| s.row_count() == 100));
    }

    #[test]
    fn test_deterministic() {
        let ids = vec!["rusqlite".to_string(), "ref".to_string()];
        assert_eq!(generate(&ids, 10), generate(&ids, 10));
    }

    #[test]
    fn test_duplicates_removed() {
        let scenarios = generate(&["ref", "sqlx", "ref"], 1);
        assert_eq!(scenarios.len(), 8);
        assert_eq!(scenarios[0].backend_id(), "ref");
        assert_eq!(scenarios[4].backend_id(), "sqlx");
    }

    #[test]
    fn test_empty_backends() {
        let ids: [&str; 0] = [];
        assert!(generate(&ids, 10).is_empty());
    }
}
