use crate::{editor::Row, kvp::Attribute};

/// Returns `true` if the key of the row at `index` is used more than once.
///
/// Only enabled rows are counted individually. Disabled rows (protected or
/// inherited) and the `pinned` attribute are supplied externally, so at most
/// one of them is counted no matter how many share the key. Disabled rows are
/// never reported as duplicates themselves, because users cannot change them.
///
/// Rows with an empty key are never duplicates.
pub fn is_duplicate(rows: &[Row], index: usize, pinned: Option<&Attribute>) -> bool {
    let Some(row) = rows.get(index) else {
        return false;
    };

    let key = row.key();
    if key.is_empty() || row.is_disabled() {
        return false;
    }

    let enabled = rows
        .iter()
        .filter(|other| !other.is_disabled() && other.key() == key)
        .count();

    let external = rows
        .iter()
        .any(|other| other.is_disabled() && other.key() == key)
        || pinned.is_some_and(|pinned| pinned.key == key);

    enabled + usize::from(external) > 1
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::new(Attribute::new("env", "prod")),
            Row::new(Attribute::new("team", "x")),
            Row::new(Attribute::new("env", "staging")),
            Row::new(Attribute::new("owner", "a")).with_protected(true),
            Row::new(Attribute::new("project", "p")).with_inherited(true),
            Row::new(Attribute::new("owner", "b")),
            Row::new(Attribute::new("Env", "x")),
            Row::blank(),
            Row::blank(),
        ]
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(2, true)]
    #[case(3, false)]
    #[case(4, false)]
    #[case(5, true)]
    #[case(6, false)]
    #[case(7, false)]
    #[case(42, false)]
    fn duplicates(#[case] index: usize, #[case] expected: bool) {
        assert_eq!(is_duplicate(&rows(), index, None), expected);
    }

    #[test]
    fn disabled_rows_do_not_collide_with_each_other() {
        let rows = vec![
            Row::new(Attribute::new("project", "p")).with_inherited(true),
            Row::new(Attribute::new("project", "p")).with_protected(true),
            Row::new(Attribute::new("project", "q")),
        ];

        assert!(!is_duplicate(&rows, 0, None));
        assert!(!is_duplicate(&rows, 1, None));
        assert!(is_duplicate(&rows, 2, None));
    }

    #[test]
    fn pinned_counts_as_external() {
        let rows = vec![Row::new(Attribute::new("team", "x"))];
        let pinned = Attribute::new("team", "y");

        assert!(!is_duplicate(&rows, 0, None));
        assert!(is_duplicate(&rows, 0, Some(&pinned)));
    }
}
