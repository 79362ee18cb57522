use imap_store::storage::{IndexRange, SearchTerm};
use imap_store::{ColorLabel, Flag, FlagSet, SystemFlag};

#[test]
fn index_ranges_clamp() {
    for n in 0..6usize {
        let items: Vec<usize> = (1..=n).collect();
        for a in 1..8 {
            for b in a..8 {
                let window = IndexRange::new(a, b).apply(items.clone());
                if a > n {
                    assert!(window.is_empty());
                } else {
                    assert_eq!(window.len(), b.min(n) - a + 1);
                    assert_eq!(window.first(), Some(&a));
                }
                if a == b && a <= n {
                    assert_eq!(window, vec![a]);
                }
            }
        }
    }
}

#[test]
fn color_labels() {
    assert!(ColorLabel::new(ColorLabel::MAX + 1).is_none());
    let label = ColorLabel::new(7).unwrap();
    assert_eq!(label.value(), 7);
    assert_eq!(ColorLabel::from_keyword(&label.keyword()), Some(label));
}

#[test]
fn fetched_flags() {
    let flags = [
        Flag::Flagged,
        Flag::Custom("cl_2".into()),
        Flag::Custom("$Junk".into()),
    ];
    let set = FlagSet::from_flags(&flags);
    assert!(set.contains(SystemFlag::Flagged));
    assert!(set.contains(SystemFlag::User));
    assert_eq!(set.color_label, ColorLabel::new(2));
    assert_eq!(set.keywords, vec!["$Junk".to_string()]);
}

#[test]
fn unsettable_flags() {
    let unsettable = SystemFlag::unsettable();
    assert!(unsettable.contains(SystemFlag::Recent));
    assert!(unsettable.contains(SystemFlag::User));
    assert!(!unsettable.contains(SystemFlag::Seen));
}

#[test]
fn search_terms() {
    let term = SearchTerm::And(vec![
        SearchTerm::Or(vec![
            SearchTerm::From("ann".into()),
            SearchTerm::Cc("ann".into()),
        ]),
        SearchTerm::Flag(SystemFlag::Seen, false),
    ]);
    assert_eq!(
        term.to_query().unwrap(),
        "(OR FROM \"ann\" CC \"ann\" UNSEEN)"
    );
}
