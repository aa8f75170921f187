use std::collections::BTreeSet;

use proptest::prelude::*;

use quickform::common::Attributes;
use quickform::element::Text;
use quickform::form::{Form, Submission};
use quickform::param::FormMethod;

fn attribute_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z][a-z0-9_-]{0,7}", "[a-zA-Z0-9 &<>\"'=._;#-]{0,12}"), 0..6)
}

proptest! {
    #[test]
    fn test_attributes_survive_render_and_parse(pairs in attribute_pairs()) {
        let original = Attributes::from_pairs(&pairs);
        let html = original.to_html();
        let reparsed = Attributes::parse(&html);
        prop_assert_eq!(&reparsed, &original);
        prop_assert_eq!(reparsed.to_html(), html);
    }

    #[test]
    fn test_insert_before_keeps_index_bijection(
        base in 1usize..8,
        dup_sources in prop::collection::vec(0usize..8, 0..4),
        target in 0usize..8,
        reuse_name in prop::option::of(0usize..8),
    ) {
        let mut form = Form::new("p", FormMethod::Post, Submission::default());
        for i in 0..base {
            form.add_element(Box::new(Text::new(&format!("e{}", i), "", ""))).unwrap();
        }
        for source in &dup_sources {
            let name = format!("e{}", source % base);
            form.add_element(Box::new(Text::new(&name, "", ""))).unwrap();
        }
        let before = format!("e{}", target % base);
        prop_assume!(form.duplicate_indices(&before).is_empty());

        let name = reuse_name.map_or("fresh".to_string(), |i| format!("e{}", i % base));
        form.insert_element_before(Box::new(Text::new(&name, "", "class=inserted")), &before).unwrap();

        let mut names: BTreeSet<String> = form.elements().map(|e| e.name().to_string()).collect();
        names.insert(name);
        let mut indices = Vec::new();
        for name in &names {
            let primary = form.index_of(name).unwrap();
            prop_assert_eq!(form.elements().nth(primary).unwrap().name(), name.as_str());
            indices.push(primary);
            for &dup in form.duplicate_indices(name) {
                prop_assert_eq!(form.elements().nth(dup).unwrap().name(), name.as_str());
                indices.push(dup);
            }
        }
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..form.len()).collect::<Vec<_>>());

        let at = form.index_of(&before).unwrap();
        prop_assert!(at > 0);
        let inserted = form.elements().nth(at - 1).unwrap();
        prop_assert_eq!(inserted.attributes().get("class"), Some("inserted"));
    }
}
