use bson::{Bson, doc};
use docmod::{ElementMatcher, FilterMatcher, UpdateSpec, apply_update_with, parse_update_json};

struct MatchEverything;

impl ElementMatcher for MatchEverything {
    fn select_matching(&self, _expr: &Bson, candidates: &[Bson]) -> Vec<Bson> {
        candidates.to_vec()
    }
}

struct MatchNothing;

impl ElementMatcher for MatchNothing {
    fn select_matching(&self, _expr: &Bson, _candidates: &[Bson]) -> Vec<Bson> {
        Vec::new()
    }
}

#[test]
fn pull_routes_expressions_through_the_injected_matcher() {
    let spec = UpdateSpec { pull: vec![("arr".into(), Bson::Int32(0))], ..Default::default() };

    let mut d = doc! {"arr": [1, 2, 3]};
    apply_update_with(&mut d, &spec, false, &MatchEverything).unwrap();
    assert_eq!(d, doc! {"arr": []});

    let mut d = doc! {"arr": [1, 2, 3]};
    apply_update_with(&mut d, &spec, false, &MatchNothing).unwrap();
    assert_eq!(d, doc! {"arr": [1, 2, 3]});
}

#[test]
fn built_in_matcher_selects_by_field_condition() {
    let spec = UpdateSpec {
        pull: vec![("items".into(), Bson::Document(doc! {"qty": {"$gte": 10}}))],
        ..Default::default()
    };
    let mut d = doc! {"items": [{"qty": 2}, {"qty": 10}, {"qty": 50}]};
    apply_update_with(&mut d, &spec, false, &FilterMatcher).unwrap();
    assert_eq!(d, doc! {"items": [{"qty": 2}]});
}

#[test]
fn parsed_json_update_applies_end_to_end() {
    let spec = parse_update_json(
        r#"{"$set": {"user.name": "alice"},
            "$inc": {"user.visits": 1},
            "$pull": {"tags": {"$lt": 0}},
            "$unset": {"tmp": 1}}"#,
    )
    .unwrap();
    let mut d = doc! {"tags": [-2, 5, -1, 8], "tmp": "x", "user": {"visits": 4}};
    docmod::apply_update(&mut d, &spec, false).unwrap();
    assert_eq!(d.get_document("user").unwrap().get_str("name").unwrap(), "alice");
    assert_eq!(d.get_document("user").unwrap().get_f64("visits").unwrap(), 5.0);
    assert_eq!(d.get_array("tags").unwrap().len(), 2);
    assert!(d.get("tmp").is_none());
}
