//! Property tests over schema options and generated schemas.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{catalog, model, options, registry};
use ormschema::prelude::*;
use proptest::prelude::*;
use proptest::sample::subsequence;

const AUCTION_FIELDS: [&str; 5] = ["id", "title", "category", "start_date", "end_date"];

fn node_model() -> Model {
    CatalogBuilder::new()
        .register(
            ModelDef::new("Node")
                .field(FieldDescriptor::new("label", FieldKind::CharField))
                .field(FieldDescriptor::foreign_key("parent", "self").null(true).related_name("children")),
        )
        .build()
        .unwrap()
        .model("Node")
        .unwrap()
}

proptest! {
    #[test]
    fn include_and_exclude_never_combine(
        include in subsequence(AUCTION_FIELDS.to_vec(), 1..=5),
        exclude in subsequence(AUCTION_FIELDS.to_vec(), 1..=5),
    ) {
        let catalog = catalog();
        let err = SchemaDecl::new("AuctionSchema")
            .options(options(&catalog, "Auction").include(include).exclude(exclude))
            .build()
            .unwrap_err();
        prop_assert!(err.is_config());
    }

    #[test]
    fn included_fields_keep_model_order(include in subsequence(AUCTION_FIELDS.to_vec(), 1..=5)) {
        let catalog = catalog();
        let schema = SchemaDecl::new("AuctionSchema")
            .options(options(&catalog, "Auction").include(include.clone()))
            .build()
            .unwrap();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        prop_assert_eq!(names, include);
    }

    #[test]
    fn optional_fields_are_never_required(optional in subsequence(AUCTION_FIELDS.to_vec(), 0..=5)) {
        let catalog = catalog();
        let schema = SchemaDecl::new("AuctionSchema")
            .options(options(&catalog, "Auction").optional(optional.clone()))
            .build()
            .unwrap();
        let required: BTreeSet<&str> = schema.required_fields().collect();
        for name in &optional {
            let field = schema.field(name).unwrap();
            prop_assert!(field.allows_none());
            prop_assert!(!required.contains(name));
        }
        prop_assert!(!required.contains("id"));
    }

    #[test]
    fn choice_values_round_trip(
        values in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let values: Vec<String> = values.into_iter().collect();
        let choices = values
            .iter()
            .map(|v| Choice::new(v.as_str(), format!("Label {v}")))
            .collect();
        let level = CatalogBuilder::new()
            .register(ModelDef::new("Tier").field(FieldDescriptor::new("level", FieldKind::CharField).choices(choices)))
            .build()
            .unwrap()
            .model("Tier")
            .unwrap();
        let schema = SchemaDecl::new("TierSchema")
            .options(SchemaOptions::new(level).registry(registry()))
            .build()
            .unwrap();

        let chosen = pick.get(&values).clone();
        let value = schema.construct([("level", chosen.as_str())]).unwrap();
        let dumped = value.dump(&DumpOptions::new());
        prop_assert_eq!(dumped["level"].as_str(), Some(chosen.as_str()));

        let outside = format!("{chosen}-x");
        prop_assert!(schema.construct([("level", outside.as_str())]).is_err());
    }

    #[test]
    fn relation_expansion_stops_at_depth(depth in 0u32..5) {
        let node = node_model();
        let schema = create_schema(
            &node,
            CreateOptions::new().depth(depth).skip_registry(true).registry(registry()),
        )
        .unwrap();

        let mut levels = 0;
        let mut current = schema;
        while let Some(nested) = current.field("parent").and_then(|f| f.ty.schema()).map(Arc::clone) {
            levels += 1;
            current = nested;
        }
        prop_assert_eq!(levels, depth);
        prop_assert_eq!(current.field("parent").map(|f| f.ty.clone()), Some(FieldType::Int));
    }
}

#[test]
fn primary_key_defaults_to_optional() {
    let catalog = catalog();
    for name in ["Category", "Auction", "Client", "Group"] {
        let schema = create_schema(&model(&catalog, name), CreateOptions::new().registry(registry())).unwrap();
        assert!(schema.required_fields().all(|f| f != "id"), "{name}");
    }
}
