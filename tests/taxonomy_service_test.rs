//! Integration tests for TaxonomyService

use rstest::rstest;

use nestset::application::services::{Taxonomy, TaxonomyService};
use nestset::application::{ApplicationError, NodeQuery};
use nestset::config::EngineSettings;
use nestset::domain::{DomainError, InvalidOperation, Node, NodeId, Payload};
use nestset::infrastructure::MemoryStore;
use nestset::util::testing::init_test_setup;

type Service = TaxonomyService<MemoryStore<Taxonomy>>;

fn service() -> Service {
    init_test_setup();
    TaxonomyService::open(MemoryStore::new(), EngineSettings::default()).unwrap()
}

fn is_validation(err: &ApplicationError, expected: &str) -> bool {
    matches!(
        err,
        ApplicationError::Domain(DomainError::Validation { field, .. }) if *field == expected
    )
}

fn is_incompatible(err: &ApplicationError) -> bool {
    matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidOperation(InvalidOperation::Incompatible(_)))
    )
}

#[test]
fn given_new_taxonomy_when_creating_then_slug_derives_from_name() {
    // Arrange
    let taxonomies = service();

    // Act
    let node = taxonomies
        .create(None, "  Tin Tức Mới ", "POST", Some("latest"))
        .unwrap();

    // Assert
    assert_eq!(node.payload.name, "Tin Tức Mới");
    assert_eq!(node.payload.slug, "tin-tuc-moi");
    assert_eq!(node.payload.post_type, "POST");
    assert_eq!(node.payload.description.as_deref(), Some("latest"));
}

#[test]
fn given_taken_slug_when_creating_then_new_slug_gets_copy_suffix() {
    // Arrange
    let taxonomies = service();
    let first = taxonomies.create(None, "News", "POST", None).unwrap();

    // Act
    let second = taxonomies.create(None, "news", "POST", None).unwrap();

    // Assert
    assert_eq!(first.payload.slug, "news");
    assert!(second.payload.slug.starts_with("news-copy-"));
    assert_ne!(first.payload.slug, second.payload.slug);
    assert_eq!(
        taxonomies.find_by_slug("news").unwrap().map(|n| n.id),
        Some(first.id)
    );
}

#[test]
fn given_name_matching_root_slug_when_creating_then_does_not_collide_with_root() {
    let taxonomies = service();

    let node = taxonomies.create(None, "Root", "POST", None).unwrap();

    assert!(node.payload.slug.starts_with("root-copy-"), "{}", node.payload.slug);
}

#[rstest]
#[case("POST", "PAGE", false)]
#[case("POST", "POST", true)]
fn given_parent_post_type_when_creating_child_then_types_must_match(
    #[case] parent_type: &str,
    #[case] child_type: &str,
    #[case] accepted: bool,
) {
    let taxonomies = service();
    let parent = taxonomies.create(None, "Parent", parent_type, None).unwrap();

    let result = taxonomies.create(Some(parent.id), "Child", child_type, None);

    assert_eq!(result.is_ok(), accepted);
    if let Err(err) = result {
        assert!(is_incompatible(&err), "{err}");
    }
}

#[rstest]
#[case("post")]
#[case("PO")]
#[case("POST_TYPE")]
fn given_bad_post_type_when_creating_then_rejects(#[case] post_type: &str) {
    let taxonomies = service();

    let err = taxonomies.create(None, "Valid name", post_type, None).unwrap_err();

    assert!(is_validation(&err, "post_type"), "{err}");
    assert_eq!(taxonomies.hierarchy().engine().root().unwrap().right, 1);
}

#[test]
fn given_update_when_changing_name_then_slug_and_post_type_stay() {
    let taxonomies = service();
    let node = taxonomies.create(None, "Sports", "POST", Some("old")).unwrap();

    let updated = taxonomies.update(node.id, Some("Sport News"), None).unwrap();

    assert_eq!(updated.payload.name, "Sport News");
    assert_eq!(updated.payload.slug, "sports");
    assert_eq!(updated.payload.post_type, "POST");
    assert_eq!(updated.payload.description.as_deref(), Some("old"));
}

#[test]
fn given_slug_change_when_valid_then_findable_under_new_slug() {
    let taxonomies = service();
    let node = taxonomies.create(None, "Sports", "POST", None).unwrap();

    taxonomies.change_slug(node.id, "sport-news").unwrap();

    assert!(taxonomies.find_by_slug("sports").unwrap().is_none());
    assert_eq!(
        taxonomies.find_by_slug("sport-news").unwrap().map(|n| n.id),
        Some(node.id)
    );
}

#[rstest]
#[case::unchanged("sports")]
#[case::taken("music")]
#[case::bad_format("Sport News")]
fn given_bad_slug_when_changing_then_rejects(#[case] slug: &str) {
    // Arrange
    let taxonomies = service();
    let node = taxonomies.create(None, "Sports", "POST", None).unwrap();
    taxonomies.create(None, "Music", "POST", None).unwrap();

    // Act
    let err = taxonomies.change_slug(node.id, slug).unwrap_err();

    // Assert
    assert!(is_validation(&err, "slug"), "{err}");
    assert_eq!(taxonomies.get(node.id).unwrap().payload.slug, "sports");
}

#[test]
fn given_other_post_type_target_when_moving_then_rejects() {
    let taxonomies = service();
    let post = taxonomies.create(None, "Articles", "POST", None).unwrap();
    let page = taxonomies.create(None, "Pages", "PAGE", None).unwrap();

    let err = taxonomies.move_taxonomy(post.id, Some(page.id)).unwrap_err();

    assert!(is_incompatible(&err));
    assert_eq!(taxonomies.get(post.id).unwrap().parent, Some(NodeId::ROOT));
}

#[test]
fn given_same_post_type_when_moving_then_path_follows() {
    let taxonomies = service();
    let world = taxonomies.create(None, "World", "POST", None).unwrap();
    let asia = taxonomies.create(None, "Asia", "POST", None).unwrap();
    let vietnam = taxonomies.create(Some(asia.id), "Vietnam", "POST", None).unwrap();

    assert!(taxonomies.move_taxonomy(asia.id, Some(world.id)).unwrap());

    let path: Vec<String> = taxonomies
        .path(vietnam.id)
        .unwrap()
        .into_iter()
        .map(|n| n.payload.slug)
        .collect();
    assert_eq!(path, vec!["world", "asia", "vietnam"]);
    taxonomies.verify().unwrap();
}

#[test]
fn given_mixed_post_types_when_building_forest_for_one_type_then_others_are_absent() {
    // Arrange
    let taxonomies = service();
    let news = taxonomies.create(None, "News", "POST", None).unwrap();
    taxonomies.create(Some(news.id), "Local", "POST", None).unwrap();
    taxonomies.create(None, "Shoes", "PRODUCT", None).unwrap();

    // Act
    let posts = taxonomies.as_forest_for("POST", None).unwrap();
    let products = taxonomies.as_forest_for("PRODUCT", None).unwrap();

    // Assert
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].item.payload.slug, "news");
    assert_eq!(posts[0].children.len(), 1);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].item.payload.slug, "shoes");
}

#[test]
fn given_subtree_scope_when_building_forest_for_type_then_limited_to_subtree() {
    let taxonomies = service();
    let news = taxonomies.create(None, "News", "POST", None).unwrap();
    let local = taxonomies.create(Some(news.id), "Local", "POST", None).unwrap();
    taxonomies.create(Some(local.id), "City", "POST", None).unwrap();
    taxonomies.create(None, "Blog", "POST", None).unwrap();

    let forest = taxonomies.as_forest_for("POST", Some(local.id)).unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].item.id, local.id);
    assert_eq!(forest[0].size(), 2);
}

#[test]
fn given_tag_query_when_listing_then_filters_by_post_type() {
    let taxonomies = service();
    taxonomies.create(None, "News", "POST", None).unwrap();
    taxonomies.create(None, "Shoes", "PRODUCT", None).unwrap();

    let page = taxonomies
        .list(&NodeQuery {
            tag: Some("PRODUCT".into()),
            ..NodeQuery::genealogy_of(None)
        })
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].payload.slug, "shoes");

    let err = taxonomies
        .list(&NodeQuery {
            tag: Some("product".into()),
            ..NodeQuery::default()
        })
        .unwrap_err();
    assert!(is_validation(&err, "post_type"));
}

#[test]
fn given_taxonomy_with_children_when_removing_then_whole_subtree_is_gone() {
    let taxonomies = service();
    let news = taxonomies.create(None, "News", "POST", None).unwrap();
    let local = taxonomies.create(Some(news.id), "Local", "POST", None).unwrap();

    assert_eq!(taxonomies.remove(news.id).unwrap(), 2);

    assert!(taxonomies.get(local.id).unwrap_err().is_not_found());
    assert!(taxonomies.find_by_slug("local").unwrap().is_none());
}

#[rstest]
#[case("snake__case", "snake-case")]
#[case("a_ b_c", "a-b-c")]
fn given_underscore_name_when_creating_then_slug_is_findable(
    #[case] name: &str,
    #[case] expected: &str,
) {
    // Arrange
    let taxonomies = service();

    // Act
    let node = taxonomies.create(None, name, "POST", None).unwrap();

    // Assert
    assert_eq!(node.payload.slug, expected);
    assert_eq!(
        taxonomies.find_by_slug(expected).unwrap().map(|n| n.id),
        Some(node.id)
    );
    taxonomies.change_slug(node.id, "renamed").unwrap();
}

#[test]
fn given_root_with_custom_id_when_building_forest_for_type_from_it_then_root_is_excluded() {
    // Arrange
    init_test_setup();
    let now = chrono::Utc::now();
    let root = Node {
        id: NodeId::new(),
        parent: None,
        left: 0,
        right: 1,
        created_at: now,
        updated_at: now,
        payload: Taxonomy::root(),
    };
    let taxonomies =
        TaxonomyService::open(MemoryStore::from_nodes([root.clone()]), EngineSettings::default())
            .unwrap();
    taxonomies.create(None, "News", "POST", None).unwrap();

    // Act
    let forest = taxonomies.as_forest_for("POST", Some(root.id)).unwrap();

    // Assert
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].item.payload.slug, "news");
}
