#![allow(dead_code)]

use tagmodel::prelude::*;

#[derive(Model)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub emails: Vec<Email>,
    pub profile: Option<Profile>,
    pub company: Company,
    pub company_id: i64,
    #[tagmodel = "many2many:user_languages"]
    pub languages: Vec<Language>,
}

#[derive(Model)]
pub struct Email {
    pub id: i64,
    pub user_id: i64,
    pub address: String,
}

#[derive(Model)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: String,
}

#[derive(Model)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Model)]
pub struct Language {
    pub id: i64,
    pub name: String,
}

fn relationship<'a>(meta: &'a ModelMetadata, field: &str) -> &'a RelationshipMetadata {
    meta.field(field)
        .and_then(|f| f.relationship.as_ref())
        .unwrap_or_else(|| panic!("no relationship on {field}"))
}

#[test]
fn test_has_many() {
    let cache = ModelCache::default();
    let user = cache.get::<User>();

    let rel = relationship(&user, "emails");
    assert_eq!(rel.kind, RelationshipKind::HasMany);
    assert_eq!(rel.foreign_field_name, "user_id");
    assert_eq!(rel.foreign_column_name, "user_id");
    assert!(rel.join_table.is_none());

    let emails = user.field("emails").unwrap();
    assert!(!emails.is_normal);
    assert!(!emails.is_column());

    let email = cache.get::<Email>();
    assert!(email.field("user_id").unwrap().is_foreign_key());
    assert!(!email.field("address").unwrap().is_foreign_key());
}

#[test]
fn test_has_one_through_option() {
    let cache = ModelCache::default();
    let user = cache.get::<User>();

    let rel = relationship(&user, "profile");
    assert_eq!(rel.kind, RelationshipKind::HasOne);
    assert_eq!(rel.foreign_column_name, "user_id");
    assert!(cache.get::<Profile>().field("user_id").unwrap().is_foreign_key());
}

#[test]
fn test_belongs_to_preferred_over_has_one() {
    let cache = ModelCache::default();
    let user = cache.get::<User>();

    let rel = relationship(&user, "company");
    assert_eq!(rel.kind, RelationshipKind::BelongsTo);
    assert_eq!(rel.foreign_field_name, "company_id");

    let company_id = user.field("company_id").unwrap();
    assert!(company_id.is_foreign_key());
    assert!(company_id.is_normal);
}

#[test]
fn test_many_to_many_join_table() {
    let cache = ModelCache::default();
    let user = cache.get::<User>();

    let rel = relationship(&user, "languages");
    assert_eq!(rel.kind, RelationshipKind::ManyToMany);
    assert_eq!(rel.foreign_field_name, "UserId");
    assert_eq!(rel.foreign_column_name, "user_id");
    assert_eq!(rel.association_foreign_field_name.as_deref(), Some("LanguageId"));
    assert_eq!(rel.association_foreign_column_name.as_deref(), Some("language_id"));

    let join = rel.join_table.as_ref().unwrap();
    assert_eq!(join.table_name, "user_languages");
    assert_eq!(join.columns(), ["user_id", "language_id"]);
    assert_eq!(join.source.model_type.name(), "User");
    assert_eq!(join.source.foreign_key.association_column_name, "id");
    assert_eq!(join.destination.model_type.name(), "Language");
    assert_eq!(join.destination.foreign_key.association_column_name, "id");
    assert_eq!(
        join.join_clause("languages"),
        "INNER JOIN user_languages ON user_languages.language_id = languages.id"
    );
}

#[test]
fn test_associated_types_resolved_in_same_pass() {
    let cache = ModelCache::default();
    cache.get::<User>();

    assert!(cache.contains::<Email>());
    assert!(cache.contains::<Profile>());
    assert!(cache.contains::<Company>());
    assert!(cache.contains::<Language>());
    assert_eq!(cache.len(), 5);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.resolved, 5);

    cache.get::<Email>();
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_relationships_iterator() {
    let cache = ModelCache::default();
    let user = cache.get::<User>();
    let names: Vec<&str> = user.relationships().map(|(f, _)| f.name.as_str()).collect();
    assert_eq!(names, vec!["emails", "profile", "company", "languages"]);
    assert!(user.unresolved.is_empty());
}

#[derive(Model)]
pub struct Toy {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub owner_type: String,
}

#[derive(Model)]
pub struct Cat {
    pub id: i64,
    #[tagmodel = "polymorphic:Owner"]
    pub toys: Vec<Toy>,
}

#[derive(Model)]
pub struct Dog {
    pub id: i64,
    #[tagmodel = "polymorphic:Owner"]
    pub toy: Toy,
}

#[test]
fn test_polymorphic_has_many() {
    let cache = ModelCache::default();
    let cat = cache.get::<Cat>();

    let rel = relationship(&cat, "toys");
    assert_eq!(rel.kind, RelationshipKind::HasMany);
    assert!(rel.is_polymorphic());
    assert_eq!(rel.foreign_column_name, "owner_id");
    assert_eq!(rel.polymorphic_type_field_name.as_deref(), Some("owner_type"));
    assert_eq!(rel.polymorphic_type_column_name.as_deref(), Some("owner_type"));

    let toy = cache.get::<Toy>();
    assert!(toy.field("owner_id").unwrap().is_foreign_key());
    assert!(toy.field("owner_type").unwrap().is_foreign_key());
    assert!(!toy.field("name").unwrap().is_foreign_key());
}

#[test]
fn test_polymorphic_has_one_on_cached_type() {
    let cache = ModelCache::default();
    cache.get::<Cat>();
    let dog = cache.get::<Dog>();

    let rel = relationship(&dog, "toy");
    assert_eq!(rel.kind, RelationshipKind::HasOne);
    assert!(rel.is_polymorphic());
    assert_eq!(rel.foreign_field_name, "owner_id");
}

#[derive(Model)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub manager_id: Option<i64>,
    pub manager: Option<Box<Employee>>,
    #[tagmodel = "foreignkey:ManagerId"]
    pub reports: Vec<Employee>,
}

#[test]
fn test_self_reference() {
    let cache = ModelCache::default();
    let employee = cache.get::<Employee>();

    assert_eq!(relationship(&employee, "manager").kind, RelationshipKind::BelongsTo);
    let reports = relationship(&employee, "reports");
    assert_eq!(reports.kind, RelationshipKind::HasMany);
    assert_eq!(reports.foreign_column_name, "manager_id");

    let manager_id = employee.field("manager_id").unwrap();
    assert!(manager_id.is_foreign_key());
    assert!(manager_id.is_normal);
    assert_eq!(cache.len(), 1);
}

#[derive(Model)]
pub struct Author {
    pub id: i64,
    pub books: Vec<Book>,
}

#[derive(Model)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub author: Option<Box<Author>>,
}

fn assert_author_book(cache: &ModelCache) {
    let author = cache.get::<Author>();
    let book = cache.get::<Book>();
    assert_eq!(relationship(&author, "books").kind, RelationshipKind::HasMany);
    assert_eq!(relationship(&book, "author").kind, RelationshipKind::BelongsTo);
    assert!(book.field("author_id").unwrap().is_foreign_key());
}

#[test]
fn test_mutual_reference_either_order() {
    let cache = ModelCache::default();
    cache.get::<Author>();
    assert_author_book(&cache);

    let cache = ModelCache::default();
    cache.get::<Book>();
    assert_author_book(&cache);
}

#[derive(Model)]
pub struct Orphan {
    pub id: i64,
    pub labels: Vec<Label>,
    pub badge: Label,
}

#[derive(Model)]
pub struct Label {
    pub id: i64,
    pub text: String,
}

#[test]
fn test_unresolved_relationship_omitted() {
    let cache = ModelCache::default();
    let orphan = cache.get::<Orphan>();

    for name in ["labels", "badge"] {
        let field = orphan.field(name).unwrap();
        assert!(field.relationship.is_none());
        assert!(!field.is_normal);
    }
    assert_eq!(orphan.unresolved.len(), 2);
    assert_eq!(orphan.unresolved[0].foreign_key, "OrphanId");
    assert!(cache.try_get::<Orphan>().is_ok());
}

#[test]
fn test_unresolved_relationship_strict() {
    let cache = ModelCache::new(Config::new().strict(true));
    let err = cache.try_get::<Orphan>().unwrap_err();
    assert_eq!(
        err,
        Error::UnresolvedRelationship {
            model: "Orphan".to_string(),
            field: "labels".to_string(),
            foreign_key: "OrphanId".to_string(),
        }
    );
    assert!(cache.try_get::<Label>().is_ok());
}

#[derive(Model)]
pub struct Reader {
    pub id: i64,
    #[tagmodel = "foreignkey:OwnerRef"]
    pub cards: Vec<LibraryCard>,
    #[tagmodel = "many2many:reader_genres;associationforeignkey:FavoriteGenreId"]
    pub genres: Vec<Genre>,
}

#[derive(Model)]
pub struct LibraryCard {
    pub id: i64,
    pub owner_ref: i64,
}

#[derive(Model)]
pub struct Genre {
    #[tagmodel = "primary_key"]
    pub code: String,
}

#[test]
fn test_explicit_foreign_keys() {
    let cache = ModelCache::default();
    let reader = cache.get::<Reader>();

    let cards = relationship(&reader, "cards");
    assert_eq!(cards.foreign_field_name, "owner_ref");

    let genres = relationship(&reader, "genres");
    assert_eq!(
        genres.association_foreign_column_name.as_deref(),
        Some("favorite_genre_id")
    );
    let join = genres.join_table.as_ref().unwrap();
    assert_eq!(join.columns(), ["reader_id", "favorite_genre_id"]);
    assert_eq!(join.destination.foreign_key.association_column_name, "code");
}
