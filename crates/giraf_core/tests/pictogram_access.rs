use giraf_core::model::resource::{NewPictogram, PictogramUpdate};
use giraf_core::model::user::NewUser;
use giraf_core::service::pictogram_service::PictogramQuery;
use giraf_core::{
    open_db_in_memory, AccessLevel, ErrorCode, FsImageStore, ImageStore, PictogramService,
    ResourceId, Response, ResourceRepository, Role, ServiceResult, SqliteResourceRepository,
    SqliteUserRepository, User, UserRepository,
};
use rusqlite::Connection;
use std::io;
use tempfile::TempDir;

struct People {
    owner: User,
    colleague: User,
    outsider: User,
}

fn people(conn: &Connection) -> People {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let north = users.create_department("north").unwrap();
    let south = users.create_department("south").unwrap();
    let create = |username: &str, department_id| {
        users
            .create_user(&NewUser {
                username: username.to_string(),
                role: Role::Guardian,
                department_id: Some(department_id),
            })
            .unwrap()
    };
    People {
        owner: create("owner", north.id),
        colleague: create("colleague", north.id),
        outsider: create("outsider", south.id),
    }
}

fn service(
    conn: &Connection,
) -> (
    PictogramService<SqliteResourceRepository<'_>, FsImageStore>,
    TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    let images = FsImageStore::open(dir.path().join("pictograms")).unwrap();
    let repo = SqliteResourceRepository::try_new(conn).unwrap();
    (PictogramService::new(repo, images), dir)
}

fn new_pictogram(title: &str, access_level: AccessLevel) -> NewPictogram {
    NewPictogram {
        title: title.to_string(),
        access_level,
    }
}

fn code<T: std::fmt::Debug>(result: ServiceResult<T>) -> ErrorCode {
    result.unwrap_err().code().unwrap()
}

#[test]
fn public_pictogram_is_readable_without_authentication() {
    let conn = open_db_in_memory().unwrap();
    let (pictograms, _dir) = service(&conn);

    let created = pictograms
        .create_pictogram(None, &new_pictogram("cat", AccessLevel::Public))
        .unwrap();
    let read = pictograms.read_pictogram(None, created.key).unwrap();

    assert_eq!(read.key, created.key);
    assert_eq!(read.title, "cat");
    assert_eq!(read.last_edit, created.last_edit);
    assert!(!read.has_image);
}

#[test]
fn private_pictogram_is_visible_to_its_owner_only() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let private = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("diary", AccessLevel::Private),
        )
        .unwrap();

    assert_eq!(
        code(pictograms.read_pictogram(None, private.key)),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        pictograms
            .read_pictogram(Some(&people.owner), private.key)
            .unwrap()
            .title,
        "diary"
    );
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.colleague), private.key)),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.outsider), private.key)),
        ErrorCode::NotAuthorized
    );
}

#[test]
fn missing_pictogram_is_not_found_for_everyone() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    assert_eq!(code(pictograms.read_pictogram(None, 999)), ErrorCode::NotFound);
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.owner), 999)),
        ErrorCode::NotFound
    );
}

#[test]
fn protected_pictogram_is_shared_within_department() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let protected = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("bus", AccessLevel::Protected),
        )
        .unwrap();

    assert!(pictograms
        .read_pictogram(Some(&people.colleague), protected.key)
        .is_ok());
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.outsider), protected.key)),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.read_pictogram(None, protected.key)),
        ErrorCode::NotAuthorized
    );
}

#[test]
fn creation_checks_title_and_owner_requirements() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let loner = users
        .create_user(&NewUser {
            username: "loner".to_string(),
            role: Role::Guardian,
            department_id: None,
        })
        .unwrap();
    let (pictograms, _dir) = service(&conn);

    assert_eq!(
        code(pictograms.create_pictogram(None, &new_pictogram("  ", AccessLevel::Public))),
        ErrorCode::MissingProperties
    );
    assert_eq!(
        code(pictograms.create_pictogram(None, &new_pictogram("x", AccessLevel::Private))),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.create_pictogram(Some(&loner), &new_pictogram("x", AccessLevel::Protected))),
        ErrorCode::NotAuthorized
    );
    assert!(pictograms
        .create_pictogram(Some(&loner), &new_pictogram("x", AccessLevel::Private))
        .is_ok());
}

#[test]
fn listing_filters_by_visibility_title_and_page() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    for title in ["apple", "banana", "apricot"] {
        pictograms
            .create_pictogram(None, &new_pictogram(title, AccessLevel::Public))
            .unwrap();
    }
    pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("april secret", AccessLevel::Private),
        )
        .unwrap();

    let titles = |actor: Option<&User>, query: &PictogramQuery| -> Vec<String> {
        pictograms
            .list_pictograms(actor, query)
            .unwrap()
            .into_iter()
            .map(|pictogram| pictogram.title)
            .collect()
    };

    let ap = PictogramQuery {
        title: Some("AP".to_string()),
        ..PictogramQuery::default()
    };
    assert_eq!(titles(None, &ap), vec!["apple", "apricot"]);
    assert_eq!(
        titles(Some(&people.owner), &ap),
        vec!["apple", "apricot", "april secret"]
    );

    let second_page = PictogramQuery {
        title: None,
        page: 2,
        page_size: 2,
    };
    assert_eq!(titles(None, &second_page), vec!["banana"]);

    let bad_page = PictogramQuery {
        page: 0,
        ..PictogramQuery::default()
    };
    assert_eq!(
        code(pictograms.list_pictograms(None, &bad_page)),
        ErrorCode::InvalidProperties
    );
}

#[test]
fn update_to_protected_adds_department_ownership() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let private = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("draft", AccessLevel::Private),
        )
        .unwrap();
    assert!(pictograms
        .read_pictogram(Some(&people.colleague), private.key)
        .is_err());

    let updated = pictograms
        .update_pictogram(
            Some(&people.owner),
            private.key,
            PictogramUpdate {
                title: "final".to_string(),
                access_level: AccessLevel::Protected,
            },
        )
        .unwrap();
    assert_eq!(updated.title, "final");
    assert!(updated.last_edit >= private.last_edit);

    let read = pictograms
        .read_pictogram(Some(&people.colleague), private.key)
        .unwrap();
    assert_eq!(read.access_level, AccessLevel::Protected);

    let repo = SqliteResourceRepository::try_new(&conn).unwrap();
    let ownership = repo.get_ownership(private.key).unwrap();
    assert_eq!(ownership.user_ids, vec![people.owner.id]);
    assert_eq!(ownership.department_ids, vec![people.owner.department_id.unwrap()]);
}

#[test]
fn update_and_delete_are_gated() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let private = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("mine", AccessLevel::Private),
        )
        .unwrap();
    let rename = PictogramUpdate {
        title: "stolen".to_string(),
        access_level: AccessLevel::Private,
    };

    assert_eq!(
        code(pictograms.update_pictogram(Some(&people.outsider), private.key, rename.clone())),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.update_pictogram(None, private.key, rename)),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.delete_pictogram(Some(&people.colleague), private.key)),
        ErrorCode::NotAuthorized
    );
    assert_eq!(
        code(pictograms.delete_pictogram(Some(&people.owner), 999)),
        ErrorCode::NotFound
    );

    pictograms
        .delete_pictogram(Some(&people.owner), private.key)
        .unwrap();
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.owner), private.key)),
        ErrorCode::NotFound
    );
}

#[test]
fn image_round_trip_sets_flag() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let pictogram = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("photo", AccessLevel::Private),
        )
        .unwrap();
    assert_eq!(
        code(pictograms.read_image(Some(&people.owner), pictogram.key)),
        ErrorCode::NotFound
    );

    let updated = pictograms
        .set_image(Some(&people.owner), pictogram.key, b"\x89PNG")
        .unwrap();
    assert!(updated.has_image);
    assert_eq!(
        pictograms
            .read_image(Some(&people.owner), pictogram.key)
            .unwrap(),
        b"\x89PNG".to_vec()
    );
    assert_eq!(
        code(pictograms.read_image(Some(&people.outsider), pictogram.key)),
        ErrorCode::NotAuthorized
    );
    assert!(pictograms
        .read_pictogram(Some(&people.owner), pictogram.key)
        .unwrap()
        .has_image);
}

#[test]
fn default_pictogram_seed_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let (pictograms, _dir) = service(&conn);

    let first = pictograms.ensure_default_pictogram("default").unwrap();
    let second = pictograms.ensure_default_pictogram("default").unwrap();
    assert_eq!(first.key, second.key);
    assert_eq!(first.access_level, AccessLevel::Public);

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM resources WHERE title = 'default';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn expected_failures_fold_into_envelopes() {
    let conn = open_db_in_memory().unwrap();
    let (pictograms, _dir) = service(&conn);

    let response = Response::from_result(pictograms.read_pictogram(None, 999)).unwrap();
    let envelope = response.into_envelope();
    assert!(!envelope.success);
    assert_eq!(envelope.error_key, ErrorCode::NotFound);
    assert!(envelope.data.is_none());
}

#[test]
fn failed_ownership_write_rolls_back_level_change() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let (pictograms, _dir) = service(&conn);

    let private = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("draft", AccessLevel::Private),
        )
        .unwrap();

    // Department 999 does not exist, so the department_resources insert
    // violates its foreign key after the frame row was already updated.
    let mut stale_owner = people.owner.clone();
    stale_owner.department_id = Some(999);
    let result = pictograms.update_pictogram(
        Some(&stale_owner),
        private.key,
        PictogramUpdate {
            title: "renamed".to_string(),
            access_level: AccessLevel::Protected,
        },
    );
    assert!(result.unwrap_err().code().is_none());

    let stored = pictograms
        .read_pictogram(Some(&people.owner), private.key)
        .unwrap();
    assert_eq!(stored.title, "draft");
    assert_eq!(stored.access_level, AccessLevel::Private);
    assert_eq!(stored.last_edit, private.last_edit);

    let ownership = SqliteResourceRepository::try_new(&conn)
        .unwrap()
        .get_ownership(private.key)
        .unwrap();
    assert_eq!(ownership.user_ids, vec![people.owner.id]);
    assert!(ownership.department_ids.is_empty());
}

struct StuckImages(FsImageStore);

impl ImageStore for StuckImages {
    fn get(&self, id: ResourceId) -> io::Result<Option<Vec<u8>>> {
        self.0.get(id)
    }

    fn put(&self, id: ResourceId, bytes: &[u8]) -> io::Result<()> {
        self.0.put(id, bytes)
    }

    fn remove(&self, _id: ResourceId) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

#[test]
fn delete_succeeds_when_image_file_cannot_be_removed() {
    let conn = open_db_in_memory().unwrap();
    let people = people(&conn);
    let dir = tempfile::tempdir().unwrap();
    let pictograms = PictogramService::new(
        SqliteResourceRepository::try_new(&conn).unwrap(),
        StuckImages(FsImageStore::open(dir.path()).unwrap()),
    );

    let pictogram = pictograms
        .create_pictogram(
            Some(&people.owner),
            &new_pictogram("photo", AccessLevel::Private),
        )
        .unwrap();
    pictograms
        .set_image(Some(&people.owner), pictogram.key, b"\x89PNG")
        .unwrap();

    pictograms
        .delete_pictogram(Some(&people.owner), pictogram.key)
        .unwrap();
    assert_eq!(
        code(pictograms.read_pictogram(Some(&people.owner), pictogram.key)),
        ErrorCode::NotFound
    );
}
