use giraf_core::model::resource::NewPictogram;
use giraf_core::model::schedule::TimerDescription;
use giraf_core::model::user::NewUser;
use giraf_core::service::activity_service::{ActivityUpdate, NewActivityDescription};
use giraf_core::service::week_service::{ActivityDescription, WeekDescription, WeekdayDescription};
use giraf_core::{
    open_db_in_memory, AccessLevel, ActivityService, ActivityState, Day, ErrorCode, ResourceId,
    ResourceOwnership, ResourceRepository, Role, ServiceResult, SqliteResourceRepository,
    SqliteUserRepository, SqliteWeekRepository, User, UserRepository, WeekService,
};
use rusqlite::Connection;

type Activities<'conn> = ActivityService<
    SqliteUserRepository<'conn>,
    SqliteResourceRepository<'conn>,
    SqliteWeekRepository<'conn>,
>;

struct Schedule {
    user: User,
    pictogram: ResourceId,
}

/// Stores week 2024/10 with Monday holding activities at orders 0 and 4.
fn schedule(conn: &Connection) -> Schedule {
    let user = SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&NewUser {
            username: "citizen".to_string(),
            role: Role::Citizen,
            department_id: None,
        })
        .unwrap();
    let pictogram = SqliteResourceRepository::try_new(conn)
        .unwrap()
        .create_pictogram(
            &NewPictogram {
                title: "brush teeth".to_string(),
                access_level: AccessLevel::Public,
            },
            &ResourceOwnership::default(),
        )
        .unwrap()
        .key;

    let activity = |order| ActivityDescription {
        pictogram_id: pictogram,
        order,
        state: ActivityState::Normal,
        timer: None,
    };
    WeekService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteResourceRepository::try_new(conn).unwrap(),
        SqliteWeekRepository::try_new(conn).unwrap(),
    )
    .update_week(
        Some(&user),
        user.id,
        2024,
        10,
        &WeekDescription {
            name: None,
            thumbnail_id: Some(pictogram),
            days: Some(vec![
                WeekdayDescription {
                    day: Day::Monday,
                    activities: vec![activity(0), activity(4)],
                },
                WeekdayDescription {
                    day: Day::Tuesday,
                    activities: Vec::new(),
                },
            ]),
        },
    )
    .unwrap();

    Schedule { user, pictogram }
}

fn activity_service(conn: &Connection) -> Activities<'_> {
    ActivityService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteResourceRepository::try_new(conn).unwrap(),
        SqliteWeekRepository::try_new(conn).unwrap(),
    )
}

fn new_activity(pictogram_id: ResourceId, timer: Option<TimerDescription>) -> NewActivityDescription {
    NewActivityDescription {
        pictogram_id,
        state: ActivityState::Normal,
        timer,
    }
}

fn timer(progress: i64) -> TimerDescription {
    TimerDescription {
        start_time: 1_000,
        progress,
        full_length: 60_000,
        paused: false,
    }
}

fn code<T: std::fmt::Debug>(result: ServiceResult<T>) -> ErrorCode {
    result.unwrap_err().code().unwrap()
}

#[test]
fn created_activity_order_is_max_plus_one() {
    let conn = open_db_in_memory().unwrap();
    let Schedule { user, pictogram } = schedule(&conn);
    let activities = activity_service(&conn);

    let appended = activities
        .create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Monday,
            &new_activity(pictogram, None),
        )
        .unwrap();
    assert_eq!(appended.order, 5);

    let first = activities
        .create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Tuesday,
            &new_activity(pictogram, Some(timer(0))),
        )
        .unwrap();
    assert_eq!(first.order, 0);
    assert!(first.timer.is_some());
}

#[test]
fn create_activity_reports_missing_targets() {
    let conn = open_db_in_memory().unwrap();
    let Schedule { user, pictogram } = schedule(&conn);
    let activities = activity_service(&conn);

    assert_eq!(
        code(activities.create_activity(
            Some(&user),
            user.id,
            2024,
            11,
            Day::Monday,
            &new_activity(pictogram, None),
        )),
        ErrorCode::WeekNotFound
    );
    assert_eq!(
        code(activities.create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Friday,
            &new_activity(pictogram, None),
        )),
        ErrorCode::InvalidDay
    );
    assert_eq!(
        code(activities.create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Monday,
            &new_activity(404, None),
        )),
        ErrorCode::ResourceNotFound
    );
    assert_eq!(
        code(activities.create_activity(
            None,
            user.id,
            2024,
            10,
            Day::Monday,
            &new_activity(pictogram, None),
        )),
        ErrorCode::NotAuthorized
    );
}

#[test]
fn timer_is_created_overwritten_in_place_and_removed() {
    let conn = open_db_in_memory().unwrap();
    let Schedule { user, pictogram } = schedule(&conn);
    let activities = activity_service(&conn);

    let created = activities
        .create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Tuesday,
            &new_activity(pictogram, None),
        )
        .unwrap();
    assert!(created.timer.is_none());

    let update = |timer: Option<TimerDescription>, state| ActivityUpdate {
        id: created.key,
        pictogram_id: pictogram,
        order: created.order,
        state,
        timer,
    };

    let with_timer = activities
        .update_activity(Some(&user), user.id, &update(Some(timer(0)), ActivityState::Active))
        .unwrap();
    let timer_id = with_timer.timer.as_ref().unwrap().key;
    assert_eq!(with_timer.state, ActivityState::Active);

    let overwritten = activities
        .update_activity(Some(&user), user.id, &update(Some(timer(30_000)), ActivityState::Active))
        .unwrap();
    let stored_timer = overwritten.timer.as_ref().unwrap();
    assert_eq!(stored_timer.key, timer_id);
    assert_eq!(stored_timer.progress, 30_000);

    let cleared = activities
        .update_activity(Some(&user), user.id, &update(None, ActivityState::Completed))
        .unwrap();
    assert!(cleared.timer.is_none());
    assert_eq!(cleared.state, ActivityState::Completed);

    let timers: i64 = conn
        .query_row("SELECT COUNT(*) FROM timers;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timers, 0);
}

#[test]
fn activity_lookup_spans_the_whole_schedule() {
    let conn = open_db_in_memory().unwrap();
    let Schedule { user, pictogram } = schedule(&conn);
    let other = SqliteUserRepository::try_new(&conn)
        .unwrap()
        .create_user(&NewUser {
            username: "other".to_string(),
            role: Role::Citizen,
            department_id: None,
        })
        .unwrap();
    let activities = activity_service(&conn);

    let created = activities
        .create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Monday,
            &new_activity(pictogram, None),
        )
        .unwrap();
    let update = ActivityUpdate {
        id: created.key,
        pictogram_id: pictogram,
        order: 9,
        state: ActivityState::Canceled,
        timer: None,
    };

    assert_eq!(
        code(activities.update_activity(Some(&other), other.id, &update)),
        ErrorCode::ActivityNotFound
    );
    assert_eq!(
        code(activities.update_activity(
            Some(&user),
            user.id,
            &ActivityUpdate { id: 9_999, ..update.clone() }
        )),
        ErrorCode::ActivityNotFound
    );

    let updated = activities
        .update_activity(Some(&user), user.id, &update)
        .unwrap();
    assert_eq!(updated.order, 9);
    assert_eq!(updated.state, ActivityState::Canceled);
}

#[test]
fn delete_activity_removes_it_from_the_week() {
    let conn = open_db_in_memory().unwrap();
    let Schedule { user, pictogram } = schedule(&conn);
    let activities = activity_service(&conn);

    let created = activities
        .create_activity(
            Some(&user),
            user.id,
            2024,
            10,
            Day::Monday,
            &new_activity(pictogram, Some(timer(0))),
        )
        .unwrap();

    activities
        .delete_activity(Some(&user), user.id, created.key)
        .unwrap();
    assert_eq!(
        code(activities.delete_activity(Some(&user), user.id, created.key)),
        ErrorCode::ActivityNotFound
    );

    let timers: i64 = conn
        .query_row("SELECT COUNT(*) FROM timers;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timers, 0);
}
