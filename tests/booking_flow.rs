//! End-to-end flows through a durable gym: the booking lifecycle, restart
//! recovery from the log, compaction, and a hot-class burst.

use std::path::PathBuf;
use std::sync::Arc;

use ulid::Ulid;

use turnstile::admission::Gym;
use turnstile::config::GymConfig;
use turnstile::error::Error;
use turnstile::model::*;
use turnstile::store::{BookingFilter, MemoryStore};

const H: Ms = 3_600_000;
/// 2024-01-01T10:00:00Z.
const JAN1_10H: Ms = 1_704_067_200_000 + 10 * H;

fn test_data_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("turnstile_test_flows").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn admin() -> Principal {
    Principal::new(Ulid::new(), Role::Admin)
}

async fn register_trainee(gym: &Gym<MemoryStore>, name: &str) -> Principal {
    let member = gym
        .register_member(NewMember { name: name.into(), email: format!("{name}@flows.test") })
        .await
        .unwrap();
    Principal::new(member.id, Role::Trainee)
}

async fn register_trainer(gym: &Gym<MemoryStore>, name: &str) -> Ulid {
    let member = gym
        .register_member(NewMember { name: name.into(), email: format!("{name}@flows.test") })
        .await
        .unwrap();
    gym.update_member(
        &admin(),
        member.id,
        MemberPatch { role: Some(Role::Trainer), ..Default::default() },
    )
    .await
    .unwrap();
    member.id
}

fn yoga(code: &str, instructor_id: Ulid, capacity: u32) -> NewClass {
    NewClass {
        code: code.into(),
        name: "Morning Yoga".into(),
        description: Some("Slow flow".into()),
        instructor_id,
        scheduled_at: JAN1_10H,
        duration_min: 60,
        location: "Studio 1".into(),
        difficulty: Difficulty::Beginner,
        max_capacity: Some(capacity),
    }
}

#[tokio::test]
async fn booking_lifecycle_survives_restart() {
    let dir = test_data_dir("restart");
    let admin = admin();

    let (trainee, class_id, kept_id, cancelled_id) = {
        let gym = Gym::open(GymConfig::default(), &dir).unwrap();
        let instructor = register_trainer(&gym, "coach").await;
        let trainee = register_trainee(&gym, "ada").await;
        let class = gym.create_class(&admin, yoga("YG-01", instructor, 5)).await.unwrap();

        let doomed = gym.create_booking(&trainee, class.id).await.unwrap();
        gym.cancel_booking(&trainee, doomed.id).await.unwrap();
        let kept = gym.create_booking(&trainee, class.id).await.unwrap();
        (trainee, class.id, kept.id, doomed.id)
    };

    // Reopen from the log alone.
    let gym = Gym::open(GymConfig::default(), &dir).unwrap();
    let rec = gym.class(class_id).await.unwrap();
    assert_eq!(rec.code, "YG-01");
    assert_eq!(rec.booked_seats, 1);

    let mine = gym.my_bookings(&trainee, &BookingFilter::default()).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(
        mine.iter().find(|b| b.id == kept_id).unwrap().status,
        BookingStatus::Confirmed
    );
    assert_eq!(
        mine.iter().find(|b| b.id == cancelled_id).unwrap().status,
        BookingStatus::Cancelled
    );

    // Constraints replayed with the data: the held window still blocks...
    assert!(matches!(
        gym.create_booking(&trainee, class_id).await,
        Err(Error::Overlap { .. })
    ));
    // ...and the email is still registered.
    assert!(matches!(
        gym.register_member(NewMember { name: "Imp".into(), email: "ada@flows.test".into() })
            .await,
        Err(Error::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn compaction_rewrites_history_without_losing_state() {
    let dir = test_data_dir("compaction");
    let admin = admin();

    let (trainee, class_id) = {
        let gym = Gym::open(GymConfig::default(), &dir).unwrap();
        let instructor = register_trainer(&gym, "coach").await;
        let trainee = register_trainee(&gym, "bea").await;
        let class = gym.create_class(&admin, yoga("YG-02", instructor, 5)).await.unwrap();

        // Churn the log, then leave one booking standing.
        for _ in 0..10 {
            let b = gym.create_booking(&trainee, class.id).await.unwrap();
            gym.cancel_booking(&trainee, b.id).await.unwrap();
        }
        gym.create_booking(&trainee, class.id).await.unwrap();

        assert!(gym.store().wal_appends_since_compact().await >= 20);
        gym.store().compact_wal().await.unwrap();
        assert_eq!(gym.store().wal_appends_since_compact().await, 0);

        // The compacted log keeps accepting appends.
        let extra = register_trainee(&gym, "cal").await;
        gym.create_booking(&extra, class.id).await.unwrap();
        (trainee, class.id)
    };

    let gym = Gym::open(GymConfig::default(), &dir).unwrap();
    assert_eq!(gym.class(class_id).await.unwrap().booked_seats, 2);

    let mine = gym.my_bookings(&trainee, &BookingFilter::default()).await.unwrap();
    assert_eq!(mine.len(), 11);
    assert_eq!(
        mine.iter().filter(|b| b.status == BookingStatus::Confirmed).count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hot_class_burst_admits_exactly_capacity() {
    let dir = test_data_dir("burst");
    let gym = Arc::new(Gym::open(GymConfig::default(), &dir).unwrap());
    let instructor = register_trainer(&gym, "coach").await;
    let class = gym.create_class(&admin(), yoga("YG-03", instructor, 10)).await.unwrap();

    let mut trainees = Vec::new();
    for i in 0..25 {
        trainees.push(register_trainee(&gym, &format!("member-{i}")).await);
    }

    let mut tasks = Vec::new();
    for principal in trainees {
        let gym = gym.clone();
        let class_id = class.id;
        tasks.push(tokio::spawn(async move { gym.create_booking(&principal, class_id).await }));
    }
    let results = futures::future::join_all(tasks).await;

    let admitted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(Error::CapacityExceeded(_)))))
        .count();
    assert_eq!(admitted, 10);
    assert_eq!(full, 15);
    assert_eq!(gym.class(class.id).await.unwrap().booked_seats, 10);

    let confirmed = gym
        .bookings(
            &admin(),
            &BookingFilter {
                class_id: Some(class.id),
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 10);
}
