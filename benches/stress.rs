use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use turnstile::admission::Gym;
use turnstile::config::GymConfig;
use turnstile::error::Error;
use turnstile::model::{
    Difficulty, MemberPatch, Ms, NewClass, NewMember, Principal, Role, day_of,
};
use turnstile::store::MemoryStore;

const HOUR: Ms = 3_600_000; // 1 hour in ms
const JAN1_10H: Ms = 1_704_067_200_000 + 10 * HOUR;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn admin() -> Principal {
    Principal::new(Ulid::new(), Role::Admin)
}

async fn register_trainer(gym: &Gym<MemoryStore>, name: &str) -> Ulid {
    let member = gym
        .register_member(NewMember { name: name.into(), email: format!("{name}@bench.test") })
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

async fn register_trainees(gym: &Gym<MemoryStore>, prefix: &str, n: usize) -> Vec<Principal> {
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let member = gym
            .register_member(NewMember {
                name: format!("{prefix}-{i}"),
                email: format!("{prefix}-{i}@bench.test"),
            })
            .await
            .unwrap();
        out.push(Principal::new(member.id, Role::Trainee));
    }
    out
}

async fn create_class(gym: &Gym<MemoryStore>, code: &str, start: Ms, capacity: u32) -> Ulid {
    let instructor = register_trainer(gym, &format!("coach-{code}")).await;
    gym.create_class(
        &admin(),
        NewClass {
            code: code.into(),
            name: format!("Bench {code}"),
            description: None,
            instructor_id: instructor,
            scheduled_at: start,
            duration_min: 60,
            location: "Main Hall".into(),
            difficulty: Difficulty::Intermediate,
            max_capacity: Some(capacity),
        },
    )
    .await
    .unwrap()
    .id
}

async fn phase1_sequential(gym: &Gym<MemoryStore>) {
    let n = 2000;
    let class_id = create_class(gym, "SEQ-01", JAN1_10H, n as u32).await;
    let trainees = register_trainees(gym, "seq", n).await;

    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    for principal in &trainees {
        let t = Instant::now();
        gym.create_booking(principal, class_id).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} admissions in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("admission latency", &mut latencies);
}

async fn phase2_hot_class(gym: &Arc<Gym<MemoryStore>>) {
    let capacity = 10u32;
    let n_tasks = 200;
    let class_id = create_class(gym, "HOT-01", JAN1_10H + 2 * HOUR, capacity).await;
    let trainees = register_trainees(gym, "hot", n_tasks).await;

    let admitted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for principal in trainees {
        let gym = gym.clone();
        let admitted = admitted.clone();
        let rejected = rejected.clone();
        handles.push(tokio::spawn(async move {
            match gym.create_booking(&principal, class_id).await {
                Ok(_) => admitted.fetch_add(1, Ordering::Relaxed),
                Err(Error::CapacityExceeded(_)) => rejected.fetch_add(1, Ordering::Relaxed),
                Err(e) => panic!("unexpected outcome: {e}"),
            };
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let admitted = admitted.load(Ordering::Relaxed);
    let rejected = rejected.load(Ordering::Relaxed);
    println!(
        "  {n_tasks} concurrent requests for {capacity} seats in {:.2}s: {admitted} admitted, {rejected} full",
        elapsed.as_secs_f64()
    );
    assert_eq!(admitted, capacity as usize);
    let seats = gym.class(class_id).await.unwrap().booked_seats;
    assert_eq!(seats, capacity);
}

async fn phase3_churn(gym: &Gym<MemoryStore>) {
    let n = 1000;
    let class_id = create_class(gym, "CHN-01", JAN1_10H + 4 * HOUR, 1).await;
    let principal = register_trainees(gym, "churn", 1).await[0];

    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    for _ in 0..n {
        let t = Instant::now();
        let booking = gym.create_booking(&principal, class_id).await.unwrap();
        gym.cancel_booking(&principal, booking.id).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = (n * 2) as f64 / elapsed.as_secs_f64();
    println!("  {n} book/cancel pairs in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("book+cancel latency", &mut latencies);

    let seats = gym.class(class_id).await.unwrap().booked_seats;
    assert_eq!(seats, 0);
}

async fn phase4_read_under_load(gym: &Arc<Gym<MemoryStore>>) {
    let day = day_of(JAN1_10H);

    // Writers churn their own classes in the background.
    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for w in 0..4i64 {
        let class_id = create_class(gym, &format!("WR-{w}"), JAN1_10H + (6 + w) * HOUR, 1).await;
        let principal = register_trainees(gym, &format!("writer-{w}"), 1).await[0];
        let gym = gym.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            while !stop.load(Ordering::Relaxed) {
                let booking = gym.create_booking(&principal, class_id).await.unwrap();
                gym.cancel_booking(&principal, booking.id).await.unwrap();
            }
        }));
    }

    let n_readers = 8;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();
    for _ in 0..n_readers {
        let gym = gym.clone();
        reader_handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                let schedule = gym.day_schedule(day).await.unwrap();
                assert!(!schedule.classes.is_empty());
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("day schedule query", &mut all_latencies);
}

#[tokio::main]
async fn main() {
    let data_dir = std::env::temp_dir().join(format!("turnstile_bench_{}", Ulid::new()));
    let config = GymConfig {
        max_classes_per_day: 1_000_000,
        seat_ceiling: 100_000,
        ..GymConfig::default()
    };

    println!("=== turnstile stress benchmark ===");
    println!("data: {}\n", data_dir.display());

    let gym = Arc::new(Gym::open(config, &data_dir).unwrap());

    println!("[phase 1] sequential admission throughput");
    phase1_sequential(&gym).await;

    println!("\n[phase 2] hot class contention");
    phase2_hot_class(&gym).await;

    println!("\n[phase 3] book/cancel churn");
    phase3_churn(&gym).await;

    println!("\n[phase 4] schedule reads under booking load");
    phase4_read_under_load(&gym).await;

    println!("\n=== benchmark complete ===");
}
