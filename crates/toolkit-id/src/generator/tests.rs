use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::scope;
use std::time::Duration;

use crate::{
    Backoff, BackoffKind, ConfigError, DEFAULT_EPOCH_MILLIS, GeneratorConfig, IdGenStatus,
    IdGenerator, MonotonicClock, SleepWait, SnowflakeGenerator, SnowflakeId, SystemClock,
    TimeSource, YieldWait,
};

const EPOCH: u64 = DEFAULT_EPOCH_MILLIS;
const EPOCH_I64: i64 = DEFAULT_EPOCH_MILLIS as i64;
/// An arbitrary "now" comfortably after the default epoch.
const NOW: u64 = EPOCH + 1_000_000;

#[derive(Clone)]
struct MockClock {
    millis: Arc<AtomicU64>,
}

impl MockClock {
    fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockClock {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Records every wait and moves the mock clock forward so blocking calls
/// finish deterministically.
struct RecordingBackoff {
    clock: MockClock,
    step: Option<u64>,
    waits: Mutex<Vec<(u64, u64)>>,
}

impl RecordingBackoff {
    /// Jumps the clock straight to `until` on each wait.
    fn jumping(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
            step: None,
            waits: Mutex::new(Vec::new()),
        }
    }

    /// Advances the clock by `step` ms on each wait.
    fn stepping(clock: &MockClock, step: u64) -> Self {
        Self {
            clock: clock.clone(),
            step: Some(step),
            waits: Mutex::new(Vec::new()),
        }
    }

    fn waits(&self) -> Vec<(u64, u64)> {
        self.waits.lock().unwrap().clone()
    }
}

impl Backoff for RecordingBackoff {
    fn wait(&self, now: u64, until: u64) {
        self.waits.lock().unwrap().push((now, until));
        match self.step {
            Some(step) => self.clock.set(now + step),
            None => self.clock.set(until),
        }
    }
}

fn config(datacenter_id: i64, worker_id: i64) -> GeneratorConfig {
    GeneratorConfig::new(datacenter_id, worker_id, EPOCH_I64)
}

fn mock_generator(
    clock: &MockClock,
) -> SnowflakeGenerator<MockClock, Arc<RecordingBackoff>> {
    let backoff = Arc::new(RecordingBackoff::jumping(clock));
    SnowflakeGenerator::with_parts(config(3, 7), clock.clone(), backoff).unwrap()
}

trait IdGenStatusExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl IdGenStatusExt for IdGenStatus {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_until } => {
                panic!("unexpected pending (yield until: {yield_until})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_until } => yield_until,
        }
    }
}

fn run_generator_monotonic<T, B>(generator: &SnowflakeGenerator<T, B>, total: usize)
where
    T: TimeSource,
    B: Backoff,
{
    let mut seen = HashSet::with_capacity(total);
    let mut prev = generator.next_id();
    seen.insert(prev);

    for _ in 0..total {
        let next = generator.next_id();
        assert!(next > prev, "{next:?} not greater than {prev:?}");
        assert!(seen.insert(next), "duplicate id {next}");
        if next.timestamp() > prev.timestamp() {
            assert_eq!(next.sequence(), 0);
        } else {
            assert_eq!(next.sequence(), prev.sequence() + 1);
        }
        prev = next;
    }
}

fn run_generator_threaded<G>(generator: &G, threads: usize, per_thread: usize)
where
    G: IdGenerator,
{
    let seen = Mutex::new(HashSet::with_capacity(threads * per_thread));

    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let ids: Vec<String> = (0..per_thread).map(|_| generator.generate_id()).collect();
                let mut seen = seen.lock().unwrap();
                for id in ids {
                    assert!(seen.insert(id.clone()), "duplicate id {id}");
                }
            });
        }
    });

    assert_eq!(seen.into_inner().unwrap().len(), threads * per_thread);
}

fn thread_count() -> usize {
    num_cpus::get().clamp(2, 8)
}

#[test]
fn first_id_packs_configured_fields() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    let id = generator.next_id();
    assert_eq!(id.timestamp(), NOW - EPOCH);
    assert_eq!(id.datacenter_id(), 3);
    assert_eq!(id.worker_id(), 7);
    assert_eq!(id.sequence(), 0);
    assert_eq!(
        id.to_raw(),
        ((NOW - EPOCH) << 22) | (3 << 17) | (7 << 12)
    );
}

#[test]
fn sequence_increments_within_same_tick() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    let id1 = generator.next_id();
    let id2 = generator.next_id();
    let id3 = generator.next_id();

    assert_eq!(id1.timestamp(), NOW - EPOCH);
    assert_eq!(id2.timestamp(), NOW - EPOCH);
    assert_eq!(id3.timestamp(), NOW - EPOCH);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn sequence_resets_when_millisecond_advances() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    generator.next_id();
    generator.next_id();
    clock.set(NOW + 5);

    let id = generator.next_id();
    assert_eq!(id.timestamp(), NOW + 5 - EPOCH);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn epoch_equal_to_now_starts_at_zero_offset() {
    let clock = MockClock::at(NOW);
    let generator =
        SnowflakeGenerator::with_time_source(GeneratorConfig::new(0, 0, NOW as i64), clock)
            .unwrap();
    let id = generator.next_id();
    assert_eq!(id.timestamp(), 0);
    assert_eq!(id.to_raw(), 0);
}

#[test]
fn poll_returns_pending_when_sequence_exhausted() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = generator.poll_id().unwrap_ready();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), NOW - EPOCH);
    }

    assert_eq!(generator.poll_id().unwrap_pending(), NOW + 1);
    // Pending attempts leave the state alone.
    assert_eq!(generator.poll_id().unwrap_pending(), NOW + 1);

    clock.set(NOW + 1);
    let id = generator.poll_id().unwrap_ready();
    assert_eq!(id.timestamp(), NOW + 1 - EPOCH);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn next_id_waits_for_next_millisecond_when_exhausted() {
    let clock = MockClock::at(NOW);
    let backoff = Arc::new(RecordingBackoff::jumping(&clock));
    let generator =
        SnowflakeGenerator::with_parts(config(0, 0), clock.clone(), Arc::clone(&backoff)).unwrap();

    let mut last = generator.next_id();
    for _ in 0..SnowflakeId::MAX_SEQUENCE {
        last = generator.next_id();
    }
    assert_eq!(last.sequence(), SnowflakeId::MAX_SEQUENCE);
    assert!(backoff.waits().is_empty());

    let id = generator.next_id();
    assert_eq!(backoff.waits(), vec![(NOW, NOW + 1)]);
    assert_eq!(id.timestamp(), NOW + 1 - EPOCH);
    assert_eq!(id.sequence(), 0);
    assert!(id > last);
}

#[test]
fn next_id_blocks_until_clock_catches_up_after_rollback() {
    let clock = MockClock::at(NOW);
    let backoff = Arc::new(RecordingBackoff::stepping(&clock, 1));
    let generator =
        SnowflakeGenerator::with_parts(config(1, 1), clock.clone(), Arc::clone(&backoff)).unwrap();

    let before = generator.next_id();
    clock.set(NOW - 10);

    let after = generator.next_id();
    let waits = backoff.waits();
    assert_eq!(waits.len(), 10);
    assert_eq!(waits.first(), Some(&(NOW - 10, NOW)));
    assert_eq!(waits.last(), Some(&(NOW - 1, NOW)));

    // Caught up to the same millisecond, so the sequence continues.
    assert_eq!(after.timestamp(), before.timestamp());
    assert_eq!(after.sequence(), 1);
    assert!(after > before);
}

#[test]
fn rollback_followed_by_exhaustion_still_moves_forward() {
    let clock = MockClock::at(NOW);
    let backoff = Arc::new(RecordingBackoff::jumping(&clock));
    let generator =
        SnowflakeGenerator::with_parts(config(0, 0), clock.clone(), Arc::clone(&backoff)).unwrap();

    for _ in 0..=SnowflakeId::MAX_SEQUENCE {
        generator.next_id();
    }
    clock.set(NOW - 3);

    let id = generator.next_id();
    // First catch up to the last timestamp, then to the one after it.
    assert_eq!(backoff.waits(), vec![(NOW - 3, NOW), (NOW, NOW + 1)]);
    assert_eq!(id.timestamp(), NOW + 1 - EPOCH);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn poll_returns_pending_while_clock_is_behind() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    let first = generator.poll_id().unwrap_ready();
    clock.set(NOW - 2);
    assert_eq!(generator.poll_id().unwrap_pending(), NOW);

    clock.set(NOW);
    let next = generator.poll_id().unwrap_ready();
    assert_eq!(next.sequence(), first.sequence() + 1);
}

#[test]
fn first_mint_waits_for_epoch_if_clock_dips_below_it() {
    let clock = MockClock::at(EPOCH);
    let backoff = Arc::new(RecordingBackoff::jumping(&clock));
    let generator =
        SnowflakeGenerator::with_parts(config(0, 0), clock.clone(), Arc::clone(&backoff)).unwrap();

    clock.set(EPOCH - 5);
    assert_eq!(generator.poll_id().unwrap_pending(), EPOCH);

    let id = generator.next_id();
    assert_eq!(backoff.waits(), vec![(EPOCH - 5, EPOCH)]);
    assert_eq!(id.timestamp(), 0);
}

#[test]
fn ten_thousand_ids_strictly_increase() {
    let generator = SnowflakeGenerator::new(0, 0, 1_577_836_800_000).unwrap();
    run_generator_monotonic(&generator, 10_000);
}

#[test]
fn monotonic_clock_generator_strictly_increases() {
    let generator =
        SnowflakeGenerator::with_time_source(config(2, 2), MonotonicClock::new()).unwrap();
    run_generator_monotonic(&generator, 4096 * 16);
}

#[test]
fn yield_and_sleep_backoffs_strictly_increase() {
    let yielding = SnowflakeGenerator::with_parts(config(0, 1), SystemClock, YieldWait).unwrap();
    run_generator_monotonic(&yielding, 4096 * 4);

    let sleeping =
        SnowflakeGenerator::with_parts(config(0, 2), SystemClock, SleepWait::default()).unwrap();
    run_generator_monotonic(&sleeping, 4096 * 4);

    let by_name = SnowflakeGenerator::with_parts(config(0, 3), SystemClock, BackoffKind::Yield)
        .unwrap();
    run_generator_monotonic(&by_name, 4096 * 4);
}

#[test]
fn threaded_generation_has_no_duplicates() {
    let generator = SnowflakeGenerator::new(0, 0, EPOCH_I64).unwrap();
    run_generator_threaded(&generator, thread_count(), 4096 * 8);
}

#[test]
fn threaded_generation_through_trait_object_has_no_duplicates() {
    let generator: Arc<dyn IdGenerator> =
        Arc::new(SnowflakeGenerator::with_parts(config(5, 5), SystemClock, YieldWait).unwrap());
    run_generator_threaded(&generator, thread_count(), 4096 * 4);
}

#[test]
fn generate_id_is_unsigned_decimal_and_round_trips() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);

    let text = generator.generate_id();
    assert!(!text.is_empty());
    assert!(text.bytes().all(|b| b.is_ascii_digit()));
    assert!(!text.starts_with('0'));

    let parsed: SnowflakeId = text.parse().unwrap();
    assert_eq!(parsed.to_string(), text);
    assert_eq!(parsed.sequence(), 0);

    // Same millisecond, so the next raw value is exactly one higher.
    assert_eq!(generator.next_raw(), parsed.to_raw() + 1);
}

#[test]
fn decoded_fields_match_config_and_wall_clock() {
    let generator = SnowflakeGenerator::new(17, 29, EPOCH_I64).unwrap();

    let before = SystemClock.current_millis();
    let id = generator.next_id();
    let after = SystemClock.current_millis();

    assert_eq!(id.datacenter_id(), 17);
    assert_eq!(id.worker_id(), 29);
    let minted_at = id.unix_millis(EPOCH);
    assert!(
        (before..=after).contains(&minted_at),
        "{minted_at} outside {before}..={after}"
    );
}

#[test]
fn distinct_partitions_never_collide() {
    let a = SnowflakeGenerator::new(0, 1, EPOCH_I64).unwrap();
    let b = SnowflakeGenerator::new(1, 0, EPOCH_I64).unwrap();

    let from_a: HashSet<SnowflakeId> = (0..1_000).map(|_| a.next_id()).collect();
    let from_b: HashSet<SnowflakeId> = (0..1_000).map(|_| b.next_id()).collect();

    assert_eq!(from_a.len(), 1_000);
    assert_eq!(from_b.len(), 1_000);
    assert!(from_a.is_disjoint(&from_b));
    assert!(from_a
        .iter()
        .all(|id| id.datacenter_id() == 0 && id.worker_id() == 1));
    assert!(from_b
        .iter()
        .all(|id| id.datacenter_id() == 1 && id.worker_id() == 0));
}

#[test]
fn rejects_out_of_range_ids() {
    let cases = [
        (0, 32, ConfigError::WorkerIdOutOfRange { value: 32, max: 31 }),
        (0, -1, ConfigError::WorkerIdOutOfRange { value: -1, max: 31 }),
        (32, 0, ConfigError::DatacenterIdOutOfRange { value: 32, max: 31 }),
        (-1, 0, ConfigError::DatacenterIdOutOfRange { value: -1, max: 31 }),
    ];

    for (datacenter_id, worker_id, expected) in cases {
        let err = SnowflakeGenerator::new(datacenter_id, worker_id, EPOCH_I64).unwrap_err();
        assert_eq!(err, expected);
    }
}

#[test]
fn worker_id_is_checked_before_datacenter_id() {
    let err = SnowflakeGenerator::new(99, 99, EPOCH_I64).unwrap_err();
    assert!(matches!(err, ConfigError::WorkerIdOutOfRange { value: 99, .. }));
}

#[test]
fn accepts_boundary_ids() {
    for datacenter_id in [0, 31] {
        for worker_id in [0, 31] {
            let generator = SnowflakeGenerator::new(datacenter_id, worker_id, EPOCH_I64).unwrap();
            let id = generator.next_id();
            assert_eq!(id.datacenter_id(), datacenter_id as u64);
            assert_eq!(id.worker_id(), worker_id as u64);
        }
    }
}

#[test]
fn rejects_bad_epochs() {
    let clock = MockClock::at(NOW);

    let err = SnowflakeGenerator::with_time_source(GeneratorConfig::new(0, 0, -1), clock.clone())
        .unwrap_err();
    assert_eq!(err, ConfigError::NegativeEpoch { epoch: -1 });

    let future = GeneratorConfig::new(0, 0, (NOW + 1) as i64);
    let err = SnowflakeGenerator::with_time_source(future, clock.clone()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::EpochInFuture {
            epoch: NOW + 1,
            now: NOW
        }
    );

    // Far enough out that an epoch can be more than 2^41 ms behind it.
    let late = 1 << 42;
    let clock = MockClock::at(late);

    let ancient = late - SnowflakeId::MAX_TIMESTAMP - 1;
    let err = SnowflakeGenerator::with_time_source(
        GeneratorConfig::new(0, 0, ancient as i64),
        clock.clone(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigError::EpochTooOld {
            epoch: ancient,
            now: late
        }
    );

    let oldest = late - SnowflakeId::MAX_TIMESTAMP;
    assert!(
        SnowflakeGenerator::with_time_source(GeneratorConfig::new(0, 0, oldest as i64), clock)
            .is_ok()
    );
}

#[test]
fn epoch_in_future_on_system_clock_is_rejected() {
    let future = SystemClock.current_millis() + 60_000;
    let err = SnowflakeGenerator::new(0, 0, future as i64).unwrap_err();
    assert!(matches!(err, ConfigError::EpochInFuture { .. }));
}

#[test]
fn config_error_messages_name_the_field() {
    let err = GeneratorConfig::new(0, 40, EPOCH_I64).validate(NOW).unwrap_err();
    assert_eq!(err.to_string(), "worker id out of range: 40 (expected 0..=31)");

    let err = GeneratorConfig::new(40, 0, EPOCH_I64).validate(NOW).unwrap_err();
    assert_eq!(
        err.to_string(),
        "datacenter id out of range: 40 (expected 0..=31)"
    );
}

#[test]
fn validated_config_is_exposed_unchanged() {
    let clock = MockClock::at(NOW);
    let generator = mock_generator(&clock);
    let validated = generator.config();
    assert_eq!(validated.datacenter_id(), 3);
    assert_eq!(validated.worker_id(), 7);
    assert_eq!(validated.epoch_millis(), EPOCH);
    assert_eq!(GeneratorConfig::from(*validated), config(3, 7));
}

#[test]
fn debug_shows_configuration() {
    let generator = SnowflakeGenerator::new(4, 9, EPOCH_I64).unwrap();
    let debug = format!("{generator:?}");
    assert!(debug.contains("datacenter_id: 4"));
    assert!(debug.contains("worker_id: 9"));
    assert!(debug.contains(&format!("epoch_millis: {EPOCH}")));
}

#[test]
fn default_config_uses_default_epoch() {
    let config = GeneratorConfig::default();
    assert_eq!(config, GeneratorConfig::new(0, 0, EPOCH_I64));
    assert!(SnowflakeGenerator::from_config(config).is_ok());
}

#[test]
fn backoff_kind_parses_names() {
    assert_eq!("spin".parse::<BackoffKind>(), Ok(BackoffKind::Spin));
    assert_eq!("Yield".parse::<BackoffKind>(), Ok(BackoffKind::Yield));
    assert_eq!("SLEEP".parse::<BackoffKind>(), Ok(BackoffKind::Sleep));
    assert!("nap".parse::<BackoffKind>().is_err());
    assert_eq!(BackoffKind::default(), BackoffKind::Spin);
}

#[test]
fn sleep_wait_is_capped() {
    let backoff = SleepWait::new(Duration::from_millis(2));
    let start = std::time::Instant::now();
    backoff.wait(0, 10_000);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(backoff.max(), Duration::from_millis(2));
}

/// Fixed clock that panics on the first read after [`FaultyClock::arm`].
#[derive(Clone, Default)]
struct FaultyClock {
    armed: Arc<std::sync::atomic::AtomicBool>,
}

impl FaultyClock {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl TimeSource for FaultyClock {
    fn current_millis(&self) -> u64 {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("clock read failed");
        }
        NOW
    }
}

#[test]
fn panic_inside_critical_section_leaves_generator_usable() {
    let clock = FaultyClock::default();
    let generator = SnowflakeGenerator::with_time_source(config(1, 2), clock.clone()).unwrap();

    let before = generator.next_id();
    assert_eq!(before.sequence(), 0);

    clock.arm();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());

    let after = generator.next_id();
    assert!(after > before, "{after:?} not greater than {before:?}");
    assert_eq!(after.timestamp(), before.timestamp());
    assert_eq!(after.sequence(), 1);
}
