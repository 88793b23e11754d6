//! Wait engine behaviour against a scripted host and a manual clock

use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use toys_spawn::{
    CancelFlag, Clock, Error, HostResolver, Job, JobLedger, JobStatus, LaunchOptions, ManualClock,
    Outcome, SpawnLauncher, WaitEnd, WaitEngine, WaitMode, WaitOptions,
};
use toys_test_utils::{FakeHost, Poll, TestLedger};

struct Harness {
    _scratch: TestLedger,
    ledger: JobLedger,
    host: FakeHost,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        let scratch = TestLedger::new();
        let ledger = JobLedger::open(scratch.path());
        Self {
            _scratch: scratch,
            ledger,
            host: FakeHost::new(),
            clock: ManualClock::new(),
        }
    }

    fn launch(&self, task: &str) -> Job {
        SpawnLauncher::new(&self.host, &self.ledger, "claude-opus-4.5", "/work")
            .launch(task, &LaunchOptions::default())
            .unwrap()
    }

    fn engine(&self) -> WaitEngine<'_, HostResolver<&FakeHost>, &ManualClock> {
        WaitEngine::new(&self.ledger, HostResolver::new(&self.host)).with_clock(&self.clock)
    }

    fn status(&self, job: &Job) -> JobStatus {
        self.ledger.get(&job.id).unwrap().status
    }
}

fn options(mode: WaitMode, timeout: Option<u64>) -> WaitOptions {
    WaitOptions {
        mode,
        timeout: timeout.map(Duration::from_secs),
        poll_interval: Duration::from_secs(2),
    }
}

fn ids(jobs: &[&Job]) -> Vec<String> {
    jobs.iter().map(|j| j.id.clone()).collect()
}

#[test]
fn all_mode_returns_when_every_job_is_terminal() {
    let h = Harness::new();
    let a = h.launch("task A");
    let b = h.launch("task B");
    h.host
        .script(&a.remote_handle, [Poll::Open, Poll::done("a done")]);
    h.host.script(
        &b.remote_handle,
        [Poll::Open, Poll::Open, Poll::Error("b crashed".into())],
    );

    let report = h
        .engine()
        .wait(&ids(&[&a, &b]), &options(WaitMode::All, None))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.elapsed_ms, 4_000);

    let a_out = report.outcome(&a.id).unwrap();
    assert_eq!(a_out.outcome, Outcome::Completed);
    assert_eq!(a_out.result.as_deref(), Some("a done"));
    let b_out = report.outcome(&b.id).unwrap();
    assert_eq!(b_out.outcome, Outcome::Failed);
    assert_eq!(b_out.result.as_deref(), Some("b crashed"));

    // Terminal jobs are not polled again.
    assert_eq!(h.host.polls(&a.remote_handle), 2);
    assert_eq!(h.host.polls(&b.remote_handle), 3);
    assert_eq!(h.status(&a), JobStatus::Completed);
    assert_eq!(h.status(&b), JobStatus::Failed);
}

#[test]
fn any_mode_stops_at_first_terminal_observation() {
    let h = Harness::new();
    let a = h.launch("task A");
    let b = h.launch("task B");
    h.host.set(&a.remote_handle, Poll::done("first"));

    let report = h
        .engine()
        .wait(&ids(&[&a, &b]), &options(WaitMode::Any, None))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    assert_eq!(report.winner.as_deref(), Some(a.id.as_str()));
    assert_eq!(report.rounds, 1);
    assert_eq!(h.host.polls(&b.remote_handle), 0);

    let b_out = report.outcome(&b.id).unwrap();
    assert_eq!(b_out.outcome, Outcome::Pending);
    assert_eq!(b_out.last_known, JobStatus::Pending);
    assert_eq!(h.status(&b), JobStatus::Pending);
}

#[rstest]
#[case::any(WaitMode::Any, 0)]
#[case::all(WaitMode::All, 1)]
fn already_terminal_jobs_are_not_polled(#[case] mode: WaitMode, #[case] expected_rounds: u32) {
    let h = Harness::new();
    let done = h.launch("done");
    let open = h.launch("open");
    h.ledger
        .update(&done.id, |j| {
            j.status = JobStatus::Completed;
            j.result = Some("earlier".into());
        })
        .unwrap();

    let report = h
        .engine()
        .wait(&ids(&[&done, &open]), &options(mode, Some(0)))
        .unwrap();

    assert_eq!(report.rounds, expected_rounds);
    assert_eq!(h.host.polls(&done.remote_handle), 0);
    assert_eq!(
        report.outcome(&done.id).unwrap().outcome,
        Outcome::Completed
    );
}

#[test]
fn unreachable_host_never_fails_a_job() {
    let h = Harness::new();
    let a = h.launch("task A");
    h.host.set(&a.remote_handle, Poll::Unreachable);

    let report = h
        .engine()
        .wait(&ids(&[&a]), &options(WaitMode::All, Some(5)))
        .unwrap();

    assert_eq!(report.end, WaitEnd::TimedOut);
    // Rounds at 0s, 2s, 4s and at the 5s deadline.
    assert_eq!(report.rounds, 4);
    assert_eq!(h.host.polls(&a.remote_handle), 4);
    assert_eq!(report.elapsed_ms, 5_000);

    let out = report.outcome(&a.id).unwrap();
    assert_eq!(out.outcome, Outcome::TimedOut);
    assert_eq!(out.last_known, JobStatus::Pending);
    assert_eq!(h.status(&a), JobStatus::Pending);
}

#[test]
fn timeout_is_reported_but_not_persisted() {
    let h = Harness::new();
    let a = h.launch("task A");
    let b = h.launch("task B");

    let report = h
        .engine()
        .wait(&ids(&[&a, &b]), &options(WaitMode::Any, Some(5)))
        .unwrap();

    assert!(report.timed_out());
    assert_eq!(report.winner, None);
    for job in [&a, &b] {
        let out = report.outcome(&job.id).unwrap();
        assert_eq!(out.outcome, Outcome::TimedOut);
        assert_eq!(out.last_known, JobStatus::Running);
        assert_eq!(h.status(job), JobStatus::Running);
    }
}

#[test]
fn zero_timeout_polls_exactly_once() {
    let h = Harness::new();
    let a = h.launch("task A");

    let report = h
        .engine()
        .wait(&ids(&[&a]), &options(WaitMode::All, Some(0)))
        .unwrap();

    assert_eq!(report.end, WaitEnd::TimedOut);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.elapsed_ms, 0);
}

#[test]
fn resolved_result_is_visible_to_later_readers() {
    let h = Harness::new();
    let a = h.launch("task A");
    h.host
        .script(&a.remote_handle, [Poll::Open, Poll::Open, Poll::done("42")]);

    let report = h
        .engine()
        .wait(&ids(&[&a]), &options(WaitMode::All, None))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    let stored = h.ledger.get(&a.id).unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.result.as_deref(), Some("42"));
    assert!(stored.resolved_at.is_some());
}

#[test]
fn persisted_timed_out_is_polled_and_superseded() {
    let h = Harness::new();
    let a = h.launch("task A");
    h.ledger
        .update(&a.id, |j| j.status = JobStatus::TimedOut)
        .unwrap();
    h.host.set(&a.remote_handle, Poll::done("late"));

    let report = h
        .engine()
        .wait(&ids(&[&a]), &options(WaitMode::All, Some(10)))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    assert_eq!(h.status(&a), JobStatus::Completed);
}

/// Manual clock that raises a cancel flag once enough time has passed
struct InterruptAfter {
    clock: ManualClock,
    flag: CancelFlag,
    after: Duration,
}

impl Clock for InterruptAfter {
    fn now(&self) -> std::time::Instant {
        self.clock.now()
    }

    fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
        if self.clock.elapsed() >= self.after {
            self.flag.cancel();
        }
    }
}

#[test]
fn cancellation_interrupts_a_sleeping_wait() {
    let h = Harness::new();
    let a = h.launch("task A");
    let flag = CancelFlag::new();
    let clock = InterruptAfter {
        clock: ManualClock::new(),
        flag: flag.clone(),
        after: Duration::from_secs(3),
    };

    let report = WaitEngine::new(&h.ledger, HostResolver::new(&h.host))
        .with_clock(&clock)
        .with_cancel(flag)
        .wait(&ids(&[&a]), &options(WaitMode::All, None))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Interrupted);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.elapsed_ms, 3_000);
    let out = report.outcome(&a.id).unwrap();
    assert_eq!(out.outcome, Outcome::Pending);
    assert_eq!(out.last_known, JobStatus::Running);
}

/// Manual clock that records a job as completed, the way a concurrent
/// `check` would, once enough time has passed
struct CompletesElsewhereAfter<'a> {
    clock: ManualClock,
    ledger: &'a JobLedger,
    id: String,
    after: Duration,
    done: std::cell::Cell<bool>,
}

impl Clock for CompletesElsewhereAfter<'_> {
    fn now(&self) -> std::time::Instant {
        self.clock.now()
    }

    fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
        if !self.done.get() && self.clock.elapsed() >= self.after {
            self.ledger
                .update(&self.id, |j| {
                    j.status = JobStatus::Completed;
                    j.result = Some("seen elsewhere".into());
                })
                .unwrap();
            self.done.set(true);
        }
    }
}

#[rstest]
#[case::any(WaitMode::Any)]
#[case::all(WaitMode::All)]
fn unreachable_host_still_sees_progress_recorded_in_ledger(#[case] mode: WaitMode) {
    let h = Harness::new();
    let a = h.launch("task A");
    h.host.set(&a.remote_handle, Poll::Unreachable);
    let clock = CompletesElsewhereAfter {
        clock: ManualClock::new(),
        ledger: &h.ledger,
        id: a.id.clone(),
        after: Duration::from_secs(3),
        done: std::cell::Cell::new(false),
    };

    let report = WaitEngine::new(&h.ledger, HostResolver::new(&h.host))
        .with_clock(&clock)
        .wait(&ids(&[&a]), &options(mode, Some(30)))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    // Rounds at 0s and 2s see nothing; the 4s round reads the ledger.
    assert_eq!(report.rounds, 3);
    assert_eq!(report.elapsed_ms, 4_000);
    let out = report.outcome(&a.id).unwrap();
    assert_eq!(out.outcome, Outcome::Completed);
    assert_eq!(out.result.as_deref(), Some("seen elsewhere"));
}

#[test]
fn cancelled_before_start_does_not_poll() {
    let h = Harness::new();
    let a = h.launch("task A");
    let flag = CancelFlag::new();
    flag.cancel();

    let report = h
        .engine()
        .with_cancel(flag)
        .wait(&ids(&[&a]), &options(WaitMode::All, None))
        .unwrap();

    assert_eq!(report.end, WaitEnd::Interrupted);
    assert_eq!(report.rounds, 0);
    assert_eq!(h.host.polls(&a.remote_handle), 0);
}

#[test]
fn empty_target_set_returns_immediately() {
    let h = Harness::new();

    let report = h.engine().wait(&[], &options(WaitMode::Any, None)).unwrap();

    assert_eq!(report.end, WaitEnd::Resolved);
    assert!(report.outcomes.is_empty());
    assert_eq!(report.rounds, 0);
}

#[test]
fn unknown_id_fails_before_polling() {
    let h = Harness::new();
    let a = h.launch("task A");

    let result = h.engine().wait(
        &[a.id.clone(), "no-such-job".to_string()],
        &options(WaitMode::All, None),
    );

    assert!(matches!(result, Err(Error::NotFound { id }) if id == "no-such-job"));
    assert_eq!(h.host.polls(&a.remote_handle), 0);
}

#[test]
fn duplicate_ids_are_waited_on_once() {
    let h = Harness::new();
    let a = h.launch("task A");
    h.host.set(&a.remote_handle, Poll::done("ok"));

    let report = h
        .engine()
        .wait(&[a.id.clone(), a.id.clone()], &options(WaitMode::All, None))
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(h.host.polls(&a.remote_handle), 1);
}

#[test]
fn report_serializes_for_json_output() {
    let h = Harness::new();
    let a = h.launch("task A");
    h.host.set(&a.remote_handle, Poll::done("42"));

    let report = h
        .engine()
        .wait(&ids(&[&a]), &options(WaitMode::Any, None))
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["mode"], "any");
    assert_eq!(json["end"], "resolved");
    assert_eq!(json["outcomes"][0]["outcome"], "completed");
    assert_eq!(json["outcomes"][0]["result"], "42");
}
