use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::PlaybackSettings;
use crate::error::{OutputError, PlaybackError};
use crate::library::AudioFileRef;

use super::controller::Controller;
use super::output::{Finish, OutputBackend, OutputHandle, UnavailableBackend};
use super::player::AudioPlayer;
use super::thread::{dispatch, run_event_loop};
use super::timer::PollTimer;
use super::types::{AudioCmd, Msg, PlaybackHandle, PlaybackInfo, Status};

#[derive(Debug, Default)]
struct FakeState {
    playing: bool,
    releases: u32,
    position: Duration,
    finished: Option<Finish>,
    reject_seek: bool,
}

type Shared = Arc<Mutex<FakeState>>;

struct FakeHandle {
    state: Shared,
    duration: Option<Duration>,
}

impl OutputHandle for FakeHandle {
    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn seek(&mut self, seconds: f64) -> Result<Duration, OutputError> {
        let mut s = self.state.lock().unwrap();
        if s.reject_seek {
            return Err(OutputError::Seek("not seekable".into()));
        }
        let target = Duration::from_secs_f64(seconds.max(0.0));
        s.position = target;
        Ok(target)
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn finished(&self) -> Option<Finish> {
        self.state.lock().unwrap().finished.clone()
    }

    fn release(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.playing = false;
        s.releases += 1;
    }
}

fn fake_handle(secs: u64) -> (Box<dyn OutputHandle>, Shared) {
    let state = Shared::default();
    let handle = FakeHandle {
        state: state.clone(),
        duration: Some(Duration::from_secs(secs)),
    };
    (Box::new(handle), state)
}

/// Records every handle it hands out so tests can inspect them afterwards.
#[derive(Default)]
struct FakeBackend {
    opened: Mutex<Vec<(PathBuf, Shared)>>,
}

impl FakeBackend {
    fn handles(&self) -> Vec<(PathBuf, Shared)> {
        self.opened.lock().unwrap().clone()
    }
}

impl OutputBackend for FakeBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn OutputHandle>, OutputError> {
        if path.to_string_lossy().contains("broken") {
            return Err(OutputError::Decode("unsupported codec".into()));
        }
        let (handle, state) = fake_handle(180);
        self.opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), state));
        Ok(handle)
    }
}

fn track(path: &str) -> AudioFileRef {
    let path = PathBuf::from(path);
    AudioFileRef {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        folder: path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: 0,
        modified: None,
        path,
    }
}

fn controller() -> Controller {
    Controller::new(&PlaybackSettings::default())
}

/// Play `file` and immediately complete the load with a fake handle.
fn play_loaded(c: &mut Controller, file: &AudioFileRef, secs: u64) -> Shared {
    let req = c.play_or_toggle(file).expect("expected a load request");
    assert_eq!(req.path, file.path);
    let (handle, state) = fake_handle(secs);
    c.finish_load(req.ticket, Ok(handle));
    state
}

fn assert_consistent(c: &Controller) {
    assert_eq!(c.has_handle(), c.current().is_some());
    assert_eq!(c.timer().is_running(), c.is_playing());
    if c.status() == Status::Idle {
        assert_eq!(c.current_time(), 0.0);
        assert_eq!(c.total_duration(), 0.0);
    }
}

#[test]
fn toggling_the_same_track_pauses_and_resumes_without_reloading() {
    let a = track("/music/Album/a.mp3");
    let mut c = controller();

    let state = play_loaded(&mut c, &a, 120);
    assert_eq!(c.status(), Status::Playing);
    assert_eq!(c.total_duration(), 120.0);
    assert!(state.lock().unwrap().playing);

    state.lock().unwrap().position = Duration::from_secs(37);
    c.tick();
    assert_eq!(c.current_time(), 37.0);

    assert!(c.play_or_toggle(&a).is_none());
    assert_eq!(c.status(), Status::Paused);
    assert!(!c.timer().is_running());
    assert!(!state.lock().unwrap().playing);
    assert_eq!(c.current_time(), 37.0);
    assert_eq!(c.current(), Some(&a));

    assert!(c.play_or_toggle(&a).is_none());
    assert_eq!(c.status(), Status::Playing);
    assert!(c.timer().is_running());
    assert!(state.lock().unwrap().playing);
    assert_eq!(c.current_time(), 37.0);
    assert_eq!(c.current(), Some(&a));
    assert_eq!(c.total_duration(), 120.0);

    assert_eq!(state.lock().unwrap().releases, 0);
    assert_eq!(c.timer().starts(), 2);
    assert_eq!(c.timer().stops(), 1);
}

#[test]
fn switching_tracks_releases_the_previous_handle_once() {
    let a = track("/music/Album/a.mp3");
    let b = track("/music/Album/b.mp3");
    let mut c = controller();

    let state_a = play_loaded(&mut c, &a, 120);
    let req = c.play_or_toggle(&b).expect("new track loads");
    assert_eq!(state_a.lock().unwrap().releases, 1);
    assert_eq!(c.status(), Status::Loading);
    assert!(c.current().is_none());
    assert!(!c.timer().is_running());

    let (handle, state_b) = fake_handle(60);
    c.finish_load(req.ticket, Ok(handle));
    assert_eq!(c.current(), Some(&b));
    assert_eq!(c.total_duration(), 60.0);
    assert_eq!(state_a.lock().unwrap().releases, 1);
    assert_eq!(state_b.lock().unwrap().releases, 0);
}

#[test]
fn tick_stops_at_end_of_track() {
    let a = track("/music/Album/a.mp3");
    let mut c = controller();
    let state = play_loaded(&mut c, &a, 10);

    state.lock().unwrap().position = Duration::from_secs(4);
    c.tick();
    assert_eq!(c.status(), Status::Playing);
    assert_eq!(c.current_time(), 4.0);

    state.lock().unwrap().position = Duration::from_secs(10);
    c.tick();
    assert_eq!(c.status(), Status::Idle);
    assert_eq!(c.current_time(), 0.0);
    assert_eq!(state.lock().unwrap().releases, 1);
    assert!(c.snapshot().notice.is_none());
    assert_consistent(&c);
}

#[test]
fn position_within_tolerance_counts_as_finished() {
    let settings = PlaybackSettings {
        poll_interval_ms: 500,
        end_tolerance_ms: Some(1000),
    };
    let mut c = Controller::new(&settings);
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 30);

    state.lock().unwrap().position = Duration::from_millis(29_200);
    c.tick();
    assert_eq!(c.status(), Status::Idle);
}

#[test]
fn default_tolerance_does_not_clip_the_tail() {
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 30);

    state.lock().unwrap().position = Duration::from_millis(29_700);
    c.tick();
    assert_eq!(c.status(), Status::Playing);
    assert!((c.current_time() - 29.7).abs() < 1e-9);

    state.lock().unwrap().position = Duration::from_millis(29_950);
    c.tick();
    assert_eq!(c.status(), Status::Idle);
}

#[test]
fn unknown_duration_never_ends_by_position() {
    let mut c = controller();
    let req = c.play_or_toggle(&track("/m/A/a.mp3")).unwrap();
    let state = Shared::default();
    let handle = FakeHandle {
        state: state.clone(),
        duration: None,
    };
    c.finish_load(req.ticket, Ok(Box::new(handle)));

    state.lock().unwrap().position = Duration::from_secs(9000);
    c.tick();
    assert_eq!(c.status(), Status::Playing);
    assert_eq!(c.current_time(), 9000.0);
}

#[test]
fn completion_reported_by_output_returns_to_idle() {
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 300);
    state.lock().unwrap().finished = Some(Finish::Completed);

    c.tick();
    assert_eq!(c.status(), Status::Idle);
    assert!(c.snapshot().notice.is_none());
    assert_eq!(state.lock().unwrap().releases, 1);
}

#[test]
fn playback_failure_sets_a_notice_and_releases() {
    let a = track("/m/A/a.mp3");
    let mut c = controller();
    let state = play_loaded(&mut c, &a, 300);
    state.lock().unwrap().finished = Some(Finish::Failed("device unplugged".into()));

    c.tick();
    assert_eq!(c.status(), Status::Idle);
    assert_eq!(state.lock().unwrap().releases, 1);
    assert_eq!(
        c.snapshot().notice,
        Some(PlaybackError::Playback {
            path: a.path.clone(),
            reason: "device unplugged".into()
        })
    );

    c.dismiss_notice();
    assert!(c.snapshot().notice.is_none());
}

#[test]
fn load_failure_leaves_controller_idle_with_notice() {
    let a = track("/m/A/broken.mp3");
    let mut c = controller();
    let req = c.play_or_toggle(&a).unwrap();
    c.finish_load(req.ticket, Err(OutputError::Decode("bad header".into())));

    assert_eq!(c.status(), Status::Idle);
    assert!(!c.has_handle());
    assert!(!c.timer().is_running());
    match c.snapshot().notice {
        Some(PlaybackError::Load { path, .. }) => assert_eq!(path, a.path),
        other => panic!("expected load notice, got {other:?}"),
    }
}

#[test]
fn stale_load_results_are_released_and_ignored() {
    let a = track("/m/A/a.mp3");
    let b = track("/m/A/b.mp3");
    let mut c = controller();

    let req_a = c.play_or_toggle(&a).unwrap();
    let req_b = c.play_or_toggle(&b).unwrap();
    assert_ne!(req_a.ticket, req_b.ticket);

    let (late_a, state_a) = fake_handle(100);
    c.finish_load(req_a.ticket, Ok(late_a));
    assert_eq!(state_a.lock().unwrap().releases, 1);
    assert_eq!(c.status(), Status::Loading);
    assert_eq!(c.snapshot().loading, Some(b.clone()));

    let (handle_b, _) = fake_handle(100);
    c.finish_load(req_b.ticket, Ok(handle_b));
    assert_eq!(c.current(), Some(&b));
}

#[test]
fn load_completing_after_stop_is_released() {
    let mut c = controller();
    let req = c.play_or_toggle(&track("/m/A/a.mp3")).unwrap();
    c.stop();
    assert_eq!(c.status(), Status::Idle);

    let (handle, state) = fake_handle(100);
    c.finish_load(req.ticket, Ok(handle));
    assert_eq!(c.status(), Status::Idle);
    assert_eq!(state.lock().unwrap().releases, 1);
}

#[test]
fn rejected_seek_keeps_position() {
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 100);

    c.seek(30.0);
    assert_eq!(c.current_time(), 30.0);

    state.lock().unwrap().reject_seek = true;
    c.seek(60.0);
    assert_eq!(c.current_time(), 30.0);
    assert!(matches!(
        c.snapshot().notice,
        Some(PlaybackError::Seek { .. })
    ));
    assert_eq!(c.status(), Status::Playing);
}

#[test]
fn seek_by_is_relative_and_ignored_when_idle() {
    let mut c = controller();
    c.seek_by(10.0);
    assert_eq!(c.current_time(), 0.0);

    play_loaded(&mut c, &track("/m/A/a.mp3"), 100);
    c.seek(20.0);
    c.seek_by(-5.0);
    assert_eq!(c.current_time(), 15.0);
    c.seek_by(-60.0);
    assert_eq!(c.current_time(), 0.0);
}

#[test]
fn stop_is_safe_in_every_state() {
    let mut c = controller();
    c.stop();
    c.stop();
    assert_consistent(&c);
    assert_eq!(c.timer().stops(), 0);

    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 100);
    c.stop();
    c.stop();
    assert_eq!(state.lock().unwrap().releases, 1);
    assert_eq!(c.timer().stops(), 1);
    assert_consistent(&c);
}

#[test]
fn shutdown_releases_active_handle() {
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 100);
    c.shutdown();
    assert_eq!(state.lock().unwrap().releases, 1);
    assert_eq!(c.status(), Status::Idle);
}

#[test]
fn paused_tracks_are_not_polled() {
    let a = track("/m/A/a.mp3");
    let mut c = controller();
    let state = play_loaded(&mut c, &a, 100);
    c.play_or_toggle(&a);
    state.lock().unwrap().position = Duration::from_secs(100);

    c.tick();
    assert_eq!(c.status(), Status::Paused);
    assert_eq!(c.poll_timeout(Instant::now()), None);
}

#[test]
fn on_timer_ticks_only_when_due() {
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 100);
    state.lock().unwrap().position = Duration::from_secs(7);

    let now = Instant::now();
    c.on_timer(now);
    assert_eq!(c.current_time(), 0.0);

    c.on_timer(now + Duration::from_secs(1));
    assert_eq!(c.current_time(), 7.0);
}

#[test]
fn due_poll_runs_even_when_messages_keep_arriving() {
    let backend: Arc<dyn OutputBackend> = Arc::new(FakeBackend::default());
    let (tx, _rx) = mpsc::channel::<Msg>();
    let mut c = controller();
    let state = play_loaded(&mut c, &track("/m/A/a.mp3"), 100);
    state.lock().unwrap().position = Duration::from_secs(42);

    let now = Instant::now();
    assert!(dispatch(&mut c, &backend, &tx, Some(Msg::Cmd(AudioCmd::DismissNotice)), now));
    assert_eq!(c.current_time(), 0.0);

    let later = now + Duration::from_secs(1);
    assert!(dispatch(&mut c, &backend, &tx, Some(Msg::Cmd(AudioCmd::DismissNotice)), later));
    assert_eq!(c.current_time(), 42.0);

    assert!(!dispatch(&mut c, &backend, &tx, Some(Msg::Cmd(AudioCmd::Quit)), later));
}

/// Small deterministic generator so random-intent runs are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[test]
fn random_intent_sequences_keep_handle_and_timer_consistent() {
    let tracks: Vec<AudioFileRef> = ["a", "b", "c"]
        .iter()
        .map(|n| track(&format!("/m/A/{n}.mp3")))
        .collect();
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let mut c = controller();
    let mut pending: Vec<u64> = Vec::new();
    let mut handed_out: Vec<Shared> = Vec::new();

    for _ in 0..2000 {
        match rng.next() % 7 {
            0 | 1 => {
                let file = &tracks[(rng.next() % 3) as usize];
                if let Some(req) = c.play_or_toggle(file) {
                    pending.push(req.ticket);
                }
            }
            2 => {
                if !pending.is_empty() {
                    let ticket = pending.remove((rng.next() as usize) % pending.len());
                    if rng.next() % 5 == 0 {
                        c.finish_load(ticket, Err(OutputError::Device("gone".into())));
                    } else {
                        let (handle, state) = fake_handle(20);
                        handed_out.push(state);
                        c.finish_load(ticket, Ok(handle));
                    }
                }
            }
            3 => c.stop(),
            4 => c.seek((rng.next() % 30) as f64),
            5 => {
                if let Some(state) = handed_out.last() {
                    state.lock().unwrap().position = Duration::from_secs(rng.next() % 25);
                }
                c.tick();
            }
            _ => c.dismiss_notice(),
        }
        assert_consistent(&c);
    }

    c.shutdown();
    for state in &handed_out {
        assert_eq!(state.lock().unwrap().releases, 1);
    }
}

#[test]
fn poll_timer_counts_transitions() {
    let mut t = PollTimer::new(Duration::from_millis(100));
    let now = Instant::now();

    t.stop();
    assert_eq!(t.stops(), 0);

    t.start(now);
    t.start(now);
    assert_eq!(t.starts(), 1);
    assert_eq!(t.remaining(now), Some(Duration::from_millis(100)));

    assert!(!t.fire(now + Duration::from_millis(50)));
    assert!(t.fire(now + Duration::from_millis(100)));
    assert_eq!(t.remaining(now + Duration::from_millis(100)), Some(Duration::from_millis(100)));

    // Far behind schedule: one tick, then the next deadline is in the future.
    let late = now + Duration::from_secs(5);
    assert!(t.fire(late));
    assert!(!t.fire(late));

    t.stop();
    assert!(!t.is_running());
    assert_eq!(t.remaining(late), None);
    assert_eq!(t.stops(), 1);
}

#[test]
fn unavailable_backend_always_fails() {
    let backend = UnavailableBackend::new("no device");
    match backend.open(Path::new("/m/A/a.mp3")) {
        Err(OutputError::Device(reason)) => assert_eq!(reason, "no device"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("expected failure"),
    }
}

fn wait_for(info: &PlaybackHandle, pred: impl Fn(&PlaybackInfo) -> bool) -> PlaybackInfo {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = info.lock().unwrap().clone();
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out, last state {snapshot:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn event_loop_plays_toggles_and_quits() {
    let backend = Arc::new(FakeBackend::default());
    let (tx, rx) = mpsc::channel::<Msg>();
    let info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));
    let settings = PlaybackSettings {
        poll_interval_ms: 10,
        end_tolerance_ms: None,
    };

    let join = {
        let backend: Arc<dyn OutputBackend> = backend.clone();
        let loop_tx = tx.clone();
        let info = info.clone();
        thread::spawn(move || run_event_loop(Controller::new(&settings), backend, rx, loop_tx, info))
    };

    let a = track("/m/A/a.mp3");
    tx.send(Msg::Cmd(AudioCmd::PlayOrToggle(a.clone()))).unwrap();
    let playing = wait_for(&info, |i| i.status == Status::Playing);
    assert_eq!(playing.current, Some(a.clone()));
    assert_eq!(playing.total_duration, 180.0);

    let state = backend.handles()[0].1.clone();
    state.lock().unwrap().position = Duration::from_secs(42);
    wait_for(&info, |i| i.current_time == 42.0);

    tx.send(Msg::Cmd(AudioCmd::PlayOrToggle(a.clone()))).unwrap();
    wait_for(&info, |i| i.status == Status::Paused);

    tx.send(Msg::Cmd(AudioCmd::PlayOrToggle(track("/m/A/broken.mp3"))))
        .unwrap();
    let failed = wait_for(&info, |i| i.notice.is_some());
    assert_eq!(failed.status, Status::Idle);
    assert_eq!(state.lock().unwrap().releases, 1);

    tx.send(Msg::Cmd(AudioCmd::DismissNotice)).unwrap();
    wait_for(&info, |i| i.notice.is_none());

    tx.send(Msg::Cmd(AudioCmd::PlayOrToggle(a))).unwrap();
    wait_for(&info, |i| i.status == Status::Playing);
    tx.send(Msg::Cmd(AudioCmd::Quit)).unwrap();
    join.join().unwrap();

    assert_eq!(info.lock().unwrap().status, Status::Idle);
    for (_, state) in backend.handles() {
        assert_eq!(state.lock().unwrap().releases, 1);
    }
}

#[test]
fn quitting_twice_joins_once_and_closes_the_queue() {
    let backend = Arc::new(FakeBackend::default());
    let settings = PlaybackSettings {
        poll_interval_ms: 10,
        end_tolerance_ms: None,
    };
    let player = AudioPlayer::with_backend(backend.clone(), &settings);
    let info = player.playback_handle();

    player.send(AudioCmd::PlayOrToggle(track("/m/A/a.mp3"))).unwrap();
    wait_for(&info, |i| i.status == Status::Playing);

    player.quit();
    player.quit();
    assert_eq!(player.send(AudioCmd::Stop), Err(mpsc::SendError(AudioCmd::Stop)));
    assert_eq!(info.lock().unwrap().status, Status::Idle);
    drop(player);

    let handles = backend.handles();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].1.lock().unwrap().releases, 1);
}
