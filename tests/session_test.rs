//! Cast session controller tests
//!
//! Covers the session state machine end to end with a scripted catt:
//! Idle -> Playing -> Paused -> Playing -> Stopped -> Idle, failures moving
//! to Error and recovery from Error.

mod common;

use std::sync::Arc;

use castui::{CastController, CastError, Outcome, PlayerState, Request, SessionState};
use common::{args, bedroom, living_room, Reply, ScriptedRunner};

const VIDEO: &str = "https://example.com/video.mp4";

fn controller(runner: &Arc<ScriptedRunner>) -> CastController {
    CastController::new(runner.clone())
}

/// Controller with a Playing session on the living room TV
async fn playing(runner: &Arc<ScriptedRunner>) -> CastController {
    let mut ctl = controller(runner);
    ctl.start_cast(living_room(), VIDEO).await.unwrap();
    assert_eq!(ctl.state(), SessionState::Playing);
    ctl
}

// =============================================================================
// START CAST
// =============================================================================

/// Successful cast from Idle moves to Playing with no error
#[tokio::test]
async fn test_start_cast_success() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    let outcome = ctl.start_cast(bedroom(), VIDEO).await.unwrap();

    assert!(matches!(
        outcome,
        Outcome::Applied {
            state: SessionState::Playing,
            ..
        }
    ));
    assert_eq!(ctl.state(), SessionState::Playing);
    assert!(ctl.last_error().is_none());
    assert_eq!(ctl.session().unwrap().media_url, VIDEO);
    assert_eq!(ctl.target(), Some(&bedroom()));
    assert_eq!(
        runner.calls(),
        vec![args(&["-d", "192.168.1.11", "cast", VIDEO])]
    );
}

/// Tool failure moves to Error carrying stderr verbatim
#[tokio::test]
async fn test_start_cast_failure() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.reply_fail(1, "Device not found");
    let mut ctl = controller(&runner);

    let err = ctl.start_cast(bedroom(), VIDEO).await.unwrap_err();

    assert_eq!(err.label(), "Command failed");
    assert_eq!(ctl.state(), SessionState::Error);
    assert_eq!(ctl.last_error(), Some("Device not found"));
}

/// Empty or blank URLs never reach the tool
#[tokio::test]
async fn test_start_cast_empty_url_is_rejected() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    for url in ["", "   ", "\t\n"] {
        let err = ctl.start_cast(bedroom(), url).await.unwrap_err();
        assert!(matches!(err, CastError::InvalidInput(_)));
    }

    assert_eq!(runner.call_count(), 0);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(ctl.session().is_none());
}

/// Invalid input does not disturb a running session
#[tokio::test]
async fn test_invalid_url_keeps_session() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    let err = ctl.start_cast(bedroom(), "not a url").await.unwrap_err();
    assert!(matches!(err, CastError::InvalidInput(_)));
    assert_eq!(ctl.state(), SessionState::Playing);
    assert_eq!(runner.call_count(), 1);
}

/// A new cast stops the active one first
#[tokio::test]
async fn test_start_cast_replaces_active_session() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    let first = ctl.session().unwrap().id;

    ctl.start_cast(bedroom(), "https://example.com/other.mp4")
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], args(&["-d", "192.168.1.10", "stop"]));
    assert_eq!(calls[2][1], "192.168.1.11");

    let session = ctl.session().unwrap();
    assert_ne!(session.id, first);
    assert_eq!(session.device, bedroom());
    assert_eq!(session.state, SessionState::Playing);
}

/// If the implicit stop fails the new cast is not attempted
#[tokio::test]
async fn test_failing_pre_stop_aborts_cast() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    let first = ctl.session().unwrap().id;
    runner.reply_fail(1, "Chromecast went away");

    let err = ctl.start_cast(bedroom(), VIDEO).await.unwrap_err();

    assert_eq!(err.to_string(), "Chromecast went away");
    assert_eq!(runner.call_count(), 2);
    assert_eq!(ctl.state(), SessionState::Error);
    assert_eq!(ctl.last_error(), Some("Chromecast went away"));

    // the old session still owns the living room TV
    let session = ctl.session().unwrap();
    assert_eq!(session.id, first);
    assert_eq!(session.device, living_room());
    assert_eq!(session.media_url, VIDEO);

    ctl.stop().await.unwrap();
    assert_eq!(runner.calls()[2], args(&["-d", "192.168.1.10", "stop"]));
    assert_eq!(ctl.state(), SessionState::Stopped);
}

/// A session in Error may still be playing, so a new cast stops it first
#[tokio::test]
async fn test_cast_after_error_stops_previous_device() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_fail(1, "Connection reset");
    ctl.pause().await.unwrap_err();
    assert_eq!(ctl.state(), SessionState::Error);

    ctl.start_cast(bedroom(), VIDEO).await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            args(&["-d", "192.168.1.10", "cast", VIDEO]),
            args(&["-d", "192.168.1.10", "pause"]),
            args(&["-d", "192.168.1.10", "stop"]),
            args(&["-d", "192.168.1.11", "cast", VIDEO]),
        ]
    );
    assert_eq!(ctl.session().unwrap().device, bedroom());
    assert_eq!(ctl.state(), SessionState::Playing);
}

/// A failure in the cast step itself records the new device
#[tokio::test]
async fn test_failing_cast_after_pre_stop_moves_to_new_device() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_ok("").reply_fail(1, "Device not found");

    ctl.start_cast(bedroom(), VIDEO).await.unwrap_err();

    let session = ctl.session().unwrap();
    assert_eq!(session.device, bedroom());
    assert_eq!(session.state, SessionState::Error);
    assert_eq!(ctl.target(), Some(&bedroom()));
}

/// Stopped sessions are not stopped again
#[tokio::test]
async fn test_cast_after_stop_skips_pre_stop() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    ctl.stop().await.unwrap();

    ctl.start_cast(bedroom(), VIDEO).await.unwrap();
    assert_eq!(runner.call_count(), 3);
    assert_eq!(runner.calls()[2], args(&["-d", "192.168.1.11", "cast", VIDEO]));
}

// =============================================================================
// TRANSPORT CONTROLS
// =============================================================================

/// Playing -> Paused -> Playing
#[tokio::test]
async fn test_pause_resume_cycle() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    ctl.pause().await.unwrap();
    assert_eq!(ctl.state(), SessionState::Paused);

    ctl.resume().await.unwrap();
    assert_eq!(ctl.state(), SessionState::Playing);

    let calls = runner.calls();
    assert_eq!(calls[1], args(&["-d", "192.168.1.10", "pause"]));
    assert_eq!(calls[2], args(&["-d", "192.168.1.10", "play"]));
}

/// pause() while Idle is informational and spawns nothing
#[tokio::test]
async fn test_pause_when_idle_is_noop() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    let outcome = ctl.pause().await.unwrap();
    assert!(matches!(outcome, Outcome::Info(_)));
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(runner.call_count(), 0);
}

/// pause() while Stopped is informational too
#[tokio::test]
async fn test_pause_when_stopped_is_noop() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    ctl.stop().await.unwrap();

    let outcome = ctl.pause().await.unwrap();
    assert_eq!(outcome, Outcome::Info("Nothing is playing.".into()));
    assert_eq!(ctl.state(), SessionState::Stopped);
    assert_eq!(runner.call_count(), 2);
}

/// resume() needs Paused
#[tokio::test]
async fn test_resume_when_playing_is_noop() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    let outcome = ctl.resume().await.unwrap();
    assert!(matches!(outcome, Outcome::Info(_)));
    assert_eq!(ctl.state(), SessionState::Playing);
}

/// Playing -> Stopped -> Idle once acknowledged
#[tokio::test]
async fn test_stop_then_acknowledge() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    ctl.stop().await.unwrap();
    assert_eq!(ctl.state(), SessionState::Stopped);

    assert!(ctl.acknowledge());
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(runner.calls()[1], args(&["-d", "192.168.1.10", "stop"]));
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);
    assert!(matches!(ctl.stop().await.unwrap(), Outcome::Info(_)));
    assert_eq!(runner.call_count(), 0);
}

/// Volume, seek and skip go to the session's device
#[tokio::test]
async fn test_extra_controls() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    for request in [
        Request::VolumeUp(5),
        Request::VolumeDown(5),
        Request::FastForward(15),
        Request::Rewind(15),
        Request::Skip,
        Request::Enqueue {
            url: "https://example.com/next.mp4".into(),
        },
    ] {
        ctl.run(request).await.unwrap();
    }

    let calls = runner.calls();
    assert_eq!(calls[1], args(&["-d", "192.168.1.10", "volumeup", "5"]));
    assert_eq!(calls[2], args(&["-d", "192.168.1.10", "volumedown", "5"]));
    assert_eq!(calls[3], args(&["-d", "192.168.1.10", "ffwd", "15"]));
    assert_eq!(calls[4], args(&["-d", "192.168.1.10", "rewind", "15"]));
    assert_eq!(calls[5], args(&["-d", "192.168.1.10", "skip"]));
    assert_eq!(
        calls[6],
        args(&["-d", "192.168.1.10", "add", "https://example.com/next.mp4"])
    );
    assert_eq!(ctl.state(), SessionState::Playing);
}

/// Mute, absolute volume and absolute seek
#[tokio::test]
async fn test_absolute_controls() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_ok("Title: Sintel\nState: PLAYING\nVolume: 40\n");
    ctl.refresh_status().await.unwrap();

    let outcome = ctl.run(Request::Mute(true)).await.unwrap();
    assert_eq!(outcome.message(), "Muted.");
    assert!(ctl.status().unwrap().muted);

    let outcome = ctl.run(Request::SetVolume(70)).await.unwrap();
    assert_eq!(outcome.message(), "Volume set to 70%.");
    assert_eq!(ctl.status().and_then(|s| s.volume), Some(70));

    let outcome = ctl.run(Request::Seek(754)).await.unwrap();
    assert_eq!(outcome.message(), "Seeked to 00:12:34.");

    let calls = runner.calls();
    assert_eq!(calls[2], args(&["-d", "192.168.1.10", "volumemute", "true"]));
    assert_eq!(calls[3], args(&["-d", "192.168.1.10", "volume", "70"]));
    assert_eq!(calls[4], args(&["-d", "192.168.1.10", "seek", "754"]));
    assert_eq!(ctl.state(), SessionState::Playing);
}

/// Stop-all stops every device in turn
#[tokio::test]
async fn test_stop_all() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;

    ctl.stop_all(&[living_room(), bedroom()]).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls[1], args(&["-d", "192.168.1.10", "stop"]));
    assert_eq!(calls[2], args(&["-d", "192.168.1.11", "stop"]));
    assert_eq!(ctl.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_stop_all_without_devices() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);
    assert!(matches!(ctl.stop_all(&[]).await.unwrap(), Outcome::Info(_)));
    assert_eq!(runner.call_count(), 0);
}

// =============================================================================
// LOCAL FILES
// =============================================================================

fn media_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("holiday video.mp4");
    std::fs::write(&path, b"not really a video").unwrap();
    path
}

/// A local file is served in the background until playback stops
#[cfg(unix)]
#[tokio::test]
async fn test_cast_file_keeps_server_until_stop() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir);
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    let outcome = ctl.cast_file(bedroom(), &path).await.unwrap();

    assert_eq!(outcome.message(), "Serving holiday video.mp4 to Bedroom.");
    assert!(ctl.is_serving());
    assert_eq!(ctl.state(), SessionState::Playing);
    let path_arg = path.to_string_lossy().into_owned();
    assert_eq!(
        runner.calls(),
        vec![args(&["-d", "192.168.1.11", "cast", path_arg.as_str()])]
    );

    ctl.stop().await.unwrap();
    assert!(!ctl.is_serving());
}

/// A remote cast replaces the local server too
#[cfg(unix)]
#[tokio::test]
async fn test_remote_cast_releases_local_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir);
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    ctl.cast_file(bedroom(), &path).await.unwrap();
    ctl.start_cast(bedroom(), VIDEO).await.unwrap();

    assert!(!ctl.is_serving());
    assert_eq!(runner.calls()[1], args(&["-d", "192.168.1.11", "stop"]));
}

/// catt exiting inside the grace period fails the cast
#[tokio::test]
async fn test_cast_file_early_exit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir);
    let runner = Arc::new(ScriptedRunner::new());
    runner.reply_fail(1, "Unsupported file type");
    let mut ctl = controller(&runner);

    let err = ctl.cast_file(bedroom(), &path).await.unwrap_err();

    assert_eq!(err.to_string(), "Unsupported file type");
    assert!(!ctl.is_serving());
    assert_eq!(ctl.state(), SessionState::Error);
}

/// A missing file is rejected before catt runs
#[tokio::test]
async fn test_cast_missing_file_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = controller(&runner);

    let err = ctl
        .cast_file(bedroom(), &dir.path().join("gone.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::InvalidInput(_)));
    assert_eq!(runner.call_count(), 0);
}

// =============================================================================
// ERROR RECOVERY
// =============================================================================

/// A failed control moves to Error; a successful stop clears it
#[tokio::test]
async fn test_stop_recovers_from_error() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_fail(1, "Connection reset");

    ctl.pause().await.unwrap_err();
    assert_eq!(ctl.state(), SessionState::Error);
    assert_eq!(ctl.last_error(), Some("Connection reset"));

    ctl.stop().await.unwrap();
    assert_eq!(ctl.state(), SessionState::Stopped);
    assert!(ctl.last_error().is_none());
}

/// A successful cast after a failed one clears the error
#[tokio::test]
async fn test_start_cast_recovers_from_error() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.reply_fail(1, "Device not found");
    let mut ctl = controller(&runner);

    ctl.start_cast(bedroom(), VIDEO).await.unwrap_err();
    assert_eq!(ctl.state(), SessionState::Error);

    ctl.start_cast(bedroom(), VIDEO).await.unwrap();
    assert_eq!(ctl.state(), SessionState::Playing);
    assert!(ctl.last_error().is_none());
}

/// Timeouts count as command failures
#[tokio::test]
async fn test_timeout_is_command_failure() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.push(Reply::Timeout);

    let err = ctl.pause().await.unwrap_err();
    assert!(matches!(err, CastError::CommandFailed { .. }));
    assert_eq!(ctl.state(), SessionState::Error);
    assert!(ctl.last_error().unwrap().contains("timed out"));
}

/// A missing tool also fails the session, with the not-found message
#[tokio::test]
async fn test_missing_tool_during_cast() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.push(Reply::NotFound);
    let mut ctl = controller(&runner);

    let err = ctl.start_cast(bedroom(), VIDEO).await.unwrap_err();
    assert!(err.is_persistent());
    assert_eq!(ctl.state(), SessionState::Error);
    assert!(ctl.last_error().unwrap().contains("command not found"));
}

// =============================================================================
// STATUS
// =============================================================================

/// Status is a query: it never moves the session
#[tokio::test]
async fn test_status_does_not_change_session() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_ok("Title: Sintel\nState: PAUSED\nVolume: 30\n");

    let outcome = ctl.refresh_status().await.unwrap();
    let status = match outcome {
        Outcome::Status(status) => status,
        other => panic!("expected status, got {:?}", other),
    };
    assert_eq!(status.state, PlayerState::Paused);
    assert_eq!(ctl.state(), SessionState::Playing);
    assert_eq!(ctl.status().and_then(|s| s.volume), Some(30));
}

/// "inactive" from catt status means the receiver is idle
#[tokio::test]
async fn test_status_inactive_is_idle() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.reply_fail(1, "Error: Chromecast is inactive.");
    let mut ctl = controller(&runner);
    ctl.select(bedroom());

    let outcome = ctl.refresh_status().await.unwrap();
    assert!(matches!(outcome, Outcome::Status(ref s) if s.state == PlayerState::Idle));
    assert_eq!(ctl.state(), SessionState::Idle);
}

/// Other status failures are informational
#[tokio::test]
async fn test_status_failure_is_informational() {
    let runner = Arc::new(ScriptedRunner::new());
    let mut ctl = playing(&runner).await;
    runner.reply_fail(1, "Connection refused");

    let outcome = ctl.refresh_status().await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Info("Status unavailable: Connection refused".into())
    );
    assert_eq!(ctl.state(), SessionState::Playing);
    assert!(ctl.last_error().is_none());
}
