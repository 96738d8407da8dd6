//! End-to-end exercise of the monitor's polling loop: a real `tmon` process
//! is driven through the file-plus-signal channel and dispatches a stub
//! worker whose argv and output we can inspect.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use common::channel::CommandChannel;
use nix::unistd::Pid;

const POLL_MS: u64 = 20;
const GRACE_MS: u64 = 200;

fn stub_worker(dir: &Path, argv_log: &Path) -> PathBuf {
    let path = dir.join("stub-worker");
    let body = format!(
        "#!/bin/sh\necho \"$@\" >> {}\necho \"worker output: $@\"\n",
        argv_log.display()
    );
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn spawn_monitor(channel_dir: &Path, worker: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_tmon"))
        .arg("--channel-dir")
        .arg(channel_dir)
        .arg("--worker-bin")
        .arg(worker)
        .arg("--poll-ms")
        .arg(POLL_MS.to_string())
        .arg("--grace-ms")
        .arg(GRACE_MS.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn tmon")
}

fn wait_for_exit(child: &mut Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if child.try_wait().unwrap().is_some() {
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    panic!("tmon did not exit within {timeout:?}");
}

#[test]
fn dispatches_commands_and_honors_stop_grace() {
    let dir = tempfile::tempdir().unwrap();
    let argv_log = dir.path().join("argv.log");
    let worker = stub_worker(dir.path(), &argv_log);
    let channel = CommandChannel::new(dir.path());

    let mut child = spawn_monitor(dir.path(), &worker);
    let pid = Pid::from_raw(child.id() as i32);

    // Let the monitor install its SIGUSR1 handler before poking it.
    thread::sleep(Duration::from_millis(500));

    channel
        .send("list_treasures", Some("pirates42"), Some(pid))
        .unwrap();
    thread::sleep(Duration::from_millis(400));
    assert_eq!(fs::read_to_string(&argv_log).unwrap(), "show pirates42\n");

    // An unrecognized command is reported but must not kill the loop.
    channel.send("alakazam", None, Some(pid)).unwrap();
    thread::sleep(Duration::from_millis(300));

    channel.send("list_hunts", None, Some(pid)).unwrap();
    thread::sleep(Duration::from_millis(400));
    assert_eq!(
        fs::read_to_string(&argv_log).unwrap(),
        "show pirates42\nlist\n"
    );

    let stop_sent = Instant::now();
    channel.send("stop", None, Some(pid)).unwrap();
    wait_for_exit(&mut child, Duration::from_secs(5));
    assert!(
        stop_sent.elapsed() >= Duration::from_millis(GRACE_MS),
        "monitor exited before its grace delay"
    );

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Monitor started (PID:"), "stdout: {stdout}");
    assert!(stdout.contains("worker output: show pirates42"), "stdout: {stdout}");
    assert!(stdout.contains("Monitor: unknown command 'alakazam'"), "stdout: {stdout}");
    assert!(stdout.contains("Monitor received stop command"), "stdout: {stdout}");
    assert!(stdout.contains("Monitor: exiting now"), "stdout: {stdout}");
}

#[test]
fn coalesced_sends_run_only_the_last_command() {
    let dir = tempfile::tempdir().unwrap();
    let argv_log = dir.path().join("argv.log");
    let worker = stub_worker(dir.path(), &argv_log);
    let channel = CommandChannel::new(dir.path());

    let mut child = spawn_monitor(dir.path(), &worker);
    let pid = Pid::from_raw(child.id() as i32);
    thread::sleep(Duration::from_millis(500));

    // Two back-to-back sends within one poll interval: the slot is
    // last-writer-wins, so only the second command may run. The first can
    // sneak in if a poll tick lands between the writes, but never after the
    // second is stored.
    channel.send("list_treasures", Some("first"), Some(pid)).unwrap();
    channel.send("list_treasures", Some("second"), Some(pid)).unwrap();
    thread::sleep(Duration::from_millis(400));

    let log = fs::read_to_string(&argv_log).unwrap_or_default();
    assert!(
        log == "show second\n" || log == "show first\nshow second\n" || log == "show second\nshow second\n",
        "unexpected dispatch log: {log:?}"
    );
    assert!(log.ends_with("show second\n"), "first send won: {log:?}");

    channel.send("stop", None, Some(pid)).unwrap();
    wait_for_exit(&mut child, Duration::from_secs(5));
}
