//! Drives a real `thub` process through a full interactive session against a
//! stub monitor that answers the wake signal by echoing the channel slot.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

fn stub_monitor(dir: &Path) -> PathBuf {
    let path = dir.join("stub-monitor");
    let body = format!(
        r#"#!/bin/sh
on_usr1() {{
    cmd=$(cat "{dir}/monitor_command.txt" 2>/dev/null)
    echo "stub saw: $cmd"
    if [ "$cmd" = stop ]; then STOP=1; fi
}}
trap on_usr1 USR1
echo "stub monitor ready"
STOP=0
i=0
while [ "$STOP" -eq 0 ] && [ $i -lt 400 ]; do sleep 0.05; i=$((i+1)); done
exit 0
"#,
        dir = dir.display()
    );
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn full_session_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = stub_monitor(dir.path());

    let mut child = Command::new(env!("CARGO_BIN_EXE_thub"))
        .arg("--channel-dir")
        .arg(dir.path())
        .arg("--hunts-root")
        .arg(dir.path().join("hunts"))
        .arg("--monitor-bin")
        .arg(&monitor)
        .arg("--settle-ms")
        .arg("150")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn thub");

    let mut stdin = child.stdin.take().unwrap();
    let mut say = |line: &str, wait_ms: u64| {
        stdin.write_all(line.as_bytes()).unwrap();
        stdin.flush().unwrap();
        thread::sleep(Duration::from_millis(wait_ms));
    };

    say("start_monitor\n", 300);
    say("start_monitor\n", 200); // rejected: already running
    say("exit\n", 200); // rejected: monitor still running
    say("list_hunts\n", 400); // forwarded, stub's echo drained back
    say("stop_monitor\n", 300);
    thread::sleep(Duration::from_millis(500)); // let SIGCHLD land
    say("\n", 300); // next iteration reports the exit
    say("exit\n", 200);
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "thub exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Monitor started (PID:"), "stdout: {stdout}");
    assert!(stdout.contains("Monitor is already running"), "stdout: {stdout}");
    assert!(
        stdout.contains("Error: Monitor is still running. Stop it first with 'stop_monitor'"),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("stub monitor ready"), "stdout: {stdout}");
    assert!(stdout.contains("stub saw: list_hunts"), "stdout: {stdout}");
    assert!(stdout.contains("Stopping monitor..."), "stdout: {stdout}");
    assert!(
        stdout.contains("Monitor has terminated with status 0"),
        "stdout: {stdout}"
    );
    assert_eq!(
        stdout.matches("Monitor has terminated").count(),
        1,
        "exit status must be reported exactly once: {stdout}"
    );
    assert!(stdout.contains("Exiting treasure hub"), "stdout: {stdout}");
}

#[test]
fn worker_output_flows_back_within_one_settle_interval() {
    // A monitor stub that writes a canned "worker" response on any wake:
    // whatever it prints must show up in the very drain that follows the
    // hub's send, not a later one.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stub-monitor");
    fs::write(
        &path,
        // Bounded lifetime so an orphaned stub cannot outlive the test run.
        "#!/bin/sh\ntrap 'echo \"ID: 7 | User: alice | Value: 10\"' USR1\ni=0\nwhile [ $i -lt 200 ]; do sleep 0.05; i=$((i+1)); done\n",
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_thub"))
        .arg("--channel-dir")
        .arg(dir.path())
        .arg("--hunts-root")
        .arg(dir.path().join("hunts"))
        .arg("--monitor-bin")
        .arg(&path)
        .arg("--settle-ms")
        .arg("200")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn thub");

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"start_monitor\n").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(300));
    stdin
        .write_all(b"list_treasures pirates42\n")
        .unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(600));
    drop(stdin); // EOF ends the hub even with the stub still up

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("ID: 7 | User: alice | Value: 10"),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("End of input. Exiting."), "stdout: {stdout}");
}
