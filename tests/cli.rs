//! Process-level tests of the `clinrec` and `clinrec-client` binaries.

mod common;

use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn clinrec_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_clinrec"))
}

fn client_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_clinrec-client"))
}

/// Run clinrec to completion with the given args
fn run_clinrec(args: &[&str]) -> Output {
    Command::new(clinrec_binary())
        .args(args)
        .arg("--quiet")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run clinrec")
}

/// Start a server in the background and wait until it accepts connections
fn spawn_server(port: u16, dictionary: &std::path::Path) -> Child {
    let mut child = Command::new(clinrec_binary())
        .arg(port.to_string())
        .arg(dictionary)
        .args(["--bind", "127.0.0.1", "--quiet"])
        .env("RUST_LOG", "off")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start clinrec");

    let deadline = Instant::now() + Duration::from_secs(30);
    while TcpStream::connect((Ipv4Addr::LOCALHOST, port)).is_err() {
        if let Ok(Some(status)) = child.try_wait() {
            panic!("clinrec exited early: {status}");
        }
        assert!(Instant::now() < deadline, "clinrec did not start listening");
        thread::sleep(Duration::from_millis(50));
    }
    child
}

#[test]
fn test_missing_arguments_exit_1() {
    let output = run_clinrec(&[]);
    assert_eq!(output.status.code(), Some(1));

    let output = run_clinrec(&["8890"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_port_exit_1() {
    let dictionary = common::write_dictionary(common::DICTIONARY);
    let path = dictionary.path().to_str().unwrap();

    for port in ["0", "70000", "-1", "http"] {
        let output = run_clinrec(&[port, path]);
        assert_eq!(output.status.code(), Some(1), "port {port:?}");
    }
}

#[test]
fn test_missing_dictionary_exit_1() {
    let output = run_clinrec(&["8890", "/nonexistent/dictionary.tsv"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load dictionary"), "stderr: {stderr}");
}

#[test]
fn test_malformed_dictionary_exit_1() {
    let dictionary = common::write_dictionary("1\tfievre\nnot a concept line\n");
    let output = run_clinrec(&["8890", dictionary.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn test_invalid_config_exit_1() {
    let dictionary = common::write_dictionary(common::DICTIONARY);
    let output = run_clinrec(&[
        "8890",
        dictionary.path().to_str().unwrap(),
        "--pool-size",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bind_failure_exit_1() {
    let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = taken.local_addr().unwrap().port().to_string();
    let dictionary = common::write_dictionary(common::DICTIONARY);

    let output = run_clinrec(&[
        &port,
        dictionary.path().to_str().unwrap(),
        "--bind",
        "127.0.0.1",
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_and_version_exit_0() {
    let output = Command::new(clinrec_binary()).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("dictionary"));

    let output = Command::new(clinrec_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
}

#[test]
fn test_client_annotates_arguments() {
    let dictionary = common::write_dictionary(common::DICTIONARY);
    let port = common::free_port();
    let mut server = spawn_server(port, dictionary.path());

    let addr = format!("127.0.0.1:{port}");
    let output = Command::new(client_binary())
        .args([addr.as_str(), "douleur thoracique intense", "fievre jaune"])
        .output()
        .expect("Failed to run clinrec-client");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "1\t0\t18\tdouleur thoracique\n5\t0\t12\tfievre jaune\n"
    );

    let output = Command::new(client_binary())
        .args([addr.as_str(), "--json", "fievre"])
        .output()
        .expect("Failed to run clinrec-client");
    let value: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(value["concept_id"], 4);

    server.kill().unwrap();
    server.wait().unwrap();
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_server_cleanly() {
    let dictionary = common::write_dictionary(common::DICTIONARY);
    let port = common::free_port();
    let mut server = spawn_server(port, dictionary.path());

    // SAFETY: signalling our own child process
    let rc = unsafe { libc::kill(server.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(rc, 0);

    let deadline = Instant::now() + Duration::from_secs(15);
    let status = loop {
        if let Some(status) = server.try_wait().unwrap() {
            break status;
        }
        assert!(Instant::now() < deadline, "clinrec ignored SIGTERM");
        thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success(), "exit status: {status}");
    assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).is_err());
}
