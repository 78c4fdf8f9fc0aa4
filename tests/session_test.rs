// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Session lifecycle, command execution and fail-fast sequences.

mod common;

use common::FakeTransport;
use hostbridge::Error;

#[tokio::test]
async fn test_execute_returns_combined_output_and_status() {
    let fake = FakeTransport::new();
    let session = fake.session();

    let result = session.execute("echo hello").await.unwrap();
    assert!(result.success());
    assert_eq!(result.output_string(), "hello\n");

    let result = session.execute("false").await.unwrap();
    assert!(!result.success());
    assert_eq!(result.exit_status, Some(1));
}

#[tokio::test]
async fn test_execute_rejects_empty_command() {
    let fake = FakeTransport::new();
    let session = fake.session();

    for command in ["", "   ", "\n"] {
        let err = session.execute(command).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
    }
    assert!(fake.commands().is_empty());
}

#[tokio::test]
async fn test_execute_checked_reports_output() {
    let fake = FakeTransport::new();
    fake.respond("systemctl is-active", "inactive\n", Some(3));
    let session = fake.session();

    let err = session
        .execute_checked("systemctl is-active app")
        .await
        .unwrap_err();
    match err {
        Error::Command {
            command,
            exit_status,
            reason,
        } => {
            assert_eq!(command, "systemctl is-active app");
            assert_eq!(exit_status, Some(3));
            assert_eq!(reason, "inactive");
        }
        other => panic!("expected command error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_exit_status_is_failure() {
    let fake = FakeTransport::new();
    fake.respond("kill -9", "", None);
    let session = fake.session();

    let result = session.execute("kill -9 $$").await.unwrap();
    assert_eq!(result.exit_status, None);
    assert!(!result.success());
    assert!(session.execute_checked("kill -9 $$").await.is_err());
}

#[tokio::test]
async fn test_sequence_runs_all_commands_in_order() {
    let fake = FakeTransport::new();
    let session = fake.session();

    session
        .execute_sequence(&["echo one", "echo two", "true"])
        .await
        .unwrap();
    assert_eq!(fake.commands(), vec!["echo one", "echo two", "true"]);
}

#[tokio::test]
async fn test_sequence_stops_at_first_failure() {
    let fake = FakeTransport::new();
    let session = fake.session();

    let err = session
        .execute_sequence(&["true", "false", "echo never"])
        .await
        .unwrap_err();
    match &err {
        Error::Step { index, command, .. } => {
            assert_eq!(*index, 1);
            assert_eq!(command, "false");
        }
        other => panic!("expected step error, got {other:?}"),
    }
    assert!(matches!(err.root_step_cause(), Error::Command { .. }));
    assert_eq!(fake.commands(), vec!["true", "false"]);
}

#[tokio::test]
async fn test_sequence_rejects_empty_list() {
    let fake = FakeTransport::new();
    let session = fake.session();

    let empty: [&str; 0] = [];
    let err = session.execute_sequence(&empty).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_sequence_with_empty_step_fails_at_that_step() {
    let fake = FakeTransport::new();
    let session = fake.session();

    let err = session
        .execute_sequence(&["true", " ", "true"])
        .await
        .unwrap_err();
    match err {
        Error::Step { index, source, .. } => {
            assert_eq!(index, 1);
            assert!(matches!(*source, Error::InvalidArgument(_)));
        }
        other => panic!("expected step error, got {other:?}"),
    }
    assert_eq!(fake.commands(), vec!["true"]);
}

#[tokio::test]
async fn test_close_releases_file_channel_first() {
    let fake = FakeTransport::new();
    let mut session = fake.session();

    session.close().await.unwrap();
    assert!(session.is_closed());
    assert_eq!(fake.closes(), vec!["file-transfer", "command"]);
}

#[tokio::test]
async fn test_close_twice_is_noop() {
    let fake = FakeTransport::new();
    let mut session = fake.session();

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert_eq!(fake.closes().len(), 2);
}

#[tokio::test]
async fn test_close_attempts_both_channels_on_failure() {
    let fake = FakeTransport::new();
    fake.fail_close(true, false);
    let mut session = fake.session();

    let err = session.close().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Close {
            channel: "file-transfer",
            ..
        }
    ));
    assert_eq!(fake.closes(), vec!["file-transfer", "command"]);
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_close_reports_command_channel_failure() {
    let fake = FakeTransport::new();
    fake.fail_close(false, true);
    let mut session = fake.session();

    let err = session.close().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Close {
            channel: "command",
            ..
        }
    ));
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let fake = FakeTransport::new();
    let mut session = fake.session();
    session.close().await.unwrap();

    assert!(matches!(
        session.execute("true").await.unwrap_err(),
        Error::SessionClosed
    ));
    assert!(matches!(
        session.execute_sequence(&["true"]).await.unwrap_err(),
        Error::SessionClosed
    ));
    assert!(matches!(
        session
            .transfer()
            .download_file("/etc/hosts", std::path::Path::new("/tmp"))
            .await
            .unwrap_err(),
        Error::SessionClosed
    ));
    assert!(fake.commands().is_empty());
}

#[tokio::test]
async fn test_session_identity() {
    let fake = FakeTransport::new();
    let session = fake.session();
    assert_eq!(session.host(), common::HOST);
    assert_eq!(session.principal(), common::USER);
    assert!(!session.is_closed());
}
