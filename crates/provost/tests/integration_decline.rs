//! Operator-decline semantics: declining any confirmation terminates the
//! whole run with exit code 0 and executes no further phase actions.

mod support;

use predicates::prelude::*;
use support::TestEnv;

#[test]
fn declining_the_first_prompt_exits_zero_with_no_actions() {
    let env = TestEnv::new();

    env.deploy_cmd()
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "aborted at operator request before phase A",
        ));

    assert!(env.toolkit_log().is_empty());
    assert!(env.remote_log().is_empty());
}

#[test]
fn end_of_input_declines_rather_than_assuming_consent() {
    let env = TestEnv::new();

    env.deploy_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("aborted at operator request"));

    assert!(env.toolkit_log().is_empty());
}

#[test]
fn declining_the_continue_prompt_stops_after_the_phase() {
    let env = TestEnv::new();

    // Confirm phase A, decline "proceed to the next phase?".
    env.deploy_cmd()
        .write_stdin("y\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "stopped at operator request after phase A",
        ));

    // Phase A ran...
    assert!(env.remote_log().contains("subscription-manager"));
    // ...but phase B (and everything after) did not.
    let toolkit = env.toolkit_log();
    assert!(!toolkit.contains("--verify"));
    assert!(!toolkit.contains("cluster create"));
}
