//! Health-check path scenarios: fixed query order, best-effort tolerance,
//! and the absence of any cluster-mutating call.

mod support;

use predicates::prelude::*;
use support::TestEnv;

#[test]
fn health_runs_five_queries_in_fixed_order_and_mutates_nothing() {
    let env = TestEnv::new();

    env.health_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("cluster listing"))
        .stdout(predicate::str::contains("storage device listing"))
        .stdout(predicate::str::contains("health check complete"));

    let toolkit = env.toolkit_log();
    let lines: Vec<&str> = toolkit.lines().collect();
    assert_eq!(
        lines,
        vec![
            "scalectl cluster list",
            "scalectl cluster state",
            "scalectl health nodes",
            "scalectl health events",
            "scalectl nsd list",
        ]
    );

    // No cluster-mutating call is ever issued on this path.
    assert!(!toolkit.contains("cluster create"));
    assert!(!toolkit.contains("node add"));
    assert!(!toolkit.contains("nsd add"));
    assert!(!toolkit.contains("install"));
    assert!(env.remote_log().is_empty());
}

#[test]
fn best_effort_query_failures_do_not_change_the_exit_code() {
    let env = TestEnv::new();
    env.write_scalectl(&format!(
        "#!/bin/sh\necho \"scalectl $*\" >> '{log}'\ncase \"$1\" in\n  health) echo 'monitor unavailable' >&2; exit 1 ;;\nesac\necho report\nexit 0\n",
        log = env.toolkit_log.display()
    ));

    env.health_cmd_without_transport()
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("health check complete"));

    // All five queries were still attempted, in order.
    let toolkit = env.toolkit_log();
    let lines: Vec<&str> = toolkit.lines().collect();
    assert_eq!(
        lines,
        vec![
            "scalectl cluster list",
            "scalectl cluster state",
            "scalectl health nodes",
            "scalectl health events",
            "scalectl nsd list",
        ]
    );
}

#[test]
fn required_query_failures_fail_the_health_check() {
    let env = TestEnv::new();
    env.write_scalectl(&format!(
        "#!/bin/sh\necho \"scalectl $*\" >> '{log}'\necho 'cluster not defined' >&2\nexit 1\n",
        log = env.toolkit_log.display()
    ));

    env.health_cmd_without_transport()
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolution strategy"));
}
