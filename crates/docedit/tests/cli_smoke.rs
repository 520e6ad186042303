use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docedit(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docedit").expect("binary exists");
    cmd.current_dir(workspace.path())
        .env_remove("DOCEDIT_EDIT_COMMAND")
        .env_remove("DOCEDIT_HISTORY_LIMIT");
    cmd
}

fn workspace_with(contents: &str) -> TempDir {
    let temp = tempfile::tempdir().expect("temp dir");
    fs::write(temp.path().join("paper.md"), contents).expect("write document");
    temp
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("docedit")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn commands_require_an_open_document() {
    let temp = tempfile::tempdir().unwrap();
    docedit(&temp)
        .args(["resolve", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no open document"));
}

#[test]
fn resolve_reports_json_range() {
    let temp = workspace_with("Hello   world\nfoo\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["resolve", "Hello world", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tier\": \"normalized\""))
        .stdout(predicate::str::contains("\"start\": 0"))
        .stdout(predicate::str::contains("\"end\": 13"));

    docedit(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Selection: 0..13 (normalized)"));
}

#[test]
fn unmatched_selection_is_a_notice_not_a_failure() {
    let temp = workspace_with("alpha beta gamma\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["resolve", "Table of Contents"])
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be matched"));
}

#[test]
fn resolve_reads_multiline_fragment_from_file() {
    let temp = workspace_with("# Title\n\nFirst line\nsecond   line\n\nOutro.\n");
    fs::write(temp.path().join("fragment.txt"), "First line\nsecond   line\n").unwrap();
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["resolve", "--file", "fragment.txt", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tier\": \"exact\""))
        .stdout(predicate::str::contains("\"start\": 9"))
        .stdout(predicate::str::contains("\"end\": 33"));
}

#[test]
fn resolve_reads_fragment_from_stdin() {
    let temp = workspace_with("alpha\nbeta  gamma\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["resolve", "--file", "-"])
        .write_stdin("alpha\nbeta gamma\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("normalized match at 0..17"));
}

#[test]
fn resolve_rejects_fragment_and_file_together() {
    let temp = workspace_with("alpha\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["resolve", "alpha", "--file", "fragment.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn workspace_config_applies_outside_the_workspace() {
    let workspace = workspace_with("alpha\n");
    fs::create_dir_all(workspace.path().join(".docedit")).unwrap();
    fs::write(
        workspace.path().join(".docedit/config.toml"),
        "[editor]\nhistory_limit = 7\n",
    )
    .unwrap();
    let elsewhere = tempfile::tempdir().unwrap();

    docedit(&elsewhere)
        .arg("--workspace")
        .arg(workspace.path())
        .args(["open", "paper.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(7 history slots)"));
}

#[cfg(unix)]
#[test]
fn workspace_edit_command_is_used_with_workspace_flag() {
    let workspace = workspace_with("alpha\n");
    fs::create_dir_all(workspace.path().join(".docedit")).unwrap();
    fs::write(
        workspace.path().join(".docedit/config.toml"),
        "[edit]\ncommand = [\"sh\", \"-c\", \"cat >/dev/null; echo ALPHA\"]\n",
    )
    .unwrap();
    let elsewhere = tempfile::tempdir().unwrap();

    docedit(&elsewhere)
        .arg("--workspace")
        .arg(workspace.path())
        .args(["open", "paper.md"])
        .assert()
        .success();
    docedit(&elsewhere)
        .arg("--workspace")
        .arg(workspace.path())
        .args(["propose", "--prompt", "shout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ALPHA"));
}

#[test]
fn propose_without_command_fails() {
    let temp = workspace_with("alpha\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args(["propose", "--prompt", "shout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no edit command configured"));
}

#[cfg(unix)]
#[test]
fn propose_accept_and_undo_round_trip() {
    let temp = workspace_with("Intro.\n\nlet x be small.\n");
    let document = temp.path().join("paper.md");
    docedit(&temp).args(["open", "paper.md"]).assert().success();
    docedit(&temp)
        .args(["resolve", "let x  be small."])
        .assert()
        .success();

    // The edit command sees the whole prompt, so keep only the excerpt line.
    docedit(&temp)
        .args([
            "propose",
            "--prompt",
            "capitalise",
            "--command",
            "sh -c 'tail -n 1 | tr a-z A-Z'",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("-let x be small."))
        .stdout(predicate::str::contains("+LET X BE SMALL."));

    docedit(&temp).arg("accept").assert().success();
    assert_eq!(
        fs::read_to_string(&document).unwrap(),
        "Intro.\n\nLET X BE SMALL.\n"
    );

    docedit(&temp)
        .arg("undo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Undid to: open"));
    assert_eq!(
        fs::read_to_string(&document).unwrap(),
        "Intro.\n\nlet x be small.\n"
    );

    docedit(&temp)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("selection: capitalise"));
}

#[cfg(unix)]
#[test]
fn declined_edit_leaves_document_untouched() {
    let temp = workspace_with("keep me\n");
    docedit(&temp).args(["open", "paper.md"]).assert().success();

    docedit(&temp)
        .args([
            "propose",
            "--prompt",
            "delete everything",
            "--command",
            "sh -c 'cat >/dev/null; echo \"ERROR: refusing to delete\"'",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("declined: refusing to delete"));

    docedit(&temp)
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending proposal."));
    assert_eq!(
        fs::read_to_string(temp.path().join("paper.md")).unwrap(),
        "keep me\n"
    );
}
