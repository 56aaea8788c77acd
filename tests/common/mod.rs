use std::path::Path;
use std::process::Output;

/// Runs the zonesigner binary in the given directory.
#[track_caller]
pub fn zonesigner(dir: &Path, args: &[&str]) -> Output {
    test_bin::get_test_bin("zonesigner")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

/// Asserts that the command succeeded and returns its stdout.
#[track_caller]
pub fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}
