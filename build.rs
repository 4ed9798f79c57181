use std::process::Command;

/// Прокидывает в бинарь короткий хеш коммита и время сборки для
/// `--version` и стартового лога.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=RELAY_GIT_COMMIT={}", commit.trim());

    let build_time = chrono::Utc::now().to_rfc3339();
    println!("cargo:rustc-env=RELAY_BUILD_TIME={build_time}");
}
