use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::prelude::*;
use std::path::Path;
use tar::Builder;
use tempfile::tempdir;

const MAIN_MANIFEST: &str = r#"{
  "name": "@spader/node-whisper-cpp",
  "version": "1.2.3",
  "optionalDependencies": {
    "@spader/node-whisper-cpp-x64-linux-cpu-gnu": "1.2.3",
    "@spader/node-whisper-cpp-x64-linux-cuda-gnu": "1.2.3",
    "@spader/node-whisper-cpp-arm64-darwin-metal": "1.2.3"
  }
}
"#;

fn create_packed_tgz(name: &str, version: &str) -> Vec<u8> {
    let manifest = format!(r#"{{"name": "{}", "version": "{}"}}"#, name, version);
    let mut tar_builder = Builder::new(Vec::new());
    for (path, content) in [
        ("package/package.json", manifest.as_str()),
        ("package/index.js", "module.exports = {};"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(path).unwrap();
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// A checkout with the main package, two platform packages, an installed
/// dependency and a build store holding the 1.2.3 artifacts.
fn create_repo(root: &Path) {
    write(root, "package.json", MAIN_MANIFEST.as_bytes());
    for triple in ["x64-linux-cpu-gnu", "arm64-darwin-metal"] {
        write(
            root,
            &format!("packages/platform/{}/package.json", triple),
            format!(
                "{{\n  \"name\": \"@spader/node-whisper-cpp-{}\",\n  \"version\": \"1.2.3\"\n}}\n",
                triple
            )
            .as_bytes(),
        );
    }
    write(
        root,
        "node_modules/left-pad/package.json",
        br#"{"name": "left-pad", "version": "1.0.0"}"#,
    );

    let store = ".cache/store/npm";
    write(
        root,
        &format!("{}/spader-node-whisper-cpp-1.2.3.tgz", store),
        &create_packed_tgz("@spader/node-whisper-cpp", "1.2.3"),
    );
    write(
        root,
        &format!("{}/spader-node-whisper-cpp-x64-linux-cpu-gnu-1.2.3.tgz", store),
        &create_packed_tgz("@spader/node-whisper-cpp-x64-linux-cpu-gnu", "1.2.3"),
    );
    write(
        root,
        &format!("{}/spader-node-whisper-cpp-arm64-darwin-metal-1.2.3.tgz", store),
        &create_packed_tgz("@spader/node-whisper-cpp-arm64-darwin-metal", "1.2.3"),
    );
}

fn staged(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join("artifacts"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_version_bump_stamps_every_manifest() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);
    let output = root.join("github_output");

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .arg("version")
        .arg("bump")
        .arg("minor")
        .arg("--root")
        .arg(root)
        .env("GITHUB_OUTPUT", &output)
        .assert()
        .success()
        .stdout(predicates::str::contains("stamped 1.3.0"))
        .stdout(predicates::str::contains("optionalDependencies"));

    let main = std::fs::read_to_string(root.join("package.json")).unwrap();
    assert!(main.contains(r#""version": "1.3.0""#));
    assert!(!main.contains("1.2.3"));

    let platform =
        std::fs::read_to_string(root.join("packages/platform/x64-linux-cpu-gnu/package.json"))
            .unwrap();
    assert!(platform.contains(r#""version": "1.3.0""#));

    let dependency =
        std::fs::read_to_string(root.join("node_modules/left-pad/package.json")).unwrap();
    assert!(dependency.contains("1.0.0"));

    assert_eq!(std::fs::read_to_string(output).unwrap(), "version=1.3.0\n");

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .arg("version")
        .arg("current")
        .env("WHISPER_DIST_ROOT", root)
        .assert()
        .success()
        .stdout("1.3.0\n");
}

#[test]
fn test_version_bump_explicit_prerelease() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["version", "bump", "2.0.0-rc.1", "--root"])
        .arg(root)
        .env_remove("GITHUB_OUTPUT")
        .assert()
        .success();

    let main = std::fs::read_to_string(root.join("package.json")).unwrap();
    assert!(main.contains(r#""version": "2.0.0-rc.1""#));
    assert!(main.contains(r#""@spader/node-whisper-cpp-arm64-darwin-metal": "2.0.0-rc.1""#));
}

#[test]
fn test_version_bump_rejects_invalid_version() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["version", "bump", "1.2", "--root"])
        .arg(root)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Invalid version"));

    let main = std::fs::read_to_string(root.join("package.json")).unwrap();
    assert_eq!(main, MAIN_MANIFEST);
}

#[test]
fn test_stage_all_and_filtered() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);
    write(root, "artifacts/spader-node-whisper-cpp-1.2.2.tgz", b"stale");

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .arg("stage")
        .arg("--root")
        .arg(root)
        .assert()
        .success()
        .stdout(predicates::str::contains("3 artifact(s)"));

    assert_eq!(
        staged(root),
        vec![
            "spader-node-whisper-cpp-1.2.3.tgz",
            "spader-node-whisper-cpp-arm64-darwin-metal-1.2.3.tgz",
            "spader-node-whisper-cpp-x64-linux-cpu-gnu-1.2.3.tgz",
        ]
    );

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["stage", "js", "--root"])
        .arg(root)
        .assert()
        .success();
    assert_eq!(staged(root), vec!["spader-node-whisper-cpp-1.2.3.tgz"]);

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["stage", "addon", "--root"])
        .arg(root)
        .assert()
        .success();
    assert_eq!(
        staged(root),
        vec![
            "spader-node-whisper-cpp-arm64-darwin-metal-1.2.3.tgz",
            "spader-node-whisper-cpp-x64-linux-cpu-gnu-1.2.3.tgz",
        ]
    );
}

#[test]
fn test_stage_with_empty_store_fails() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    write(root, "package.json", MAIN_MANIFEST.as_bytes());

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["stage", "--root"])
        .arg(root)
        .assert()
        .failure()
        .stderr(predicates::str::contains("No artifacts found"));
}

#[test]
fn test_publish_empty_staging_fails() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);
    std::fs::create_dir_all(root.join("artifacts")).unwrap();

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["publish", "--dry-run", "--root"])
        .arg(root)
        .assert()
        .failure()
        .stderr(predicates::str::contains("No artifacts found"));
}

#[test]
fn test_publish_refuses_stale_staging() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["stage", "--root"])
        .arg(root)
        .assert()
        .success();

    // Version moves on without re-staging
    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["version", "bump", "patch", "--root"])
        .arg(root)
        .env_remove("GITHUB_OUTPUT")
        .assert()
        .success();

    // The old main artifact no longer matches 1.2.4 and is treated as a
    // platform artifact; its packed version gives it away.
    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["publish", "--dry-run", "--root"])
        .arg(root)
        .assert()
        .failure()
        .stderr(predicates::str::contains("expected version 1.2.4"));
}

#[test]
fn test_clean_removes_build_outputs() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);
    write(
        root,
        "packages/platform/x64-linux-cpu-gnu/bins/whisper-addon.node",
        b"\x7fELF",
    );

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["clean", "--root"])
        .arg(root)
        .assert()
        .success()
        .stdout(predicates::str::contains("removed .cache"));

    assert!(!root.join(".cache").exists());
    assert!(!root.join("packages/platform/x64-linux-cpu-gnu/bins").exists());
    assert!(root.join("packages/platform/x64-linux-cpu-gnu/package.json").exists());

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["clean", "--root"])
        .arg(root)
        .assert()
        .success()
        .stdout(predicates::str::contains("Nothing to clean."));
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[test]
fn test_detect_with_forced_backend() {
    Command::new(cargo::cargo_bin!("whisper-dist"))
        .arg("detect")
        .env("WHISPER_DIST_BACKEND", "cpu")
        .assert()
        .success()
        .stdout("x64-linux-cpu-gnu\n");

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .arg("detect")
        .env("WHISPER_DIST_BACKEND", "metal")
        .assert()
        .failure()
        .stderr(predicates::str::contains("Unsupported platform"));
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[test]
fn test_resolve_local_platform_package() {
    let root_dir = tempdir().unwrap();
    let root = root_dir.path();
    create_repo(root);

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["resolve", "--root"])
        .arg(root)
        .env("WHISPER_DIST_BACKEND", "cpu")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "packages/platform/x64-linux-cpu-gnu/bins/whisper-addon.node",
        ));

    Command::new(cargo::cargo_bin!("whisper-dist"))
        .args(["resolve", "--root"])
        .arg(root)
        .env("WHISPER_DIST_BACKEND", "cuda")
        .assert()
        .failure()
        .stderr(predicates::str::contains("Could not resolve platform package"));
}
