use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_scrollfx")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "scrollfx.exe"
            } else {
                "scrollfx"
            });
            p
        })
}

#[test]
fn cli_list_prints_the_registry() {
    let out = std::process::Command::new(exe()).arg("list").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert_eq!(text.lines().count(), 7);
    assert!(text.contains("stacking-cards"));
    assert!(text.contains("text-explosion-legacy"));
}

#[test]
fn cli_sample_prints_frames() {
    let page = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("page.json");
    let out = std::process::Command::new(exe())
        .args(["sample", "--page"])
        .arg(&page)
        .args(["--scroll", "0,1000,2200", "--seed", "3", "--settle", "1", "--changed-only"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let frames: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let frames = frames.as_array().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1]["scroll_y"], 1000.0);
    assert!(!frames[1]["nodes"].as_array().unwrap().is_empty());
}

#[test]
fn cli_sample_reports_missing_page() {
    let out = std::process::Command::new(exe())
        .args(["sample", "--page", "does/not/exist.json"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("open page"));
}
