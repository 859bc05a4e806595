use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_carousel")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "carousel.exe"
            } else {
                "carousel"
            });
            p
        })
}

#[test]
fn cli_render_writes_one_png_per_line() {
    let dir = PathBuf::from("target").join("cli_smoke");
    let out_dir = dir.join("deck");
    let _ = std::fs::remove_dir_all(&out_dir);
    std::fs::create_dir_all(&dir).unwrap();

    let in_path = dir.join("post.txt");
    std::fs::write(&in_path, "Ship small: fewer changes\n\nTest early: catch bugs\n").unwrap();
    let cfg_path = dir.join("brand.json");
    std::fs::write(&cfg_path, r##"{"primaryColor": "#ff6600", "outputFormat": "twitter"}"##)
        .unwrap();

    let status = std::process::Command::new(exe())
        .arg("render")
        .arg("--in")
        .arg(&in_path)
        .arg("--out")
        .arg(&out_dir)
        .arg("--config")
        .arg(&cfg_path)
        .args(["--style", "minimalist", "--threads", "2"])
        .status()
        .unwrap();

    assert!(status.success());
    for i in 1..=2 {
        let p = out_dir.join(format!("slide-{i}-twitter-minimalist.png"));
        let img = image::open(&p).unwrap();
        assert_eq!((img.width(), img.height()), (1600, 900));
    }
}

#[test]
fn cli_slide_prints_data_uri() {
    let out = std::process::Command::new(exe())
        .args(["slide", "--text", "Hello: world", "--style", "playful"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.trim().starts_with("data:image/png;base64,"));
}
