use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "wsnet-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

// 所有类都没有 implementation 块，不需要任何动态库
const CONFIG: &str = r#"
<worldsens>
    <global_map name="world">
        <class_parameters>
            <param key="x" value="100"/>
            <param key="y" value="100"/>
        </class_parameters>
    </global_map>
    <pathloss name="freespace"/>
    <mac name="csma"><default_parameters><param key="rate" value="10"/></default_parameters></mac>
    <application name="cbr"/>
    <medium name="radio" range="50"><pathloss name="freespace"/></medium>
    <environment name="outdoor"/>
    <node_architecture name="mote" default="true">
        <implementation>
            <mac name="csma"/>
            <application name="cbr"><down name="csma"/></application>
        </implementation>
    </node_architecture>
    <simulation nodes="3" duration="2s">
        <node id="2" birth="1s"/>
    </simulation>
</worldsens>
"#;

#[test]
fn wsnet_dumps_the_assembled_graph_as_json() {
    let dir = unique_temp_dir("dump");
    let config = write_file(&dir, "config.xml", CONFIG);
    let out_json = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_wsnet"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--dump-json",
            out_json.to_str().unwrap(),
            "--run",
        ])
        .env_remove("WSNET_MODDIR")
        .output()
        .expect("run wsnet");
    assert!(
        output.status.success(),
        "wsnet failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("assembled classes=4, mediums=1, environments=1, nodes=3, groups=0, events=4"),
        "unexpected stdout: {stdout}"
    );

    let raw = fs::read_to_string(&out_json).expect("read summary.json");
    let v: Value = serde_json::from_str(&raw).expect("parse summary.json");
    let nodes = v["nodes"].as_array().expect("nodes array");
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[2]["birth"], 1_000_000_000u64);
    assert_eq!(v["area"]["x"], 100.0);
    assert_eq!(v["mediums"][0]["range"], 50.0);
    assert_eq!(v["classes"][0]["name"], "world");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wsnet_fails_on_invalid_config() {
    let dir = unique_temp_dir("invalid");
    let config = write_file(
        &dir,
        "config.xml",
        r#"<worldsens><simulation nodes="1" duration="1s"/><simulation/></worldsens>"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_wsnet"))
        .args(["--config", config.to_str().unwrap()])
        .output()
        .expect("run wsnet");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("配置失败"));

    let _ = fs::remove_dir_all(&dir);
}
