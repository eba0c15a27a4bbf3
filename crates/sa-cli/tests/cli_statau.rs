use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_statau"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("statau_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn write_tmp(filename: &str, contents: &str) -> PathBuf {
    let p = tmp_path(filename);
    std::fs::write(&p, contents).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn stdout_json(out: &Output) -> serde_json::Value {
    assert!(out.status.success(), "command failed, stderr={}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

/// 6 firms × 4 years; y depends on x and a firm effect.
fn panel_dataset() -> PathBuf {
    let mut firm = Vec::new();
    let mut year = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut region = Vec::new();
    for i in 0..6 {
        for t in 0..4 {
            let xi = ((i * 7 + t * 3) % 5) as f64 + 0.5 * t as f64;
            let noise = (((i * 13 + t * 11) % 7) as f64 - 3.0) * 0.1;
            firm.push(i.to_string());
            year.push((2000 + t).to_string());
            x.push(format!("{xi}"));
            y.push(format!("{}", 1.0 + 0.8 * xi + i as f64 + noise));
            region.push(if i % 2 == 0 { "\"north\"" } else { "\"south\"" });
        }
    }
    let json = format!(
        r#"{{"columns": [
            {{"name": "firm", "values": [{}]}},
            {{"name": "year", "values": [{}]}},
            {{"name": "x", "values": [{}]}},
            {{"name": "y", "values": [{}]}},
            {{"name": "region", "values": [{}]}}
        ]}}"#,
        firm.join(","),
        year.join(","),
        x.join(","),
        y.join(","),
        region.join(",")
    );
    write_tmp("panel.json", &json)
}

#[test]
fn version_smoke() {
    let out = run(&["version"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("statau "));
}

#[test]
fn run_ols_json_contract() {
    let data = panel_dataset();
    let spec = write_tmp("ols.yaml", "method: ols\ny_var: y\nx_vars: [x]\nse_config:\n  type: robust\n");
    let out = run(&["run", "--data", data.to_str().unwrap(), "--spec", spec.to_str().unwrap(), "--json"]);
    let v = stdout_json(&out);
    assert_eq!(v["kind"], "estimation");
    assert_eq!(v["method"], "ols");
    assert_eq!(v["se_kind"], "robust");
    let coefs = v["coefficients"].as_array().unwrap();
    assert_eq!(coefs.len(), 2);
    assert_eq!(coefs[1]["name"], "Constant");
    assert_eq!(v["stats"]["n_obs"], 24);
}

#[test]
fn run_prints_table_and_writes_output() {
    let data = panel_dataset();
    let spec = write_tmp(
        "fe.json",
        r#"{"method": "fe", "y_var": "y", "x_vars": ["x"], "panel_entity": "firm", "panel_time": "year",
            "se_config": {"type": "cluster", "cluster_var": "firm"}}"#,
    );
    let output = tmp_path("fe_out.json");
    let out = run(&[
        "run",
        "--data",
        data.to_str().unwrap(),
        "--spec",
        spec.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Regression Results"));
    assert!(text.contains("(FE)"));
    assert!(text.contains("Standard errors are clustered."));
    assert!(text.contains("Fixed effects"));

    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(saved["method"], "fe");
    assert_eq!(saved["stats"]["n_clusters"], 6);
}

#[test]
fn table_merges_specs() {
    let data = panel_dataset();
    let ols = write_tmp("m1.yaml", "method: ols\ny_var: y\nx_vars: [x]\n");
    let pooled = write_tmp(
        "m2.yaml",
        "method: pooled\ny_var: y\nx_vars: [x, region]\npanel_entity: firm\npanel_time: year\n",
    );
    let out = run(&[
        "table",
        "--data",
        data.to_str().unwrap(),
        "--spec",
        ols.to_str().unwrap(),
        pooled.to_str().unwrap(),
        "--stats",
        "r2,nobs",
        "--row",
        "Controls=No,Yes",
        "--json",
    ]);
    let v = stdout_json(&out);
    assert_eq!(v["header"][0], serde_json::json!(["Variables", "(1)", "(2)"]));
    let footer = v["footer"].as_array().unwrap();
    assert_eq!(footer[0][0], "Observations");
    assert!(footer.iter().any(|r| r == &serde_json::json!(["Controls", "No", "Yes"])));
    let labels: Vec<&str> = v["rows"]
        .as_array()
        .unwrap()
        .iter()
        .step_by(2)
        .map(|r| r[0].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["x", "region=south", "Constant"]);
}

#[test]
fn f_test_and_hausman() {
    let data = panel_dataset();
    let spec = write_tmp(
        "panel.yaml",
        "method: fe\ny_var: y\nx_vars: [x]\npanel_entity: firm\npanel_time: year\ndecimals: 4\n",
    );
    let f = stdout_json(&run(&["f-test", "--data", data.to_str().unwrap(), "--spec", spec.to_str().unwrap(), "--json"]));
    assert_eq!(f["test"], "f_test");
    assert_eq!(f["df1"], 5);
    assert_eq!(f["df2"], 24 - 6 - 1);
    assert_eq!(f["n_entities"], 6);

    let h = run(&[
        "hausman",
        "--data",
        data.to_str().unwrap(),
        "--spec",
        spec.to_str().unwrap(),
        "--sigmamore",
        "--json",
    ]);
    let h = stdout_json(&h);
    assert_eq!(h["test"], "hausman_sigma_more");
    assert_eq!(h["df1"], 2);
    assert!(h["audit"]["scaling"].as_f64().unwrap() > 0.0);
}

#[test]
fn invalid_spec_fails_cleanly() {
    let data = panel_dataset();
    let spec = write_tmp("bad.yaml", "method: fe\ny_var: y\nx_vars: [x]\n");
    let out = run(&["run", "--data", data.to_str().unwrap(), "--spec", spec.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("panel entity and time"));
}
