use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nf_hist::{Hist1D, Hist2D};
use nf_store::{Store, StoreValue};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nufold"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn exit_code(out: &Output) -> i32 {
    out.status.code().expect("process should exit normally")
}

fn edges(n: usize) -> Vec<f64> {
    (0..=n).map(|i| i as f64).collect()
}

fn hist(name: &str, cv: &[f64]) -> Hist1D {
    Hist1D::with_contents(name, &edges(cv.len()), cv.to_vec(), vec![0.0; cv.len()]).unwrap()
}

fn write_data_store(dir: &Path) -> PathBuf {
    let mut data = Store::new();
    data.insert("POTUsed", StoreValue::Scalar { value: 1.0e19 });
    data.insert(
        "Tracker_Signal",
        StoreValue::Hist1D(hist("Tracker_Signal", &[10.0, 20.0, 10.0])),
    );
    let path = dir.join("Data.json");
    data.write_new(&path).unwrap();
    path
}

fn write_sim_store(dir: &Path, with_migration: bool) -> PathBuf {
    let n = 3;
    let mut plane = vec![0.0; n * n];
    for i in 0..n {
        plane[i * n + i] = 10.0;
    }
    let migration =
        Hist2D::with_contents("Tracker_Migration", &edges(n), &edges(n), plane, vec![0.0; n * n])
            .unwrap();

    let mut sim = Store::new();
    sim.insert("POTUsed", StoreValue::Scalar { value: 2.0e19 });
    if with_migration {
        sim.insert("Tracker_Migration", StoreValue::Hist2D(migration));
    }
    sim.insert(
        "Tracker_EfficiencyNumerator",
        StoreValue::Hist1D(hist("num", &[50.0, 80.0, 20.0])),
    );
    sim.insert(
        "Tracker_EfficiencyDenominator",
        StoreValue::Hist1D(hist("denom", &[50.0, 80.0, 20.0])),
    );
    sim.insert(
        "Tracker_reweightedflux_integrated",
        StoreValue::Hist1D(hist("flux", &[1.0, 1.0, 1.0])),
    );
    sim.insert(
        "Tracker_Background_Other",
        StoreValue::Hist1D(hist("bkg", &[2.0, 4.0, 2.0])),
    );
    sim.insert(
        "Tracker_FiducialNucleons",
        StoreValue::Hist1D(
            Hist1D::with_contents("nucleons", &[0.0, 1.0], vec![1.0e30], vec![0.0]).unwrap(),
        ),
    );
    let path = dir.join("MC.json");
    sim.write_new(&path).unwrap();
    path
}

#[test]
fn extract_writes_cross_sections_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data_store(dir.path());
    let sim = write_sim_store(dir.path(), true);
    let output = dir.path().join("crossSections.json");

    let out = run(&[
        "extract",
        data.to_string_lossy().as_ref(),
        sim.to_string_lossy().as_ref(),
        "--output",
        output.to_string_lossy().as_ref(),
        "--threads",
        "1",
    ]);
    assert_eq!(
        exit_code(&out),
        0,
        "extract should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(output.exists());

    let store = Store::open(&output).unwrap();
    for key in [
        "Tracker_backgroundSubtracted",
        "Tracker_unfolded",
        "Tracker_crossSection",
        "Tracker_simulatedCrossSection",
    ] {
        assert!(store.get_hist1d(key).is_ok(), "missing {key}");
    }
    assert_eq!(
        store.get_hist1d("Tracker_backgroundSubtracted").unwrap().cv(),
        &[9.0, 18.0, 9.0]
    );
    assert_eq!(store.get_scalar("POTUsed").unwrap(), 1.0e19);
}

#[test]
fn iterative_mode_accepts_an_iteration_count() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data_store(dir.path());
    let sim = write_sim_store(dir.path(), true);
    let output = dir.path().join("bayes.json");

    let out = run(&[
        "extract",
        data.to_string_lossy().as_ref(),
        sim.to_string_lossy().as_ref(),
        "--iterations",
        "4",
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert_eq!(exit_code(&out), 0, "stderr={}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn refuses_to_overwrite_an_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data_store(dir.path());
    let sim = write_sim_store(dir.path(), true);
    let output = dir.path().join("taken.json");
    std::fs::write(&output, "{}").unwrap();

    let out = run(&[
        "extract",
        data.to_string_lossy().as_ref(),
        sim.to_string_lossy().as_ref(),
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert_eq!(exit_code(&out), 5);
    // The pre-existing artifact is untouched.
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");
}

#[test]
fn unreadable_data_store_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let sim = write_sim_store(dir.path(), true);
    let missing = dir.path().join("nope.json");

    let out = run(&[
        "extract",
        missing.to_string_lossy().as_ref(),
        sim.to_string_lossy().as_ref(),
        "--output",
        dir.path().join("out.json").to_string_lossy().as_ref(),
    ]);
    assert_eq!(exit_code(&out), 2);
}

#[test]
fn unreadable_sim_store_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data_store(dir.path());
    let missing = dir.path().join("nope.json");

    let out = run(&[
        "extract",
        data.to_string_lossy().as_ref(),
        missing.to_string_lossy().as_ref(),
        "--output",
        dir.path().join("out.json").to_string_lossy().as_ref(),
    ]);
    assert_eq!(exit_code(&out), 3);
}

#[test]
fn missing_positional_arguments_exit_one() {
    let out = run(&["extract"]);
    assert_eq!(exit_code(&out), 1);
}

#[test]
fn a_failed_prefix_exits_four_but_still_persists_bookkeeping() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data_store(dir.path());
    let sim = write_sim_store(dir.path(), false); // no migration: unfold ingredient missing
    let output = dir.path().join("out.json");

    let out = run(&[
        "extract",
        data.to_string_lossy().as_ref(),
        sim.to_string_lossy().as_ref(),
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert_eq!(exit_code(&out), 4);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Tracker"), "stderr should name the failed prefix: {stderr}");

    // The run still writes what it can.
    let store = Store::open(&output).unwrap();
    assert_eq!(store.get_scalar("POTUsed").unwrap(), 1.0e19);
    assert!(store.get_hist1d("Tracker_crossSection").is_err());
}

#[test]
fn help_exits_zero() {
    let out = run(&["--help"]);
    assert_eq!(exit_code(&out), 0);
}
