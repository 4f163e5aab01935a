use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const TREE: &str = "((A:0.1,B:0.2):0.05,(C:0.3,D:0.1):0.2);";

fn write_tree(dir: &Path, newick: &str) -> std::path::PathBuf {
    let path = dir.join("tree.nwk");
    fs::write(&path, newick).unwrap();
    path
}

fn phylosim() -> Command {
    Command::cargo_bin("phylosim").unwrap()
}

#[test]
fn test_init_writes_configuration() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("run.json");

    phylosim()
        .arg("init")
        .arg("--output")
        .arg(&config)
        .arg("--model")
        .arg("HKY{2}+G4{0.5}")
        .arg("--length")
        .arg("200")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let text = fs::read_to_string(&config).unwrap();
    assert!(text.contains("HKY{2}+G4{0.5}"));
    assert!(text.contains("\"sequence_length\": 200"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("run.json");
    fs::write(&config, "{}").unwrap();

    phylosim()
        .arg("init")
        .arg("-o")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    phylosim()
        .arg("init")
        .arg("-o")
        .arg(&config)
        .arg("--force")
        .assert()
        .success();
}

#[test]
fn test_validate_reports_missing_branch_model() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), "(A[&model=FAST]:0.1,B:0.2);");

    phylosim()
        .arg("validate")
        .arg("--tree")
        .arg(&tree)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAST"));

    phylosim()
        .arg("validate")
        .arg("--tree")
        .arg(&tree)
        .arg("--branch-model")
        .arg("FAST=JC+I{0.2}")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ready to simulate"));
}

#[test]
fn test_simulate_writes_phylip() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);
    let prefix = temp.path().join("out");

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("--output")
        .arg(&prefix)
        .arg("--length")
        .arg("30")
        .arg("--seed")
        .arg("42")
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation complete!"));

    let text = fs::read_to_string(temp.path().join("out.phy")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "4 30");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("A "));
    assert_eq!(lines[1].len(), 2 + 30);
}

#[test]
fn test_simulate_is_reproducible_with_seed() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);

    for name in ["first", "second"] {
        phylosim()
            .arg("simulate")
            .arg("--tree")
            .arg(&tree)
            .arg("-o")
            .arg(temp.path().join(name))
            .arg("-m")
            .arg("GTR{1,2,1,1,2,1}+I{0.2}+G4{0.5}")
            .arg("-L")
            .arg("100")
            .arg("--seed")
            .arg("7")
            .arg("--format")
            .arg("fasta")
            .arg("--no-progress")
            .assert()
            .success();
    }

    let first = fs::read(temp.path().join("first.fa")).unwrap();
    let second = fs::read(temp.path().join("second.fa")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_simulate_multiple_compressed_datasets() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);
    let prefix = temp.path().join("aln");

    phylosim()
        .arg("-t")
        .arg("2")
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("-o")
        .arg(&prefix)
        .arg("-n")
        .arg("3")
        .arg("-L")
        .arg("20")
        .arg("--seed")
        .arg("1")
        .arg("--compression")
        .arg("zstd")
        .arg("--no-progress")
        .assert()
        .success();

    for i in 0..3 {
        let path = temp.path().join(format!("aln_{i}.phy.zst"));
        let bytes = fs::read(&path).unwrap();
        let text = String::from_utf8(zstd_decode(&bytes)).unwrap();
        assert!(text.starts_with("4 20\n"), "{}", path.display());
    }
}

#[test]
fn test_simulate_with_config_file_and_fundi() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);
    let config = temp.path().join("run.json");

    phylosim()
        .arg("init")
        .arg("-o")
        .arg(&config)
        .arg("--length")
        .arg("40")
        .arg("--fundi-taxa")
        .arg("A,C")
        .arg("--fundi-proportion")
        .arg("0.25")
        .assert()
        .success();

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(temp.path().join("fundi"))
        .arg("--seed")
        .arg("3")
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("FunDi swapped sites: 10"));

    assert!(temp.path().join("fundi.phy").exists());
}

#[test]
fn test_simulate_bad_model_creates_no_file() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);
    let prefix = temp.path().join("bad");

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("-o")
        .arg(&prefix)
        .arg("-m")
        .arg("NOPE{1}")
        .arg("--no-progress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOPE"));

    assert!(!temp.path().join("bad.phy").exists());
}

#[test]
fn test_simulate_rejects_invalid_tree() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), "((A:0.1,B:0.2);");

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("--no-progress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tree"));
}

#[test]
fn test_simulate_ancestral_with_whitespace() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), TREE);
    let prefix = temp.path().join("fixed");

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("-o")
        .arg(&prefix)
        .arg("--ancestral")
        .arg("AC GT ACGT")
        .arg("--seed")
        .arg("4")
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fixed, 8 sites"));

    let text = fs::read_to_string(temp.path().join("fixed.phy")).unwrap();
    assert!(text.starts_with("4 8\n"));
}

#[test]
fn test_simulate_with_ascertainment_correction() {
    let temp = tempdir().unwrap();
    let tree = write_tree(temp.path(), "((A:0.5,B:0.5):0.5,(C:0.5,D:0.5):0.5);");
    let prefix = temp.path().join("asc");

    phylosim()
        .arg("simulate")
        .arg("--tree")
        .arg(&tree)
        .arg("-o")
        .arg(&prefix)
        .arg("-m")
        .arg("JC+ASC")
        .arg("-L")
        .arg("40")
        .arg("--seed")
        .arg("8")
        .arg("--format")
        .arg("fasta")
        .arg("--no-progress")
        .assert()
        .success();

    let text = fs::read_to_string(temp.path().join("asc.fa")).unwrap();
    let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('>')).collect();
    assert_eq!(rows.len(), 4);
    for column in 0..40 {
        let first = rows[0].as_bytes()[column];
        assert!(
            rows.iter().any(|r| r.as_bytes()[column] != first),
            "column {column} is constant"
        );
    }
}

fn zstd_decode(bytes: &[u8]) -> Vec<u8> {
    phylosim_codec::CodecStrategy::Zstd.decode(bytes).unwrap()
}
