//! Process-level tests for `MxNeuralCompiler` using stand-in shell scripts.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mx_compiler::{CompileRequest, CompilerConfig, CompilerError, MxNeuralCompiler, NeuralCompiler};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn request(dir: &Path) -> CompileRequest {
    let model_path = dir.join("net.onnx");
    std::fs::write(&model_path, b"onnx").unwrap();
    CompileRequest {
        model_path,
        dfp_path: dir.join("out").join("net.dfp"),
        work_dir: dir.to_path_buf(),
    }
}

#[test]
fn successful_compile_returns_dfp_and_runs_in_work_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("out")).unwrap();
    let script = write_script(
        dir.path(),
        "fake_nc",
        r#"while [ $# -gt 0 ]; do
  case "$1" in
    --dfp_fname) out="$2"; shift ;;
  esac
  shift
done
printf 'dfp' > "$out"
echo "compiled" > nc.log"#,
    );

    let compiler = MxNeuralCompiler::new(CompilerConfig::from_env().with_executable(script));
    let req = request(dir.path());
    let artifact = compiler.compile(&req).expect("compile failed");

    assert_eq!(artifact.dfp_path, req.dfp_path);
    assert_eq!(std::fs::read(&artifact.dfp_path).unwrap(), b"dfp");
    assert!(dir.path().join("nc.log").is_file());
}

#[test]
fn non_zero_exit_is_compilation_failed_with_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "failing_nc",
        "echo 'unsupported operator: Einsum' >&2\nexit 3",
    );

    let compiler = MxNeuralCompiler::new(CompilerConfig::from_env().with_executable(script));
    match compiler.compile(&request(dir.path())) {
        Err(CompilerError::CompilationFailed { stderr, .. }) => {
            assert!(stderr.contains("Einsum"))
        }
        other => panic!("expected CompilationFailed, got {other:?}"),
    }
}

#[test]
fn success_without_artifact_is_artifact_missing() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "lazy_nc", "exit 0");

    let compiler = MxNeuralCompiler::new(CompilerConfig::from_env().with_executable(script));
    assert!(matches!(
        compiler.compile(&request(dir.path())),
        Err(CompilerError::ArtifactMissing(_))
    ));
}
