//! End-to-end integration tests for the facegen CLI.
//!
//! Each test invokes the real binary against the shared schema fixture
//! and asserts on the written fragments or the reported diagnostics.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run `facegen generate` against the shared fixture with `--stable-ids`
/// and return the output directory.
fn generate_fixture(temp_dir: &Path) -> PathBuf {
    let out_dir = temp_dir.join("out");
    let output = Command::new(find_facegen())
        .args([
            "generate",
            fixture_path("editor.iface").to_str().unwrap(),
            "--config",
            fixture_path("editor.toml").to_str().unwrap(),
            "--out-dir",
            out_dir.to_str().unwrap(),
            "--stable-ids",
        ])
        .output()
        .expect("failed to invoke facegen");

    assert!(
        output.status.success(),
        "facegen generate failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    out_dir
}

fn read_output(out_dir: &Path, name: &str) -> String {
    let path = out_dir.join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
}

/// Find the facegen binary in the target directory.
fn find_facegen() -> PathBuf {
    let mut path = std::env::current_exe()
        .expect("cannot find current exe")
        .parent()
        .expect("cannot find parent dir")
        .to_path_buf();

    // Navigate from `deps/` to the target directory
    if path.file_name().map_or(false, |n| n == "deps") {
        path = path.parent().unwrap().to_path_buf();
    }

    let facegen = path.join("facegen");
    assert!(
        facegen.exists(),
        "facegen binary not found at {}. Run `cargo build -p facegen` first.",
        facegen.display()
    );
    facegen
}

/// Path to a shared fixture in the repo-root tests/fixtures/ directory.
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ── E2E Tests ────────────────────────────────────────────────────────────

#[test]
fn generate_writes_all_six_fragments() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    for name in [
        "IEditView_gen.schema.fragment",
        "IEditView_lite_gen.schema.fragment",
        "IEditView_gen.consts.fragment",
        "EditView_gen.stubs.h",
        "EditView_gen.dispatch.h",
        "IEditView_gen.wrapper.js",
    ] {
        assert!(out_dir.join(name).exists(), "missing output {name}");
    }
}

#[test]
fn schema_fragment_renders_attributes_and_stable_chunk_ids() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    let schema = read_output(&out_dir, "IEditView_gen.schema.fragment");
    assert!(schema.contains("[scriptable, uuid(00000000-0000-0000-0000-000000000000)]"));
    assert!(schema.contains("interface IEditView_Part0 : IHostSupports {"));
    assert!(schema.contains("attribute long currentPos;"));
    assert!(schema.contains("readonly attribute long length;"));
    assert!(schema.contains("attribute boolean readOnly;"));
    // Claimed by the lite interface, so absent here.
    assert!(!schema.contains("addText"));
    // Omitted from the interface description only.
    assert!(!schema.contains("lineFromPosition"));

    let lite = read_output(&out_dir, "IEditView_lite_gen.schema.fragment");
    assert!(lite.contains("void addText(in long length, in string text);"));
}

#[test]
fn constants_fragment_honors_the_discard_list() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    let constants = read_output(&out_dir, "IEditView_gen.consts.fragment");
    assert!(constants.contains("// Returned for invalid positions."));
    assert!(constants.contains("const long EV_INVALID_POSITION = -1;"));
    assert!(!constants.contains("SCI_START"));
}

#[test]
fn lite_features_become_direct_native_stubs() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    let stubs = read_output(&out_dir, "EditView_gen.stubs.h");
    assert!(stubs.contains("HostResult EditView::AddText(int32_t length, const char *text) {"));
    assert!(stubs.contains("SendCommand(EV_ADDTEXT, (uptr_t)length, (uptr_t)(text));"));

    let dispatch = read_output(&out_dir, "EditView_gen.dispatch.h");
    assert!(!dispatch.contains("METHOD_ADDTEXT"));
}

#[test]
fn dispatch_tables_cover_derived_and_manual_features() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    let dispatch = read_output(&out_dir, "EditView_gen.dispatch.h");
    assert!(dispatch.contains("static ScriptIdent METHOD_GOTOLINE;"));
    assert!(dispatch.contains("static ScriptIdent PROP_CURRENTPOS;"));
    // Schema-omitted features still dispatch.
    assert!(dispatch.contains("if (ident == METHOD_LINEFROMPOSITION) {"));
    assert!(dispatch.contains("METHOD_GOTOLINE = host_ident(\"gotoLine\");"));
    assert!(dispatch.contains(
        "INT_TO_SCRIPTVAL((int32_t)SendCommand(EV_GETCURRENTPOS, 0, 0), *result);"
    ));
    assert!(dispatch.contains("SendCommand(EV_SETCURRENTPOS, (uptr_t)SCRIPTVAL_TO_INT(*value), 0);"));
    // The stringresult argument gets a scratch buffer and a write-back.
    assert!(dispatch.contains("static char buffer_1[32 * 1024];"));
    // Manual features route to hand-written code.
    assert!(dispatch.contains("return SendUpdateCommands(args, argCount, result);"));
    assert!(dispatch.contains("return CopyDocumentText(result);"));
    assert!(dispatch.contains("return ReplaceDocumentText(value);"));
    // Unknown identifiers warn and fail closed.
    assert!(dispatch.contains("host_warn(\"EditView::Invoke: unknown method %s\", host_ident_name(ident));"));
}

#[test]
fn wrapper_registers_chunks_and_forwards_names() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let out_dir = generate_fixture(temp.path());

    let wrapper = read_output(&out_dir, "IEditView_gen.wrapper.js");
    assert!(wrapper.contains(
        "editorWrapper.prototype._interfaces.push(Host.interfaces.IEditView_Part0);"
    ));
    assert!(wrapper.contains("editorWrapper.prototype.__defineGetter__(\"currentPos\","));
    assert!(wrapper.contains("editorWrapper.prototype.__defineSetter__(\"text\","));
    assert!(wrapper.contains("editorWrapper.prototype.sendUpdateCommands ="));
    assert!(wrapper.contains("editorWrapper.prototype.lineFromPosition ="));
    assert!(!wrapper.contains("SCI_START"));
}

#[test]
fn regeneration_with_stable_ids_is_byte_identical() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let first = generate_fixture(&temp.path().join("a"));
    let second = generate_fixture(&temp.path().join("b"));

    for name in [
        "IEditView_gen.schema.fragment",
        "IEditView_lite_gen.schema.fragment",
        "IEditView_gen.consts.fragment",
        "EditView_gen.stubs.h",
        "EditView_gen.dispatch.h",
        "IEditView_gen.wrapper.js",
    ] {
        assert_eq!(
            read_output(&first, name),
            read_output(&second, name),
            "fragment {name} differs between runs"
        );
    }
}

#[test]
fn check_reports_the_feature_count() {
    let output = Command::new(find_facegen())
        .args([
            "check",
            fixture_path("editor.iface").to_str().unwrap(),
            "--config",
            fixture_path("editor.toml").to_str().unwrap(),
        ])
        .output()
        .expect("failed to invoke facegen");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Checked:"), "unexpected stderr: {stderr}");
}

#[test]
fn schema_errors_fail_the_run_with_diagnostics() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let bad = temp.path().join("bad.iface");
    std::fs::write(&bad, "bogus record here\nval EV_OK=1\n").expect("failed to write schema");

    let output = Command::new(find_facegen())
        .args(["check", bad.to_str().unwrap(), "--no-color"])
        .output()
        .expect("failed to invoke facegen");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown record kind: bogus"), "unexpected stderr: {stderr}");
    assert!(stderr.contains("error: Generation failed due to schema errors above."));
}

#[test]
fn json_mode_emits_one_diagnostic_per_line() {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let bad = temp.path().join("bad.iface");
    std::fs::write(&bad, "bogus record here\n").expect("failed to write schema");

    let output = Command::new(find_facegen())
        .args(["check", bad.to_str().unwrap(), "--json"])
        .output()
        .expect("failed to invoke facegen");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let diag = stderr
        .lines()
        .find(|l| l.starts_with('{'))
        .expect("no JSON diagnostic line");
    let parsed: serde_json::Value = serde_json::from_str(diag).expect("diagnostic is not JSON");
    assert_eq!(parsed["severity"], "error");
    assert!(parsed["message"].as_str().unwrap().contains("unknown record kind"));
}
