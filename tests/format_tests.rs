//! Integration coverage for the file-loading entry point, as opposed to
//! the unit tests inside `format::text`/`format::json` that exercise the
//! parsers directly on in-memory strings.

use std::io::Write;

use t81vm::core::opcode::Opcode;
use t81vm::format::load_program_from_file;

#[test]
fn loads_a_text_program_by_extension() {
    let mut file = tempfile_with_suffix(".t81");
    writeln!(file, "LOADIMM 0 10 0\nHALT\n").unwrap();
    let program = load_program_from_file(file.path()).unwrap();
    assert_eq!(program.insns[0].opcode, Opcode::LoadImm);
}

#[test]
fn loads_a_json_program_by_extension() {
    let mut file = tempfile_with_suffix(".json");
    writeln!(file, r#"{{"insns":[{{"opcode":"HALT"}}]}}"#).unwrap();
    let program = load_program_from_file(file.path()).unwrap();
    assert_eq!(program.insns[0].opcode, Opcode::Halt);
}

#[test]
fn missing_file_surfaces_an_io_error() {
    let missing = std::path::Path::new("/nonexistent/t81vm-test-program.t81");
    assert!(load_program_from_file(missing).is_err());
}

fn tempfile_with_suffix(suffix: &str) -> std::fs::File {
    let mut path = std::env::temp_dir();
    path.push(format!("t81vm-test-{}{}", std::process::id(), suffix));
    std::fs::File::create(&path).unwrap();
    std::fs::OpenOptions::new().write(true).truncate(true).open(&path).unwrap()
}
